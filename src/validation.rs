// src/validation.rs
// Precondition checks gating whether a query is allowed to execute.
// A disabled query never invokes its fetcher and its state stays Idle.

use crate::types::ChainId;
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationFailure {
    #[error("unrecognized chain id {0}")]
    UnrecognizedChain(ChainId),
    #[error("malformed address: {0}")]
    MalformedAddress(String),
    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),
    #[error("entity id must not be empty")]
    EmptyEntityId,
    #[error("no tokens requested")]
    EmptyTokenList,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enablement {
    Enabled,
    Disabled(Vec<ValidationFailure>),
}

impl Enablement {
    pub fn is_enabled(&self) -> bool {
        matches!(self, Enablement::Enabled)
    }
}

/// Returns true for a `0x`-prefixed 20-byte hex address.
pub fn is_address(s: &str) -> bool {
    s.len() == 42
        && s.starts_with("0x")
        && s[2..].bytes().all(|b| b.is_ascii_hexdigit())
}

/// Accumulates precondition failures for one request.
#[derive(Debug, Default)]
pub struct ValidationSuite {
    failures: Vec<ValidationFailure>,
}

impl ValidationSuite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require_recognized_chain(mut self, recognized: &[ChainId], chain_id: ChainId) -> Self {
        if !recognized.contains(&chain_id) {
            self.failures
                .push(ValidationFailure::UnrecognizedChain(chain_id));
        }
        self
    }

    pub fn require_address(mut self, address: &str) -> Self {
        if !is_address(address) {
            self.failures
                .push(ValidationFailure::MalformedAddress(address.to_string()));
        }
        self
    }

    pub fn require_positive_amount(mut self, amount: Decimal) -> Self {
        if amount <= Decimal::ZERO {
            self.failures
                .push(ValidationFailure::NonPositiveAmount(amount));
        }
        self
    }

    pub fn require_entity_id(mut self, entity_id: &str) -> Self {
        if entity_id.trim().is_empty() {
            self.failures.push(ValidationFailure::EmptyEntityId);
        }
        self
    }

    pub fn require_tokens(mut self, tokens: &[String]) -> Self {
        if tokens.is_empty() {
            self.failures.push(ValidationFailure::EmptyTokenList);
        } else {
            for token in tokens {
                if !is_address(token) {
                    self.failures
                        .push(ValidationFailure::MalformedAddress(token.clone()));
                }
            }
        }
        self
    }

    pub fn evaluate(self) -> Enablement {
        if self.failures.is_empty() {
            Enablement::Enabled
        } else {
            Enablement::Disabled(self.failures)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD_ADDR: &str = "0x00000000000000000000000000000000000000a1";

    #[test]
    fn address_format_check() {
        assert!(is_address(GOOD_ADDR));
        assert!(!is_address("0xA"));
        assert!(!is_address("00000000000000000000000000000000000000a1ff"));
        assert!(!is_address("0x0000000000000000000000000000000000000zz1"));
    }

    #[test]
    fn all_checks_passing_enables_the_query() {
        let enablement = ValidationSuite::new()
            .require_recognized_chain(&[1, 10], 1)
            .require_address(GOOD_ADDR)
            .require_entity_id("3pool")
            .evaluate();
        assert!(enablement.is_enabled());
    }

    #[test]
    fn failures_accumulate() {
        let enablement = ValidationSuite::new()
            .require_recognized_chain(&[1, 10], 999)
            .require_address("0xA")
            .require_entity_id("  ")
            .evaluate();
        match enablement {
            Enablement::Disabled(failures) => assert_eq!(failures.len(), 3),
            Enablement::Enabled => panic!("expected disabled"),
        }
    }

    #[test]
    fn positive_amount_check() {
        let enablement = ValidationSuite::new()
            .require_positive_amount(Decimal::ZERO)
            .evaluate();
        assert!(!enablement.is_enabled());
    }
}
