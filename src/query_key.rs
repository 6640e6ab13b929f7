// src/query_key.rs

use crate::types::ChainId;
use rust_decimal::Decimal;
use std::fmt;

/// One element of a query key tuple.
///
/// Parts are typed primitives so two logically-equal requests always produce
/// byte-identical keys: addresses are lowercased at construction, decimals
/// compare by numeric value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
    Chain(ChainId),
    Address(String),
    Str(String),
    Int(i64),
    Decimal(Decimal),
    Flag(bool),
}

impl KeyPart {
    pub fn address(address: &str) -> Self {
        KeyPart::Address(address.to_ascii_lowercase())
    }

    pub fn str(label: &str) -> Self {
        KeyPart::Str(label.to_string())
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Chain(id) => write!(f, "chain:{}", id),
            KeyPart::Address(a) => write!(f, "addr:{}", a),
            KeyPart::Str(s) => write!(f, "{}", s),
            KeyPart::Int(i) => write!(f, "int:{}", i),
            KeyPart::Decimal(d) => write!(f, "dec:{}", d),
            KeyPart::Flag(b) => write!(f, "flag:{}", b),
        }
    }
}

/// Stable cache identity for one request.
///
/// Invariant: every parameter that affects the response is a part of the key;
/// nothing else is. Key factories take the typed parameter struct, so
/// UI-only flags cannot leak in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<KeyPart>);

impl QueryKey {
    pub fn new(parts: Vec<KeyPart>) -> Self {
        Self(parts)
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            write!(f, "{}", part)?;
        }
        Ok(())
    }
}

/// Derives the cache key for a request parameter struct. Pure, no side
/// effects; equal parameters must produce equal keys.
pub trait QueryParams {
    fn query_key(&self) -> QueryKey;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    struct SwapParams {
        chain_id: ChainId,
        user: String,
        pool_id: String,
        amount: Decimal,
        max_slippage: bool,
    }

    impl QueryParams for SwapParams {
        fn query_key(&self) -> QueryKey {
            QueryKey::new(vec![
                KeyPart::str("swap"),
                KeyPart::Chain(self.chain_id),
                KeyPart::address(&self.user),
                KeyPart::str(&self.pool_id),
                KeyPart::Decimal(self.amount),
                KeyPart::Flag(self.max_slippage),
            ])
        }
    }

    fn params() -> SwapParams {
        SwapParams {
            chain_id: 1,
            user: "0xAbC0000000000000000000000000000000000001".to_string(),
            pool_id: "3pool".to_string(),
            amount: Decimal::from_str("10.5").unwrap(),
            max_slippage: false,
        }
    }

    #[test]
    fn equal_params_produce_identical_keys() {
        assert_eq!(params().query_key(), params().query_key());
    }

    #[test]
    fn address_case_does_not_change_the_key() {
        let mut other = params();
        other.user = other.user.to_ascii_lowercase();
        assert_eq!(params().query_key(), other.query_key());
    }

    #[test]
    fn any_response_affecting_field_changes_the_key() {
        let base = params().query_key();

        let mut p = params();
        p.chain_id = 10;
        assert_ne!(base, p.query_key());

        let mut p = params();
        p.pool_id = "tricrypto".to_string();
        assert_ne!(base, p.query_key());

        let mut p = params();
        p.amount = Decimal::from_str("10.6").unwrap();
        assert_ne!(base, p.query_key());

        let mut p = params();
        p.max_slippage = true;
        assert_ne!(base, p.query_key());
    }

    #[test]
    fn numerically_equal_decimals_produce_equal_keys() {
        let mut a = params();
        let mut b = params();
        a.amount = Decimal::from_str("10.50").unwrap();
        b.amount = Decimal::from_str("10.5").unwrap();
        assert_eq!(a.query_key(), b.query_key());
    }
}
