// src/sdk.rs
// Boundary trait over the external chain SDK that performs the actual
// blockchain reads. The fetch actions consume this trait; the AMM/lending
// math behind it lives outside this crate.

use crate::errors::FetchError;
use crate::types::{ChainId, VoteEscrowInfo};
use async_trait::async_trait;
use futures::future::join_all;
use rust_decimal::Decimal;

/// Error message fragment the wallet ecosystem emits when the user declines
/// a prompt. Matched in exactly one place (`classify_sdk_error`).
pub const USER_REJECTED_FRAGMENT: &str = "user rejected action";

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct SdkError {
    pub message: String,
}

impl SdkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Read surface of the external SDK.
#[async_trait]
pub trait ChainSdk: Send + Sync {
    async fn gas_price(&self, chain_id: ChainId) -> Result<Decimal, SdkError>;

    async fn token_balance(
        &self,
        chain_id: ChainId,
        user: &str,
        token: &str,
    ) -> Result<Decimal, SdkError>;

    /// Batched balance read: one settled result per requested token, in
    /// request order. The default issues the per-token reads concurrently;
    /// implementations with a multicall-style primitive should override it.
    async fn token_balances(
        &self,
        chain_id: ChainId,
        user: &str,
        tokens: &[String],
    ) -> Vec<(String, Result<Decimal, SdkError>)> {
        join_all(tokens.iter().map(|token| async move {
            (
                token.clone(),
                self.token_balance(chain_id, user, token).await,
            )
        }))
        .await
    }

    async fn vote_escrow(&self, chain_id: ChainId, user: &str) -> Result<VoteEscrowInfo, SdkError>;
}

/// Maps an SDK error onto the crate's fetch-error taxonomy.
pub fn classify_sdk_error(error: SdkError) -> FetchError {
    if error
        .message
        .to_ascii_lowercase()
        .contains(USER_REJECTED_FRAGMENT)
    {
        FetchError::UserRejected
    } else {
        FetchError::Sdk(error.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::FromPrimitive;

    struct LengthSdk;

    #[async_trait]
    impl ChainSdk for LengthSdk {
        async fn gas_price(&self, _chain_id: ChainId) -> Result<Decimal, SdkError> {
            Err(SdkError::new("unsupported"))
        }

        async fn token_balance(
            &self,
            _chain_id: ChainId,
            _user: &str,
            token: &str,
        ) -> Result<Decimal, SdkError> {
            if token.starts_with("0x") {
                Decimal::from_usize(token.len()).ok_or_else(|| SdkError::new("overflow"))
            } else {
                Err(SdkError::new(format!("bad token {}", token)))
            }
        }

        async fn vote_escrow(
            &self,
            _chain_id: ChainId,
            _user: &str,
        ) -> Result<VoteEscrowInfo, SdkError> {
            Err(SdkError::new("unsupported"))
        }
    }

    #[tokio::test]
    async fn batched_balances_settle_per_token_in_request_order() {
        let tokens = vec![
            "0xaaaa".to_string(),
            "broken".to_string(),
            "0xbb".to_string(),
        ];
        let settled = LengthSdk.token_balances(1, "0xuser", &tokens).await;
        assert_eq!(settled.len(), 3);
        assert_eq!(settled[0].0, "0xaaaa");
        assert_eq!(settled[0].1.as_ref().ok(), Some(&Decimal::from(6)));
        assert!(settled[1].1.is_err());
        assert_eq!(settled[2].0, "0xbb");
        assert_eq!(settled[2].1.as_ref().ok(), Some(&Decimal::from(4)));
    }

    #[test]
    fn user_rejection_is_classified_regardless_of_case() {
        let err = SdkError::new("Error: User rejected action (code 4001)");
        assert_eq!(classify_sdk_error(err), FetchError::UserRejected);
    }

    #[test]
    fn other_errors_stay_sdk_errors() {
        let err = SdkError::new("execution reverted");
        assert_eq!(
            classify_sdk_error(err),
            FetchError::Sdk("execution reverted".to_string())
        );
    }
}
