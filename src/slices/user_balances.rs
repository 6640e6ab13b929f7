// src/slices/user_balances.rs

use crate::query_cache::{QueryCache, QueryCacheConfig, QueryState};
use crate::query_key::{KeyPart, QueryKey, QueryParams};
use crate::sdk::ChainSdk;
use crate::settings::Settings;
use crate::store::{AppStore, SliceState};
use crate::types::ChainId;
use crate::validation::{Enablement, ValidationSuite};
use log::{debug, warn};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

/// Wallet token balances, merged by lowercased token address.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserBalancesState {
    pub balances: HashMap<String, Decimal>,
}

impl SliceState for UserBalancesState {
    const NAME: &'static str = "user_balances";

    fn entry_count(&self) -> usize {
        self.balances.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserBalancesParams {
    pub chain_id: ChainId,
    pub user_address: String,
    tokens: Vec<String>,
}

impl UserBalancesParams {
    /// Tokens are lowercased, deduplicated and sorted so logically-equal
    /// requests share one query key.
    pub fn new(chain_id: ChainId, user_address: &str, tokens: &[&str]) -> Self {
        let mut tokens: Vec<String> = tokens.iter().map(|t| t.to_ascii_lowercase()).collect();
        tokens.sort();
        tokens.dedup();
        Self {
            chain_id,
            user_address: user_address.to_string(),
            tokens,
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

impl QueryParams for UserBalancesParams {
    fn query_key(&self) -> QueryKey {
        let mut parts = vec![
            KeyPart::str("user-balances"),
            KeyPart::Chain(self.chain_id),
            KeyPart::address(&self.user_address),
        ];
        parts.extend(self.tokens.iter().map(|t| KeyPart::address(t)));
        QueryKey::new(parts)
    }
}

/// Fetch actions for the balances slice.
pub struct UserBalancesActions {
    sdk: Arc<dyn ChainSdk>,
    store: Arc<AppStore>,
    recognized_chains: Vec<ChainId>,
    queries: Arc<QueryCache<HashMap<String, Decimal>>>,
}

impl UserBalancesActions {
    pub fn new(sdk: Arc<dyn ChainSdk>, store: Arc<AppStore>, settings: &Settings) -> Self {
        Self {
            sdk,
            store,
            recognized_chains: settings.chains.recognized_chain_ids.clone(),
            queries: Arc::new(QueryCache::new(
                "user_balances",
                QueryCacheConfig::from(&settings.queries),
            )),
        }
    }

    pub fn reset(&self) {
        self.store.user_balances.reset_state();
        self.queries.reset();
    }

    /// Batched balance fetch with settled semantics: per-token failures are
    /// logged and excluded, fulfilled entries are merged by token address.
    /// Partial failure never propagates an error to the caller.
    pub async fn fetch_user_balances(
        &self,
        params: &UserBalancesParams,
    ) -> QueryState<HashMap<String, Decimal>> {
        let enablement = ValidationSuite::new()
            .require_recognized_chain(&self.recognized_chains, params.chain_id)
            .require_address(&params.user_address)
            .require_tokens(&params.tokens)
            .evaluate();
        if let Enablement::Disabled(failures) = enablement {
            debug!("user_balances: fetch disabled: {:?}", failures);
            return QueryState::Idle;
        }

        let key = params.query_key();
        let sdk = Arc::clone(&self.sdk);
        let chain_id = params.chain_id;
        let user = params.user_address.clone();
        let tokens = params.tokens.clone();

        let state = self
            .queries
            .fetch(&key, move || async move {
                let settled = sdk.token_balances(chain_id, &user, &tokens).await;

                let mut merged = HashMap::new();
                for (token, result) in settled {
                    match result {
                        Ok(balance) => {
                            merged.insert(token, balance);
                        }
                        Err(error) => {
                            warn!("user_balances: balance fetch failed for {}: {}", token, error);
                        }
                    }
                }
                Ok(merged)
            })
            .await;

        if let QueryState::Ready(balances) = &state {
            let balances = balances.clone();
            self.store
                .user_balances
                .set_state_by_keys(|s| s.balances.extend(balances));
        }
        state
    }
}
