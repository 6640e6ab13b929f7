// src/slices/user.rs

use crate::active_key::ActiveKey;
use crate::query_cache::{QueryCache, QueryCacheConfig, QueryState};
use crate::query_key::{KeyPart, QueryKey, QueryParams};
use crate::sdk::{classify_sdk_error, ChainSdk};
use crate::settings::Settings;
use crate::store::{ActiveKeyMap, AppStore, SliceState};
use crate::types::{ChainId, Quote, VoteEscrowInfo};
use crate::validation::{Enablement, ValidationSuite};
use log::debug;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Wallet/session data: who is connected and their vote-escrow positions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserState {
    /// Lowercased address of the connected signer, if any.
    pub signer_address: Option<String>,
    pub gas_price: Quote,
    /// Keyed `{chain}-{address}-vote-escrow`.
    pub vote_escrow: ActiveKeyMap<VoteEscrowInfo>,
}

impl SliceState for UserState {
    const NAME: &'static str = "user";

    fn entry_count(&self) -> usize {
        self.vote_escrow.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoteEscrowParams {
    pub chain_id: ChainId,
    pub user_address: String,
}

impl QueryParams for VoteEscrowParams {
    fn query_key(&self) -> QueryKey {
        QueryKey::new(vec![
            KeyPart::str("vote-escrow"),
            KeyPart::Chain(self.chain_id),
            KeyPart::address(&self.user_address),
        ])
    }
}

fn gas_price_key(chain_id: ChainId) -> QueryKey {
    QueryKey::new(vec![KeyPart::str("gas-price"), KeyPart::Chain(chain_id)])
}

/// Fetch actions for the user slice.
pub struct UserActions {
    sdk: Arc<dyn ChainSdk>,
    store: Arc<AppStore>,
    recognized_chains: Vec<ChainId>,
    vote_escrow_queries: Arc<QueryCache<VoteEscrowInfo>>,
    gas_price_queries: Arc<QueryCache<Decimal>>,
}

impl UserActions {
    pub fn new(sdk: Arc<dyn ChainSdk>, store: Arc<AppStore>, settings: &Settings) -> Self {
        let config = QueryCacheConfig::from(&settings.queries);
        Self {
            sdk,
            store,
            recognized_chains: settings.chains.recognized_chain_ids.clone(),
            vote_escrow_queries: Arc::new(QueryCache::new("user_vote_escrow", config.clone())),
            gas_price_queries: Arc::new(QueryCache::new("user_gas_price", config)),
        }
    }

    pub fn connect_wallet(&self, address: &str) {
        self.store.user.set_state_by_key(
            |s| &mut s.signer_address,
            Some(address.to_ascii_lowercase()),
        );
    }

    /// Clears the slice and opens a new cache scope so in-flight fetches for
    /// the previous wallet cannot write back.
    pub fn disconnect_wallet(&self) {
        self.store.user.reset_state();
        self.vote_escrow_queries.reset();
        self.gas_price_queries.reset();
    }

    pub async fn fetch_vote_escrow(&self, params: &VoteEscrowParams) -> QueryState<VoteEscrowInfo> {
        let enablement = ValidationSuite::new()
            .require_recognized_chain(&self.recognized_chains, params.chain_id)
            .require_address(&params.user_address)
            .evaluate();
        if let Enablement::Disabled(failures) = enablement {
            debug!("user: vote-escrow fetch disabled: {:?}", failures);
            return QueryState::Idle;
        }

        let key = params.query_key();
        let sdk = Arc::clone(&self.sdk);
        let chain_id = params.chain_id;
        let user = params.user_address.clone();
        let state = self
            .vote_escrow_queries
            .fetch(&key, move || async move {
                sdk.vote_escrow(chain_id, &user)
                    .await
                    .map_err(classify_sdk_error)
            })
            .await;

        if let QueryState::Ready(info) = &state {
            let active_key = ActiveKey::new(params.chain_id, &params.user_address, "vote-escrow");
            self.store
                .user
                .set_state_by_active_key(|s| &mut s.vote_escrow, active_key, info.clone());
        }
        state
    }

    pub async fn fetch_gas_price(&self, chain_id: ChainId) -> QueryState<Decimal> {
        let enablement = ValidationSuite::new()
            .require_recognized_chain(&self.recognized_chains, chain_id)
            .evaluate();
        if let Enablement::Disabled(failures) = enablement {
            debug!("user: gas-price fetch disabled: {:?}", failures);
            return QueryState::Idle;
        }

        let key = gas_price_key(chain_id);
        let sdk = Arc::clone(&self.sdk);
        let state = self
            .gas_price_queries
            .fetch(&key, move || async move {
                sdk.gas_price(chain_id).await.map_err(classify_sdk_error)
            })
            .await;

        if let QueryState::Ready(price) = &state {
            self.store
                .user
                .set_state_by_key(|s| &mut s.gas_price, Quote::Available(*price));
        }
        state
    }
}
