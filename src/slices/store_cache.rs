// src/slices/store_cache.rs

use crate::active_key::ActiveKey;
use crate::prices_api::MarketDataApi;
use crate::query_cache::{QueryCache, QueryCacheConfig, QueryState};
use crate::query_key::{KeyPart, QueryKey, QueryParams};
use crate::settings::Settings;
use crate::store::{ActiveKeyMap, AppStore, SliceState};
use crate::types::{ChainId, MarketSnapshot};
use crate::validation::{Enablement, ValidationSuite};
use log::debug;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Cached market snapshots hydrated from the pricing API.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StoreCacheState {
    /// Keyed `{chain}-{market}-snapshot`.
    pub market_snapshots: ActiveKeyMap<MarketSnapshot>,
}

impl SliceState for StoreCacheState {
    const NAME: &'static str = "store_cache";

    fn entry_count(&self) -> usize {
        self.market_snapshots.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarketSnapshotParams {
    pub chain_id: ChainId,
    pub market_id: String,
}

impl QueryParams for MarketSnapshotParams {
    fn query_key(&self) -> QueryKey {
        QueryKey::new(vec![
            KeyPart::str("market-snapshot"),
            KeyPart::Chain(self.chain_id),
            KeyPart::str(&self.market_id.to_ascii_lowercase()),
        ])
    }
}

/// Fetch actions for the market snapshot cache.
pub struct StoreCacheActions {
    prices: Arc<dyn MarketDataApi>,
    store: Arc<AppStore>,
    recognized_chains: Vec<ChainId>,
    queries: Arc<QueryCache<MarketSnapshot>>,
}

impl StoreCacheActions {
    pub fn new(prices: Arc<dyn MarketDataApi>, store: Arc<AppStore>, settings: &Settings) -> Self {
        Self {
            prices,
            store,
            recognized_chains: settings.chains.recognized_chain_ids.clone(),
            queries: Arc::new(QueryCache::new(
                "market_snapshots",
                QueryCacheConfig::from(&settings.queries),
            )),
        }
    }

    pub fn reset(&self) {
        self.store.store_cache.reset_state();
        self.queries.reset();
    }

    pub async fn fetch_market_snapshot(
        &self,
        params: &MarketSnapshotParams,
    ) -> QueryState<MarketSnapshot> {
        let enablement = ValidationSuite::new()
            .require_recognized_chain(&self.recognized_chains, params.chain_id)
            .require_entity_id(&params.market_id)
            .evaluate();
        if let Enablement::Disabled(failures) = enablement {
            debug!("store_cache: snapshot fetch disabled: {:?}", failures);
            return QueryState::Idle;
        }

        let key = params.query_key();
        let prices = Arc::clone(&self.prices);
        let chain_id = params.chain_id;
        let market_id = params.market_id.clone();
        let state = self
            .queries
            .fetch(&key, move || async move {
                prices.market_snapshot(chain_id, &market_id).await
            })
            .await;

        if let QueryState::Ready(snapshot) = &state {
            let active_key = ActiveKey::new(params.chain_id, &params.market_id, "snapshot");
            self.store.store_cache.set_state_by_active_key(
                |s| &mut s.market_snapshots,
                active_key,
                snapshot.clone(),
            );
        }
        state
    }

    /// Background refresh for one market, driven by the configured
    /// `refetch_interval`. Each round writes the fresh snapshot into the
    /// slice, same as the foreground path, so slice readers never sit on a
    /// snapshot older than the interval. Returns `None` when no interval is
    /// configured.
    pub fn spawn_snapshot_refresher(&self, params: MarketSnapshotParams) -> Option<JoinHandle<()>> {
        let key = params.query_key();
        let prices = Arc::clone(&self.prices);
        let store = Arc::clone(&self.store);
        self.queries.spawn_refetcher(key, move || {
            let prices = Arc::clone(&prices);
            let store = Arc::clone(&store);
            let chain_id = params.chain_id;
            let market_id = params.market_id.clone();
            async move {
                let snapshot = prices.market_snapshot(chain_id, &market_id).await?;
                store.store_cache.set_state_by_active_key(
                    |s| &mut s.market_snapshots,
                    ActiveKey::new(chain_id, &market_id, "snapshot"),
                    snapshot.clone(),
                );
                Ok(snapshot)
            }
        })
    }
}
