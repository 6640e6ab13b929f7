// src/client.rs

use crate::prices_api::{MarketDataApi, PricesApi};
use crate::sdk::ChainSdk;
use crate::settings::Settings;
use crate::slices::{StoreCacheActions, UserActions, UserBalancesActions};
use crate::store::AppStore;
use anyhow::Result;
use std::sync::Arc;

/// Top-level handle wiring the store, the external boundaries and each
/// slice's actions together. Hosts hold one of these per page session.
pub struct AppClient {
    pub store: Arc<AppStore>,
    pub user: UserActions,
    pub balances: UserBalancesActions,
    pub markets: StoreCacheActions,
}

impl AppClient {
    pub fn new(sdk: Arc<dyn ChainSdk>, settings: &Settings) -> Result<Self> {
        let store = AppStore::with_settings(&settings.queries);
        let prices: Arc<dyn MarketDataApi> = Arc::new(PricesApi::new(&settings.prices_api)?);
        Ok(Self {
            user: UserActions::new(Arc::clone(&sdk), Arc::clone(&store), settings),
            balances: UserBalancesActions::new(Arc::clone(&sdk), Arc::clone(&store), settings),
            markets: StoreCacheActions::new(prices, Arc::clone(&store), settings),
            store,
        })
    }

    /// Wallet disconnect: drop everything derived from the signer.
    pub fn on_wallet_disconnect(&self) {
        self.user.disconnect_wallet();
        self.balances.reset();
    }

    /// Network switch: every cached read belongs to the old chain.
    pub fn on_network_switch(&self) {
        self.user.disconnect_wallet();
        self.balances.reset();
        self.markets.reset();
    }
}
