use crate::types::ChainId;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct ChainSettings {
    #[serde(default = "default_recognized_chain_ids")]
    pub recognized_chain_ids: Vec<ChainId>,
}

fn default_recognized_chain_ids() -> Vec<ChainId> {
    // Mainnet, Optimism, Gnosis, Polygon, Fantom, Base, Arbitrum One, Avalanche
    vec![1, 10, 100, 137, 250, 8453, 42161, 43114]
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            recognized_chain_ids: default_recognized_chain_ids(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct QuerySettings {
    #[serde(default = "default_stale_time_ms")]
    pub stale_time_ms: u64,
    /// Background refresh period; absent means no background refresh.
    #[serde(default)]
    pub refetch_interval_ms: Option<u64>,
    #[serde(default = "default_query_max_entries")]
    pub max_entries: usize,
    #[serde(default = "default_active_key_max_entries")]
    pub active_key_max_entries: usize,
}

fn default_stale_time_ms() -> u64 {
    20_000
}
fn default_query_max_entries() -> usize {
    256
}
fn default_active_key_max_entries() -> usize {
    512
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            stale_time_ms: default_stale_time_ms(),
            refetch_interval_ms: None,
            max_entries: default_query_max_entries(),
            active_key_max_entries: default_active_key_max_entries(),
        }
    }
}

impl QuerySettings {
    pub fn stale_time(&self) -> Duration {
        Duration::from_millis(self.stale_time_ms)
    }

    pub fn refetch_interval(&self) -> Option<Duration> {
        self.refetch_interval_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PricesApiSettings {
    #[serde(default = "default_prices_base_url")]
    pub base_url: String,
    #[serde(default = "default_prices_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_prices_base_url() -> String {
    "https://prices.curve.fi".to_string()
}
fn default_prices_timeout_seconds() -> u64 {
    10
}

impl Default for PricesApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_prices_base_url(),
            timeout_seconds: default_prices_timeout_seconds(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppCacheSettings {
    #[serde(default = "default_app_cache_path")]
    pub path: String,
}

fn default_app_cache_path() -> String {
    ".app-cache.json".to_string()
}

impl Default for AppCacheSettings {
    fn default() -> Self {
        Self {
            path: default_app_cache_path(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub chains: ChainSettings,
    #[serde(default)]
    pub queries: QuerySettings,
    #[serde(default)]
    pub prices_api: PricesApiSettings,
    #[serde(default)]
    pub app_cache: AppCacheSettings,
}

impl Settings {
    /// Layered load: optional `config/default.toml`, then `DEX_STATE__`
    /// environment overrides (e.g. `DEX_STATE__QUERIES__STALE_TIME_MS=5000`).
    pub fn new() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(Environment::with_prefix("DEX_STATE").separator("__"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let settings = Settings::default();
        assert!(settings.chains.recognized_chain_ids.contains(&1));
        assert_eq!(settings.queries.stale_time(), Duration::from_secs(20));
        assert_eq!(settings.queries.refetch_interval(), None);
        assert_eq!(settings.prices_api.base_url, "https://prices.curve.fi");
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let settings: Settings = Config::builder()
            .add_source(config::File::from_str(
                "[queries]\nstale_time_ms = 5000\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(settings.queries.stale_time_ms, 5000);
        assert_eq!(settings.queries.max_entries, 256);
        assert!(settings.chains.recognized_chain_ids.contains(&42161));
    }
}
