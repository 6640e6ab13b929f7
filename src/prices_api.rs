// src/prices_api.rs

use crate::errors::FetchError;
use crate::settings::PricesApiSettings;
use crate::types::{ChainId, MarketSnapshot, Quote};
use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use std::time::Duration;

/// Market-data read surface the slices consume. `PricesApi` is the HTTP
/// implementation; tests substitute their own.
#[async_trait]
pub trait MarketDataApi: Send + Sync {
    async fn market_snapshot(
        &self,
        chain_id: ChainId,
        market_id: &str,
    ) -> Result<MarketSnapshot, FetchError>;
}

/// Response envelope used by the pricing/analytics endpoints:
/// a `detail` field present signals an API-level error, otherwise `data`
/// carries the rows.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<Vec<T>>,
    detail: Option<String>,
}

fn unwrap_envelope<T>(envelope: Envelope<T>) -> Result<Vec<T>, FetchError> {
    if let Some(detail) = envelope.detail {
        return Err(FetchError::Api { detail });
    }
    envelope.data.ok_or_else(|| FetchError::Api {
        detail: "response carried neither data nor detail".to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct MarketSnapshotRow {
    market_id: String,
    tvl_usd: Quote,
    volume_24h_usd: Quote,
    base_apy: Quote,
}

impl From<MarketSnapshotRow> for MarketSnapshot {
    fn from(row: MarketSnapshotRow) -> Self {
        MarketSnapshot {
            tvl_usd: row.tvl_usd,
            volume_24h_usd: row.volume_24h_usd,
            base_apy: row.base_apy,
        }
    }
}

fn to_fetch_error(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(error.to_string())
    }
}

/// Client for the pricing/analytics REST API.
pub struct PricesApi {
    client: reqwest::Client,
    base_url: String,
}

impl PricesApi {
    pub fn new(settings: &PricesApiSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetches the aggregated snapshot for one market. An empty `data` array
    /// is an API error: the endpoint always returns the requested market or
    /// a `detail` message.
    pub async fn market_snapshot(
        &self,
        chain_id: ChainId,
        market_id: &str,
    ) -> Result<MarketSnapshot, FetchError> {
        let url = format!(
            "{}/v1/markets/{}/{}/snapshot",
            self.base_url, chain_id, market_id
        );
        debug!("prices api: GET {}", url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(to_fetch_error)?;
        let envelope: Envelope<MarketSnapshotRow> =
            response.json().await.map_err(to_fetch_error)?;
        let rows = unwrap_envelope(envelope)?;
        rows.into_iter()
            .find(|row| row.market_id.eq_ignore_ascii_case(market_id))
            .map(MarketSnapshot::from)
            .ok_or_else(|| FetchError::Api {
                detail: format!("market {} missing from response", market_id),
            })
    }
}

#[async_trait]
impl MarketDataApi for PricesApi {
    async fn market_snapshot(
        &self,
        chain_id: ChainId,
        market_id: &str,
    ) -> Result<MarketSnapshot, FetchError> {
        PricesApi::market_snapshot(self, chain_id, market_id).await
    }
}
