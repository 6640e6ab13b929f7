// src/types.rs
// Shared value types crossing the SDK / API / store boundaries.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

/// Chain identifier (EVM-style numeric chain id).
pub type ChainId = u64;

/// A numeric value that the upstream APIs may report as unavailable.
///
/// The pricing/analytics endpoints encode "rate unavailable" as the literal
/// string `"NaN"` instead of a number. That sentinel is parsed exactly once,
/// here, so the rest of the crate works with a typed value and never
/// string-compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Quote {
    Available(Decimal),
    #[default]
    Unavailable,
}

impl Quote {
    pub fn available(self) -> Option<Decimal> {
        match self {
            Quote::Available(value) => Some(value),
            Quote::Unavailable => None,
        }
    }

    pub fn is_unavailable(self) -> bool {
        matches!(self, Quote::Unavailable)
    }
}

impl From<Decimal> for Quote {
    fn from(value: Decimal) -> Self {
        Quote::Available(value)
    }
}

impl Serialize for Quote {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            // Trait-qualified: Decimal has an inherent `serialize(&self)`
            // returning its raw bytes that would shadow the serde method.
            Quote::Available(value) => Serialize::serialize(value, serializer),
            Quote::Unavailable => serializer.serialize_str("NaN"),
        }
    }
}

impl<'de> Deserialize<'de> for Quote {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            serde_json::Value::Null => Ok(Quote::Unavailable),
            serde_json::Value::String(s) if s == "NaN" => Ok(Quote::Unavailable),
            serde_json::Value::String(s) => Decimal::from_str(&s)
                .map(Quote::Available)
                .map_err(|e| D::Error::custom(format!("invalid quote string {:?}: {}", s, e))),
            serde_json::Value::Number(n) => Decimal::from_str(&n.to_string())
                .map(Quote::Available)
                .map_err(|e| D::Error::custom(format!("invalid quote number {}: {}", n, e))),
            other => Err(D::Error::custom(format!(
                "unsupported quote value: {}",
                other
            ))),
        }
    }
}

/// Vote-escrow position for one user on one chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteEscrowInfo {
    pub locked_amount: Decimal,
    pub unlock_time: Option<DateTime<Utc>>,
    pub vecrv_balance: Quote,
}

/// Aggregated market figures served by the pricing API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub tvl_usd: Quote,
    pub volume_24h_usd: Quote,
    pub base_apy: Quote,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_parses_nan_sentinel_and_null_as_unavailable() {
        assert_eq!(
            serde_json::from_str::<Quote>("\"NaN\"").unwrap(),
            Quote::Unavailable
        );
        assert_eq!(
            serde_json::from_str::<Quote>("null").unwrap(),
            Quote::Unavailable
        );
    }

    #[test]
    fn quote_parses_numbers_and_numeric_strings() {
        assert_eq!(
            serde_json::from_str::<Quote>("\"100.5\"").unwrap(),
            Quote::Available(Decimal::from_str("100.5").unwrap())
        );
        assert_eq!(
            serde_json::from_str::<Quote>("0").unwrap(),
            Quote::Available(Decimal::ZERO)
        );
    }

    #[test]
    fn quote_zero_is_distinct_from_unavailable() {
        let zero: Quote = serde_json::from_str("0").unwrap();
        assert_ne!(zero, Quote::Unavailable);
        assert_eq!(zero.available(), Some(Decimal::ZERO));
    }

    #[test]
    fn quote_serializes_available_as_numeric_string() {
        let quote = Quote::Available(Decimal::from_str("100.5").unwrap());
        assert_eq!(serde_json::to_string(&quote).unwrap(), "\"100.5\"");
    }

    #[test]
    fn quote_serializes_unavailable_as_wire_sentinel() {
        assert_eq!(
            serde_json::to_string(&Quote::Unavailable).unwrap(),
            "\"NaN\""
        );
    }
}
