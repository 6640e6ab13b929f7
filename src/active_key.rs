// src/active_key.rs

use crate::types::ChainId;
use std::fmt;
use std::str::FromStr;

/// Composite key identifying one cached request/result within a slice:
/// chain id + address + entity id, rendered as `"{chain}-{address}-{entity}"`.
///
/// Addresses are lowercased on construction so two spellings of the same
/// account always land on the same entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActiveKey {
    chain_id: ChainId,
    address: String,
    entity_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActiveKeyError {
    #[error("malformed active key: {0}")]
    Malformed(String),
}

impl ActiveKey {
    pub fn new(chain_id: ChainId, address: &str, entity_id: &str) -> Self {
        Self {
            chain_id,
            address: address.to_ascii_lowercase(),
            entity_id: entity_id.to_string(),
        }
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }
}

impl fmt::Display for ActiveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.chain_id, self.address, self.entity_id)
    }
}

impl FromStr for ActiveKey {
    type Err = ActiveKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, '-');
        let (chain, address, entity) = match (parts.next(), parts.next(), parts.next()) {
            (Some(c), Some(a), Some(e)) if !a.is_empty() && !e.is_empty() => (c, a, e),
            _ => return Err(ActiveKeyError::Malformed(s.to_string())),
        };
        let chain_id = chain
            .parse::<ChainId>()
            .map_err(|_| ActiveKeyError::Malformed(s.to_string()))?;
        Ok(ActiveKey::new(chain_id, address, entity))
    }
}
