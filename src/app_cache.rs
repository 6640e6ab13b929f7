// src/app_cache.rs
// Persisted user preferences, the browser localStorage analog: a small JSON
// key-value file with no schema versioning.

use anyhow::Result;
use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Chad,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AppCache {
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub theme: Option<Theme>,
    #[serde(default)]
    pub last_saved: Option<DateTime<Utc>>,
}

impl AppCache {
    /// Best-effort load: a missing or corrupt file yields the defaults.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(cache) => cache,
                Err(error) => {
                    warn!("app cache at {} is corrupt, using defaults: {}", path.display(), error);
                    Self::default()
                }
            },
            Err(error) if error.kind() == ErrorKind::NotFound => Self::default(),
            Err(error) => {
                warn!("failed to read app cache at {}: {}", path.display(), error);
                Self::default()
            }
        }
    }

    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.last_saved = Some(Utc::now());
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
