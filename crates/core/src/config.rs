//! Client-side thresholds.
//!
//! Everything here is a tuning knob of the client only; the backend applies
//! its own limits regardless of what the client is configured with.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::location::LocationOptions;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Codenames sign in as `<codename>@<email_domain>`.
    pub email_domain: String,
    pub nearby_radius_m: f64,
    pub min_distance_change_m: f64,
    pub min_update_interval_ms: u64,
    /// Fixes less accurate than this are rejected.
    pub max_accuracy_m: f64,
    /// How many tags and dodges a refresh loads.
    pub recent_activity_limit: usize,
    pub high_accuracy: bool,
    pub location_timeout_ms: u64,
    pub location_maximum_age_ms: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            email_domain: "shadowtag.game".into(),
            nearby_radius_m: 500.0,
            min_distance_change_m: 5.0,
            min_update_interval_ms: 3000,
            max_accuracy_m: 100.0,
            recent_activity_limit: 50,
            high_accuracy: true,
            location_timeout_ms: 60_000,
            location_maximum_age_ms: 60_000,
        }
    }
}

impl GameConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn min_update_interval(&self) -> Duration {
        Duration::from_millis(self.min_update_interval_ms)
    }

    pub fn location_options(&self) -> LocationOptions {
        LocationOptions {
            enable_high_accuracy: self.high_accuracy,
            timeout: Duration::from_millis(self.location_timeout_ms),
            maximum_age: Duration::from_millis(self.location_maximum_age_ms),
        }
    }

    pub fn email_for(&self, codename: &str) -> String {
        format!("{}@{}", codename.to_lowercase(), self.email_domain)
    }
}
