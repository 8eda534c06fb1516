//! Connection settings for the hosted backend.

use std::time::Duration;

use crate::error::{BackendError, Result};

pub const URL_VAR: &str = "SHADOW_TAG_SUPABASE_URL";
pub const ANON_KEY_VAR: &str = "SHADOW_TAG_SUPABASE_ANON_KEY";
pub const POLL_INTERVAL_VAR: &str = "SHADOW_TAG_REALTIME_POLL_MS";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Clone, Debug)]
pub struct BackendConfig {
    /// Project base URL, e.g. `https://xyz.supabase.co`.
    pub url: String,
    pub anon_key: String,
    /// How often the players table is polled for realtime changes.
    pub realtime_poll_interval: Duration,
}

impl BackendConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
            realtime_poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let url = lookup(URL_VAR).ok_or_else(|| BackendError::Config(format!("{URL_VAR} is not set")))?;
        let anon_key = lookup(ANON_KEY_VAR)
            .ok_or_else(|| BackendError::Config(format!("{ANON_KEY_VAR} is not set")))?;

        let mut config = Self::new(url, anon_key);
        if let Some(ms) = lookup(POLL_INTERVAL_VAR) {
            let ms: u64 = ms
                .parse()
                .map_err(|_| BackendError::Config(format!("{POLL_INTERVAL_VAR} must be milliseconds")))?;
            config.realtime_poll_interval = Duration::from_millis(ms.max(250));
        }
        Ok(config)
    }
}
