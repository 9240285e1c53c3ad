//! Coordinator Configuration
//!
//! Provides configuration for the sync coordinator and the timer wiring.

use std::time::Duration;
use thiserror::Error;

/// Default period of the background sync loop.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(30);

/// Default cadence of the display tick.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Default broadcast freshness window in milliseconds.
pub const DEFAULT_FRESHNESS_WINDOW_MS: i64 = 2_000;

/// Sync coordinator configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base URL of the sync server, e.g. `https://study.example.com`
    pub server_url: String,
    /// Externally supplied user identity, when the hosting application has one
    pub user_id: Option<String>,
    /// Period of the background sync loop
    pub sync_interval: Duration,
    /// Cadence of the display tick
    pub tick_interval: Duration,
    /// Age in milliseconds past which a broadcast envelope is discarded
    pub freshness_window_ms: i64,
}

impl SyncConfig {
    /// Create a new SyncConfigBuilder
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::default()
    }

    /// Build a full URL for an API path
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.server_url.trim_end_matches('/'), path)
    }
}

/// Builder for SyncConfig
#[derive(Debug, Default)]
pub struct SyncConfigBuilder {
    server_url: Option<String>,
    user_id: Option<String>,
    sync_interval: Option<Duration>,
    tick_interval: Option<Duration>,
    freshness_window_ms: Option<i64>,
}

impl SyncConfigBuilder {
    /// Set the server URL
    pub fn server_url(mut self, url: String) -> Self {
        self.server_url = Some(url);
        self
    }

    /// Set the externally supplied user identity
    pub fn user_id(mut self, user_id: String) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Set the background sync period
    pub fn sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = Some(interval);
        self
    }

    /// Set the display tick cadence
    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = Some(interval);
        self
    }

    /// Set the broadcast freshness window
    pub fn freshness_window_ms(mut self, window: i64) -> Self {
        self.freshness_window_ms = Some(window);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<SyncConfig, ConfigError> {
        let server_url = self
            .server_url
            .ok_or(ConfigError::MissingValue("server_url"))?;
        if !server_url.starts_with("http://") && !server_url.starts_with("https://") {
            return Err(ConfigError::InvalidUrl(server_url));
        }

        Ok(SyncConfig {
            server_url,
            user_id: self.user_id,
            sync_interval: self.sync_interval.unwrap_or(DEFAULT_SYNC_INTERVAL),
            tick_interval: self.tick_interval.unwrap_or(DEFAULT_TICK_INTERVAL),
            freshness_window_ms: self
                .freshness_window_ms
                .unwrap_or(DEFAULT_FRESHNESS_WINDOW_MS),
        })
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("missing value: {0}")]
    MissingValue(&'static str),
}
