//! Realtime core configuration
//!
//! A single base URL is the only required setting; everything else has
//! per-feed defaults matching the production backend. The config is a
//! plain value passed into constructors, loadable from a TOML file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::errors::RealtimeError;
use crate::logger::{self, LogTag};

// ============================================================================
// FEED SETTINGS
// ============================================================================

/// Reconnect tuning for one feed
///
/// When a feed section appears in the config file all four knobs must be
/// given; omitting the section entirely keeps the feed's own defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedSettings {
    /// Reconnect attempts before the policy's exhaustion behavior kicks in
    pub max_attempts: u32,

    /// First backoff delay in milliseconds
    pub base_delay_ms: u64,

    /// Backoff growth factor per attempt
    pub growth: f64,

    /// Upper bound on a single backoff delay in milliseconds
    pub max_delay_ms: u64,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self::order_defaults()
    }
}

impl FeedSettings {
    /// Defaults for the order feeds (give up after max attempts)
    pub fn order_defaults() -> Self {
        Self {
            max_attempts: 10,
            base_delay_ms: 1_000,
            growth: 1.5,
            max_delay_ms: 10_000,
        }
    }

    /// Defaults for the table feed (longer cap, fewer attempts per round)
    pub fn table_defaults() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 1_000,
            growth: 2.0,
            max_delay_ms: 30_000,
        }
    }

    fn validate(&self, name: &str) -> Result<(), RealtimeError> {
        if self.max_attempts == 0 {
            return Err(RealtimeError::Config(format!(
                "{name}: max_attempts must be at least 1"
            )));
        }
        if self.base_delay_ms == 0 {
            return Err(RealtimeError::Config(format!(
                "{name}: base_delay_ms must be positive"
            )));
        }
        if self.growth < 1.0 {
            return Err(RealtimeError::Config(format!(
                "{name}: growth must be at least 1.0, got {}",
                self.growth
            )));
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(RealtimeError::Config(format!(
                "{name}: max_delay_ms must not be below base_delay_ms"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// REALTIME CONFIG
// ============================================================================

/// Top-level configuration for the realtime core
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    /// HTTP(S) base URL of the backend; upgraded to ws(s) for the feeds
    pub api_url: String,

    /// Heartbeat interval in seconds for feeds that ping (table updates)
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,

    /// Order-updates feed reconnect tuning
    #[serde(default = "FeedSettings::order_defaults")]
    pub order_updates: FeedSettings,

    /// Customer order-status feed reconnect tuning
    #[serde(default = "FeedSettings::order_defaults")]
    pub order_status: FeedSettings,

    /// Table-updates feed reconnect tuning
    #[serde(default = "FeedSettings::table_defaults")]
    pub table_updates: FeedSettings,
}

fn default_heartbeat_secs() -> u64 {
    30
}

impl RealtimeConfig {
    /// Config pointing at the given backend base URL, all defaults
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            heartbeat_secs: default_heartbeat_secs(),
            order_updates: FeedSettings::order_defaults(),
            order_status: FeedSettings::order_defaults(),
            table_updates: FeedSettings::table_defaults(),
        }
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;

        logger::info(
            LogTag::Config,
            &format!("Loaded realtime config from {}", path.display()),
        );
        Ok(config)
    }

    /// Check the config is usable before opening channels
    pub fn validate(&self) -> Result<(), RealtimeError> {
        if self.api_url.is_empty() {
            return Err(RealtimeError::Config("api_url must not be empty".into()));
        }
        if !self.api_url.starts_with("http") && !self.api_url.starts_with("ws") {
            return Err(RealtimeError::Config(format!(
                "api_url must be an http(s) or ws(s) URL, got '{}'",
                self.api_url
            )));
        }
        for (name, feed) in [
            ("order_updates", &self.order_updates),
            ("order_status", &self.order_status),
            ("table_updates", &self.table_updates),
        ] {
            feed.validate(name)?;
        }
        Ok(())
    }

    /// Base URL with the scheme upgraded to the message transport
    /// (http -> ws, https -> wss). Already-ws URLs pass through.
    pub fn ws_base(&self) -> String {
        if let Some(rest) = self.api_url.strip_prefix("https") {
            format!("wss{}", rest)
        } else if let Some(rest) = self.api_url.strip_prefix("http") {
            format!("ws{}", rest)
        } else {
            self.api_url.clone()
        }
    }

    /// Full WebSocket URL for a feed path
    pub fn ws_url(&self, path: &str) -> String {
        format!("{}{}", self.ws_base().trim_end_matches('/'), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_upgrade() {
        let config = RealtimeConfig::new("http://localhost:8000");
        assert_eq!(config.ws_base(), "ws://localhost:8000");

        let config = RealtimeConfig::new("https://pos.example.com/");
        assert_eq!(
            config.ws_url("/ws/orders/updates/"),
            "wss://pos.example.com/ws/orders/updates/"
        );
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        assert!(RealtimeConfig::new("").validate().is_err());
        assert!(RealtimeConfig::new("ftp://x").validate().is_err());
        assert!(RealtimeConfig::new("http://x").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_feed_tuning() {
        let mut config = RealtimeConfig::new("http://x");
        config.order_status.growth = 0.5;
        assert!(config.validate().is_err());

        let mut config = RealtimeConfig::new("http://x");
        config.table_updates.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_roundtrip_with_defaults() {
        let raw = r#"
            api_url = "http://localhost:8000"

            [table_updates]
            max_attempts = 3
            base_delay_ms = 500
            growth = 2.0
            max_delay_ms = 15000
        "#;
        let config: RealtimeConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.heartbeat_secs, 30);
        assert_eq!(config.order_updates.max_attempts, 10);
        assert_eq!(config.order_updates.growth, 1.5);
        assert_eq!(config.table_updates.max_attempts, 3);
        assert_eq!(config.table_updates.base_delay_ms, 500);
    }
}
