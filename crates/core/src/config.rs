//! Configuration types

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{CoreError, CoreResult};

/// Complete service configuration.
///
/// Keys are flat so that `POLL_INTERVAL_MS`, `PRICE_CHANGE_THRESHOLD`,
/// `PORT` and friends map straight onto fields. The listen host is
/// `bind_host` rather than `host` since many shells export `HOST`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub poll_interval_ms: u64,
    pub price_change_threshold: f64,
    pub bind_host: String,
    pub port: u16,
    /// Per-request timeout inside an adapter
    pub source_timeout_ms: u64,
    /// Hard bound on one adapter's whole fetch, retries included
    pub fetch_timeout_ms: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub dexscreener_url: String,
    pub dexscreener_query: String,
    pub geckoterminal_url: String,
    pub geckoterminal_network: String,
    pub jupiter_url: String,
    pub event_buffer: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 30_000,
            price_change_threshold: 0.05,
            bind_host: "0.0.0.0".to_string(),
            port: 3000,
            source_timeout_ms: 5_000,
            fetch_timeout_ms: 15_000,
            max_retries: 3,
            retry_base_delay_ms: 500,
            dexscreener_url: "https://api.dexscreener.com".to_string(),
            dexscreener_query: "solana".to_string(),
            geckoterminal_url: "https://api.geckoterminal.com".to_string(),
            geckoterminal_network: "solana".to_string(),
            jupiter_url: "https://api.jup.ag".to_string(),
            event_buffer: 256,
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if self.poll_interval_ms == 0 {
            return Err(CoreError::InvalidConfig("poll_interval_ms must be > 0".into()));
        }
        if !self.price_change_threshold.is_finite() || self.price_change_threshold < 0.0 {
            return Err(CoreError::InvalidConfig(format!(
                "price_change_threshold must be a non-negative fraction, got {}",
                self.price_change_threshold
            )));
        }
        if self.source_timeout_ms == 0 || self.fetch_timeout_ms == 0 {
            return Err(CoreError::InvalidConfig("timeouts must be > 0".into()));
        }
        if self.fetch_timeout_ms <= self.source_timeout_ms {
            return Err(CoreError::InvalidConfig(format!(
                "fetch_timeout_ms ({}) must exceed source_timeout_ms ({}) to leave room for a fallback request",
                self.fetch_timeout_ms, self.source_timeout_ms
            )));
        }
        if self.event_buffer == 0 {
            return Err(CoreError::InvalidConfig("event_buffer must be > 0".into()));
        }
        Ok(())
    }

    pub fn poll(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(self.poll_interval_ms),
            price_change_threshold: self.price_change_threshold,
            fetch_timeout: Duration::from_millis(self.fetch_timeout_ms),
        }
    }

    pub fn source(&self) -> SourceConfig {
        let request_timeout = Duration::from_millis(self.source_timeout_ms);
        SourceConfig {
            request_timeout,
            primary_budget: Duration::from_millis(self.fetch_timeout_ms).saturating_sub(request_timeout),
            max_retries: self.max_retries,
            retry_base_delay: Duration::from_millis(self.retry_base_delay_ms),
            dexscreener_url: self.dexscreener_url.clone(),
            dexscreener_query: self.dexscreener_query.clone(),
            geckoterminal_url: self.geckoterminal_url.clone(),
            geckoterminal_network: self.geckoterminal_network.clone(),
            jupiter_url: self.jupiter_url.clone(),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}

/// Poll scheduler configuration
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub interval: Duration,
    pub price_change_threshold: f64,
    pub fetch_timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        AppConfig::default().poll()
    }
}

/// Source adapter configuration
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub request_timeout: Duration,
    /// Time a primary attempt may take, retries included, before its
    /// fallback runs. One request timeout short of the outer fetch bound.
    pub primary_budget: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub dexscreener_url: String,
    pub dexscreener_query: String,
    pub geckoterminal_url: String,
    pub geckoterminal_network: String,
    pub jupiter_url: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        AppConfig::default().source()
    }
}
