//! Core type definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Market-data providers a record can originate from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceId {
    #[serde(rename = "dexscreener")]
    DexScreener,
    #[serde(rename = "geckoterminal")]
    GeckoTerminal,
    #[serde(rename = "jupiter-fallback")]
    JupiterFallback,
}

impl SourceId {
    pub fn name(&self) -> &'static str {
        match self {
            SourceId::DexScreener => "dexscreener",
            SourceId::GeckoTerminal => "geckoterminal",
            SourceId::JupiterFallback => "jupiter-fallback",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One observation of a token from one source at one instant.
///
/// Field names match the JSON shape served to subscribers and the query
/// endpoint. A record that reaches the merge engine always carries a
/// non-empty address and a finite, non-negative price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    #[serde(rename = "token_address")]
    pub address: String,
    #[serde(rename = "token_name")]
    pub name: Option<String>,
    #[serde(rename = "token_ticker")]
    pub ticker: Option<String>,
    pub price_usd: f64,
    pub volume_usd: Option<f64>,
    pub liquidity_usd: Option<f64>,
    pub price_change_24h: Option<f64>,
    pub protocol: Option<String>,
    pub source: SourceId,
    /// Fetch time, unix milliseconds
    pub last_updated: i64,
}

impl TokenRecord {
    pub fn new(address: impl Into<String>, price_usd: f64, source: SourceId) -> Self {
        Self {
            address: address.into(),
            name: None,
            ticker: None,
            price_usd,
            volume_usd: None,
            liquidity_usd: None,
            price_change_24h: None,
            protocol: None,
            source,
            last_updated: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_ticker(mut self, ticker: impl Into<String>) -> Self {
        self.ticker = Some(ticker.into());
        self
    }

    pub fn with_volume(mut self, volume_usd: f64) -> Self {
        self.volume_usd = Some(volume_usd);
        self
    }

    /// Case-insensitive identity used for grouping and diffing
    pub fn identity(&self) -> String {
        identity_key(&self.address)
    }

    /// Volume used for conflict resolution, absent counts as zero
    pub fn volume_or_zero(&self) -> f64 {
        self.volume_usd.unwrap_or(0.0)
    }

    pub fn has_valid_price(&self) -> bool {
        self.price_usd.is_finite() && self.price_usd >= 0.0
    }
}

/// Normalize an address into its identity key
pub fn identity_key(address: &str) -> String {
    address.trim().to_lowercase()
}

/// A merged record whose price moved past the configured threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceChange {
    #[serde(flatten)]
    pub token: TokenRecord,
    /// `|new - old| / old`, not multiplied by 100
    pub price_change_pct: f64,
}

/// Per-cycle classification produced by the diff engine
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    NewToken(TokenRecord),
    PriceChange(PriceChange),
}

/// Named events pushed to real-time subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum FeedEvent {
    InitialData(Vec<TokenRecord>),
    NewTokens(Vec<TokenRecord>),
    PriceChanges(Vec<PriceChange>),
}

impl FeedEvent {
    pub fn name(&self) -> &'static str {
        match self {
            FeedEvent::InitialData(_) => "initial_data",
            FeedEvent::NewTokens(_) => "new_tokens",
            FeedEvent::PriceChanges(_) => "price_changes",
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FeedEvent::InitialData(v) | FeedEvent::NewTokens(v) => v.len(),
            FeedEvent::PriceChanges(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
