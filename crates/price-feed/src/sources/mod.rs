//! Source adapters
//!
//! Each adapter turns one provider's HTTP API into canonical token
//! records. An adapter is an ordered chain of attempts; the first attempt
//! that succeeds wins and a fully failed chain yields an empty list.

pub mod dexscreener;
pub mod geckoterminal;
pub mod http;
pub mod jupiter;

use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use meme_core::{SourceConfig, SourceError, SourceId, SourceResult, TokenRecord, WRAPPED_SOL_MINT};

use self::http::{HttpFetcher, RetryPolicy};

/// A provider of canonical token records.
///
/// `fetch` never fails: adapter errors are logged and become an empty list.
#[async_trait::async_trait]
pub trait TokenSource: Send + Sync {
    fn name(&self) -> &str;
    async fn fetch(&self) -> Vec<TokenRecord>;
}

/// One way of obtaining records from a provider
#[derive(Debug, Clone, PartialEq)]
pub enum Attempt {
    DexScreenerSearch { base_url: String, query: String },
    GeckoTerminalTrending { base_url: String, network: String },
    JupiterPrice { base_url: String, mint: String },
}

impl Attempt {
    pub fn label(&self) -> &'static str {
        match self {
            Attempt::DexScreenerSearch { .. } => "dexscreener-search",
            Attempt::GeckoTerminalTrending { .. } => "geckoterminal-trending",
            Attempt::JupiterPrice { .. } => "jupiter-price",
        }
    }

    pub fn source(&self) -> SourceId {
        match self {
            Attempt::DexScreenerSearch { .. } => SourceId::DexScreener,
            Attempt::GeckoTerminalTrending { .. } => SourceId::GeckoTerminal,
            Attempt::JupiterPrice { .. } => SourceId::JupiterFallback,
        }
    }

    pub async fn run(&self, http: &HttpFetcher) -> SourceResult<Vec<TokenRecord>> {
        let observed_at = chrono::Utc::now().timestamp_millis();

        match self {
            Attempt::DexScreenerSearch { base_url, query } => {
                dexscreener::fetch_search(http, base_url, query, observed_at).await
            }
            Attempt::GeckoTerminalTrending { base_url, network } => {
                geckoterminal::fetch_trending(http, base_url, network, observed_at).await
            }
            Attempt::JupiterPrice { base_url, mint } => {
                jupiter::fetch_sol_price(http, base_url, mint, observed_at).await
            }
        }
    }
}

struct Step {
    attempt: Attempt,
    http: HttpFetcher,
    /// Cut-off for the whole attempt, retries included
    budget: Option<Duration>,
}

/// HTTP-backed adapter built from an attempt chain
pub struct SourceAdapter {
    name: String,
    steps: Vec<Step>,
}

impl SourceAdapter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Append an attempt to the chain
    pub fn then(mut self, attempt: Attempt, http: HttpFetcher) -> Self {
        self.steps.push(Step {
            attempt,
            http,
            budget: None,
        });
        self
    }

    /// Append an attempt that is abandoned once `budget` has elapsed
    pub fn then_within(mut self, attempt: Attempt, http: HttpFetcher, budget: Duration) -> Self {
        self.steps.push(Step {
            attempt,
            http,
            budget: Some(budget),
        });
        self
    }

    pub fn attempts(&self) -> impl Iterator<Item = &Attempt> {
        self.steps.iter().map(|step| &step.attempt)
    }

    /// DexScreener search, no fallback
    pub fn dexscreener(config: &SourceConfig) -> SourceResult<Self> {
        let http = HttpFetcher::from_config(config, config.max_retries)?;

        Ok(Self::new(SourceId::DexScreener.name()).then(
            Attempt::DexScreenerSearch {
                base_url: config.dexscreener_url.clone(),
                query: config.dexscreener_query.clone(),
            },
            http,
        ))
    }

    /// GeckoTerminal trending pools, falling back to a single Jupiter SOL price
    pub fn geckoterminal(config: &SourceConfig) -> SourceResult<Self> {
        let http = HttpFetcher::from_config(config, config.max_retries)?;
        let single_shot = http.with_retry(RetryPolicy::new(0, config.retry_base_delay));

        Ok(Self::new(SourceId::GeckoTerminal.name())
            .then_within(
                Attempt::GeckoTerminalTrending {
                    base_url: config.geckoterminal_url.clone(),
                    network: config.geckoterminal_network.clone(),
                },
                http,
                config.primary_budget,
            )
            .then(
                Attempt::JupiterPrice {
                    base_url: config.jupiter_url.clone(),
                    mint: WRAPPED_SOL_MINT.to_string(),
                },
                single_shot,
            ))
    }
}

#[async_trait::async_trait]
impl TokenSource for SourceAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Vec<TokenRecord> {
        let mut last_error = None;

        for Step { attempt, http, budget } in &self.steps {
            let result = match budget {
                Some(budget) => match tokio::time::timeout(*budget, attempt.run(http)).await {
                    Ok(result) => result,
                    Err(_) => {
                        warn!("{} attempt {} exceeded its {:?} budget", self.name, attempt.label(), budget);
                        Err(SourceError::Timeout)
                    }
                },
                None => attempt.run(http).await,
            };

            match result {
                Ok(records) => {
                    let fetched = records.len();
                    let records = sanitize(records);
                    if records.len() < fetched {
                        debug!("{} dropped {} invalid records", self.name, fetched - records.len());
                    }
                    info!("{} returned {} records via {}", self.name, records.len(), attempt.label());
                    return records;
                }
                Err(e) => {
                    warn!("{} attempt {} failed: {}", self.name, attempt.label(), e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => error!("{} unavailable this cycle: {}", self.name, e),
            None => warn!("{} has no attempts configured", self.name),
        }
        Vec::new()
    }
}

/// Drop records that must never reach the merge engine
pub fn sanitize(records: Vec<TokenRecord>) -> Vec<TokenRecord> {
    records
        .into_iter()
        .filter(|r| !r.address.trim().is_empty() && r.has_valid_price())
        .collect()
}

/// Lenient numeric read: JSON numbers and numeric strings, finite only
pub(crate) fn number(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Treat zero as absent
pub(crate) fn non_zero(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0)
}
