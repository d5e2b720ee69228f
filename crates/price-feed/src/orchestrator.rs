//! Fetch orchestrator - runs every source concurrently, one cycle at a time

use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use meme_core::TokenRecord;

use crate::sources::TokenSource;

/// Outcome of one source within a fetch round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceOutcome {
    Ok(usize),
    TimedOut,
    Crashed,
}

/// Concatenated records plus per-source outcomes
#[derive(Debug, Clone, Default)]
pub struct FetchRound {
    pub records: Vec<TokenRecord>,
    pub outcomes: Vec<(String, SourceOutcome)>,
    pub elapsed: Duration,
}

impl FetchRound {
    pub fn healthy_sources(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, SourceOutcome::Ok(n) if *n > 0))
            .count()
    }
}

pub struct FetchOrchestrator {
    sources: Vec<Arc<dyn TokenSource>>,
    timeout: Duration,
}

impl FetchOrchestrator {
    pub fn new(timeout: Duration) -> Self {
        Self {
            sources: Vec::new(),
            timeout,
        }
    }

    pub fn with_source(mut self, source: Arc<dyn TokenSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Fetch from all sources in parallel and wait for every one to settle.
    ///
    /// Each source runs in its own task under `timeout`, so a hung or
    /// panicking source contributes nothing and never affects the others.
    pub async fn fetch_all(&self) -> FetchRound {
        let start = Instant::now();

        let tasks = self.sources.iter().map(|source| {
            let source = Arc::clone(source);
            let timeout = self.timeout;
            let name = source.name().to_string();

            let handle = tokio::spawn(async move { tokio::time::timeout(timeout, source.fetch()).await });
            async move { (name, handle.await) }
        });

        let mut round = FetchRound::default();

        for (name, joined) in join_all(tasks).await {
            let outcome = match joined {
                Ok(Ok(records)) => {
                    let count = records.len();
                    round.records.extend(records);
                    SourceOutcome::Ok(count)
                }
                Ok(Err(_)) => {
                    warn!("{} did not finish within {:?}, skipping", name, self.timeout);
                    SourceOutcome::TimedOut
                }
                Err(e) => {
                    error!("{} fetch task failed: {}", name, e);
                    SourceOutcome::Crashed
                }
            };
            debug!("{} -> {:?}", name, outcome);
            round.outcomes.push((name, outcome));
        }

        round.elapsed = start.elapsed();
        info!(
            "Fetched {} records from {}/{} sources in {:?}",
            round.records.len(),
            round.healthy_sources(),
            self.sources.len(),
            round.elapsed
        );

        round
    }
}
