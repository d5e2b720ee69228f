//! Shared HTTP fetcher with bounded retry and backoff

use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use meme_core::{truncate_body, SourceConfig, SourceError, SourceResult};

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Delay applied before retrying a 429
const RATE_LIMIT_DELAY: Duration = Duration::from_secs(2);

/// Retry policy for one adapter
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self { max_retries, base_delay }
    }

    /// Exponential backoff for the given retry attempt (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// reqwest wrapper used by all adapters
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: Client,
    retry: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, retry: RetryPolicy) -> SourceResult<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        headers.insert(
            header::ACCEPT_LANGUAGE,
            header::HeaderValue::from_static("en-US,en;q=0.9"),
        );

        let http = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        Ok(Self { http, retry })
    }

    pub fn from_config(config: &SourceConfig, max_retries: u32) -> SourceResult<Self> {
        Self::new(
            config.request_timeout,
            RetryPolicy::new(max_retries, config.retry_base_delay),
        )
    }

    /// Same client, different retry budget
    pub fn with_retry(&self, retry: RetryPolicy) -> Self {
        Self {
            http: self.http.clone(),
            retry,
        }
    }

    /// GET `url` with `query` appended and decode the JSON body, retrying
    /// transient failures
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        referer: &str,
    ) -> SourceResult<T> {
        let body = self.get_text(url, query, referer).await?;
        serde_json::from_str(&body).map_err(|e| {
            SourceError::Malformed(format!("{}: {}", e, truncate_body(&body)))
        })
    }

    async fn get_text(&self, url: &str, query: &[(&str, &str)], referer: &str) -> SourceResult<String> {
        let mut last_error = None;

        for attempt in 0..=self.retry.max_retries {
            if attempt > 0 {
                let delay = match last_error {
                    Some(SourceError::RateLimited) => RATE_LIMIT_DELAY.max(self.retry.delay_for(attempt)),
                    _ => self.retry.delay_for(attempt),
                };
                debug!("Retrying {} in {:?} (attempt {}/{})", url, delay, attempt, self.retry.max_retries);
                sleep(delay).await;
            }

            match self.send_once(url, query, referer).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_transient() => {
                    warn!("Request to {} failed: {}", url, e);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| SourceError::Exhausted(url.to_string())))
    }

    async fn send_once(&self, url: &str, query: &[(&str, &str)], referer: &str) -> SourceResult<String> {
        let response = self
            .http
            .get(url)
            .query(query)
            .header(header::REFERER, referer)
            .send()
            .await
            .map_err(classify_reqwest)?;

        let status = response.status();
        let body = response.text().await.map_err(classify_reqwest)?;

        match status {
            s if s.is_success() => Ok(body),
            StatusCode::TOO_MANY_REQUESTS => Err(SourceError::RateLimited),
            s => Err(SourceError::Http {
                status: s.as_u16(),
                body: truncate_body(&body),
            }),
        }
    }
}

fn classify_reqwest(e: reqwest::Error) -> SourceError {
    if e.is_timeout() {
        SourceError::Timeout
    } else if e.is_decode() {
        SourceError::Malformed(e.to_string())
    } else {
        SourceError::Transport(e.to_string())
    }
}
