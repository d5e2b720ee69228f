//! Error types

use thiserror::Error;

/// Core error types
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Errors raised inside a source adapter.
///
/// These never cross the adapter boundary; `TokenSource::fetch` turns them
/// into an empty result after logging.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Rate limited")]
    RateLimited,

    #[error("Timeout waiting for response")]
    Timeout,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("All attempts failed: {0}")]
    Exhausted(String),
}

impl SourceError {
    /// Whether a bounded retry may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::Timeout | SourceError::RateLimited | SourceError::Transport(_) => true,
            SourceError::Http { status, .. } => *status >= 500,
            SourceError::Malformed(_) | SourceError::Exhausted(_) => false,
        }
    }
}

/// Max body length carried in error messages and logs
pub const MAX_LOGGED_BODY: usize = 200;

/// Truncate a response body for logging
pub fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(MAX_LOGGED_BODY) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

/// Result type alias
pub type CoreResult<T> = Result<T, CoreError>;
pub type SourceResult<T> = Result<T, SourceError>;
