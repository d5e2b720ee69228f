//! HTTP handlers

use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::query::{TokenPage, TokenQuery};
use crate::server::AppState;

pub async fn tokens(State(state): State<AppState>, Query(query): Query<TokenQuery>) -> Json<TokenPage> {
    let snapshot = state.store.read();
    Json(query.apply(&snapshot.records))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub tokens: usize,
    /// Poll cycles run, including ones where no source returned data
    pub cycles: u64,
    pub commits: u64,
    pub committed_at: Option<DateTime<Utc>>,
    pub last_commit_age_ms: Option<u64>,
    pub subscribers: usize,
    pub uptime_secs: u64,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.store.stats();
    Json(HealthResponse {
        status: "ok".to_string(),
        tokens: stats.token_count,
        cycles: state.cycles_run(),
        commits: stats.commit_count,
        committed_at: stats.committed_at,
        last_commit_age_ms: stats.last_commit_age.map(|age| age.as_millis() as u64),
        subscribers: state.subscribers.len(),
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}
