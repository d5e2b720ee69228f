//! HTTP server configuration and startup

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use axum::routing::get;
use axum::Router;
use dashmap::DashMap;
use tokio::net::TcpListener;
use tracing::info;
use uuid::Uuid;

use meme_price_feed::{BroadcastPublisher, PollScheduler, SnapshotStore};

use crate::{routes, ws};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SnapshotStore>,
    pub publisher: Arc<BroadcastPublisher>,
    /// Poll loop feeding the store, if one is attached
    pub scheduler: Option<Arc<PollScheduler>>,
    /// Connected WebSocket clients and when they joined
    pub subscribers: Arc<DashMap<Uuid, Instant>>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(store: Arc<SnapshotStore>, publisher: Arc<BroadcastPublisher>) -> Self {
        Self {
            store,
            publisher,
            scheduler: None,
            subscribers: Arc::new(DashMap::new()),
            started_at: Instant::now(),
        }
    }

    pub fn with_scheduler(mut self, scheduler: Arc<PollScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Poll cycles completed so far, including ones that committed nothing
    pub fn cycles_run(&self) -> u64 {
        self.scheduler.as_ref().map_or(0, |s| s.cycles_run())
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/tokens", get(routes::tokens))
        .route("/health", get(routes::health))
        .route("/ws", get(ws::upgrade))
        .with_state(state)
}

/// HTTP and WebSocket server
pub struct ApiServer {
    config: ApiServerConfig,
    state: AppState,
}

impl ApiServer {
    pub fn new(config: ApiServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Bind the listener; failure here is fatal to startup
    pub async fn bind(&self) -> anyhow::Result<TcpListener> {
        let addr = self.address();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;
        info!("HTTP server listening on {}", listener.local_addr()?);
        Ok(listener)
    }

    /// Serve on a bound listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(async move {
                shutdown.await;
                info!("Shutdown signal received");
            })
            .await?;
        Ok(())
    }

    /// Get server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }
}

/// Builder for the API server
pub struct ApiServerBuilder {
    config: ApiServerConfig,
    store: Option<Arc<SnapshotStore>>,
    publisher: Option<Arc<BroadcastPublisher>>,
    scheduler: Option<Arc<PollScheduler>>,
}

impl ApiServerBuilder {
    pub fn new() -> Self {
        Self {
            config: ApiServerConfig::default(),
            store: None,
            publisher: None,
            scheduler: None,
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn store(mut self, store: Arc<SnapshotStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn publisher(mut self, publisher: Arc<BroadcastPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Report this scheduler's cycles on `/health`. Its store wins over
    /// any store set separately.
    pub fn scheduler(mut self, scheduler: Arc<PollScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn build(self) -> ApiServer {
        let store = match &self.scheduler {
            Some(scheduler) => scheduler.store(),
            None => self.store.unwrap_or_default(),
        };
        let publisher = self
            .publisher
            .unwrap_or_else(|| Arc::new(BroadcastPublisher::new(256)));

        let mut state = AppState::new(store, publisher);
        if let Some(scheduler) = self.scheduler {
            state = state.with_scheduler(scheduler);
        }
        ApiServer::new(self.config, state)
    }
}

impl Default for ApiServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
