//! Meme token aggregator
//!
//! Main entry point for the HTTP/WebSocket server and poll loop

use std::sync::Arc;

use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use meme_price_feed::{
    BroadcastPublisher, FetchOrchestrator, PollScheduler, Publisher, SnapshotStore, SourceAdapter,
};
use meme_server::{load_settings, ApiServerBuilder};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C");
        }
        _ = terminate => {
            info!("Received termination signal");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    init_tracing();

    info!("Starting meme token aggregator v{}", env!("CARGO_PKG_VERSION"));

    let settings = load_settings()?;
    let poll = settings.poll();
    let sources = settings.source();
    info!(
        "Polling every {:?}, change threshold {}",
        poll.interval, poll.price_change_threshold
    );

    let store = Arc::new(SnapshotStore::new());
    let publisher = Arc::new(BroadcastPublisher::new(settings.event_buffer));

    let orchestrator = FetchOrchestrator::new(poll.fetch_timeout)
        .with_source(Arc::new(SourceAdapter::dexscreener(&sources)?))
        .with_source(Arc::new(SourceAdapter::geckoterminal(&sources)?));
    info!("Configured {} sources", orchestrator.source_count());

    let scheduler = Arc::new(PollScheduler::new(
        poll,
        orchestrator,
        Arc::clone(&store),
        Arc::clone(&publisher) as Arc<dyn Publisher>,
    ));

    let server = ApiServerBuilder::new()
        .host(settings.bind_host.clone())
        .port(settings.port)
        .publisher(publisher)
        .scheduler(Arc::clone(&scheduler))
        .build();

    // Bind before the poll loop starts.
    let listener = server.bind().await?;
    let poll_loop = scheduler.start();
    info!("Press Ctrl+C to shutdown");

    let result = server.serve(listener, shutdown_signal()).await;
    poll_loop.abort();

    if let Err(e) = result {
        error!("Server error: {}", e);
        return Err(e);
    }

    info!("Server shutdown complete");
    Ok(())
}
