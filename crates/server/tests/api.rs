//! Router tests against a real listener

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use serde_json::Value;
use tokio_tungstenite::tungstenite::Message;

use meme_core::{FeedEvent, PollConfig, SourceId, TokenRecord};
use meme_price_feed::{
    BroadcastPublisher, CycleOutcome, FetchOrchestrator, PollScheduler, Publisher, SnapshotStore,
    SourceAdapter,
};
use meme_server::{ApiServerBuilder, HealthResponse};

struct Running {
    addr: SocketAddr,
    store: Arc<SnapshotStore>,
    publisher: Arc<BroadcastPublisher>,
}

async fn spawn_server() -> Running {
    let store = Arc::new(SnapshotStore::new());
    store.commit(vec![
        TokenRecord::new("MintA", 1.5, SourceId::DexScreener)
            .with_name("Alpha")
            .with_ticker("ALP")
            .with_volume(900.0),
        TokenRecord::new("MintB", 0.2, SourceId::GeckoTerminal)
            .with_name("Beta")
            .with_ticker("BET")
            .with_volume(100.0),
    ]);
    let publisher = Arc::new(BroadcastPublisher::new(16));

    let server = ApiServerBuilder::new()
        .host("127.0.0.1")
        .port(0)
        .store(Arc::clone(&store))
        .publisher(Arc::clone(&publisher))
        .build();
    let listener = server.bind().await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server.serve(listener, std::future::pending()));

    Running { addr, store, publisher }
}

async fn next_json<S>(ws: &mut S) -> Value
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream closed")
            .unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

#[tokio::test]
async fn tokens_endpoint_sorts_and_paginates() {
    let running = spawn_server().await;

    let body: Value = reqwest::get(format!("http://{}/tokens", running.addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["meta"]["total"], 2);
    assert_eq!(body["meta"]["sortBy"], "volume_usd");
    assert_eq!(body["data"][0]["token_address"], "MintA");

    let body: Value = reqwest::get(format!(
        "http://{}/tokens?sort=price_usd&order=asc&limit=1",
        running.addr
    ))
    .await
    .unwrap()
    .json()
    .await
    .unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["token_address"], "MintB");
    assert_eq!(body["meta"]["hasMore"], true);
}

#[tokio::test]
async fn tokens_endpoint_reflects_latest_commit() {
    let running = spawn_server().await;
    running
        .store
        .commit(vec![TokenRecord::new("MintC", 3.0, SourceId::DexScreener)]);

    let body: Value = reqwest::get(format!("http://{}/tokens?search=mintc", running.addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["meta"]["total"], 1);
}

#[tokio::test]
async fn websocket_gets_initial_data_then_events() {
    let running = spawn_server().await;

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", running.addr))
        .await
        .unwrap();

    let initial = next_json(&mut ws).await;
    assert_eq!(initial["event"], "initial_data");
    assert_eq!(initial["data"].as_array().unwrap().len(), 2);

    let health: HealthResponse = reqwest::get(format!("http://{}/health", running.addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health.subscribers, 1);
    assert_eq!(health.tokens, 2);
    assert_eq!(health.commits, 1);
    assert_eq!(health.cycles, 0);

    running.publisher.publish(FeedEvent::NewTokens(vec![TokenRecord::new(
        "MintD",
        4.0,
        SourceId::GeckoTerminal,
    )]));

    let event = next_json(&mut ws).await;
    assert_eq!(event["event"], "new_tokens");
    assert_eq!(event["data"][0]["token_address"], "MintD");
}

#[tokio::test]
async fn health_counts_cycles_that_committed_nothing() {
    let publisher = Arc::new(BroadcastPublisher::new(16));
    // An adapter with no attempts always comes back empty.
    let orchestrator = FetchOrchestrator::new(Duration::from_secs(1))
        .with_source(Arc::new(SourceAdapter::new("idle")));
    let scheduler = Arc::new(PollScheduler::new(
        PollConfig::default(),
        orchestrator,
        Arc::new(SnapshotStore::new()),
        Arc::clone(&publisher) as Arc<dyn Publisher>,
    ));

    let server = ApiServerBuilder::new()
        .host("127.0.0.1")
        .port(0)
        .publisher(publisher)
        .scheduler(Arc::clone(&scheduler))
        .build();
    let listener = server.bind().await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server.serve(listener, std::future::pending()));

    assert!(matches!(scheduler.run_cycle().await, CycleOutcome::Completed(r) if !r.committed));
    assert!(matches!(scheduler.run_cycle().await, CycleOutcome::Completed(r) if !r.committed));

    let health: HealthResponse = reqwest::get(format!("http://{}/health", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health.cycles, 2);
    assert_eq!(health.commits, 0);
    assert_eq!(health.tokens, 0);
    assert!(health.committed_at.is_none());
}
