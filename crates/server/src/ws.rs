//! WebSocket transport for feed events

use std::time::Instant;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

use meme_core::FeedEvent;

use crate::server::AppState;

pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let id = Uuid::new_v4();

    // Subscribe before reading the snapshot so no event falls in between.
    let events = state.publisher.subscribe();
    state.subscribers.insert(id, Instant::now());
    info!("Subscriber {} connected ({} total)", id, state.subscribers.len());

    let (mut sender, mut receiver) = socket.split();

    let snapshot = state.store.read();
    let initial = FeedEvent::InitialData(snapshot.records.clone());
    if send_event(&mut sender, &initial).await.is_ok() {
        forward(id, &mut sender, &mut receiver, BroadcastStream::new(events)).await;
    }

    state.subscribers.remove(&id);
    info!("Subscriber {} disconnected ({} total)", id, state.subscribers.len());
}

async fn forward(
    id: Uuid,
    sender: &mut SplitSink<WebSocket, Message>,
    receiver: &mut SplitStream<WebSocket>,
    mut events: BroadcastStream<FeedEvent>,
) {
    loop {
        tokio::select! {
            item = events.next() => match item {
                Some(Ok(event)) => {
                    if send_event(sender, &event).await.is_err() {
                        break;
                    }
                }
                Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                    warn!("Subscriber {} lagged, skipped {} events", id, skipped);
                }
                None => break,
            },
            msg = receiver.next() => match msg {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
}

async fn send_event(sender: &mut SplitSink<WebSocket, Message>, event: &FeedEvent) -> Result<(), axum::Error> {
    let payload = match serde_json::to_string(event) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Failed to serialize {}: {}", event.name(), e);
            return Ok(());
        }
    };
    debug!("Sending {} ({} items)", event.name(), event.len());
    sender.send(Message::Text(payload)).await
}
