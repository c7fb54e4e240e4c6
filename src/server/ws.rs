use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink, stream::SplitStream};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use quadrant_common::Task;

use super::api::SharedState;
use crate::store::Subscription;

/// How often to send WebSocket Ping frames.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// How long to wait for a Pong response before considering the connection dead.
const PONG_TIMEOUT: Duration = Duration::from_secs(60);

// ── WebSocket message types ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum WsMessage {
    /// The owner's full task list, oldest first.
    Snapshot { tasks: Vec<Task> },
    /// The live query failed; the socket stays open for the next snapshot.
    Error { message: String },
}

fn encode(msg: &WsMessage) -> Option<Message> {
    match serde_json::to_string(msg) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize WsMessage");
            None
        }
    }
}

// ── WebSocket handler ────────────────────────────────────────────────

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: SharedState) {
    let (mut sender, receiver) = socket.split();
    let subscription = match state.store.subscribe(&state.owner.uid).await {
        Ok(sub) => sub,
        Err(e) => {
            tracing::warn!(error = %e, "websocket subscribe failed");
            if let Some(msg) = encode(&WsMessage::Error {
                message: e.to_string(),
            }) {
                let _ = sender.send(msg).await;
            }
            let _ = sender.send(Message::Close(None)).await;
            return;
        }
    };
    tracing::debug!(owner = %state.owner.uid, "websocket subscribed");
    run_socket_loop(sender, receiver, subscription).await;
}

/// Forward snapshots to the client with ping/pong keepalive.
///
/// If no Pong is received within [`PONG_TIMEOUT`] after a Ping is sent, the
/// connection is considered dead and the loop exits. Dropping the
/// subscription on exit cancels the live query.
async fn run_socket_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut receiver: SplitStream<WebSocket>,
    mut subscription: Subscription,
) {
    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    // First tick completes immediately.
    ping_interval.tick().await;

    let mut last_pong = Instant::now();
    let mut awaiting_pong = false;

    loop {
        tokio::select! {
            // ── Periodic ping ───────────────────────────────────────
            _ = ping_interval.tick() => {
                if awaiting_pong && last_pong.elapsed() > PONG_TIMEOUT {
                    tracing::debug!("websocket pong timeout");
                    break;
                }
                if sender.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
                awaiting_pong = true;
            }

            // ── Snapshot forwarding ─────────────────────────────────
            snapshot = subscription.next() => {
                let msg = match snapshot {
                    Some(Ok(tasks)) => WsMessage::Snapshot { tasks },
                    Some(Err(e)) => WsMessage::Error { message: e.to_string() },
                    None => break,
                };
                if let Some(frame) = encode(&msg) {
                    if sender.send(frame).await.is_err() {
                        break;
                    }
                }
            }

            // ── Client messages (pong, close, etc.) ─────────────────
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Pong(_))) => {
                        last_pong = Instant::now();
                        awaiting_pong = false;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }

    subscription.cancel();
    let _ = sender.send(Message::Close(None)).await;
}

// ── Tests ────────────────────────────────────────────────────────────
