//! WebSocket handler for listener connections.
//!
//! Each connection runs a reader (inbound requests, read deadline) and a
//! writer (outbound queue, write deadline, ping frames). Either side ending
//! tears down the other.

use std::fmt::Display;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::sink::{Sink, SinkExt};
use futures::stream::{SplitStream, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::api::hub::ConnectionGuard;
use crate::api::protocol::{
    encode_error, encode_playback_state, encode_pong, encode_queue_update, ClientMessage,
};
use crate::api::AppState;
use crate::playback::SyncEngine;

/// WebSocket upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

/// Frames a joining listener receives before any broadcast.
fn initial_snapshot(engine: &SyncEngine) -> Vec<Utf8Bytes> {
    let (queue, playback) = engine.join_snapshot();
    let frames = [encode_queue_update(&queue), encode_playback_state(&playback)];
    frames
        .into_iter()
        .filter_map(|frame| match frame {
            Ok(frame) => Some(frame),
            Err(e) => {
                log::warn!("[WS] Failed to encode snapshot: {}", e);
                None
            }
        })
        .collect()
}

/// Main WebSocket connection handler.
async fn handle_ws(socket: WebSocket, state: AppState) {
    let fanout = state.config.fanout.clone();
    let (conn_guard, outbound) = state.hub.join(|| initial_snapshot(&state.engine));
    let cancel_token = conn_guard.cancel_token().clone();

    log::info!("[WS] Listener connected: {}", conn_guard.id());

    let (sender, receiver) = socket.split();
    let writer = tokio::spawn(write_loop(
        sender,
        outbound,
        cancel_token.clone(),
        fanout.write_deadline(),
        fanout.ping_interval(),
    ));

    read_loop(receiver, &state, &conn_guard, fanout.read_deadline()).await;

    // Dropping the guard releases the hub's sender; the writer drains and exits.
    conn_guard.mark_closing();
    let id = conn_guard.id();
    drop(conn_guard);

    if let Err(e) = writer.await {
        log::warn!("[WS] Writer task for {} failed: {}", id, e);
    }
    log::info!("[WS] Listener disconnected: {}", id);
}

async fn read_loop(
    mut receiver: SplitStream<WebSocket>,
    state: &AppState,
    conn: &ConnectionGuard,
    read_deadline: Duration,
) {
    let cancel_token = conn.cancel_token().clone();

    loop {
        let next = tokio::select! {
            _ = cancel_token.cancelled() => {
                log::info!("[WS] Connection {} cancelled", conn.id());
                break;
            }
            next = tokio::time::timeout(read_deadline, receiver.next()) => next,
        };

        let msg = match next {
            Err(_) => {
                log::warn!("[WS] Read deadline exceeded: {}", conn.id());
                break;
            }
            Ok(Some(Ok(msg))) => msg,
            Ok(Some(Err(e))) => {
                log::debug!("[WS] Read error on {}: {}", conn.id(), e);
                break;
            }
            Ok(None) => break,
        };

        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(request) => {
                    if !respond(state, conn, request) {
                        break;
                    }
                }
                Err(e) => {
                    log::warn!("[WS] Malformed message from {}: {}", conn.id(), e);
                    if let Ok(frame) = encode_error("malformed message") {
                        conn.send(frame);
                    }
                    break;
                }
            },
            Message::Binary(_) => {
                log::warn!("[WS] Unexpected binary frame from {}", conn.id());
                break;
            }
            Message::Close(_) => break,
            // Control frames only refresh the read deadline.
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }
}

/// Answers a listener request. Returns `false` if the connection should close.
fn respond(state: &AppState, conn: &ConnectionGuard, request: ClientMessage) -> bool {
    let frame = match request {
        ClientMessage::Ping => encode_pong(),
        ClientMessage::GetPlaybackState => encode_playback_state(&state.engine.playback_snapshot()),
    };

    match frame {
        Ok(frame) => conn.send(frame),
        Err(e) => {
            log::warn!("[WS] Failed to encode reply for {}: {}", conn.id(), e);
            true
        }
    }
}

async fn write_loop<S>(
    mut sender: S,
    mut outbound: mpsc::Receiver<Utf8Bytes>,
    cancel_token: CancellationToken,
    write_deadline: Duration,
    ping_interval: Duration,
) where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    let mut ping = tokio::time::interval_at(Instant::now() + ping_interval, ping_interval);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let frame = tokio::select! {
            _ = cancel_token.cancelled() => break,
            next = outbound.recv() => match next {
                Some(text) => Message::Text(text),
                None => break,
            },
            _ = ping.tick() => Message::Ping(Bytes::new()),
        };

        match tokio::time::timeout(write_deadline, sender.send(frame)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                log::debug!("[WS] Write failed: {}", e);
                break;
            }
            Err(_) => {
                log::warn!("[WS] Write deadline exceeded, closing");
                break;
            }
        }
    }

    // Unblocks the reader if the writer ended first.
    cancel_token.cancel();
    let _ = tokio::time::timeout(write_deadline, sender.send(Message::Close(None))).await;
}
