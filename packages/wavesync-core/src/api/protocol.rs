//! Listener wire protocol.
//!
//! Every frame is a JSON envelope `{ "type", "payload", "timestamp" }`.
//! Outbound frames are encoded once into [`Utf8Bytes`] and shared by every
//! connection's outbound queue.

use axum::extract::ws::Utf8Bytes;
use serde::{Deserialize, Serialize};

use crate::events::PlaybackEvent;
use crate::playback::{PlaybackSnapshot, QueueInfo, SongChange};
use crate::protocol_constants::{
    MSG_ERROR, MSG_PLAYBACK_STATE, MSG_PONG, MSG_QUEUE_UPDATE, MSG_SONG_CHANGE,
};
use crate::utils::now_millis;

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    #[serde(rename = "type")]
    kind: &'a str,
    payload: &'a T,
    timestamp: u64,
}

#[derive(Serialize)]
struct Empty {}

#[derive(Serialize)]
struct ErrorPayload<'a> {
    message: &'a str,
}

/// Encodes a payload under the given message type.
pub fn encode<T: Serialize>(kind: &str, payload: &T) -> Result<Utf8Bytes, serde_json::Error> {
    let envelope = Envelope {
        kind,
        payload,
        timestamp: now_millis(),
    };
    serde_json::to_string(&envelope).map(Utf8Bytes::from)
}

/// Encodes a bus event as its outbound frame.
pub fn encode_event(event: &PlaybackEvent) -> Result<Utf8Bytes, serde_json::Error> {
    match event {
        PlaybackEvent::SongChanged(change) => encode_song_change(change),
        PlaybackEvent::QueueUpdated(info) => encode_queue_update(info),
        PlaybackEvent::PlaybackState(snapshot) => encode_playback_state(snapshot),
    }
}

pub fn encode_song_change(change: &SongChange) -> Result<Utf8Bytes, serde_json::Error> {
    encode(MSG_SONG_CHANGE, change)
}

pub fn encode_queue_update(info: &QueueInfo) -> Result<Utf8Bytes, serde_json::Error> {
    encode(MSG_QUEUE_UPDATE, info)
}

pub fn encode_playback_state(
    snapshot: &PlaybackSnapshot,
) -> Result<Utf8Bytes, serde_json::Error> {
    encode(MSG_PLAYBACK_STATE, snapshot)
}

pub fn encode_pong() -> Result<Utf8Bytes, serde_json::Error> {
    encode(MSG_PONG, &Empty {})
}

pub fn encode_error(message: &str) -> Result<Utf8Bytes, serde_json::Error> {
    encode(MSG_ERROR, &ErrorPayload { message })
}

/// Inbound listener requests. Any other text frame is a protocol violation.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Ping,
    GetPlaybackState,
}
