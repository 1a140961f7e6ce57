//! Broadcast event algebra (spec §4.2, and §9's call to replace dynamic
//! duck-typed JSON payloads with tagged variants of a small event
//! algebra).

use chrono::{DateTime, Utc};
use serde::Serialize;
use systems_common::PlayerId;

/// Why a room transitioned to `closed` (spec §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    HostLeft,
    Inactive,
    GameEnded,
    Ttl,
}

/// The full broadcast event algebra. Serialized internally-tagged so the
/// wire frame looks like `{"event": "...", "data": {...}}` (see
/// [`Frame`]) rather than a loosely-typed map.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum RoomEvent {
    PlayerJoined { player_id: PlayerId, name: String },
    PlayerLeft { player_id: PlayerId },
    HostChanged { new_host: PlayerId },
    PlayerReadyChanged { player_id: PlayerId, is_ready: bool },
    SongSelected { song_id: String },
    GameStarting { countdown: u32 },
    GameEnded,
    RoomClosed { reason: CloseReason },
}

/// The wire frame delivered over the subscription endpoint (spec §6):
/// `{event, data, ts}`.
#[derive(Debug, Clone, Serialize)]
pub struct Frame {
    #[serde(flatten)]
    pub event: RoomEvent,
    pub ts: DateTime<Utc>,
}

impl Frame {
    pub fn new(event: RoomEvent) -> Self {
        Frame { event, ts: Utc::now() }
    }
}
