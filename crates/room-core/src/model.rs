//! Entity types for the Room core (spec §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use systems_common::{PlayerId, RoomId};

/// `{playerId, name, isReady, joinedAt}` from spec §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSlot {
    pub player_id: PlayerId,
    pub name: String,
    pub is_ready: bool,
    pub joined_at: DateTime<Utc>,
}

/// Status domain from spec §4.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomStatus {
    Waiting,
    Preparing,
    Ready,
    Playing,
    Finished,
    Closed,
}

impl RoomStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RoomStatus::Closed)
    }
}

/// `(roomId, joinCode, name, hostPlayerId, maxPlayers, mode, status,
/// password?, songId?, createdAt, updatedAt, players)` from spec §3.
///
/// This is the read-model snapshot returned by `Manager::get_room` and
/// friends; the live, lock-guarded state lives in [`crate::room::Room`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub room_id: RoomId,
    pub join_code: String,
    pub name: String,
    pub host_player_id: PlayerId,
    pub max_players: u32,
    pub mode: String,
    pub status: RoomStatus,
    pub has_password: bool,
    pub song_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub players: Vec<PlayerSlot>,
}

impl RoomSnapshot {
    pub fn is_full(&self) -> bool {
        self.players.len() as u32 >= self.max_players
    }

    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.players.iter().any(|p| p.player_id == player_id)
    }
}

/// Filter accepted by `ListRooms` (spec §4.2, §6). Private (password-
/// protected) rooms are excluded from the listing unless the caller
/// supplies the room's own `join_code`, per spec §4.2.
#[derive(Debug, Clone, Default)]
pub struct RoomFilter {
    pub status: Option<RoomStatus>,
    pub mode: Option<String>,
    pub join_code: Option<String>,
}

/// Offset/limit pagination, bounded server-side (spec §3 expansion).
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl Page {
    pub const MAX_LIMIT: u32 = 100;

    pub fn clamp(self) -> Self {
        Page {
            page: self.page,
            limit: self.limit.clamp(1, Self::MAX_LIMIT),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Page { page: 0, limit: 20 }
    }
}
