//! `Room`: per-room state machine, membership, selected-song slot,
//! readiness bits, and broadcast channel (spec §4.2).
//!
//! Every mutating operation takes the room's own `parking_lot::Mutex`
//! for its entire duration — the lock covers players, status, songId,
//! and (by convention, see [`EventBus::close`]) the broadcast channel's
//! open/closed latch, per spec §4.2's concurrency rules.

use crate::bus::EventBus;
use crate::config::RoomConfig;
use crate::error::{Result, RoomError};
use crate::events::{CloseReason, RoomEvent};
use crate::model::{PlayerSlot, RoomSnapshot, RoomStatus};
use chrono::Utc;
use parking_lot::Mutex;
use std::time::Instant;
use systems_common::{PlayerId, RoomId};
use tokio::sync::mpsc;

struct RoomState {
    snapshot: RoomSnapshot,
    password: Option<String>,
    last_activity: Instant,
    created_at_monotonic: Instant,
}

pub struct Room {
    pub id: RoomId,
    config: RoomConfig,
    state: Mutex<RoomState>,
    bus: EventBus,
}

impl Room {
    pub fn create(
        name: String,
        max_players: u32,
        mode: String,
        password: Option<String>,
        join_code: String,
        host_id: PlayerId,
        host_name: String,
        config: RoomConfig,
    ) -> Result<Self> {
        if !(2..=config.max_players_ceiling).contains(&max_players) {
            return Err(RoomError::InvalidArgument(format!(
                "max_players must be between 2 and {}",
                config.max_players_ceiling
            )));
        }
        let now = Utc::now();
        let snapshot = RoomSnapshot {
            room_id: RoomId::new(),
            join_code,
            name,
            host_player_id: host_id,
            max_players,
            mode,
            status: RoomStatus::Waiting,
            has_password: password.is_some(),
            song_id: None,
            created_at: now,
            updated_at: now,
            players: vec![PlayerSlot {
                player_id: host_id,
                name: host_name,
                is_ready: false,
                joined_at: now,
            }],
        };
        let id = snapshot.room_id;
        Ok(Room {
            id,
            config,
            state: Mutex::new(RoomState {
                snapshot,
                password,
                last_activity: Instant::now(),
                created_at_monotonic: Instant::now(),
            }),
            bus: EventBus::new(),
        })
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        self.state.lock().snapshot.clone()
    }

    pub fn join_code(&self) -> String {
        self.state.lock().snapshot.join_code.clone()
    }

    fn broadcast(&self, state: &mut RoomState, event: RoomEvent) {
        let disconnected = self.bus.broadcast(event);
        for player_id in disconnected {
            // A full subscriber queue is a slow/stuck consumer; treat it
            // the way a transport disconnect would be treated, removing
            // it from the subscriber set. The caller's own Leave flow
            // handles player removal from `players` on an actual
            // disconnect; here we only drop the stale channel so future
            // broadcasts don't keep trying it.
            self.bus.unsubscribe(player_id);
        }
        state.snapshot.updated_at = Utc::now();
        state.last_activity = Instant::now();
    }

    /// `Join(roomId or joinCode, playerId, playerName, password?)`
    /// (spec §4.2). Caller (the `Manager`) is responsible for the
    /// one-room-per-player check across the whole directory; this method
    /// only enforces per-room invariants.
    pub fn join(&self, player_id: PlayerId, player_name: String, password: Option<&str>) -> Result<RoomSnapshot> {
        let mut state = self.state.lock();
        if state.snapshot.status == RoomStatus::Closed {
            return Err(RoomError::RoomClosed);
        }
        if state.snapshot.status == RoomStatus::Playing {
            return Err(RoomError::PreconditionFailed("game already in progress".into()));
        }
        if state.snapshot.is_full() {
            return Err(RoomError::RoomFull);
        }
        if let Some(expected) = &state.password {
            if password != Some(expected.as_str()) {
                return Err(RoomError::WrongPassword);
            }
        }
        if state.snapshot.contains(player_id) {
            return Ok(state.snapshot.clone());
        }

        state.snapshot.players.push(PlayerSlot {
            player_id,
            name: player_name.clone(),
            is_ready: false,
            joined_at: Utc::now(),
        });
        self.broadcast(&mut state, RoomEvent::PlayerJoined { player_id, name: player_name });

        // `waiting → preparing` auto-transition on a full room (spec
        // §4.2's state table: "all slots full OR host advances").
        if state.snapshot.status == RoomStatus::Waiting && state.snapshot.is_full() {
            state.snapshot.status = RoomStatus::Preparing;
            state.snapshot.updated_at = Utc::now();
        }
        Ok(state.snapshot.clone())
    }

    /// `Leave(roomId, playerId)` (spec §4.2): removes the player; if they
    /// were host and others remain, the earliest-joined remaining player
    /// becomes host. If no players remain the room is left for the
    /// reaper's empty-grace window rather than closed synchronously,
    /// matching spec's "closed after the idle grace" wording.
    pub fn leave(&self, player_id: PlayerId) -> Result<RoomSnapshot> {
        let mut state = self.state.lock();
        if state.snapshot.status == RoomStatus::Closed {
            return Err(RoomError::RoomClosed);
        }
        let was_host = state.snapshot.host_player_id == player_id;
        let before = state.snapshot.players.len();
        state.snapshot.players.retain(|p| p.player_id != player_id);
        if state.snapshot.players.len() == before {
            return Err(RoomError::NotAPlayer(player_id));
        }
        self.bus.unsubscribe(player_id);

        if was_host {
            if let Some(successor) = state.snapshot.players.first() {
                let new_host = successor.player_id;
                state.snapshot.host_player_id = new_host;
                self.broadcast(&mut state, RoomEvent::HostChanged { new_host });
            }
        }
        self.broadcast(&mut state, RoomEvent::PlayerLeft { player_id });
        Ok(state.snapshot.clone())
    }

    pub fn set_ready(&self, player_id: PlayerId, is_ready: bool) -> Result<RoomSnapshot> {
        let mut state = self.state.lock();
        if state.snapshot.status == RoomStatus::Closed {
            return Err(RoomError::RoomClosed);
        }
        let slot = state
            .snapshot
            .players
            .iter_mut()
            .find(|p| p.player_id == player_id)
            .ok_or(RoomError::NotAPlayer(player_id))?;
        slot.is_ready = is_ready;

        Self::maybe_transition_to_ready(&mut state);
        self.broadcast(&mut state, RoomEvent::PlayerReadyChanged { player_id, is_ready });
        Ok(state.snapshot.clone())
    }

    /// ★ `SelectSong(roomId, playerId, songId)`: host-only, allowed only
    /// in `waiting|preparing` (spec §4.2).
    pub fn select_song(&self, player_id: PlayerId, song_id: String) -> Result<RoomSnapshot> {
        let mut state = self.state.lock();
        self.require_host(&state, player_id)?;
        if !matches!(state.snapshot.status, RoomStatus::Waiting | RoomStatus::Preparing) {
            return Err(RoomError::PreconditionFailed(
                "song can only be selected while waiting or preparing".into(),
            ));
        }
        state.snapshot.song_id = Some(song_id.clone());

        Self::maybe_transition_to_ready(&mut state);
        self.broadcast(&mut state, RoomEvent::SongSelected { song_id });
        Ok(state.snapshot.clone())
    }

    /// `preparing|waiting → ready` once every player is ready and a song
    /// is selected (spec §4.2's state table). Shared by `set_ready` and
    /// `select_song` since either order of "ready up" / "pick a song"
    /// can be the one that completes the condition.
    fn maybe_transition_to_ready(state: &mut RoomState) {
        if state.snapshot.players.len() >= 2
            && state.snapshot.players.iter().all(|p| p.is_ready)
            && state.snapshot.song_id.is_some()
            && matches!(state.snapshot.status, RoomStatus::Waiting | RoomStatus::Preparing)
        {
            state.snapshot.status = RoomStatus::Ready;
        }
    }

    /// ★ `Start(roomId, playerId)`: requires `ready` (spec §4.2).
    pub fn start(&self, player_id: PlayerId) -> Result<RoomSnapshot> {
        let mut state = self.state.lock();
        self.require_host(&state, player_id)?;
        if state.snapshot.status != RoomStatus::Ready {
            return Err(RoomError::PreconditionFailed("room is not ready to start".into()));
        }
        let countdown = self.config.start_countdown_seconds;
        self.broadcast(&mut state, RoomEvent::GameStarting { countdown });
        state.snapshot.status = RoomStatus::Playing;
        Ok(state.snapshot.clone())
    }

    pub fn end_game(&self, player_id: PlayerId) -> Result<RoomSnapshot> {
        let mut state = self.state.lock();
        self.require_host(&state, player_id)?;
        if state.snapshot.status != RoomStatus::Playing {
            return Err(RoomError::PreconditionFailed("no game in progress".into()));
        }
        state.snapshot.status = RoomStatus::Finished;
        self.broadcast(&mut state, RoomEvent::GameEnded);
        Ok(state.snapshot.clone())
    }

    /// Advance `waiting → preparing` either because the room filled up or
    /// the host explicitly advances (spec §4.2's state table).
    pub fn advance_to_preparing(&self, player_id: PlayerId) -> Result<RoomSnapshot> {
        let mut state = self.state.lock();
        self.require_host(&state, player_id)?;
        if state.snapshot.status != RoomStatus::Waiting {
            return Err(RoomError::PreconditionFailed("room is not waiting".into()));
        }
        if state.snapshot.players.len() < 2 {
            return Err(RoomError::PreconditionFailed("need at least 2 players".into()));
        }
        state.snapshot.status = RoomStatus::Preparing;
        state.snapshot.updated_at = Utc::now();
        Ok(state.snapshot.clone())
    }

    fn require_host(&self, state: &RoomState, player_id: PlayerId) -> Result<()> {
        if state.snapshot.status == RoomStatus::Closed {
            return Err(RoomError::RoomClosed);
        }
        if state.snapshot.host_player_id != player_id {
            return Err(RoomError::NotHost);
        }
        Ok(())
    }

    /// Subscribe to this room's broadcast stream (spec §4.2). Returns
    /// `None` if the room's bus has already been closed (terminal).
    pub fn subscribe(&self, player_id: PlayerId) -> Option<mpsc::Receiver<RoomEvent>> {
        self.bus.subscribe(player_id, self.config.subscriber_queue_capacity)
    }

    /// Close the room, broadcasting `room_closed` before latching the
    /// bus shut. Idempotent.
    pub fn close(&self, reason: CloseReason) {
        let mut state = self.state.lock();
        if state.snapshot.status == RoomStatus::Closed {
            return;
        }
        state.snapshot.status = RoomStatus::Closed;
        self.broadcast(&mut state, RoomEvent::RoomClosed { reason });
        self.bus.close();
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().snapshot.players.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().snapshot.status == RoomStatus::Closed
    }

    pub fn status(&self) -> RoomStatus {
        self.state.lock().snapshot.status
    }

    pub fn idle_for(&self) -> std::time::Duration {
        self.state.lock().last_activity.elapsed()
    }

    pub fn age(&self) -> std::time::Duration {
        self.state.lock().created_at_monotonic.elapsed()
    }

    pub fn host(&self) -> PlayerId {
        self.state.lock().snapshot.host_player_id
    }
}
