//! `Manager`: the room directory (spec §4.2, §5).
//!
//! Two locks exist in this system and they are never held at once: each
//! [`Room`]'s own `parking_lot::Mutex` guards that room's state, and the
//! directory's `DashMap`s give lock-free lookup by id and by join code.
//! The reaper sweeps the directory to find candidates, drops its
//! reference to the map, and only then calls into each candidate room
//! to decide and act — so a slow room never blocks the directory.

use crate::config::RoomConfig;
use crate::events::CloseReason;
use crate::model::{Page, RoomFilter, RoomSnapshot, RoomStatus};
use crate::room::Room;
use dashmap::{DashMap, DashSet};
use rand::Rng;
use std::sync::Arc;
use std::time::Instant;
use systems_common::{PlayerId, RoomId};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::{Result, RoomError};

const JOIN_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const JOIN_CODE_LEN: usize = 6;

pub struct Manager {
    config: RoomConfig,
    rooms: DashMap<RoomId, Arc<Room>>,
    by_join_code: DashMap<String, RoomId>,
    /// One-room-per-player enforcement (spec §4.2's invariant).
    player_room: DashMap<PlayerId, RoomId>,
    reaped_rooms: DashSet<RoomId>,
    /// Players whose transport reported a disconnect, timestamped so a
    /// sweep can turn a stale entry into a `Leave` after
    /// `RoomConfig::reattach_window` (spec §4.2 "Failure").
    pending_disconnects: DashMap<PlayerId, Instant>,
    stop: Arc<Notify>,
}

impl Manager {
    pub fn new(config: RoomConfig) -> Arc<Self> {
        Arc::new(Manager {
            config,
            rooms: DashMap::new(),
            by_join_code: DashMap::new(),
            player_room: DashMap::new(),
            reaped_rooms: DashSet::new(),
            pending_disconnects: DashMap::new(),
            stop: Arc::new(Notify::new()),
        })
    }

    fn generate_join_code(&self) -> String {
        let mut rng = rand::thread_rng();
        loop {
            let code: String = (0..JOIN_CODE_LEN)
                .map(|_| JOIN_CODE_ALPHABET[rng.gen_range(0..JOIN_CODE_ALPHABET.len())] as char)
                .collect();
            if !self.by_join_code.contains_key(&code) {
                return code;
            }
        }
    }

    /// `CreateRoom(hostPlayerId, name, maxPlayers, mode, password?)`
    /// (spec §4.2).
    pub fn create_room(
        &self,
        host_id: PlayerId,
        host_name: String,
        name: String,
        max_players: u32,
        mode: String,
        password: Option<String>,
    ) -> Result<RoomSnapshot> {
        if self.player_room.contains_key(&host_id) {
            return Err(RoomError::AlreadyInRoom(host_id));
        }
        let join_code = self.generate_join_code();
        let room = Room::create(name, max_players, mode, password, join_code.clone(), host_id, host_name, self.config.clone())?;
        let room_id = room.id;
        let room = Arc::new(room);
        self.rooms.insert(room_id, room.clone());
        self.by_join_code.insert(join_code, room_id);
        self.player_room.insert(host_id, room_id);
        info!(%room_id, "room created");
        Ok(room.snapshot())
    }

    pub fn get_room(&self, room_id: RoomId) -> Result<Arc<Room>> {
        self.rooms.get(&room_id).map(|r| r.clone()).ok_or(RoomError::NotFound)
    }

    pub fn find_by_join_code(&self, join_code: &str) -> Result<Arc<Room>> {
        let room_id = *self.by_join_code.get(join_code).ok_or(RoomError::NotFound)?;
        self.get_room(room_id)
    }

    pub fn join(&self, room_id: RoomId, player_id: PlayerId, player_name: String, password: Option<&str>) -> Result<RoomSnapshot> {
        if let Some(existing) = self.player_room.get(&player_id) {
            if *existing != room_id {
                return Err(RoomError::AlreadyInRoom(player_id));
            }
        }
        let room = self.get_room(room_id)?;
        let snapshot = room.join(player_id, player_name, password)?;
        self.player_room.insert(player_id, room_id);
        Ok(snapshot)
    }

    pub fn leave(&self, room_id: RoomId, player_id: PlayerId) -> Result<RoomSnapshot> {
        let room = self.get_room(room_id)?;
        let snapshot = room.leave(player_id)?;
        self.player_room.remove(&player_id);
        self.pending_disconnects.remove(&player_id);
        if snapshot.host_player_id != player_id && room.is_empty() {
            // Grace window handled by the reaper; nothing further here.
        }
        Ok(snapshot)
    }

    /// `ListRooms(filter, page)` (spec §4.2): private rooms are excluded
    /// unless the caller supplies their exact `join_code`, in which case
    /// only that room (if it still matches the other filters) is
    /// returned.
    pub fn list_rooms(&self, filter: RoomFilter, page: Page) -> Vec<RoomSnapshot> {
        let page = page.clamp();
        let mut all: Vec<RoomSnapshot> = self
            .rooms
            .iter()
            .map(|entry| entry.value().snapshot())
            .filter(|s| filter.status.map(|st| st == s.status).unwrap_or(true))
            .filter(|s| filter.mode.as_deref().map(|m| m == s.mode).unwrap_or(true))
            .filter(|s| match &filter.join_code {
                Some(code) => s.join_code.eq_ignore_ascii_case(code),
                None => !s.has_password,
            })
            .collect();
        all.sort_by_key(|s| s.created_at);
        let start = (page.page as usize) * (page.limit as usize);
        all.into_iter().skip(start).take(page.limit as usize).collect()
    }

    fn remove_room(&self, room_id: RoomId) {
        if let Some((_, room)) = self.rooms.remove(&room_id) {
            let snapshot = room.snapshot();
            self.by_join_code.remove(&snapshot.join_code);
            for p in &snapshot.players {
                self.player_room.remove(&p.player_id);
            }
        }
    }

    /// One reaper pass (spec §4.2, §5): sweep finds candidates under the
    /// directory's lock-free iteration, then the actual close/removal
    /// happens outside any single shared lock, one room at a time.
    pub fn reap_once(&self) {
        let candidates: Vec<(RoomId, CloseReason)> = self
            .rooms
            .iter()
            .filter_map(|entry| {
                let room = entry.value();
                if room.is_closed() {
                    return Some((*entry.key(), CloseReason::Inactive));
                }
                if room.age() >= self.config.ttl {
                    return Some((*entry.key(), CloseReason::Ttl));
                }
                if room.is_empty() && room.idle_for() >= self.config.empty_grace {
                    return Some((*entry.key(), CloseReason::Inactive));
                }
                if room.status() == RoomStatus::Finished && room.idle_for() >= self.config.finished_grace {
                    return Some((*entry.key(), CloseReason::GameEnded));
                }
                None
            })
            .collect();

        for (room_id, reason) in candidates {
            if let Some(room) = self.rooms.get(&room_id).map(|r| r.clone()) {
                room.close(reason);
                debug!(%room_id, ?reason, "room reaped");
            }
            self.remove_room(room_id);
            self.reaped_rooms.insert(room_id);
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Record that `player_id`'s transport reported a disconnect. A
    /// player already marked disconnected keeps their original
    /// timestamp — a flapping transport doesn't repeatedly extend the
    /// reattach window. No-op for a player not currently in any room.
    pub fn handle_disconnect(&self, player_id: PlayerId) {
        if !self.player_room.contains_key(&player_id) {
            return;
        }
        self.pending_disconnects.entry(player_id).or_insert_with(Instant::now);
    }

    /// A reattach request from the same `playerId` within the window:
    /// clears the pending disconnect and returns the room so the caller
    /// can restore the subscription (spec §4.2 "Failure").
    pub fn reattach(&self, player_id: PlayerId) -> Result<Arc<Room>> {
        let room_id = *self.player_room.get(&player_id).ok_or(RoomError::NotFound)?;
        self.pending_disconnects.remove(&player_id);
        self.get_room(room_id)
    }

    /// Turn any disconnect older than `reattach_window` into a `Leave`
    /// (spec §4.2 "Failure"). Candidates are snapshotted first so this
    /// never calls into a room while holding `pending_disconnects`'
    /// shard lock.
    pub fn sweep_disconnects(&self) {
        let window = self.config.reattach_window;
        let expired: Vec<PlayerId> = self
            .pending_disconnects
            .iter()
            .filter(|entry| entry.value().elapsed() >= window)
            .map(|entry| *entry.key())
            .collect();

        for player_id in expired {
            self.pending_disconnects.remove(&player_id);
            if let Some(room_id) = self.player_room.get(&player_id).map(|r| *r) {
                match self.leave(room_id, player_id) {
                    Ok(_) => debug!(%player_id, %room_id, "reattach window expired, player left"),
                    Err(e) => debug!(%player_id, %room_id, error = %e, "reattach sweep leave failed"),
                }
            }
        }
    }

    pub fn spawn_reaper(self: &Arc<Self>) -> JoinHandle<()> {
        let manager = self.clone();
        let interval = self.config.reaper_interval;
        let stop = self.stop.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        manager.reap_once();
                        manager.sweep_disconnects();
                    }
                    _ = stop.notified() => break,
                }
            }
        })
    }

    pub fn stop_reaper(&self) {
        self.stop.notify_waiters();
    }
}
