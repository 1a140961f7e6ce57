//! `EventBus`: per-room fan-out with bounded per-subscriber queues
//! (spec §4.2).
//!
//! Delivery uses `try_send`; a subscriber whose buffer is full is
//! dropped rather than stalling the broadcaster (spec §4.2/§5's
//! "slow-consumer disconnect" policy). Closing is a one-shot latch: once
//! closed, all further sends are silently no-ops (spec §9's "single
//! designated closer" design note).

use crate::events::RoomEvent;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use systems_common::PlayerId;
use tokio::sync::mpsc;

pub struct EventBus {
    subscribers: DashMap<PlayerId, mpsc::Sender<RoomEvent>>,
    closed: AtomicBool,
}

impl EventBus {
    pub fn new() -> Self {
        EventBus {
            subscribers: DashMap::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Register a new subscriber, returning the receiving half. Replaces
    /// any existing subscription for the same player (a reattach).
    pub fn subscribe(&self, player_id: PlayerId, capacity: usize) -> Option<mpsc::Receiver<RoomEvent>> {
        if self.closed.load(Ordering::Acquire) {
            return None;
        }
        let (tx, rx) = mpsc::channel(capacity);
        self.subscribers.insert(player_id, tx);
        Some(rx)
    }

    pub fn unsubscribe(&self, player_id: PlayerId) {
        self.subscribers.remove(&player_id);
    }

    pub fn has_subscriber(&self, player_id: PlayerId) -> bool {
        self.subscribers.contains_key(&player_id)
    }

    /// Send `event` to every current subscriber. Returns the players
    /// whose channel was full or closed, so the caller (the room's
    /// state machine, already holding its own lock) can treat them as
    /// disconnected.
    pub fn broadcast(&self, event: RoomEvent) -> Vec<PlayerId> {
        if self.closed.load(Ordering::Acquire) {
            return Vec::new();
        }
        let mut slow = Vec::new();
        for entry in self.subscribers.iter() {
            if entry.value().try_send(event.clone()).is_err() {
                slow.push(*entry.key());
            }
        }
        for player_id in &slow {
            self.subscribers.remove(player_id);
        }
        slow
    }

    /// Close the bus. Idempotent: only the first call has any effect.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.subscribers.clear();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
