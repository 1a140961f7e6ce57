//! Explicit configuration for the Room core (spec §4.2, §9).

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Upper bound on `maxPlayers` a room may be created with.
    pub max_players_ceiling: u32,
    /// How long an empty room is kept before automatic close. Default 5m.
    pub empty_grace: Duration,
    /// Absolute room lifetime regardless of activity. Default 30m.
    pub ttl: Duration,
    /// How long a `finished` room is kept before automatic close (spec
    /// §4.2's state table: "finished → closed: automatic after short
    /// grace"). Default 30s.
    pub finished_grace: Duration,
    /// How long a disconnected player may reattach before being treated
    /// as `Leave`. Default 15s.
    pub reattach_window: Duration,
    /// Countdown value broadcast with `game_starting`.
    pub start_countdown_seconds: u32,
    /// How often the reaper sweeps the room directory.
    pub reaper_interval: Duration,
    /// Bound on each subscriber's event queue; a subscriber whose buffer
    /// fills is disconnected rather than stalling the broadcaster
    /// (spec §4.2, §5).
    pub subscriber_queue_capacity: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        RoomConfig {
            max_players_ceiling: 16,
            empty_grace: Duration::from_secs(5 * 60),
            ttl: Duration::from_secs(30 * 60),
            finished_grace: Duration::from_secs(30),
            reattach_window: Duration::from_secs(15),
            start_countdown_seconds: 5,
            reaper_interval: Duration::from_secs(15),
            subscriber_queue_capacity: 32,
        }
    }
}
