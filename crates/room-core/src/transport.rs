//! Session transport boundary (SPEC_FULL.md §3): the room core itself
//! knows nothing about websockets or any other wire transport. A host
//! process implements [`SessionTransport`] and drives
//! `Manager::subscribe`/`Manager::leave` from whatever disconnect/
//! reattach signal its transport gives it.

use async_trait::async_trait;
use systems_common::PlayerId;

/// A single player's live connection, as seen by the room core. The
/// host process is expected to hold one of these per connected player
/// and call [`SessionTransport::send_frame`] for every event the room
/// emits for them.
#[async_trait]
pub trait SessionTransport: Send + Sync {
    /// Push a pre-serialized frame to the player. Errors are treated as
    /// a disconnect signal by the caller, not retried here.
    async fn send_frame(&self, player_id: PlayerId, payload: Vec<u8>) -> bool;

    /// True while the transport still considers the player connected.
    /// Used by the reattach-window logic: a player whose transport
    /// reports disconnected is given [`crate::config::RoomConfig::reattach_window`]
    /// to reconnect before the room treats it as a `Leave`.
    fn is_connected(&self, player_id: PlayerId) -> bool;
}

/// In-memory transport double used by tests: records every frame sent
/// and lets tests flip a player's connectivity to exercise the
/// reattach window.
#[cfg(any(test, feature = "test-util"))]
pub mod testing {
    use super::*;
    use dashmap::DashMap;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    pub struct FakeTransport {
        connected: DashMap<PlayerId, bool>,
        sent: Mutex<Vec<(PlayerId, Vec<u8>)>>,
    }

    impl FakeTransport {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn set_connected(&self, player_id: PlayerId, connected: bool) {
            self.connected.insert(player_id, connected);
        }

        pub fn sent_count(&self, player_id: PlayerId) -> usize {
            self.sent.lock().iter().filter(|(p, _)| *p == player_id).count()
        }
    }

    #[async_trait]
    impl SessionTransport for FakeTransport {
        async fn send_frame(&self, player_id: PlayerId, payload: Vec<u8>) -> bool {
            let connected = self.is_connected(player_id);
            if connected {
                self.sent.lock().push((player_id, payload));
            }
            connected
        }

        fn is_connected(&self, player_id: PlayerId) -> bool {
            self.connected.get(&player_id).map(|v| *v).unwrap_or(true)
        }
    }
}
