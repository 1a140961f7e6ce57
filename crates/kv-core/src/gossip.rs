//! Gossip membership protocol (spec §4.4): heartbeat counters, random
//! fanout exchange, and a suspect/dead state machine. The node table is
//! guarded by a reader-writer lock (spec §5); ring rebuilds read a
//! consistent snapshot of it.

use crate::rpc::PeerRpc;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use systems_common::{Clock, NodeId};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberState {
    Alive,
    Suspected,
    Dead,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberInfo {
    pub heartbeat: u64,
    pub last_seen: DateTime<Utc>,
    pub state: MemberState,
}

/// The full known-node table exchanged verbatim during gossip fanout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeTable(pub FxHashMap<NodeId, MemberInfo>);

#[derive(Debug, Clone)]
pub struct GossipConfig {
    pub heartbeat_period: Duration,
    pub fanout: usize,
    pub suspect_after: Duration,
    pub dead_after: Duration,
}

impl Default for GossipConfig {
    fn default() -> Self {
        GossipConfig {
            heartbeat_period: Duration::from_secs(1),
            fanout: 3,
            suspect_after: Duration::from_secs(10),
            dead_after: Duration::from_secs(30),
        }
    }
}

pub struct Gossip<C: Clock> {
    self_id: NodeId,
    config: GossipConfig,
    table: RwLock<NodeTable>,
    clock: std::sync::Arc<C>,
    stop: Notify,
}

impl<C: Clock> Gossip<C> {
    pub fn new(self_id: NodeId, config: GossipConfig, clock: std::sync::Arc<C>) -> Self {
        let mut table = NodeTable::default();
        table.0.insert(
            self_id,
            MemberInfo { heartbeat: 0, last_seen: clock.utc_now(), state: MemberState::Alive },
        );
        Gossip { self_id, config, table: RwLock::new(table), clock, stop: Notify::new() }
    }

    pub fn self_id(&self) -> NodeId {
        self.self_id
    }

    pub fn config(&self) -> &GossipConfig {
        &self.config
    }

    /// Every `heartbeatPeriod`: bump the local heartbeat counter.
    pub fn tick_heartbeat(&self) {
        let mut table = self.table.write().unwrap();
        let now = self.clock.utc_now();
        let entry = table.0.get_mut(&self.self_id).expect("self always present in table");
        entry.heartbeat += 1;
        entry.last_seen = now;
    }

    /// Pick `fanout` random alive peers (excluding self) to gossip with
    /// this period.
    pub fn pick_fanout_targets(&self) -> Vec<NodeId> {
        let table = self.table.read().unwrap();
        let mut candidates: Vec<NodeId> = table
            .0
            .iter()
            .filter(|(&id, info)| id != self.self_id && info.state != MemberState::Dead)
            .map(|(&id, _)| id)
            .collect();
        let mut rng = rand::thread_rng();
        candidates.shuffle(&mut rng);
        candidates.truncate(self.config.fanout);
        candidates
    }

    pub fn snapshot_table(&self) -> NodeTable {
        self.table.read().unwrap().clone()
    }

    /// Merge an incoming table from a gossip exchange: for each entry,
    /// retain whichever side has the higher heartbeat and adopt its
    /// `lastSeen` (spec §4.4's merge rule).
    pub fn merge_table(&self, incoming: &NodeTable) {
        let mut table = self.table.write().unwrap();
        for (&node, incoming_info) in &incoming.0 {
            match table.0.get(&node) {
                Some(existing) if existing.heartbeat >= incoming_info.heartbeat => {}
                _ => {
                    table.0.insert(node, incoming_info.clone());
                }
            }
        }
    }

    /// Re-evaluate suspect/dead state for every non-self member based on
    /// elapsed wall-clock time since `lastSeen`.
    pub fn sweep_failure_detector(&self) {
        let mut table = self.table.write().unwrap();
        let now = self.clock.utc_now();
        for (&node, info) in table.0.iter_mut() {
            if node == self.self_id {
                continue;
            }
            let elapsed = now.signed_duration_since(info.last_seen);
            let elapsed = elapsed.to_std().unwrap_or(Duration::ZERO);
            let next_state = if elapsed >= self.config.dead_after {
                MemberState::Dead
            } else if elapsed >= self.config.suspect_after {
                MemberState::Suspected
            } else {
                MemberState::Alive
            };
            if next_state != info.state {
                match next_state {
                    MemberState::Dead => warn!(%node, "node marked dead"),
                    MemberState::Suspected => warn!(%node, "node marked suspected"),
                    MemberState::Alive => info!(%node, "node recovered"),
                }
                info.state = next_state;
            }
        }
    }

    pub fn alive_nodes(&self) -> Vec<NodeId> {
        self.table
            .read()
            .unwrap()
            .0
            .iter()
            .filter(|(_, info)| info.state != MemberState::Dead)
            .map(|(&id, _)| id)
            .collect()
    }

    /// Register a peer discovered out-of-band (e.g. initial seed list).
    pub fn add_member(&self, node: NodeId) {
        let mut table = self.table.write().unwrap();
        table.0.entry(node).or_insert(MemberInfo {
            heartbeat: 0,
            last_seen: self.clock.utc_now(),
            state: MemberState::Alive,
        });
    }

    /// Drive the protocol on `heartbeatPeriod` (spec §4.4: gossip "runs
    /// on a dedicated ticker"): bump the local heartbeat, exchange
    /// tables with a random fanout of peers, then re-evaluate the
    /// suspect/dead state machine.
    pub fn spawn<R: PeerRpc + 'static>(self: Arc<Self>, rpc: Arc<R>) -> JoinHandle<()>
    where
        C: 'static,
    {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.heartbeat_period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.tick_heartbeat();
                        for peer in self.pick_fanout_targets() {
                            match rpc.gossip_exchange(peer, self.snapshot_table()).await {
                                Ok(remote_table) => self.merge_table(&remote_table),
                                Err(e) => warn!(%peer, error = %e, "gossip exchange failed"),
                            }
                        }
                        self.sweep_failure_detector();
                    }
                    _ = self.stop.notified() => break,
                }
            }
        })
    }

    pub fn stop(&self) {
        self.stop.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use systems_common::ManualClock;

    #[test]
    fn suspect_then_dead_after_configured_windows() {
        let clock = std::sync::Arc::new(ManualClock::default());
        let self_id = NodeId::new();
        let peer = NodeId::new();
        let gossip = Gossip::new(self_id, GossipConfig::default(), clock.clone());
        gossip.add_member(peer);

        clock.advance(Duration::from_secs(11));
        gossip.sweep_failure_detector();
        let table = gossip.snapshot_table();
        assert_eq!(table.0[&peer].state, MemberState::Suspected);

        clock.advance(Duration::from_secs(20));
        gossip.sweep_failure_detector();
        let table = gossip.snapshot_table();
        assert_eq!(table.0[&peer].state, MemberState::Dead);
        assert!(!gossip.alive_nodes().contains(&peer));
    }

    #[test]
    fn merge_retains_higher_heartbeat() {
        let clock = std::sync::Arc::new(ManualClock::default());
        let self_id = NodeId::new();
        let peer = NodeId::new();
        let gossip = Gossip::new(self_id, GossipConfig::default(), clock.clone());
        gossip.add_member(peer);

        let mut incoming = NodeTable::default();
        incoming.0.insert(
            peer,
            MemberInfo { heartbeat: 50, last_seen: clock.utc_now(), state: MemberState::Alive },
        );
        gossip.merge_table(&incoming);
        assert_eq!(gossip.snapshot_table().0[&peer].heartbeat, 50);

        let mut stale = NodeTable::default();
        stale.0.insert(
            peer,
            MemberInfo { heartbeat: 1, last_seen: clock.utc_now(), state: MemberState::Alive },
        );
        gossip.merge_table(&stale);
        assert_eq!(gossip.snapshot_table().0[&peer].heartbeat, 50);
    }
}
