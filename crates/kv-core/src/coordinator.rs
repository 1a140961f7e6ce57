//! `ReplicationCoordinator` (spec §4.4): fans the operation out to the
//! preference list, one worker per replica with its own deadline (spec
//! §5), and returns as soon as W (Put) or R (Get) responses are in. Put
//! bumps the coordinator's own vector-clock entry then merges with
//! whatever clock the write was derived from. Get gathers values+clocks
//! across replicas, computes the non-dominated subset, and
//! asynchronously issues read-repair to any strictly-dominated replica.

use crate::error::{KvError, Result};
use crate::model::{Sibling, StoredValue};
use crate::ring::RingSnapshot;
use crate::rpc::PeerRpc;
use crate::vector_clock::{non_dominated, VectorClock};
use std::sync::Arc;
use std::time::Duration;
use systems_common::NodeId;
use tracing::warn;

pub struct ReplicationConfig {
    pub n: usize,
    pub w: usize,
    pub r: usize,
    pub per_replica_timeout: Duration,
}

impl ReplicationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.w < 1 || self.w > self.n {
            return Err(KvError::InvalidArgument(format!("w must be between 1 and {}", self.n)));
        }
        if self.r < 1 || self.r > self.n {
            return Err(KvError::InvalidArgument(format!("r must be between 1 and {}", self.n)));
        }
        Ok(())
    }

    /// `W + R > N` is required for linearizable-last-write semantics on
    /// a single key (spec §4.4); callers that need this stronger
    /// property check it explicitly since the coordinator itself
    /// accepts any valid W/R.
    pub fn has_strict_quorum(&self) -> bool {
        self.w + self.r > self.n
    }
}

pub struct ReplicationCoordinator<R: PeerRpc> {
    self_id: NodeId,
    rpc: Arc<R>,
    config: ReplicationConfig,
}

impl<R: PeerRpc + 'static> ReplicationCoordinator<R> {
    pub fn new(self_id: NodeId, rpc: Arc<R>, config: ReplicationConfig) -> Result<Self> {
        config.validate()?;
        Ok(ReplicationCoordinator { self_id, rpc, config })
    }

    /// `Put(key, value) → ok | err`. Succeeds once ≥ W replicas ack
    /// within the deadline; replicas that did apply the write keep it
    /// even when the overall call returns `quorum-not-met` (spec §4.4's
    /// failure semantics).
    pub async fn put(&self, ring: &RingSnapshot, key: &str, value: StoredValue, known_clock: Option<VectorClock>) -> Result<VectorClock> {
        let preference_list = ring.preference_list(key, self.config.n);
        if preference_list.is_empty() {
            return Err(KvError::Unavailable);
        }

        let mut new_clock = known_clock.unwrap_or_default();
        new_clock.increment(self.self_id);

        let mut workers = Vec::with_capacity(preference_list.len());
        for &peer in &preference_list {
            let rpc = self.rpc.clone();
            let key = key.to_string();
            let value = value.clone();
            let clock = new_clock.clone();
            let timeout = self.config.per_replica_timeout;
            workers.push(tokio::spawn(async move {
                match tokio::time::timeout(timeout, rpc.put(peer, &key, value, clock)).await {
                    Ok(Ok(_)) => true,
                    Ok(Err(err)) => {
                        warn!(%peer, error = %err, "put to replica failed");
                        false
                    }
                    Err(_) => {
                        warn!(%peer, "put to replica timed out");
                        false
                    }
                }
            }));
        }

        let mut acked = 0;
        for worker in workers {
            if worker.await.unwrap_or(false) {
                acked += 1;
            }
        }

        if acked >= self.config.w {
            Ok(new_clock)
        } else {
            Err(KvError::QuorumNotMet { acked, required: self.config.w })
        }
    }

    /// `Get(key) → (versions[], err)`. Gathers from the preference
    /// list, requires at least R responses, computes the non-dominated
    /// subset across all of them, and fires off read-repair to any
    /// replica whose version was strictly dominated. Read-repair errors
    /// are logged, never surfaced (spec §4.4). Each returned sibling
    /// keeps its vector clock — the caller, not the coordinator, decides
    /// how to reconcile concurrent versions (spec §5: "the store never
    /// silently drops concurrent versions").
    pub async fn get(&self, ring: &RingSnapshot, key: &str) -> Result<Vec<Sibling>> {
        let preference_list = ring.preference_list(key, self.config.n);
        if preference_list.is_empty() {
            return Err(KvError::Unavailable);
        }

        let mut workers = Vec::with_capacity(preference_list.len());
        for &peer in &preference_list {
            let rpc = self.rpc.clone();
            let key = key.to_string();
            let timeout = self.config.per_replica_timeout;
            workers.push(tokio::spawn(async move {
                match tokio::time::timeout(timeout, rpc.get(peer, &key)).await {
                    Ok(Ok(siblings)) => Some((peer, siblings)),
                    Ok(Err(err)) => {
                        warn!(%peer, error = %err, "get from replica failed");
                        None
                    }
                    Err(_) => {
                        warn!(%peer, "get from replica timed out");
                        None
                    }
                }
            }));
        }

        let mut results: Vec<(NodeId, Vec<Sibling>)> = Vec::new();
        for worker in workers {
            if let Ok(Some(r)) = worker.await {
                results.push(r);
            }
        }

        if results.len() < self.config.r {
            return Err(KvError::QuorumNotMet { acked: results.len(), required: self.config.r });
        }

        // Tag every observed sibling with where it came from so we can
        // identify, after non-dominated filtering, which replicas hold
        // a strictly-dominated version and need read-repair.
        let mut tagged: Vec<(usize, (NodeId, Sibling))> = Vec::new();
        for (peer, siblings) in &results {
            for sibling in siblings {
                tagged.push((tagged.len(), (*peer, sibling.clone())));
            }
        }
        let by_clock: Vec<(usize, VectorClock)> = tagged.iter().map(|(tag, (_, s))| (*tag, s.clock.clone())).collect();
        let kept_tags: std::collections::HashSet<usize> = non_dominated(by_clock).into_iter().map(|(tag, _)| tag).collect();

        let mut winners: Vec<Sibling> = Vec::new();
        for (tag, (_, sibling)) in &tagged {
            if kept_tags.contains(tag) && !winners.iter().any(|w| w.value == sibling.value && w.clock == sibling.clock) {
                winners.push(sibling.clone());
            }
        }

        self.spawn_read_repair(key, &tagged, &kept_tags, &winners);

        Ok(winners)
    }

    fn spawn_read_repair(&self, key: &str, tagged: &[(usize, (NodeId, Sibling))], kept_tags: &std::collections::HashSet<usize>, winners: &[Sibling]) {
        for (tag, (peer, _)) in tagged {
            if kept_tags.contains(tag) {
                continue;
            }
            for winner in winners.to_vec() {
                let rpc = self.rpc.clone();
                let peer = *peer;
                let key = key.to_string();
                tokio::spawn(async move {
                    // Read-repair re-applies the winning sibling directly;
                    // `LocalStore::merge` on the receiving side will keep
                    // it only if it still isn't dominated there.
                    if let Err(err) = rpc.put(peer, &key, winner.value, winner.clock).await {
                        warn!(%peer, error = %err, "read repair failed");
                    }
                });
            }
        }
    }
}
