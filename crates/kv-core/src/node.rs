//! `KvNode`: ties the ring, gossip membership, and replication
//! coordinator together behind the public `Put`/`Get`/`Delete` contract
//! (spec §4.4, §6). Ring rebuilds swap an `Arc<RingSnapshot>` so no
//! reader ever observes a half-built ring (spec §5).

use crate::coordinator::{ReplicationConfig, ReplicationCoordinator};
use crate::error::Result;
use crate::gossip::{Gossip, GossipConfig};
use crate::model::{Sibling, StoredValue};
use crate::ring::{RingSnapshot, DEFAULT_VIRTUAL_TOKENS};
use crate::rpc::PeerRpc;
use crate::store::LocalStore;
use crate::vector_clock::VectorClock;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use systems_common::{Clock, NodeId};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

pub struct KvNodeConfig {
    pub virtual_tokens: u32,
    pub replication: ReplicationConfig,
}

impl Default for KvNodeConfig {
    fn default() -> Self {
        KvNodeConfig {
            virtual_tokens: DEFAULT_VIRTUAL_TOKENS,
            replication: ReplicationConfig { n: 3, w: 2, r: 2, per_replica_timeout: Duration::from_millis(200) },
        }
    }
}

pub struct KvNode<R: PeerRpc + 'static, C: Clock> {
    id: NodeId,
    local: LocalStore,
    ring: RwLock<Arc<RingSnapshot>>,
    gossip: Arc<Gossip<C>>,
    rpc: Arc<R>,
    coordinator: ReplicationCoordinator<R>,
    config: KvNodeConfig,
    stop: Notify,
}

impl<R: PeerRpc + 'static, C: Clock> KvNode<R, C> {
    pub fn new(id: NodeId, members: &[NodeId], rpc: Arc<R>, clock: Arc<C>, config: KvNodeConfig) -> Result<Self> {
        let ring = RingSnapshot::build(members, config.virtual_tokens);
        let coordinator = ReplicationCoordinator::new(id, rpc.clone(), ReplicationConfig {
            n: config.replication.n,
            w: config.replication.w,
            r: config.replication.r,
            per_replica_timeout: config.replication.per_replica_timeout,
        })?;
        let gossip = Gossip::new(id, GossipConfig::default(), clock);
        for &member in members {
            gossip.add_member(member);
        }
        Ok(KvNode {
            id,
            local: LocalStore::new(),
            ring: RwLock::new(Arc::new(ring)),
            gossip: Arc::new(gossip),
            rpc,
            coordinator,
            config,
            stop: Notify::new(),
        })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn local_store(&self) -> &LocalStore {
        &self.local
    }

    pub fn gossip(&self) -> &Gossip<C> {
        &self.gossip
    }

    /// Start the gossip ticker and a ring-rebuild ticker that runs the
    /// same cadence (spec §4.4, §5): membership changes observed by
    /// gossip only take effect on the ring once this loop republishes a
    /// snapshot. Caller holds an `Arc<KvNode<..>>` and keeps the handles
    /// to await/abort on shutdown.
    pub fn spawn(self: &Arc<Self>) -> Vec<JoinHandle<()>>
    where
        C: 'static,
    {
        let gossip_handle = self.gossip.clone().spawn(self.rpc.clone());

        let node = self.clone();
        let period = self.gossip.config().heartbeat_period;
        let ring_handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => node.rebuild_ring_from_gossip(),
                    _ = node.stop.notified() => break,
                }
            }
        });

        vec![gossip_handle, ring_handle]
    }

    pub fn stop_background(&self) {
        self.gossip.stop();
        self.stop.notify_waiters();
    }

    /// Rebuild the ring from the gossip table's currently-alive members
    /// and atomically publish the new snapshot (spec §5): the new
    /// snapshot is built in full before the write-lock is taken, so the
    /// swap itself is the only moment readers are blocked and no reader
    /// ever observes a partially-built ring.
    pub fn rebuild_ring_from_gossip(&self) {
        let alive = self.gossip.alive_nodes();
        let next = Arc::new(RingSnapshot::build(&alive, self.config.virtual_tokens));
        *self.ring.write() = next;
    }

    fn current_ring(&self) -> Arc<RingSnapshot> {
        self.ring.read().clone()
    }

    pub async fn put(&self, key: &str, value: Vec<u8>, known_clock: Option<VectorClock>) -> Result<VectorClock> {
        let ring = self.current_ring();
        self.coordinator.put(&ring, key, StoredValue::Value(value), known_clock).await
    }

    pub async fn delete(&self, key: &str, known_clock: Option<VectorClock>) -> Result<VectorClock> {
        let ring = self.current_ring();
        self.coordinator.put(&ring, key, StoredValue::Tombstone, known_clock).await
    }

    /// Returns every non-dominated sibling (value + vector clock) for
    /// `key`; the caller decides how to reconcile concurrent versions
    /// (spec §4.4, §5).
    pub async fn get(&self, key: &str) -> Result<Vec<Sibling>> {
        let ring = self.current_ring();
        self.coordinator.get(&ring, key).await
    }
}
