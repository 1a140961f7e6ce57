//! `PeerRpc`: the conceptual peer-to-peer boundary (spec §4.4, §6). The
//! coordinator and the gossip layer both go through this trait rather
//! than knowing about sockets, so multi-node behavior can be tested
//! in-process with [`testing::LoopbackRpc`].

use crate::error::Result;
use crate::gossip::NodeTable;
use crate::model::{Sibling, StoredValue};
use crate::vector_clock::VectorClock;
use async_trait::async_trait;
use systems_common::NodeId;

#[async_trait]
pub trait PeerRpc: Send + Sync {
    async fn put(&self, peer: NodeId, key: &str, value: StoredValue, clock: VectorClock) -> Result<VectorClock>;
    async fn get(&self, peer: NodeId, key: &str) -> Result<Vec<Sibling>>;
    async fn gossip_exchange(&self, peer: NodeId, table: NodeTable) -> Result<NodeTable>;
}

/// Routes calls directly between in-memory per-node stores, with no
/// real sockets — mirrors the teacher's in-process recovery test
/// harnesses for multi-node scenarios.
pub mod testing {
    use super::*;
    use crate::gossip::{Gossip, GossipConfig};
    use crate::store::LocalStore;
    use dashmap::DashMap;
    use std::sync::Arc;
    use systems_common::Clock;

    pub struct LoopbackNode<C: Clock> {
        pub store: LocalStore,
        pub gossip: Gossip<C>,
    }

    pub struct LoopbackRpc<C: Clock> {
        nodes: DashMap<NodeId, Arc<LoopbackNode<C>>>,
        unreachable: DashMap<NodeId, bool>,
    }

    impl<C: Clock> LoopbackRpc<C> {
        pub fn new() -> Self {
            LoopbackRpc { nodes: DashMap::new(), unreachable: DashMap::new() }
        }

        pub fn register_node(&self, id: NodeId, clock: Arc<C>) -> Arc<LoopbackNode<C>> {
            let node = Arc::new(LoopbackNode {
                store: LocalStore::new(),
                gossip: Gossip::new(id, GossipConfig::default(), clock),
            });
            self.nodes.insert(id, node.clone());
            node
        }

        pub fn node(&self, id: NodeId) -> Option<Arc<LoopbackNode<C>>> {
            self.nodes.get(&id).map(|n| n.clone())
        }

        /// Simulate a network partition: calls to/from this node fail
        /// until [`Self::heal`] is called for it.
        pub fn partition(&self, id: NodeId) {
            self.unreachable.insert(id, true);
        }

        pub fn heal(&self, id: NodeId) {
            self.unreachable.remove(&id);
        }

        fn check_reachable(&self, peer: NodeId) -> Result<()> {
            if self.unreachable.contains_key(&peer) {
                return Err(crate::error::KvError::PeerUnreachable(format!("{peer} is partitioned")));
            }
            Ok(())
        }
    }

    impl<C: Clock> Default for LoopbackRpc<C> {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl<C: Clock> PeerRpc for LoopbackRpc<C> {
        async fn put(&self, peer: NodeId, key: &str, value: StoredValue, clock: VectorClock) -> Result<VectorClock> {
            self.check_reachable(peer)?;
            let node = self.node(peer).ok_or_else(|| crate::error::KvError::Internal(format!("unknown peer {peer}")))?;
            node.store.merge(key, value, clock.clone());
            Ok(clock)
        }

        async fn get(&self, peer: NodeId, key: &str) -> Result<Vec<Sibling>> {
            self.check_reachable(peer)?;
            let node = self.node(peer).ok_or_else(|| crate::error::KvError::Internal(format!("unknown peer {peer}")))?;
            Ok(node.store.get(key))
        }

        async fn gossip_exchange(&self, peer: NodeId, table: NodeTable) -> Result<NodeTable> {
            self.check_reachable(peer)?;
            let node = self.node(peer).ok_or_else(|| crate::error::KvError::Internal(format!("unknown peer {peer}")))?;
            node.gossip.merge_table(&table);
            Ok(node.gossip.snapshot_table())
        }
    }
}
