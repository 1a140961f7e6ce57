//! Distributed key-value core (spec §4.4): consistent hashing with
//! virtual nodes, vector-clock versioning with sibling reconciliation,
//! gossip membership/failure detection, and tunable quorum read/write
//! with asynchronous read-repair.
//!
//! The four building blocks compose bottom-up: [`vector_clock`] and
//! [`store`] are leaves; [`ring`] and [`gossip`] track membership;
//! [`coordinator`] fans reads/writes out over the ring using [`rpc`];
//! [`node`] ties a single node's pieces together behind the public
//! `Put`/`Get`/`Delete` contract.

pub mod coordinator;
pub mod error;
pub mod gossip;
pub mod model;
pub mod node;
pub mod ring;
pub mod rpc;
pub mod store;
pub mod vector_clock;

pub use coordinator::{ReplicationConfig, ReplicationCoordinator};
pub use error::{KvError, Result};
pub use gossip::{Gossip, GossipConfig, MemberState, NodeTable};
pub use model::{Sibling, SiblingSet, StoredValue};
pub use node::{KvNode, KvNodeConfig};
pub use ring::{RingSnapshot, DEFAULT_VIRTUAL_TOKENS};
pub use rpc::PeerRpc;
pub use store::LocalStore;
pub use vector_clock::{non_dominated, Ordering, VectorClock};
