//! On-the-wire/on-disk value representation (spec §4.4, §6): a stored
//! value is either a user payload or a delete tombstone, each paired
//! with the vector clock it was written under. Encoded with
//! `rmp-serde`, the teacher's serialization stack, generalized from
//! row/column payloads to KV sibling sets.

use crate::vector_clock::VectorClock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoredValue {
    Value(Vec<u8>),
    Tombstone,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sibling {
    pub value: StoredValue,
    pub clock: VectorClock,
}

/// The wire envelope for a `Get` response or a replicated `Put`/gossip
/// payload: a key and its full (already non-dominated) sibling set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiblingSet {
    pub key: String,
    pub siblings: Vec<Sibling>,
}

pub fn encode(set: &SiblingSet) -> Result<Vec<u8>, rmp_serde::encode::Error> {
    rmp_serde::to_vec(set)
}

pub fn decode(bytes: &[u8]) -> Result<SiblingSet, rmp_serde::decode::Error> {
    rmp_serde::from_slice(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use systems_common::NodeId;

    #[test]
    fn sibling_set_round_trips_through_rmp_serde() {
        let mut clock = VectorClock::new();
        clock.increment(NodeId::new());
        let set = SiblingSet {
            key: "x".into(),
            siblings: vec![Sibling { value: StoredValue::Value(b"hello".to_vec()), clock }],
        };
        let bytes = encode(&set).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.key, "x");
        assert_eq!(decoded.siblings.len(), 1);
    }
}
