//! `LocalStore`: per-node key-value storage, sibling-set aware. Guarded
//! by per-key striped locks (spec §5) via `DashMap`'s internal sharding
//! rather than one global mutex.

use crate::model::{Sibling, SiblingSet, StoredValue};
use crate::vector_clock::{non_dominated, VectorClock};
use dashmap::DashMap;
use parking_lot::Mutex;

pub struct LocalStore {
    data: DashMap<String, Mutex<Vec<Sibling>>>,
}

impl LocalStore {
    pub fn new() -> Self {
        LocalStore { data: DashMap::new() }
    }

    /// Merge an incoming (value, clock) into the key's sibling set,
    /// discarding anything the new write strictly dominates and
    /// dropping the new write if it's itself dominated. Returns the
    /// resulting sibling set.
    pub fn merge(&self, key: &str, value: StoredValue, clock: VectorClock) -> Vec<Sibling> {
        let entry = self.data.entry(key.to_string()).or_insert_with(|| Mutex::new(Vec::new()));
        let mut siblings = entry.lock();
        let mut candidates: Vec<(StoredValue, VectorClock)> =
            siblings.iter().map(|s| (s.value.clone(), s.clock.clone())).collect();
        candidates.push((value, clock));
        let kept = non_dominated(candidates);
        *siblings = kept.into_iter().map(|(value, clock)| Sibling { value, clock }).collect();
        siblings.clone()
    }

    pub fn get(&self, key: &str) -> Vec<Sibling> {
        self.data.get(key).map(|e| e.lock().clone()).unwrap_or_default()
    }

    pub fn as_sibling_set(&self, key: &str) -> SiblingSet {
        SiblingSet { key: key.to_string(), siblings: self.get(key) }
    }
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use systems_common::NodeId;

    #[test]
    fn sequential_writes_from_same_lineage_replace_each_other() {
        let store = LocalStore::new();
        let node = NodeId::new();
        let mut c1 = VectorClock::new();
        c1.increment(node);
        store.merge("k", StoredValue::Value(b"a".to_vec()), c1.clone());

        let mut c2 = c1.clone();
        c2.increment(node);
        let result = store.merge("k", StoredValue::Value(b"b".to_vec()), c2);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].value, StoredValue::Value(b"b".to_vec()));
    }

    #[test]
    fn concurrent_writes_are_retained_as_siblings() {
        let store = LocalStore::new();
        let n1 = NodeId::new();
        let n2 = NodeId::new();
        let mut c1 = VectorClock::new();
        c1.increment(n1);
        let mut c2 = VectorClock::new();
        c2.increment(n2);

        store.merge("k", StoredValue::Value(b"a".to_vec()), c1);
        let result = store.merge("k", StoredValue::Value(b"b".to_vec()), c2);
        assert_eq!(result.len(), 2);
    }
}
