//! Vector clocks (spec §4.4): a mapping from node id to a monotonically
//! increasing counter, with the standard happens-before partial order.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use systems_common::NodeId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct VectorClock(FxHashMap<NodeId, u64>);

/// The result of comparing two vector clocks under the partial order
/// `a ≤ b` iff `∀n: a[n] ≤ b[n]` (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ordering {
    Before,
    After,
    Equal,
    Concurrent,
}

impl VectorClock {
    pub fn new() -> Self {
        VectorClock::default()
    }

    pub fn get(&self, node: NodeId) -> u64 {
        self.0.get(&node).copied().unwrap_or(0)
    }

    pub fn increment(&mut self, node: NodeId) {
        *self.0.entry(node).or_insert(0) += 1;
    }

    pub fn merge(a: &VectorClock, b: &VectorClock) -> VectorClock {
        let mut merged = a.clone();
        for (&node, &count) in &b.0 {
            let entry = merged.0.entry(node).or_insert(0);
            *entry = (*entry).max(count);
        }
        merged
    }

    /// `a.compare(b)`: `Before` if `a < b`, `After` if `a > b`, `Equal`
    /// if identical, `Concurrent` otherwise.
    pub fn compare(&self, other: &VectorClock) -> Ordering {
        let mut self_less = false;
        let mut other_less = false;
        let nodes = self.0.keys().chain(other.0.keys());
        for &node in nodes {
            let a = self.get(node);
            let b = other.get(node);
            if a < b {
                self_less = true;
            } else if a > b {
                other_less = true;
            }
        }
        match (self_less, other_less) {
            (false, false) => Ordering::Equal,
            (true, false) => Ordering::Before,
            (false, true) => Ordering::After,
            (true, true) => Ordering::Concurrent,
        }
    }

    pub fn dominates(&self, other: &VectorClock) -> bool {
        matches!(self.compare(other), Ordering::After | Ordering::Equal)
    }

    pub fn is_concurrent_with(&self, other: &VectorClock) -> bool {
        matches!(self.compare(other), Ordering::Concurrent)
    }
}

/// Discards siblings that are strictly dominated by another sibling,
/// returning the pairwise-incomparable subset (spec §4.4, §8's
/// no-dominated-sibling invariant).
pub fn non_dominated<T: Clone>(siblings: Vec<(T, VectorClock)>) -> Vec<(T, VectorClock)> {
    let mut kept: Vec<(T, VectorClock)> = Vec::with_capacity(siblings.len());
    'outer: for (value, clock) in siblings {
        let mut i = 0;
        while i < kept.len() {
            let (_, ref kept_clock) = kept[i];
            match clock.compare(kept_clock) {
                Ordering::Before => continue 'outer,
                Ordering::Equal => continue 'outer,
                Ordering::After => {
                    kept.remove(i);
                    continue;
                }
                Ordering::Concurrent => {}
            }
            i += 1;
        }
        kept.push((value, clock));
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use systems_common::NodeId;

    #[test]
    fn increment_and_compare_before_after() {
        let n1 = NodeId::new();
        let mut a = VectorClock::new();
        a.increment(n1);
        let mut b = a.clone();
        b.increment(n1);
        assert_eq!(a.compare(&b), Ordering::Before);
        assert_eq!(b.compare(&a), Ordering::After);
    }

    #[test]
    fn independent_increments_are_concurrent() {
        let n1 = NodeId::new();
        let n2 = NodeId::new();
        let mut a = VectorClock::new();
        a.increment(n1);
        let mut b = VectorClock::new();
        b.increment(n2);
        assert_eq!(a.compare(&b), Ordering::Concurrent);
    }

    #[test]
    fn merge_takes_per_node_max() {
        let n1 = NodeId::new();
        let n2 = NodeId::new();
        let mut a = VectorClock::new();
        a.increment(n1);
        a.increment(n1);
        let mut b = VectorClock::new();
        b.increment(n2);
        let merged = VectorClock::merge(&a, &b);
        assert_eq!(merged.get(n1), 2);
        assert_eq!(merged.get(n2), 1);
    }

    #[test]
    fn non_dominated_drops_strictly_dominated_siblings() {
        let n1 = NodeId::new();
        let mut older = VectorClock::new();
        older.increment(n1);
        let mut newer = older.clone();
        newer.increment(n1);

        let kept = non_dominated(vec![("old", older), ("new", newer)]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].0, "new");
    }

    #[test]
    fn non_dominated_keeps_concurrent_siblings() {
        let n1 = NodeId::new();
        let n2 = NodeId::new();
        let mut a = VectorClock::new();
        a.increment(n1);
        let mut b = VectorClock::new();
        b.increment(n2);

        let kept = non_dominated(vec![("a", a), ("b", b)]);
        assert_eq!(kept.len(), 2);
    }
}
