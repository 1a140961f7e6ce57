//! `ConsistentRing` (spec §4.4): a sorted sequence of virtual-token
//! hashes mapping to physical nodes. Rebuilds happen by constructing a
//! fresh immutable snapshot and atomically swapping a pointer, so
//! readers never observe a partially-built ring (spec §5).

use rustc_hash::FxHashMap;
use std::hash::{Hash, Hasher};
use systems_common::NodeId;

pub const DEFAULT_VIRTUAL_TOKENS: u32 = 150;

#[derive(Clone)]
struct Token {
    hash: u64,
    node: NodeId,
}

/// An immutable ring snapshot. Readers hold an `Arc<RingSnapshot>`
/// obtained from [`RingHandle::current`]; a membership change builds a
/// brand new snapshot rather than mutating this one.
pub struct RingSnapshot {
    tokens: Vec<Token>,
    alive: FxHashMap<NodeId, bool>,
}

fn hash_u64(data: &[u8]) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    let mut hasher = DefaultHasher::new();
    data.hash(&mut hasher);
    hasher.finish()
}

impl RingSnapshot {
    pub fn build(nodes: &[NodeId], virtual_tokens: u32) -> Self {
        let mut tokens = Vec::with_capacity(nodes.len() * virtual_tokens as usize);
        for &node in nodes {
            for v in 0..virtual_tokens {
                let key = format!("{node}-{v}");
                tokens.push(Token { hash: hash_u64(key.as_bytes()), node });
            }
        }
        tokens.sort_by_key(|t| t.hash);
        let alive = nodes.iter().map(|&n| (n, true)).collect();
        RingSnapshot { tokens, alive }
    }

    pub fn mark_dead(&mut self, node: NodeId) {
        self.alive.insert(node, false);
    }

    pub fn mark_alive(&mut self, node: NodeId) {
        self.alive.insert(node, true);
    }

    fn is_alive(&self, node: NodeId) -> bool {
        self.alive.get(&node).copied().unwrap_or(false)
    }

    /// Walk clockwise from `key`'s hash position, collecting the next
    /// `n` *distinct* physical nodes considered alive, as the
    /// preference list (spec §4.4).
    pub fn preference_list(&self, key: &str, n: usize) -> Vec<NodeId> {
        if self.tokens.is_empty() {
            return Vec::new();
        }
        let key_hash = hash_u64(key.as_bytes());
        let start = self.tokens.partition_point(|t| t.hash < key_hash);

        let mut out = Vec::with_capacity(n);
        for i in 0..self.tokens.len() {
            let token = &self.tokens[(start + i) % self.tokens.len()];
            if !self.is_alive(token.node) {
                continue;
            }
            if !out.contains(&token.node) {
                out.push(token.node);
            }
            if out.len() == n {
                break;
            }
        }
        out
    }

    pub fn alive_count(&self) -> usize {
        self.alive.values().filter(|&&a| a).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preference_list_returns_distinct_alive_nodes() {
        let nodes: Vec<NodeId> = (0..3).map(|_| NodeId::new()).collect();
        let ring = RingSnapshot::build(&nodes, DEFAULT_VIRTUAL_TOKENS);
        let prefs = ring.preference_list("some-key", 3);
        assert_eq!(prefs.len(), 3);
        let mut unique = prefs.clone();
        unique.sort_by_key(|n| n.0);
        unique.dedup();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn dead_nodes_are_excluded_from_preference_list() {
        let nodes: Vec<NodeId> = (0..3).map(|_| NodeId::new()).collect();
        let mut ring = RingSnapshot::build(&nodes, DEFAULT_VIRTUAL_TOKENS);
        ring.mark_dead(nodes[0]);
        let prefs = ring.preference_list("some-key", 3);
        assert_eq!(prefs.len(), 2);
        assert!(!prefs.contains(&nodes[0]));
    }

    /// spec §8 scenario 7: adding a 4th node to a 3-node ring moves
    /// roughly 1/(N+1) of keys' preference-list heads.
    #[test]
    fn ring_elasticity_on_node_addition() {
        let nodes: Vec<NodeId> = (0..3).map(|_| NodeId::new()).collect();
        let before = RingSnapshot::build(&nodes, DEFAULT_VIRTUAL_TOKENS);

        let mut with_fourth = nodes.clone();
        with_fourth.push(NodeId::new());
        let after = RingSnapshot::build(&with_fourth, DEFAULT_VIRTUAL_TOKENS);

        let sample = 10_000;
        let mut moved = 0;
        for i in 0..sample {
            let key = format!("key-{i}");
            let head_before = before.preference_list(&key, 1)[0];
            let head_after = after.preference_list(&key, 1)[0];
            if head_before != head_after {
                moved += 1;
            }
        }
        let fraction = moved as f64 / sample as f64;
        assert!((0.15..=0.35).contains(&fraction), "fraction moved was {fraction}");
    }
}
