//! In-memory `AtomicStore`/`DurableStore` test doubles, mirroring the
//! teacher's in-process test harnesses (`strata-durability::testing`).
//! Not behind a feature flag — the crate's own test suite depends on
//! these, and they are cheap enough to ship unconditionally the way the
//! teacher ships its reference-model test support in `src/testing`.

use crate::error::{AtomicStoreError, DurableStoreError};
use crate::model::WriteQueueEntry;
use crate::traits::{AtomicStore, DurableStore};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// An in-memory `AtomicStore` that can be toggled unreachable, to drive
/// the `HealthGate` degradation scenarios in tests.
#[derive(Default)]
pub struct FakeAtomicStore {
    values: DashMap<String, i64>,
    sets: DashMap<String, HashSet<String>>,
    up: AtomicBool,
}

impl FakeAtomicStore {
    pub fn new() -> Arc<Self> {
        let s = FakeAtomicStore {
            values: DashMap::new(),
            sets: DashMap::new(),
            up: AtomicBool::new(true),
        };
        s.up.store(true, Ordering::SeqCst);
        Arc::new(s)
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.up.store(!unreachable, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), AtomicStoreError> {
        if self.up.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(AtomicStoreError::Unreachable("fake atomic store is down".into()))
        }
    }
}

#[async_trait]
impl AtomicStore for FakeAtomicStore {
    async fn increment_by(&self, name: &str, delta: i64) -> Result<i64, AtomicStoreError> {
        self.check()?;
        let mut entry = self.values.entry(name.to_string()).or_insert(0);
        *entry += delta;
        Ok(*entry)
    }

    async fn set(&self, name: &str, value: i64) -> Result<(), AtomicStoreError> {
        self.check()?;
        self.values.insert(name.to_string(), value);
        Ok(())
    }

    async fn read(&self, name: &str) -> Result<Option<i64>, AtomicStoreError> {
        self.check()?;
        Ok(self.values.get(name).map(|v| *v))
    }

    async fn exists(&self, name: &str) -> Result<bool, AtomicStoreError> {
        self.check()?;
        Ok(self.values.contains_key(name))
    }

    async fn add_to_set(&self, set_key: &str, member: &str) -> Result<bool, AtomicStoreError> {
        self.check()?;
        let mut set = self.sets.entry(set_key.to_string()).or_default();
        Ok(set.insert(member.to_string()))
    }

    async fn set_cardinality(&self, set_key: &str) -> Result<u64, AtomicStoreError> {
        self.check()?;
        Ok(self.sets.get(set_key).map(|s| s.len() as u64).unwrap_or(0))
    }

    async fn set_members(&self, set_key: &str) -> Result<Vec<String>, AtomicStoreError> {
        self.check()?;
        Ok(self
            .sets
            .get(set_key)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete_set(&self, set_key: &str) -> Result<(), AtomicStoreError> {
        self.check()?;
        self.sets.remove(set_key);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), AtomicStoreError> {
        self.check()
    }
}

#[derive(Default)]
struct DurableState {
    values: HashMap<String, i64>,
    queue: Vec<WriteQueueEntry>,
    history: HashMap<(String, NaiveDate), crate::model::CounterHistoryEntry>,
    uniqueness: HashSet<(String, NaiveDate)>,
}

/// An in-memory `DurableStore`. Never reports failure on its own —
/// degradation scenarios toggle `FakeAtomicStore`, not this type, since
/// spec §4.1's recovery path assumes the durable tier is the one still
/// standing.
pub struct FakeDurableStore {
    state: Mutex<DurableState>,
    batch_upsert_calls: std::sync::atomic::AtomicU64,
}

impl FakeDurableStore {
    pub fn new() -> Arc<Self> {
        Arc::new(FakeDurableStore {
            state: Mutex::new(DurableState::default()),
            batch_upsert_calls: std::sync::atomic::AtomicU64::new(0),
        })
    }

    pub fn value_of(&self, name: &str) -> i64 {
        *self.state.lock().values.get(name).unwrap_or(&0)
    }

    pub fn queue_len(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Number of `batch_upsert` transactions executed so far — used by
    /// tests asserting that the batcher coalesced many deltas into few
    /// durable writes.
    pub fn batch_upsert_calls(&self) -> u64 {
        self.batch_upsert_calls.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub fn history_for(&self, name: &str, date: NaiveDate) -> Option<crate::model::CounterHistoryEntry> {
        self.state.lock().history.get(&(name.to_string(), date)).cloned()
    }
}

#[async_trait]
impl DurableStore for FakeDurableStore {
    async fn apply_delta(&self, name: &str, delta: i64) -> Result<i64, DurableStoreError> {
        let mut state = self.state.lock();
        let entry = state.values.entry(name.to_string()).or_insert(0);
        *entry += delta;
        Ok(*entry)
    }

    async fn zero(&self, name: &str) -> Result<(), DurableStoreError> {
        self.state.lock().values.insert(name.to_string(), 0);
        Ok(())
    }

    async fn read(&self, name: &str) -> Result<i64, DurableStoreError> {
        Ok(*self.state.lock().values.get(name).unwrap_or(&0))
    }

    async fn batch_upsert(&self, deltas: &[(String, i64)]) -> Result<(), DurableStoreError> {
        let mut state = self.state.lock();
        for (name, delta) in deltas {
            *state.values.entry(name.clone()).or_insert(0) += delta;
        }
        drop(state);
        self.batch_upsert_calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }

    async fn enqueue_write(&self, entry: WriteQueueEntry) -> Result<(), DurableStoreError> {
        self.state.lock().queue.push(entry);
        Ok(())
    }

    async fn dequeue_unprocessed(&self, limit: usize) -> Result<Vec<WriteQueueEntry>, DurableStoreError> {
        Ok(self
            .state
            .lock()
            .queue
            .iter()
            .filter(|e| !e.is_processed())
            .take(limit)
            .cloned()
            .collect())
    }

    async fn mark_processed(&self, id: uuid::Uuid) -> Result<(), DurableStoreError> {
        let mut state = self.state.lock();
        if let Some(entry) = state.queue.iter_mut().find(|e| e.id == id) {
            entry.processed_at.get_or_insert(Utc::now());
        }
        Ok(())
    }

    async fn purge_processed_queue_before(&self, cutoff: DateTime<Utc>) -> Result<u64, DurableStoreError> {
        let mut state = self.state.lock();
        let before = state.queue.len();
        state
            .queue
            .retain(|e| !(e.is_processed() && e.processed_at.unwrap() < cutoff));
        Ok((before - state.queue.len()) as u64)
    }

    async fn archive(&self, entry: crate::model::CounterHistoryEntry) -> Result<(), DurableStoreError> {
        self.state
            .lock()
            .history
            .insert((entry.counter.clone(), entry.date), entry);
        Ok(())
    }

    async fn purge_history_before(&self, cutoff: NaiveDate) -> Result<u64, DurableStoreError> {
        let mut state = self.state.lock();
        let before = state.history.len();
        state.history.retain(|(_, date), _| *date >= cutoff);
        Ok((before - state.history.len()) as u64)
    }

    async fn delete_uniqueness_set(&self, counter: &str, date: NaiveDate) -> Result<(), DurableStoreError> {
        self.state.lock().uniqueness.remove(&(counter.to_string(), date));
        Ok(())
    }
}
