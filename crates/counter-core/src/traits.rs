//! External collaborator interfaces (spec §1: "the fast tier and durable
//! tier of the Counter Service are external"). The facade in `counter.rs`
//! depends only on these traits, never on a concrete backend, and is
//! constructed with `Arc<dyn AtomicStore>` / `Arc<dyn DurableStore>`.

use crate::error::{AtomicStoreError, DurableStoreError};
use crate::model::{CounterHistoryEntry, WriteQueueEntry};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

/// The fast tier: atomic integer arithmetic and small sets. Conceptually
/// a Redis-like service.
#[async_trait]
pub trait AtomicStore: Send + Sync {
    /// Atomically add `delta` (may be negative) to `name`, creating it at
    /// 0 first if absent, and return the new value.
    async fn increment_by(&self, name: &str, delta: i64) -> Result<i64, AtomicStoreError>;

    /// Atomically set `name` to `value`.
    async fn set(&self, name: &str, value: i64) -> Result<(), AtomicStoreError>;

    /// Read the current value, `None` if the counter has never been
    /// touched.
    async fn read(&self, name: &str) -> Result<Option<i64>, AtomicStoreError>;

    /// Whether `name` has ever been written.
    async fn exists(&self, name: &str) -> Result<bool, AtomicStoreError>;

    /// Add `member` to the set at `set_key`. Returns `true` if `member`
    /// was newly added, `false` if it was already present.
    async fn add_to_set(&self, set_key: &str, member: &str) -> Result<bool, AtomicStoreError>;

    /// Number of members in the set at `set_key`.
    async fn set_cardinality(&self, set_key: &str) -> Result<u64, AtomicStoreError>;

    /// All members of the set at `set_key`. Needed alongside
    /// `set_cardinality` because the reset scheduler's archive row
    /// carries a `uniqueSetSnapshot` (spec §3), not just a count.
    async fn set_members(&self, set_key: &str) -> Result<Vec<String>, AtomicStoreError>;

    /// Remove the set at `set_key` entirely.
    async fn delete_set(&self, set_key: &str) -> Result<(), AtomicStoreError>;

    /// Liveness probe used by the health gate. Must not have side
    /// effects on counter state.
    async fn health_check(&self) -> Result<(), AtomicStoreError>;
}

/// The durable tier: row-level updates and aggregates. Conceptually a
/// relational database.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// `UPDATE counters SET current_value = current_value + delta
    /// RETURNING current_value`, creating the row at 0 first if absent.
    async fn apply_delta(&self, name: &str, delta: i64) -> Result<i64, DurableStoreError>;

    /// Force a counter's value to 0.
    async fn zero(&self, name: &str) -> Result<(), DurableStoreError>;

    /// Read the current durable value, 0 if the counter has never been
    /// touched.
    async fn read(&self, name: &str) -> Result<i64, DurableStoreError>;

    /// Apply a batch of (counter, summed delta) pairs in a single
    /// transaction. All succeed or the whole batch fails.
    async fn batch_upsert(&self, deltas: &[(String, i64)]) -> Result<(), DurableStoreError>;

    /// Append an operation to the write queue.
    async fn enqueue_write(&self, entry: WriteQueueEntry) -> Result<(), DurableStoreError>;

    /// Fetch up to `limit` unprocessed entries, oldest first.
    async fn dequeue_unprocessed(&self, limit: usize) -> Result<Vec<WriteQueueEntry>, DurableStoreError>;

    /// Mark a queue entry processed. Idempotent: marking an
    /// already-processed entry again is a no-op.
    async fn mark_processed(&self, id: uuid::Uuid) -> Result<(), DurableStoreError>;

    /// Delete processed queue entries older than `cutoff`.
    async fn purge_processed_queue_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, DurableStoreError>;

    /// Upsert an archive row for `(counter, date)`, updating on conflict.
    async fn archive(&self, entry: CounterHistoryEntry) -> Result<(), DurableStoreError>;

    /// Delete archive rows strictly older than `cutoff`.
    async fn purge_history_before(&self, cutoff: NaiveDate) -> Result<u64, DurableStoreError>;

    /// Delete a counter's uniqueness set for `date` (best-effort; used
    /// during reset archival, not on the read/write hot path).
    async fn delete_uniqueness_set(&self, counter: &str, date: NaiveDate) -> Result<(), DurableStoreError>;
}
