//! Entity types for the Counter core (spec §3).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A counter's logical type. Purely descriptive metadata; the core does
/// not branch behaviour on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CounterType {
    Simple,
    Daily,
    Cumulative,
}

/// `(name, value, type, metadata, createdAt, updatedAt)` from spec §3.
///
/// This struct is the read-model returned to callers that want the full
/// entity rather than a bare `i64`; the hot path (`Increment`/`GetValue`)
/// never materializes it, it only touches the raw value in the fast or
/// durable tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counter {
    pub name: String,
    pub value: i64,
    pub counter_type: CounterType,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An operation recorded in the write queue while degraded (or on flush
/// failure), per spec §3's WriteQueue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueOp {
    Increment,
    Decrement,
    Reset,
}

/// `(id, counter, op, delta, actorId?, enqueuedAt, processedAt?)` from
/// spec §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteQueueEntry {
    pub id: Uuid,
    pub counter: String,
    pub op: QueueOp,
    pub delta: i64,
    pub actor_id: Option<String>,
    pub enqueued_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl WriteQueueEntry {
    pub fn new(counter: impl Into<String>, op: QueueOp, delta: i64, actor_id: Option<String>) -> Self {
        WriteQueueEntry {
            id: Uuid::new_v4(),
            counter: counter.into(),
            op,
            delta,
            actor_id,
            enqueued_at: Utc::now(),
            processed_at: None,
        }
    }

    pub fn is_processed(&self) -> bool {
        self.processed_at.is_some()
    }
}

/// `(counter, date, finalValue, uniqueSetSnapshot?, metadata, archivedAt)`
/// from spec §3, unique on `(counter, date)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterHistoryEntry {
    pub counter: String,
    pub date: NaiveDate,
    pub final_value: i64,
    pub unique_set_snapshot: Option<Vec<String>>,
    pub metadata: serde_json::Value,
    pub archived_at: DateTime<Utc>,
}

/// Outcome of a successful `Increment`/`Decrement`/`Reset` call. The
/// `degraded` flag is the side-channel warning from spec §7: a `true`
/// value here means the operation succeeded via the durable tier while
/// the fast tier was unavailable, never a failure. `deduped` is set when
/// an `actorId` had already contributed to the current day's uniqueness
/// set and the delta was therefore not applied (spec §4.1) — transports
/// that want to distinguish this from an ordinary successful increment
/// (e.g. the HTTP surface's 409) key off this flag rather than comparing
/// values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterOutcome {
    pub value: i64,
    pub degraded: bool,
    pub deduped: bool,
}

/// Key for a counter's current-day uniqueness set: `{counter}:users:{yyyymmdd}`.
pub fn uniqueness_set_key(counter: &str, date: NaiveDate) -> String {
    format!("{counter}:users:{}", date.format("%Y%m%d"))
}
