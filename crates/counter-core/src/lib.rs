//! Two-tier counter store: a fast in-memory tier backed by a durable
//! tier, write batching, uniqueness tracking, graceful degradation,
//! recovery after an outage, and scheduled reset/archival (spec §4.1).
//!
//! The fast tier (`AtomicStore`) and durable tier (`DurableStore`) are
//! external collaborators — this crate defines the trait boundary and
//! composes everything above it. See [`testing`] for in-memory fakes
//! suitable for exercising degradation and recovery without a real
//! Redis/Postgres.

pub mod batcher;
pub mod config;
pub mod counter;
pub mod error;
pub mod health;
pub mod model;
pub mod queue;
pub mod scheduler;
pub mod testing;
pub mod traits;

pub use config::CounterConfig;
pub use counter::Counter;
pub use error::{CounterError, Result};
pub use model::{Counter as CounterEntity, CounterHistoryEntry, CounterOutcome, CounterType, QueueOp, WriteQueueEntry};
pub use traits::{AtomicStore, DurableStore};
