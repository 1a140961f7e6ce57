//! Error taxonomy for the Counter core.

use systems_common::{CoreErrorKind, HasKind};
use thiserror::Error;

/// Error surfaced by an `AtomicStore` implementation. Opaque to the
/// facade beyond "it failed" — the health gate treats any `Err` here as
/// a probe failure, it never inspects the variant.
#[derive(Debug, Error)]
pub enum AtomicStoreError {
    #[error("atomic store unreachable: {0}")]
    Unreachable(String),
    #[error("atomic store operation failed: {0}")]
    Operation(String),
}

/// Error surfaced by a `DurableStore` implementation.
#[derive(Debug, Error)]
pub enum DurableStoreError {
    #[error("durable store unreachable: {0}")]
    Unreachable(String),
    #[error("durable store operation failed: {0}")]
    Operation(String),
}

/// Errors the `Counter` facade surfaces to its callers. Per spec §7,
/// every recoverable dependency failure (a single tier being down) is
/// handled internally via degradation; only total failure or a bad
/// argument reaches here.
#[derive(Debug, Error)]
pub enum CounterError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("both the fast and durable tiers are unavailable")]
    Unavailable,

    #[error("internal error: {0}")]
    Internal(String),
}

impl HasKind for CounterError {
    fn kind(&self) -> CoreErrorKind {
        match self {
            CounterError::InvalidArgument(_) => CoreErrorKind::InvalidArgument,
            CounterError::Unavailable => CoreErrorKind::Unavailable,
            CounterError::Internal(_) => CoreErrorKind::Internal,
        }
    }
}

impl From<AtomicStoreError> for CounterError {
    fn from(e: AtomicStoreError) -> Self {
        CounterError::Internal(e.to_string())
    }
}

impl From<DurableStoreError> for CounterError {
    fn from(e: DurableStoreError) -> Self {
        CounterError::Internal(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CounterError>;
