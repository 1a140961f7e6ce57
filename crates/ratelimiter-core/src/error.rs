//! Error taxonomy for the rate limiter core. Decider errors are never
//! surfaced to callers directly — §4.3's fail-open rule means a decider
//! error is converted to `allow=true` plus a logged warning before it
//! ever reaches a `MultiDimension` caller. This type exists for the
//! `SharedStore` boundary and for tests that want to assert on it.

use systems_common::{CoreErrorKind, HasKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LimiterError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("shared store unreachable: {0}")]
    StoreUnavailable(String),

    #[error("evaluation deadline exceeded")]
    DeadlineExceeded,
}

impl HasKind for LimiterError {
    fn kind(&self) -> CoreErrorKind {
        match self {
            LimiterError::InvalidArgument(_) => CoreErrorKind::InvalidArgument,
            LimiterError::StoreUnavailable(_) => CoreErrorKind::Unavailable,
            LimiterError::DeadlineExceeded => CoreErrorKind::DeadlineExceeded,
        }
    }
}

pub type Result<T> = std::result::Result<T, LimiterError>;
