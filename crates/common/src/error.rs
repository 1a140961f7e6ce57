//! Shared error taxonomy for the systems-core crates.
//!
//! Each core crate (counter, room, ratelimiter, kv) defines its own
//! `thiserror`-derived error enum with variants specific to that core's
//! vocabulary. What they share is the *classification* a caller-facing
//! transport (the `cli` crate's HTTP layer) needs in order to pick a
//! status code without knowing which core produced the error. That
//! classification is `CoreErrorKind`.

use std::fmt;

/// The logical error kinds from the specification's error-handling design.
///
/// These are not `source`-level error types; they are the normalized
/// classification every core error maps onto via `kind()`, so a single
/// transport-layer match arm can translate any core's error into the
/// right HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoreErrorKind {
    InvalidArgument,
    NotFound,
    Conflict,
    PreconditionFailed,
    Degraded,
    Unavailable,
    DeadlineExceeded,
    QuorumNotMet,
    RoomClosed,
    AlreadyInRoom,
    RateLimited,
    Internal,
}

impl CoreErrorKind {
    /// The HTTP status this kind maps onto, per the error-handling design.
    pub fn http_status(self) -> u16 {
        match self {
            CoreErrorKind::InvalidArgument => 400,
            CoreErrorKind::NotFound => 404,
            CoreErrorKind::Conflict => 409,
            CoreErrorKind::PreconditionFailed => 412,
            CoreErrorKind::RoomClosed => 409,
            CoreErrorKind::AlreadyInRoom => 409,
            CoreErrorKind::RateLimited => 429,
            CoreErrorKind::Degraded => 200,
            CoreErrorKind::Unavailable => 503,
            CoreErrorKind::QuorumNotMet => 503,
            CoreErrorKind::Internal => 500,
            CoreErrorKind::DeadlineExceeded => 504,
        }
    }
}

impl fmt::Display for CoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CoreErrorKind::InvalidArgument => "invalid-argument",
            CoreErrorKind::NotFound => "not-found",
            CoreErrorKind::Conflict => "conflict",
            CoreErrorKind::PreconditionFailed => "precondition-failed",
            CoreErrorKind::Degraded => "degraded",
            CoreErrorKind::Unavailable => "unavailable",
            CoreErrorKind::DeadlineExceeded => "deadline-exceeded",
            CoreErrorKind::QuorumNotMet => "quorum-not-met",
            CoreErrorKind::RoomClosed => "room-closed",
            CoreErrorKind::AlreadyInRoom => "already-in-room",
            CoreErrorKind::RateLimited => "rate-limited",
            CoreErrorKind::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// Implemented by every core's error enum so transport layers can classify
/// an error without matching on its concrete type.
pub trait HasKind {
    fn kind(&self) -> CoreErrorKind;
}
