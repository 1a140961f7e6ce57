//! Error taxonomy for the Room core.

use systems_common::{CoreErrorKind, HasKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("room not found")]
    NotFound,

    #[error("room is full")]
    RoomFull,

    #[error("room is closed")]
    RoomClosed,

    #[error("incorrect password")]
    WrongPassword,

    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("player {0} is already in a room")]
    AlreadyInRoom(systems_common::PlayerId),

    #[error("player {0} is not in this room")]
    NotAPlayer(systems_common::PlayerId),

    #[error("only the host may perform this action")]
    NotHost,

    #[error("internal error: {0}")]
    Internal(String),
}

impl HasKind for RoomError {
    fn kind(&self) -> CoreErrorKind {
        match self {
            RoomError::InvalidArgument(_) => CoreErrorKind::InvalidArgument,
            RoomError::NotFound => CoreErrorKind::NotFound,
            RoomError::RoomFull => CoreErrorKind::Conflict,
            RoomError::RoomClosed => CoreErrorKind::RoomClosed,
            RoomError::WrongPassword => CoreErrorKind::InvalidArgument,
            RoomError::PreconditionFailed(_) => CoreErrorKind::PreconditionFailed,
            RoomError::AlreadyInRoom(_) => CoreErrorKind::AlreadyInRoom,
            RoomError::NotAPlayer(_) => CoreErrorKind::PreconditionFailed,
            RoomError::NotHost => CoreErrorKind::PreconditionFailed,
            RoomError::Internal(_) => CoreErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, RoomError>;
