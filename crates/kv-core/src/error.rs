//! Error taxonomy for the distributed KV core.

use systems_common::{CoreErrorKind, HasKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KvError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("quorum not met: {acked}/{required} replicas acknowledged")]
    QuorumNotMet { acked: usize, required: usize },

    #[error("no alive nodes in the ring")]
    Unavailable,

    #[error("peer rpc failed: {0}")]
    PeerUnreachable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl HasKind for KvError {
    fn kind(&self) -> CoreErrorKind {
        match self {
            KvError::InvalidArgument(_) => CoreErrorKind::InvalidArgument,
            KvError::QuorumNotMet { .. } => CoreErrorKind::QuorumNotMet,
            KvError::Unavailable => CoreErrorKind::Unavailable,
            KvError::PeerUnreachable(_) => CoreErrorKind::Unavailable,
            KvError::Internal(_) => CoreErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, KvError>;
