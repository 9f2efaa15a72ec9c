//! Errors of the managed-mode session and the stores it reads from.

use alloy_eips::BlockNumHash;
use alloy_primitives::B256;
use jsonrpsee::types::{ErrorObject, ErrorObjectOwned};
use kona_interop::{ResetOrderingError, SafetyLevel};
use kona_supervisor_rpc::ManagedModeErrorCode;
use thiserror::Error;

/// Failures of the node's block stores.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store has no such entry.
    #[error("not found: {0}")]
    NotFound(String),
    /// Any other store failure.
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Errors surfaced by the managed-mode session to the supervisor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManagedModeError {
    /// The requested block does not exist.
    #[error("block not found: {0}")]
    BlockNotFound(String),
    /// A block exists at the requested height, but with a different hash.
    #[error("conflicting block at #{number}: expected {expected}, found {actual}")]
    ConflictingBlock {
        /// Height of the block.
        number: u64,
        /// Hash the caller asked for.
        expected: B256,
        /// Hash the node has.
        actual: B256,
    },
    /// A reset target does not exist.
    #[error("{level} reset target #{} not found", block.number)]
    ResetTargetNotFound {
        /// The level of the target.
        level: SafetyLevel,
        /// The target.
        block: BlockNumHash,
    },
    /// A reset target conflicts with the node's canonical chain.
    #[error("{level} reset target #{number} conflicts: expected {expected}, found {actual}")]
    ResetTargetConflict {
        /// The level of the target.
        level: SafetyLevel,
        /// Height of the target.
        number: u64,
        /// Hash the supervisor asked for.
        expected: B256,
        /// Hash the node has.
        actual: B256,
    },
    /// A reset target could not be checked.
    #[error("failed to check {level} reset target: {reason}")]
    ResetTargetUnavailable {
        /// The level of the target.
        level: SafetyLevel,
        /// The store failure.
        reason: String,
    },
    /// Reset targets violate the safety ordering.
    #[error(transparent)]
    ResetOrdering(#[from] ResetOrderingError),
    /// Interop is not active.
    #[error("interop is not active")]
    InteropInactive,
    /// The request parameters are invalid.
    #[error("invalid params: {0}")]
    InvalidParams(String),
    /// The session is not accepting commands.
    #[error("managed mode is not running")]
    NotRunning,
    /// The request channel to the node's pipeline is closed.
    #[error("request channel closed")]
    ChannelClosed,
    /// The node's pipeline has not drained earlier requests yet.
    #[error("request queue full")]
    RequestQueueFull,
    /// A store lookup did not complete within the query timeout.
    #[error("timed out looking up {0}")]
    Timeout(String),
    /// Any other failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ManagedModeError {
    /// Returns the JSON-RPC error code reported for this error.
    pub const fn code(&self) -> ManagedModeErrorCode {
        match self {
            Self::BlockNotFound(_) | Self::ResetTargetNotFound { .. } => {
                ManagedModeErrorCode::BlockNotFound
            }
            Self::ConflictingBlock { .. } | Self::ResetTargetConflict { .. } => {
                ManagedModeErrorCode::ConflictingBlock
            }
            Self::InteropInactive => ManagedModeErrorCode::InteropInactive,
            Self::ResetOrdering(_) | Self::InvalidParams(_) => ManagedModeErrorCode::InvalidParams,
            Self::ResetTargetUnavailable { .. } |
            Self::NotRunning |
            Self::ChannelClosed |
            Self::RequestQueueFull |
            Self::Timeout(_) |
            Self::Internal(_) => ManagedModeErrorCode::InternalError,
        }
    }

    /// Maps a failed lookup of `what` to a session error.
    pub(crate) fn from_lookup(what: impl std::fmt::Display, err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => Self::BlockNotFound(what.to_string()),
            StoreError::Backend(reason) => Self::Internal(format!("{what}: {reason}")),
        }
    }
}

impl From<ManagedModeError> for ErrorObjectOwned {
    fn from(err: ManagedModeError) -> Self {
        ErrorObject::owned(err.code().code(), err.to_string(), None::<()>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::not_found(ManagedModeError::BlockNotFound("#4".to_string()), -39001)]
    #[case::target_conflict(
        ManagedModeError::ResetTargetConflict {
            level: SafetyLevel::CrossSafe,
            number: 4,
            expected: B256::ZERO,
            actual: B256::from([1u8; 32]),
        },
        -39002
    )]
    #[case::inactive(ManagedModeError::InteropInactive, -39003)]
    #[case::ordering(
        ManagedModeError::ResetOrdering(ResetOrderingError {
            lower: SafetyLevel::LocalSafe,
            lower_number: 9,
            higher: SafetyLevel::CrossUnsafe,
            higher_number: 8,
        }),
        -32602
    )]
    #[case::unavailable(
        ManagedModeError::ResetTargetUnavailable {
            level: SafetyLevel::Finalized,
            reason: "db closed".to_string(),
        },
        -32603
    )]
    #[case::timeout(ManagedModeError::Timeout("L2 block #7".to_string()), -32603)]
    #[case::queue_full(ManagedModeError::RequestQueueFull, -32603)]
    fn test_error_object_code(#[case] err: ManagedModeError, #[case] code: i32) {
        let object: ErrorObjectOwned = err.into();
        assert_eq!(object.code(), code);
    }

    #[test]
    fn test_reset_errors_name_the_level() {
        let err = ManagedModeError::ResetTargetNotFound {
            level: SafetyLevel::CrossUnsafe,
            block: BlockNumHash { number: 12, hash: B256::ZERO },
        };
        let object: ErrorObjectOwned = err.into();
        assert!(object.message().contains(&SafetyLevel::CrossUnsafe.to_string()));
        assert!(object.message().contains("#12"));
    }

    #[test]
    fn test_from_lookup() {
        let err = ManagedModeError::from_lookup("block #3", StoreError::NotFound("3".into()));
        assert_eq!(err, ManagedModeError::BlockNotFound("block #3".to_string()));

        let err = ManagedModeError::from_lookup("block #3", StoreError::Backend("io".into()));
        assert_eq!(err.code(), ManagedModeErrorCode::InternalError);
    }
}
