use kona_supervisor_rpc::ManagedModeErrorCode;
use kona_supervisor_storage::StorageError;
use thiserror::Error;

/// Failures of a single call to the managed node.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The node does not know the requested block.
    #[error("block not found")]
    BlockNotFound,

    /// The node holds a different block at the requested height.
    #[error("conflicting block")]
    ConflictingBlock,

    /// Interop is not active on the node for the requested operation.
    #[error("interop not active")]
    InteropInactive,

    /// The node did not answer in time.
    #[error("request timed out")]
    Timeout,

    /// The JWT could not be produced or the auth header could not be built.
    #[error("failed to authenticate: {0}")]
    Authentication(String),

    /// Any other failure of the JSON-RPC client.
    #[error(transparent)]
    Rpc(jsonrpsee::core::ClientError),
}

impl From<jsonrpsee::core::ClientError> for ClientError {
    fn from(err: jsonrpsee::core::ClientError) -> Self {
        let jsonrpsee::core::ClientError::Call(ref call) = err else {
            return Self::Rpc(err);
        };
        match ManagedModeErrorCode::from_code(call.code()) {
            Some(ManagedModeErrorCode::BlockNotFound) => Self::BlockNotFound,
            Some(ManagedModeErrorCode::ConflictingBlock) => Self::ConflictingBlock,
            Some(ManagedModeErrorCode::InteropInactive) => Self::InteropInactive,
            _ => Self::Rpc(err),
        }
    }
}

/// Failures while managing a node.
#[derive(Debug, Error)]
pub enum ManagedNodeError {
    /// A call to the node failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The supervisor's own storage failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A newer reset superseded this one.
    #[error("reset cancelled")]
    ResetCancelled,

    /// The chain processor is no longer receiving events.
    #[error("failed to forward chain event")]
    ChannelSendFailed,

    /// The JWT secret could not be loaded.
    #[error("failed to load jwt secret: {0}")]
    Jwt(String),

    /// The event subscription ended.
    #[error("subscription closed")]
    SubscriptionClosed,
}
