use alloy_eips::BlockNumHash;
use thiserror::Error;

/// Errors that may occur while interacting with supervisor storage.
///
/// This enum is used across all implementations of the storage traits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// The expected entry was not found in the database.
    #[error("entry not found: {0}")]
    EntryNotFound(String),

    /// A different block is recorded at the height of the queried block.
    #[error("conflicting block at #{}", .0.number)]
    ConflictError(BlockNumHash),

    /// The queried block is ahead of what has been recorded so far.
    #[error("block #{} is not yet known", .0.number)]
    FutureData(BlockNumHash),

    /// A block does not extend the latest recorded block.
    #[error("block out of order")]
    BlockOutOfOrder,

    /// Nothing has been recorded for the chain yet.
    #[error("database not initialised")]
    DatabaseNotInitialised,

    /// A lock guarding the database was poisoned.
    #[error("lock poisoned")]
    LockPoisoned,
}
