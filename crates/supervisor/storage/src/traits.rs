use crate::StorageError;
use alloy_eips::BlockNumHash;
use kona_interop::{BlockInfo, DerivedRefPair, SafetyLevel, SuperHead};

/// Read access to the derivation records of a chain: which L2 block was derived from which L1
/// block.
pub trait DerivationStorageReader {
    /// Gets the source [`BlockInfo`] for a given derived block [`BlockNumHash`].
    fn derived_to_source(&self, derived_block_id: BlockNumHash) -> Result<BlockInfo, StorageError>;

    /// Gets the latest recorded [`DerivedRefPair`].
    fn latest_derivation_state(&self) -> Result<DerivedRefPair, StorageError>;

    /// Checks whether `block` is recorded as local-safe.
    ///
    /// # Returns
    /// * `Ok(())` if exactly this block is recorded as local-safe.
    /// * `Err(StorageError::FutureData)` if the block is above the latest local-safe block.
    /// * `Err(StorageError::ConflictError)` if another block is recorded at that height.
    /// * Any other error if the lookup itself failed.
    fn is_local_safe(&self, block: BlockNumHash) -> Result<(), StorageError>;
}

/// Write access to the derivation records of a chain.
pub trait DerivationStorageWriter {
    /// Records that `pair.derived` was derived from `pair.source`.
    ///
    /// The derived block must extend the latest recorded derived block.
    fn save_derived_block(&self, pair: DerivedRefPair) -> Result<(), StorageError>;
}

/// Read access to the safety heads of a chain.
pub trait HeadRefStorageReader {
    /// Returns the head recorded at `safety_level`.
    fn get_safety_head_ref(&self, safety_level: SafetyLevel) -> Result<BlockInfo, StorageError>;

    /// Returns every head recorded for the chain.
    fn get_super_head(&self) -> Result<SuperHead, StorageError>;
}

/// Write access to the safety heads of a chain.
pub trait HeadRefStorageWriter {
    /// Moves the head at `safety_level` to `block`.
    fn update_safety_head_ref(
        &self,
        safety_level: SafetyLevel,
        block: &BlockInfo,
    ) -> Result<(), StorageError>;
}

/// Read access to the block log of a chain.
pub trait LogStorageReader {
    /// Returns the block recorded at `block_number`.
    fn get_block(&self, block_number: u64) -> Result<BlockInfo, StorageError>;

    /// Returns the latest recorded block.
    fn get_latest_block(&self) -> Result<BlockInfo, StorageError>;

    /// Returns the first block recorded after interop activation.
    ///
    /// Fails with [`StorageError::DatabaseNotInitialised`] until the log is initialised.
    fn get_activation_block(&self) -> Result<BlockInfo, StorageError>;
}

/// Write access to the block log of a chain.
pub trait LogStorageWriter {
    /// Initialises the log with the interop activation block.
    fn initialise_log_storage(&self, activation_block: BlockInfo) -> Result<(), StorageError>;

    /// Appends `block`, which must be the child of the latest recorded block.
    fn store_block(&self, block: &BlockInfo) -> Result<(), StorageError>;
}
