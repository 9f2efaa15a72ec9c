use alloy_eips::BlockNumHash;
use kona_interop::{BlockInfo, BlockSeal};

/// Commands the supervisor sends to a managed node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagedNodeCommand {
    /// Promote a block to finalized.
    UpdateFinalized {
        /// Block ID of the finalized block.
        block_id: BlockNumHash,
    },

    /// Promote a block to cross-unsafe.
    UpdateCrossUnsafe {
        /// Block ID of the cross-unsafe block.
        block_id: BlockNumHash,
    },

    /// Promote a block to cross-safe.
    UpdateCrossSafe {
        /// L1 block the derived block was derived from.
        source_block_id: BlockNumHash,
        /// Block ID of the cross-safe block.
        derived_block_id: BlockNumHash,
    },

    /// Bring the node back in line with the supervisor.
    Reset {},

    /// Invalidate a block and have the node replace it.
    InvalidateBlock {
        /// [`BlockSeal`] of the block to invalidate.
        seal: BlockSeal,
    },

    /// Hand the next L1 block to derive from to the node.
    ProvideL1 {
        /// The next L1 block.
        block: BlockInfo,
    },
}
