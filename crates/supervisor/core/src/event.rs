//! Events a managed node produces for the supervisor's chain processor.

use kona_interop::{BlockInfo, BlockReplacement, DerivedRefPair};

/// An event about a single chain, as seen by the supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainEvent {
    /// The node has a new local-unsafe block.
    UnsafeBlock {
        /// The new block.
        block: BlockInfo,
    },

    /// The node derived a new local-safe block.
    DerivedBlock {
        /// The derived block and its L1 source.
        derived_ref_pair: DerivedRefPair,
    },

    /// The node moved on to a new L1 origin.
    DerivationOriginUpdate {
        /// The new L1 origin.
        origin: BlockInfo,
    },

    /// The node ran out of L1 blocks to derive from.
    ExhaustedL1 {
        /// The last L1 block traversed and the last block derived from it.
        derived_ref_pair: DerivedRefPair,
    },

    /// The node replaced an invalidated block.
    BlockReplaced {
        /// The replacement and the hash of the block it replaced.
        replacement: BlockReplacement,
    },
}
