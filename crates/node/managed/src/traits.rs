//! Stores the managed-mode session reads the node's chains from.

use crate::StoreError;
use alloy_primitives::{B256, Bytes};
use async_trait::async_trait;
use kona_interop::{BlockInfo, L2BlockInfo, OutputV0, Receipts};
use std::fmt::Debug;

/// A full L2 block as needed to compute outputs and build replacements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct L2Payload {
    /// The block reference.
    pub block: L2BlockInfo,
    /// The post-state root.
    pub state_root: B256,
    /// The storage root of the `L2ToL1MessagePasser` contract after the block.
    pub message_passer_storage_root: B256,
    /// The EIP-2718 encoded transactions, in block order.
    pub transactions: Vec<Bytes>,
}

impl L2Payload {
    /// Returns the [`OutputV0`] committing to this block.
    pub const fn output(&self) -> OutputV0 {
        OutputV0::new(self.state_root, self.message_passer_storage_root, self.block.hash())
    }
}

/// Read access to the node's L2 chain.
///
/// Lookups return [`StoreError::NotFound`] for unknown blocks and [`StoreError::Backend`] for
/// everything else.
#[async_trait]
pub trait L2BlockStore: Send + Sync + Debug {
    /// Returns the canonical L2 block at `number`.
    async fn l2_block_ref_by_number(&self, number: u64) -> Result<L2BlockInfo, StoreError>;

    /// Returns the L2 block with the given hash.
    async fn l2_block_ref_by_hash(&self, hash: B256) -> Result<L2BlockInfo, StoreError>;

    /// Returns the latest local-unsafe block.
    async fn latest_unsafe(&self) -> Result<L2BlockInfo, StoreError>;

    /// Returns the receipts of the block with the given hash.
    async fn receipts_by_hash(&self, hash: B256) -> Result<Receipts, StoreError>;

    /// Returns the full block with the given hash.
    async fn payload_by_hash(&self, hash: B256) -> Result<L2Payload, StoreError>;
}

/// Read access to the canonical L1 chain.
#[async_trait]
pub trait L1BlockStore: Send + Sync + Debug {
    /// Returns the canonical L1 block at `number`.
    async fn l1_block_ref_by_number(&self, number: u64) -> Result<BlockInfo, StoreError>;

    /// Returns the L1 block with the given hash.
    async fn l1_block_ref_by_hash(&self, hash: B256) -> Result<BlockInfo, StoreError>;
}
