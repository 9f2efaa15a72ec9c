//! Roles a managed node plays for the supervisor.

use crate::syncnode::ManagedNodeError;
use alloy_eips::BlockNumHash;
use async_trait::async_trait;
use kona_interop::{BlockInfo, BlockReplacement, BlockSeal, DerivedRefPair};
use std::fmt::Debug;

/// Drives the safety heads of a managed node.
#[async_trait]
pub trait ManagedNodeController: Send + Sync + Debug {
    /// Promotes `finalized_block_id` to finalized on the node.
    async fn update_finalized(&self, finalized_block_id: BlockNumHash)
    -> Result<(), ManagedNodeError>;

    /// Promotes `cross_unsafe_block_id` to cross-unsafe on the node.
    async fn update_cross_unsafe(
        &self,
        cross_unsafe_block_id: BlockNumHash,
    ) -> Result<(), ManagedNodeError>;

    /// Promotes `derived_block_id`, derived from `source_block_id`, to cross-safe on the node.
    async fn update_cross_safe(
        &self,
        source_block_id: BlockNumHash,
        derived_block_id: BlockNumHash,
    ) -> Result<(), ManagedNodeError>;

    /// Resets the node to the latest point it agrees on with the supervisor.
    async fn reset(&self) -> Result<(), ManagedNodeError>;

    /// Invalidates the block sealed by `seal`.
    async fn invalidate_block(&self, seal: BlockSeal) -> Result<(), ManagedNodeError>;

    /// Hands the next L1 block to derive from to the node.
    async fn provide_l1(&self, block: BlockInfo) -> Result<(), ManagedNodeError>;
}

/// Handles the events a managed node emits.
#[async_trait]
pub trait SubscriptionHandler: Send + Sync + Debug {
    /// The node asks to be reset.
    async fn handle_reset(&self, reason: &str) -> Result<(), ManagedNodeError>;

    /// The node has a new local-unsafe block.
    async fn handle_unsafe_block(&self, block: &BlockInfo) -> Result<(), ManagedNodeError>;

    /// The node derived a new local-safe block.
    async fn handle_derivation_update(
        &self,
        derived_ref_pair: &DerivedRefPair,
    ) -> Result<(), ManagedNodeError>;

    /// The node moved on to a new L1 origin.
    async fn handle_derivation_origin_update(
        &self,
        origin: &BlockInfo,
    ) -> Result<(), ManagedNodeError>;

    /// The node ran out of L1 data.
    async fn handle_exhaust_l1(
        &self,
        derived_ref_pair: &DerivedRefPair,
    ) -> Result<(), ManagedNodeError>;

    /// The node replaced an invalidated block.
    async fn handle_replace_block(
        &self,
        replacement: &BlockReplacement,
    ) -> Result<(), ManagedNodeError>;
}
