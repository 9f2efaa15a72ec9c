//! [`ManagedModeApi`] contains every endpoint of the supervisor <> node connection of a node
//! running in managed mode.

use alloy_eips::BlockNumHash;
use alloy_primitives::{B256, ChainId};
use jsonrpsee::{
    core::{RpcResult, SubscriptionResult},
    proc_macros::rpc,
};
use kona_interop::{
    BlockInfo, BlockSeal, DerivedRefPair, L2BlockInfo, ManagedEvent, OutputV0, Receipts,
};

/// Using the proc_macro to generate the client and server code.
/// Default namespace separator is `_`.
#[cfg_attr(not(feature = "client"), rpc(server, namespace = "interop"))]
#[cfg_attr(feature = "client", rpc(server, client, namespace = "interop"))]
pub trait ManagedModeApi {
    /// Subscribe to the events emitted by the node.
    #[subscription(name = "events", item = ManagedEvent, unsubscribe = "unsubscribeEvents")]
    async fn subscribe_events(&self) -> SubscriptionResult;

    /// Pops the next queued event, if any.
    ///
    /// Drains the same queue as the subscription.
    #[method(name = "pullEvent")]
    async fn pull_event(&self) -> RpcResult<Option<ManagedEvent>>;

    /// Promotes `id` to cross-unsafe.
    #[method(name = "updateCrossUnsafe")]
    async fn update_cross_unsafe(&self, id: BlockNumHash) -> RpcResult<()>;

    /// Promotes `derived` to cross-safe, derived from the L1 block `derived_from`.
    #[method(name = "updateCrossSafe")]
    async fn update_cross_safe(
        &self,
        derived: BlockNumHash,
        derived_from: BlockNumHash,
    ) -> RpcResult<()>;

    /// Promotes `id` to finalized.
    #[method(name = "updateFinalized")]
    async fn update_finalized(&self, id: BlockNumHash) -> RpcResult<()>;

    /// Invalidates the block sealed by `seal` and replaces it.
    #[method(name = "invalidateBlock")]
    async fn invalidate_block(&self, seal: BlockSeal) -> RpcResult<()>;

    /// Resets the node heads to the given targets.
    #[method(name = "reset")]
    async fn reset(
        &self,
        local_unsafe: BlockNumHash,
        cross_unsafe: BlockNumHash,
        local_safe: BlockNumHash,
        cross_safe: BlockNumHash,
        finalized: BlockNumHash,
    ) -> RpcResult<()>;

    /// Resets the node to its state before interop activation.
    #[method(name = "resetPreInterop")]
    async fn reset_pre_interop(&self) -> RpcResult<()>;

    /// Returns the genesis `(L1, L2)` pair interop starts from.
    #[method(name = "anchorPoint")]
    async fn anchor_point(&self) -> RpcResult<DerivedRefPair>;

    /// Hands the next L1 block to derive from to the node.
    #[method(name = "provideL1")]
    async fn provide_l1(&self, next_l1: BlockInfo) -> RpcResult<()>;

    /// Returns the receipts of the block with the given hash.
    #[method(name = "fetchReceipts")]
    async fn fetch_receipts(&self, block_hash: B256) -> RpcResult<Receipts>;

    /// Returns the chain id of the node.
    #[method(name = "chainID")]
    async fn chain_id(&self) -> RpcResult<ChainId>;

    /// Returns the canonical block at `number`.
    #[method(name = "blockRefByNumber")]
    async fn block_ref_by_number(&self, number: u64) -> RpcResult<BlockInfo>;

    /// Returns the L2 block at `timestamp`.
    #[method(name = "l2BlockRefByTimestamp")]
    async fn l2_block_ref_by_timestamp(&self, timestamp: u64) -> RpcResult<L2BlockInfo>;

    /// Returns the canonical output of the block at `timestamp`.
    #[method(name = "outputV0AtTimestamp")]
    async fn output_v0_at_timestamp(&self, timestamp: u64) -> RpcResult<OutputV0>;

    /// Returns the output at `timestamp` as it was before the block was invalidated.
    #[method(name = "pendingOutputV0AtTimestamp")]
    async fn pending_output_v0_at_timestamp(&self, timestamp: u64) -> RpcResult<OutputV0>;
}
