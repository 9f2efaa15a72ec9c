//! Mocks of the collaborators used across the syncnode tests.

use crate::syncnode::{ClientError, ManagedNodeClient};
use alloy_eips::BlockNumHash;
use alloy_primitives::{B256, ChainId};
use async_trait::async_trait;
use jsonrpsee::core::client::Subscription;
use kona_interop::{
    BlockInfo, BlockSeal, DerivedRefPair, L2BlockInfo, ManagedEvent, OutputV0, Receipts,
    SafetyLevel, SuperHead,
};
use kona_supervisor_storage::{
    DerivationStorageReader, HeadRefStorageReader, LogStorageReader, StorageError,
};
use mockall::mock;

mock! {
    #[derive(Debug)]
    pub NodeClient {}

    #[async_trait]
    impl ManagedNodeClient for NodeClient {
        async fn chain_id(&self) -> Result<ChainId, ClientError>;
        async fn subscribe_events(&self) -> Result<Subscription<ManagedEvent>, ClientError>;
        async fn fetch_receipts(&self, block_hash: B256) -> Result<Receipts, ClientError>;
        async fn output_v0_at_timestamp(&self, timestamp: u64) -> Result<OutputV0, ClientError>;
        async fn pending_output_v0_at_timestamp(&self, timestamp: u64) -> Result<OutputV0, ClientError>;
        async fn l2_block_ref_by_timestamp(&self, timestamp: u64) -> Result<L2BlockInfo, ClientError>;
        async fn block_ref_by_number(&self, block_number: u64) -> Result<BlockInfo, ClientError>;
        async fn anchor_point(&self) -> Result<DerivedRefPair, ClientError>;
        async fn reset_pre_interop(&self) -> Result<(), ClientError>;
        async fn reset(
            &self,
            unsafe_id: BlockNumHash,
            cross_unsafe_id: BlockNumHash,
            local_safe_id: BlockNumHash,
            cross_safe_id: BlockNumHash,
            finalised_id: BlockNumHash,
        ) -> Result<(), ClientError>;
        async fn invalidate_block(&self, seal: BlockSeal) -> Result<(), ClientError>;
        async fn provide_l1(&self, block_info: BlockInfo) -> Result<(), ClientError>;
        async fn update_finalized(&self, finalized_block_id: BlockNumHash) -> Result<(), ClientError>;
        async fn update_cross_unsafe(&self, cross_unsafe_block_id: BlockNumHash) -> Result<(), ClientError>;
        async fn update_cross_safe(&self, source_block_id: BlockNumHash, derived_block_id: BlockNumHash) -> Result<(), ClientError>;
        async fn reset_ws_client(&self);
    }
}

mock! {
    #[derive(Debug)]
    pub Db {}

    impl DerivationStorageReader for Db {
        fn derived_to_source(&self, derived_block_id: BlockNumHash) -> Result<BlockInfo, StorageError>;
        fn latest_derivation_state(&self) -> Result<DerivedRefPair, StorageError>;
        fn is_local_safe(&self, block: BlockNumHash) -> Result<(), StorageError>;
    }

    impl HeadRefStorageReader for Db {
        fn get_safety_head_ref(&self, safety_level: SafetyLevel) -> Result<BlockInfo, StorageError>;
        fn get_super_head(&self) -> Result<SuperHead, StorageError>;
    }

    impl LogStorageReader for Db {
        fn get_block(&self, block_number: u64) -> Result<BlockInfo, StorageError>;
        fn get_latest_block(&self) -> Result<BlockInfo, StorageError>;
        fn get_activation_block(&self) -> Result<BlockInfo, StorageError>;
    }
}

/// Block `number` of the supervisor's view of the chain.
pub(crate) fn supervisor_block(number: u64) -> BlockInfo {
    BlockInfo::new(
        block_hash(0x01, number),
        number,
        if number == 0 { B256::ZERO } else { block_hash(0x01, number - 1) },
        1_000 + number * 2,
    )
}

/// Block `number` of a node whose chain diverges from the supervisor's at `divergence`.
pub(crate) fn node_block(number: u64, divergence: u64) -> BlockInfo {
    if number < divergence {
        return supervisor_block(number);
    }
    let parent = match number {
        0 => B256::ZERO,
        n if n == divergence => supervisor_block(n - 1).hash,
        n => block_hash(0x02, n - 1),
    };
    BlockInfo::new(block_hash(0x02, number), number, parent, 1_000 + number * 2)
}

fn block_hash(fork: u8, number: u64) -> B256 {
    let mut hash = B256::ZERO;
    hash[0] = fork;
    hash[24..].copy_from_slice(&number.to_be_bytes());
    hash
}
