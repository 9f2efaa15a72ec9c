//! In-memory stores for exercising the managed-mode session.

use crate::{L1BlockStore, L2BlockStore, L2Payload, StoreError};
use alloy_eips::BlockNumHash;
use alloy_primitives::{B256, keccak256};
use async_trait::async_trait;
use kona_interop::{BlockInfo, L2BlockInfo, Receipts};
use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        RwLock,
        atomic::{AtomicBool, Ordering},
    },
};

const L1_TAG: u8 = 0x11;
const L2_TAG: u8 = 0x22;

/// Timestamp of L2 block 0 in the fixtures.
pub const GENESIS_L2_TIME: u64 = 1_000;

/// Seconds between two L2 blocks in the fixtures.
pub const BLOCK_TIME: u64 = 2;

fn fixture_hash(tag: u8, number: u64, fork: u8) -> B256 {
    let mut bytes = [0u8; 32];
    bytes[0] = tag;
    bytes[1] = fork;
    bytes[24..].copy_from_slice(&number.to_be_bytes());
    B256::from(bytes)
}

/// The L1 block at `number` on `fork`.
pub fn l1_block(number: u64, fork: u8) -> BlockInfo {
    let parent = number.checked_sub(1).map_or(B256::ZERO, |p| fixture_hash(L1_TAG, p, fork));
    BlockInfo::new(fixture_hash(L1_TAG, number, fork), number, parent, 900 + number * 12)
}

/// The L2 block at `number`, anchored to L1 block `origin` on `l1_fork`.
pub fn l2_block_on_fork(number: u64, origin: u64, l1_fork: u8) -> L2BlockInfo {
    let parent = number.checked_sub(1).map_or(B256::ZERO, |p| fixture_hash(L2_TAG, p, 0));
    L2BlockInfo::new(
        BlockInfo::new(
            fixture_hash(L2_TAG, number, 0),
            number,
            parent,
            GENESIS_L2_TIME + number * BLOCK_TIME,
        ),
        BlockNumHash { number: origin, hash: fixture_hash(L1_TAG, origin, l1_fork) },
        0,
    )
}

/// The canonical L2 block at `number`.
pub fn l2_block(number: u64) -> L2BlockInfo {
    l2_block_on_fork(number, number, 0)
}

/// A payload for `block` with roots derived from its hash and no transactions.
pub fn payload(block: L2BlockInfo) -> L2Payload {
    L2Payload {
        block,
        state_root: keccak256(block.hash()),
        message_passer_storage_root: keccak256(keccak256(block.hash())),
        transactions: Vec::new(),
    }
}

/// An in-memory [`L2BlockStore`].
#[derive(Debug, Default)]
pub struct InMemoryL2Store {
    payloads: RwLock<BTreeMap<u64, L2Payload>>,
    receipts: RwLock<HashMap<B256, Receipts>>,
    unavailable: AtomicBool,
    stalled_above: RwLock<Option<u64>>,
}

impl InMemoryL2Store {
    /// Creates a store holding the canonical blocks `0..=tip`.
    pub fn with_chain(tip: u64) -> Self {
        let store = Self::default();
        for number in 0..=tip {
            store.insert_block(l2_block(number));
        }
        store
    }

    /// Inserts `block` with a default payload, replacing the block at its height.
    pub fn insert_block(&self, block: L2BlockInfo) {
        self.insert_payload(payload(block));
    }

    /// Inserts `payload`, replacing the block at its height.
    pub fn insert_payload(&self, payload: L2Payload) {
        if let Ok(mut payloads) = self.payloads.write() {
            payloads.insert(payload.block.number(), payload);
        }
    }

    /// Sets the receipts of the block with the given hash.
    pub fn insert_receipts(&self, hash: B256, receipts: Receipts) {
        if let Ok(mut all) = self.receipts.write() {
            all.insert(hash, receipts);
        }
    }

    /// Makes every lookup fail with [`StoreError::Backend`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Makes lookups by number above `number` never complete. `None` lifts the stall.
    pub fn stall_above(&self, number: Option<u64>) {
        if let Ok(mut stalled_above) = self.stalled_above.write() {
            *stalled_above = number;
        }
    }

    async fn stall(&self, number: u64) {
        let stalled = self
            .stalled_above
            .read()
            .map(|stalled_above| stalled_above.is_some_and(|above| number > above))
            .unwrap_or(false);
        if stalled {
            std::future::pending::<()>().await;
        }
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("store unavailable".to_string()));
        }
        Ok(())
    }

    fn find<T>(&self, f: impl Fn(&BTreeMap<u64, L2Payload>) -> Option<T>) -> Result<T, StoreError> {
        self.check_available()?;
        let payloads =
            self.payloads.read().map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        f(&payloads).ok_or_else(|| StoreError::NotFound("L2 block".to_string()))
    }
}

#[async_trait]
impl L2BlockStore for InMemoryL2Store {
    async fn l2_block_ref_by_number(&self, number: u64) -> Result<L2BlockInfo, StoreError> {
        self.stall(number).await;
        self.find(|payloads| payloads.get(&number).map(|p| p.block))
    }

    async fn l2_block_ref_by_hash(&self, hash: B256) -> Result<L2BlockInfo, StoreError> {
        self.payload_by_hash(hash).await.map(|p| p.block)
    }

    async fn latest_unsafe(&self) -> Result<L2BlockInfo, StoreError> {
        self.find(|payloads| payloads.last_key_value().map(|(_, p)| p.block))
    }

    async fn receipts_by_hash(&self, hash: B256) -> Result<Receipts, StoreError> {
        self.check_available()?;
        let receipts =
            self.receipts.read().map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        receipts.get(&hash).cloned().ok_or_else(|| StoreError::NotFound(format!("receipts {hash}")))
    }

    async fn payload_by_hash(&self, hash: B256) -> Result<L2Payload, StoreError> {
        self.find(|payloads| payloads.values().find(|p| p.block.hash() == hash).cloned())
    }
}

/// An in-memory [`L1BlockStore`].
#[derive(Debug, Default)]
pub struct InMemoryL1Store {
    blocks: RwLock<BTreeMap<u64, BlockInfo>>,
}

impl InMemoryL1Store {
    /// Creates a store holding the canonical blocks `0..=tip`.
    pub fn with_chain(tip: u64) -> Self {
        let store = Self::default();
        for number in 0..=tip {
            store.insert(l1_block(number, 0));
        }
        store
    }

    /// Inserts `block` as canonical at its height.
    pub fn insert(&self, block: BlockInfo) {
        if let Ok(mut blocks) = self.blocks.write() {
            blocks.insert(block.number, block);
        }
    }

    /// Removes the block at `number`.
    pub fn remove(&self, number: u64) {
        if let Ok(mut blocks) = self.blocks.write() {
            blocks.remove(&number);
        }
    }

    fn find(&self, f: impl Fn(&BTreeMap<u64, BlockInfo>) -> Option<BlockInfo>) -> Result<BlockInfo, StoreError> {
        let blocks =
            self.blocks.read().map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        f(&blocks).ok_or_else(|| StoreError::NotFound("L1 block".to_string()))
    }
}

#[async_trait]
impl L1BlockStore for InMemoryL1Store {
    async fn l1_block_ref_by_number(&self, number: u64) -> Result<BlockInfo, StoreError> {
        self.find(|blocks| blocks.get(&number).copied())
    }

    async fn l1_block_ref_by_hash(&self, hash: B256) -> Result<BlockInfo, StoreError> {
        self.find(|blocks| blocks.values().find(|b| b.hash == hash).copied())
    }
}
