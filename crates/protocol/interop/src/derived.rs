//! Block pairs and seals exchanged between the node and the supervisor.

use crate::BlockInfo;
use alloy_eips::BlockNumHash;
use alloy_primitives::B256;
use derive_more::Constructor;

/// A derived block together with the L1 block it was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Constructor)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct DerivedRefPair {
    /// The L1 source block.
    pub source: BlockInfo,
    /// The derived L2 block.
    pub derived: BlockInfo,
}

/// Replacement of an invalidated block by a deposit-only block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Constructor)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct BlockReplacement {
    /// The block that took the place of the invalidated one.
    pub replacement: BlockInfo,
    /// Hash of the invalidated block.
    pub invalidated: B256,
}

/// A sealed block: its identity plus its timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Constructor)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct BlockSeal {
    /// The block's hash
    pub hash: B256,
    /// The block number
    #[cfg_attr(feature = "serde", serde(with = "alloy_serde::quantity"))]
    pub number: u64,
    /// The block's timestamp
    #[cfg_attr(feature = "serde", serde(with = "alloy_serde::quantity"))]
    pub timestamp: u64,
}

impl BlockSeal {
    /// Returns the block ID.
    pub const fn id(&self) -> BlockNumHash {
        BlockNumHash { hash: self.hash, number: self.number }
    }
}

impl From<BlockInfo> for BlockSeal {
    fn from(block: BlockInfo) -> Self {
        Self { hash: block.hash, number: block.number, timestamp: block.timestamp }
    }
}
