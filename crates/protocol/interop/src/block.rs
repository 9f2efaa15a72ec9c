//! Block references shared by the node and the supervisor.

use alloy_eips::BlockNumHash;
use alloy_primitives::B256;
use core::fmt;

/// Block header info: the identity of a block plus the fields needed to order it causally.
///
/// Two [`BlockInfo`]s at the same height with different hashes are competing forks.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct BlockInfo {
    /// The block hash
    pub hash: B256,
    /// The block number
    #[cfg_attr(feature = "serde", serde(with = "alloy_serde::quantity"))]
    pub number: u64,
    /// The parent block hash
    pub parent_hash: B256,
    /// The block timestamp
    #[cfg_attr(feature = "serde", serde(with = "alloy_serde::quantity"))]
    pub timestamp: u64,
}

impl BlockInfo {
    /// Instantiates a new [`BlockInfo`].
    pub const fn new(hash: B256, number: u64, parent_hash: B256, timestamp: u64) -> Self {
        Self { hash, number, parent_hash, timestamp }
    }

    /// Returns the block ID.
    pub const fn id(&self) -> BlockNumHash {
        BlockNumHash { hash: self.hash, number: self.number }
    }

    /// Returns `true` if `self` is the direct parent of `child`.
    pub fn is_parent_of(&self, child: &Self) -> bool {
        self.number + 1 == child.number && self.hash == child.parent_hash
    }
}

impl From<BlockInfo> for BlockNumHash {
    fn from(block: BlockInfo) -> Self {
        block.id()
    }
}

impl fmt::Display for BlockInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BlockInfo {{ hash: {}, number: {}, parent_hash: {}, timestamp: {} }}",
            self.hash, self.number, self.parent_hash, self.timestamp
        )
    }
}

/// An L2 block reference, carrying the L1 block it was anchored to.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct L2BlockInfo {
    /// The base [`BlockInfo`]
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub block_info: BlockInfo,
    /// The L1 origin [`BlockNumHash`]
    #[cfg_attr(feature = "serde", serde(rename = "l1origin", alias = "l1Origin"))]
    pub l1_origin: BlockNumHash,
    /// The sequence number of the L2 block within its epoch
    #[cfg_attr(feature = "serde", serde(with = "alloy_serde::quantity", rename = "sequenceNumber"))]
    pub seq_num: u64,
}

impl L2BlockInfo {
    /// Instantiates a new [`L2BlockInfo`].
    pub const fn new(block_info: BlockInfo, l1_origin: BlockNumHash, seq_num: u64) -> Self {
        Self { block_info, l1_origin, seq_num }
    }

    /// Returns the block ID.
    pub const fn id(&self) -> BlockNumHash {
        self.block_info.id()
    }

    /// Returns the block number.
    pub const fn number(&self) -> u64 {
        self.block_info.number
    }

    /// Returns the block hash.
    pub const fn hash(&self) -> B256 {
        self.block_info.hash
    }

    /// Returns the block timestamp.
    pub const fn timestamp(&self) -> u64 {
        self.block_info.timestamp
    }
}

impl fmt::Display for L2BlockInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "L2BlockInfo {{ hash: {}, number: {}, l1_origin: {} }}",
            self.block_info.hash, self.block_info.number, self.l1_origin.number
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_info_id() {
        let block = BlockInfo::new(B256::from([1u8; 32]), 42, B256::ZERO, 100);
        assert_eq!(block.id(), BlockNumHash { hash: B256::from([1u8; 32]), number: 42 });
    }

    #[test]
    fn test_same_height_different_hash_is_disagreement() {
        let a = BlockInfo::new(B256::from([1u8; 32]), 7, B256::ZERO, 0);
        let b = BlockInfo::new(B256::from([2u8; 32]), 7, B256::ZERO, 0);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_is_parent_of() {
        let parent = BlockInfo::new(B256::from([1u8; 32]), 7, B256::ZERO, 0);
        let child = BlockInfo::new(B256::from([2u8; 32]), 8, parent.hash, 2);
        let orphan = BlockInfo::new(B256::from([3u8; 32]), 8, B256::from([9u8; 32]), 2);
        assert!(parent.is_parent_of(&child));
        assert!(!parent.is_parent_of(&orphan));
    }

    #[test]
    #[cfg(feature = "serde")]
    fn test_l2_block_info_serde() {
        let json = r#"{
            "hash": "0x0101010101010101010101010101010101010101010101010101010101010101",
            "number": "0x7c",
            "parentHash": "0x0202020202020202020202020202020202020202020202020202020202020202",
            "timestamp": "0x10",
            "l1origin": {
                "hash": "0x0303030303030303030303030303030303030303030303030303030303030303",
                "number": 10
            },
            "sequenceNumber": "0x2"
        }"#;

        let block: L2BlockInfo = serde_json::from_str(json).expect("valid l2 block info");
        assert_eq!(block.number(), 124);
        assert_eq!(block.timestamp(), 16);
        assert_eq!(block.l1_origin.number, 10);
        assert_eq!(block.seq_num, 2);
    }
}
