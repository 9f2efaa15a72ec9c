//! Reset targets sent by the supervisor and the heads it tracks per chain.

use crate::{BlockInfo, SafetyLevel};
use alloy_eips::BlockNumHash;
use thiserror::Error;

/// The per-level block IDs a node is reset to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ResetTargets {
    /// Target of the local-unsafe head.
    pub local_unsafe: BlockNumHash,
    /// Target of the cross-unsafe head.
    pub cross_unsafe: BlockNumHash,
    /// Target of the local-safe head.
    pub local_safe: BlockNumHash,
    /// Target of the cross-safe head.
    pub cross_safe: BlockNumHash,
    /// Target of the finalized head.
    pub finalized: BlockNumHash,
}

/// A [`ResetTargets`] whose levels are out of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{lower} target #{lower_number} is ahead of {higher} target #{higher_number}")]
pub struct ResetOrderingError {
    /// The more confirmed level.
    pub lower: SafetyLevel,
    /// Block number targeted at `lower`.
    pub lower_number: u64,
    /// The less confirmed level.
    pub higher: SafetyLevel,
    /// Block number targeted at `higher`.
    pub higher_number: u64,
}

impl ResetTargets {
    /// Returns the target for `level`.
    pub const fn get(&self, level: SafetyLevel) -> BlockNumHash {
        match level {
            SafetyLevel::Finalized => self.finalized,
            SafetyLevel::CrossSafe => self.cross_safe,
            SafetyLevel::LocalSafe => self.local_safe,
            SafetyLevel::CrossUnsafe => self.cross_unsafe,
            SafetyLevel::LocalUnsafe => self.local_unsafe,
        }
    }

    /// Returns a mutable reference to the target for `level`.
    pub const fn get_mut(&mut self, level: SafetyLevel) -> &mut BlockNumHash {
        match level {
            SafetyLevel::Finalized => &mut self.finalized,
            SafetyLevel::CrossSafe => &mut self.cross_safe,
            SafetyLevel::LocalSafe => &mut self.local_safe,
            SafetyLevel::CrossUnsafe => &mut self.cross_unsafe,
            SafetyLevel::LocalUnsafe => &mut self.local_unsafe,
        }
    }

    /// Checks `finalized ≤ cross_safe ≤ local_safe ≤ cross_unsafe ≤ local_unsafe` by number.
    pub fn validate_ordering(&self) -> Result<(), ResetOrderingError> {
        for pair in SafetyLevel::ALL.windows(2) {
            let (lower, higher) = (pair[0], pair[1]);
            let (lower_number, higher_number) = (self.get(lower).number, self.get(higher).number);
            if lower_number > higher_number {
                return Err(ResetOrderingError { lower, lower_number, higher, higher_number });
            }
        }
        Ok(())
    }
}

/// The heads the supervisor has recorded for a chain.
///
/// A level is `None` until the supervisor has recorded anything for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct SuperHead {
    /// The latest local-unsafe block.
    pub local_unsafe: Option<BlockInfo>,
    /// The latest cross-unsafe block.
    pub cross_unsafe: Option<BlockInfo>,
    /// The latest local-safe block.
    pub local_safe: Option<BlockInfo>,
    /// The latest cross-safe block.
    pub cross_safe: Option<BlockInfo>,
    /// The latest finalized block.
    pub finalized: Option<BlockInfo>,
}

impl SuperHead {
    /// Returns the head recorded at `level`.
    pub const fn get(&self, level: SafetyLevel) -> Option<BlockInfo> {
        match level {
            SafetyLevel::Finalized => self.finalized,
            SafetyLevel::CrossSafe => self.cross_safe,
            SafetyLevel::LocalSafe => self.local_safe,
            SafetyLevel::CrossUnsafe => self.cross_unsafe,
            SafetyLevel::LocalUnsafe => self.local_unsafe,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;

    fn id(number: u64) -> BlockNumHash {
        BlockNumHash { number, hash: B256::from([number as u8; 32]) }
    }

    #[test]
    fn test_validate_ordering_accepts_equal_and_ascending() {
        let targets = ResetTargets {
            local_unsafe: id(10),
            cross_unsafe: id(8),
            local_safe: id(8),
            cross_safe: id(5),
            finalized: id(1),
        };
        assert!(targets.validate_ordering().is_ok());
    }

    #[test]
    fn test_validate_ordering_reports_offending_pair() {
        let targets = ResetTargets {
            local_unsafe: id(10),
            cross_unsafe: id(8),
            local_safe: id(9),
            cross_safe: id(5),
            finalized: id(1),
        };
        let err = targets.validate_ordering().unwrap_err();
        assert_eq!(err.lower, SafetyLevel::LocalSafe);
        assert_eq!(err.higher, SafetyLevel::CrossUnsafe);
        assert_eq!((err.lower_number, err.higher_number), (9, 8));
    }

    #[test]
    fn test_get_mut_targets_level() {
        let mut targets = ResetTargets::default();
        *targets.get_mut(SafetyLevel::CrossSafe) = id(3);
        assert_eq!(targets.cross_safe, id(3));
        assert_eq!(targets.get(SafetyLevel::CrossSafe), id(3));
    }
}
