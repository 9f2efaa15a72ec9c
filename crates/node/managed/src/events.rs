//! Events exchanged between the managed-mode session and the node's pipeline.

use alloy_eips::BlockNumHash;
use alloy_primitives::{B256, Bytes};
use kona_interop::{BlockInfo, L2BlockInfo, ManagedEvent};

/// Progress reported by the node's pipeline to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteropLifecycleEvent {
    /// The pipeline needs the supervisor to reset it.
    Reset {
        /// Why the reset is needed.
        reason: String,
    },
    /// A new local-unsafe block.
    UnsafeUpdate {
        /// The block.
        block: L2BlockInfo,
    },
    /// A new local-safe block.
    LocalSafeUpdate {
        /// The L1 block it was derived from.
        source: BlockInfo,
        /// The derived block.
        derived: L2BlockInfo,
    },
    /// Derivation moved to a new L1 origin.
    L1Traversal {
        /// The new L1 origin.
        origin: BlockInfo,
        /// The last derived L2 block.
        last_l2: L2BlockInfo,
    },
    /// Derivation ran out of L1 blocks.
    ExhaustedL1 {
        /// The last L1 block traversed.
        l1: BlockInfo,
        /// The last derived L2 block.
        last_l2: L2BlockInfo,
    },
    /// An invalidated block was replaced.
    BlockReplaced {
        /// The replacement block.
        replacement: L2BlockInfo,
        /// Hash of the invalidated block.
        invalidated: B256,
    },
    /// The pipeline applied a requested reset.
    ResetConfirmed,
}

impl InteropLifecycleEvent {
    /// Returns the L2 block the event is about, if any.
    pub const fn l2_block(&self) -> Option<&L2BlockInfo> {
        match self {
            Self::Reset { .. } | Self::ResetConfirmed => None,
            Self::UnsafeUpdate { block } => Some(block),
            Self::LocalSafeUpdate { derived, .. } => Some(derived),
            Self::L1Traversal { last_l2, .. } | Self::ExhaustedL1 { last_l2, .. } => Some(last_l2),
            Self::BlockReplaced { replacement, .. } => Some(replacement),
        }
    }

    /// Translates the event into the [`ManagedEvent`] sent to the supervisor.
    ///
    /// Returns `None` for events that stay local to the node.
    pub fn to_managed_event(&self) -> Option<ManagedEvent> {
        let event = match self {
            Self::Reset { reason } => ManagedEvent::Reset(reason.clone()),
            Self::UnsafeUpdate { block } => ManagedEvent::UnsafeBlockUpdate(block.block_info),
            Self::LocalSafeUpdate { source, derived } => ManagedEvent::DerivationUpdate {
                source: *source,
                derived: derived.block_info,
                is_l1_origin_advance: false,
            },
            Self::L1Traversal { origin, last_l2 } => ManagedEvent::DerivationUpdate {
                source: *origin,
                derived: last_l2.block_info,
                is_l1_origin_advance: true,
            },
            Self::ExhaustedL1 { l1, last_l2 } => {
                ManagedEvent::ExhaustedL1 { source: *l1, derived: last_l2.block_info }
            }
            Self::BlockReplaced { replacement, invalidated } => ManagedEvent::BlockReplacement {
                replacement: replacement.block_info,
                invalidated: *invalidated,
            },
            Self::ResetConfirmed => return None,
        };
        Some(event)
    }
}

/// The block to build in place of an invalidated one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacementBlock {
    /// The block being replaced.
    pub invalidated: BlockNumHash,
    /// Parent of both blocks.
    pub parent: BlockNumHash,
    /// Timestamp of both blocks.
    pub timestamp: u64,
    /// The transactions of the replacement.
    pub transactions: Vec<Bytes>,
}

/// Work the session hands to the node's pipeline.
///
/// Requests are fire-and-forget; completion is reported back as an [`InteropLifecycleEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteropRequest {
    /// Promote a block to cross-unsafe.
    PromoteCrossUnsafe {
        /// The block.
        block: L2BlockInfo,
    },
    /// Promote a block to cross-safe.
    PromoteSafe {
        /// The L1 block it was derived from.
        source: BlockInfo,
        /// The derived block.
        derived: L2BlockInfo,
    },
    /// Promote a block to finalized.
    PromoteFinalized {
        /// The block.
        block: L2BlockInfo,
    },
    /// Rewind every head to the given blocks.
    ForceReset {
        /// New local-unsafe head.
        local_unsafe: L2BlockInfo,
        /// New cross-unsafe head.
        cross_unsafe: L2BlockInfo,
        /// New local-safe head.
        local_safe: L2BlockInfo,
        /// New cross-safe head.
        cross_safe: L2BlockInfo,
        /// New finalized head.
        finalized: L2BlockInfo,
    },
    /// Reset the engine to its state before interop activation.
    ResetEngine,
    /// Replace an invalidated block.
    InvalidateBlock(ReplacementBlock),
    /// Derive from the given L1 block next.
    ProvideL1 {
        /// The L1 block.
        block: BlockInfo,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use kona_interop::ManagedEventKind;

    fn l2_block(n: u64) -> L2BlockInfo {
        L2BlockInfo::new(
            BlockInfo::new(B256::from([n as u8; 32]), n, B256::from([n as u8 - 1; 32]), 1000 + n),
            BlockNumHash { number: n / 2, hash: B256::from([0xaa; 32]) },
            n % 2,
        )
    }

    #[test]
    fn test_translation_keeps_kinds_apart() {
        let origin = BlockInfo::new(B256::from([0xaa; 32]), 3, B256::ZERO, 900);
        let safe = InteropLifecycleEvent::LocalSafeUpdate { source: origin, derived: l2_block(6) };
        let traversal = InteropLifecycleEvent::L1Traversal { origin, last_l2: l2_block(6) };

        assert_eq!(safe.to_managed_event().unwrap().kind(), ManagedEventKind::SafeUpdate);
        assert_eq!(traversal.to_managed_event().unwrap().kind(), ManagedEventKind::L1Traversal);
        assert_eq!(
            traversal.to_managed_event().unwrap().block_id(),
            Some(origin.id()),
            "traversal is keyed by its L1 origin"
        );
    }

    #[test]
    fn test_reset_confirmed_is_local() {
        assert_eq!(InteropLifecycleEvent::ResetConfirmed.to_managed_event(), None);
        assert_eq!(InteropLifecycleEvent::ResetConfirmed.l2_block(), None);
    }

    #[test]
    fn test_block_replaced_translation() {
        let event = InteropLifecycleEvent::BlockReplaced {
            replacement: l2_block(9),
            invalidated: B256::from([0x0d; 32]),
        };
        assert_eq!(
            event.to_managed_event(),
            Some(ManagedEvent::BlockReplacement {
                replacement: l2_block(9).block_info,
                invalidated: B256::from([0x0d; 32]),
            })
        );
        assert_eq!(event.l2_block(), Some(&l2_block(9)));
    }
}
