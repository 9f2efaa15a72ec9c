//! Events emitted by a node running in managed mode.

use crate::BlockInfo;
use alloy_eips::BlockNumHash;
use alloy_primitives::B256;

/// An event sent by the node to the supervisor.
///
/// The JSON form is externally tagged, one key per event, e.g.
/// `{"unsafeBlock": {...}}` or `{"reset": "reason"}`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all_fields = "camelCase"))]
pub enum ManagedEvent {
    /// The node needs to be reset; carries the reason.
    #[cfg_attr(feature = "serde", serde(rename = "reset"))]
    Reset(String),
    /// A new local-unsafe block.
    #[cfg_attr(feature = "serde", serde(rename = "unsafeBlock"))]
    UnsafeBlockUpdate(BlockInfo),
    /// Derivation made progress.
    #[cfg_attr(feature = "serde", serde(rename = "derivationUpdate"))]
    DerivationUpdate {
        /// The L1 block the derived block was derived from.
        source: BlockInfo,
        /// The last derived L2 block.
        derived: BlockInfo,
        /// Whether this update reports a new L1 origin rather than a new local-safe block.
        #[cfg_attr(feature = "serde", serde(rename = "isL1OriginAdvance", default))]
        is_l1_origin_advance: bool,
    },
    /// The node ran out of L1 data to derive from.
    #[cfg_attr(feature = "serde", serde(rename = "exhaustL1"))]
    ExhaustedL1 {
        /// The last L1 block traversed.
        source: BlockInfo,
        /// The last derived L2 block.
        derived: BlockInfo,
    },
    /// A block was replaced after being invalidated.
    #[cfg_attr(feature = "serde", serde(rename = "replaceBlock"))]
    BlockReplacement {
        /// The replacement block.
        replacement: BlockInfo,
        /// Hash of the invalidated block.
        invalidated: B256,
    },
}

/// The kind of a [`ManagedEvent`], used to scope de-duplication and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ManagedEventKind {
    /// [`ManagedEvent::Reset`].
    #[display("reset")]
    Reset,
    /// [`ManagedEvent::UnsafeBlockUpdate`].
    #[display("unsafe_update")]
    UnsafeUpdate,
    /// [`ManagedEvent::DerivationUpdate`] for a new local-safe block.
    #[display("safe_update")]
    SafeUpdate,
    /// [`ManagedEvent::DerivationUpdate`] for a new L1 origin.
    #[display("l1_traversal")]
    L1Traversal,
    /// [`ManagedEvent::ExhaustedL1`].
    #[display("l1_exhausted")]
    ExhaustedL1,
    /// [`ManagedEvent::BlockReplacement`].
    #[display("block_replacement")]
    BlockReplacement,
}

impl ManagedEventKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Reset,
        Self::UnsafeUpdate,
        Self::SafeUpdate,
        Self::L1Traversal,
        Self::ExhaustedL1,
        Self::BlockReplacement,
    ];
}

impl ManagedEvent {
    /// Returns the [`ManagedEventKind`] of the event.
    pub const fn kind(&self) -> ManagedEventKind {
        match self {
            Self::Reset(_) => ManagedEventKind::Reset,
            Self::UnsafeBlockUpdate(_) => ManagedEventKind::UnsafeUpdate,
            Self::DerivationUpdate { is_l1_origin_advance: false, .. } => {
                ManagedEventKind::SafeUpdate
            }
            Self::DerivationUpdate { is_l1_origin_advance: true, .. } => {
                ManagedEventKind::L1Traversal
            }
            Self::ExhaustedL1 { .. } => ManagedEventKind::ExhaustedL1,
            Self::BlockReplacement { .. } => ManagedEventKind::BlockReplacement,
        }
    }

    /// Returns the block the event is about, if any.
    ///
    /// For L1 traversal and exhaustion this is the L1 block, for everything else the L2 block.
    pub const fn block_id(&self) -> Option<BlockNumHash> {
        match self {
            Self::Reset(_) => None,
            Self::UnsafeBlockUpdate(block) => Some(block.id()),
            Self::DerivationUpdate { source, is_l1_origin_advance: true, .. } => Some(source.id()),
            Self::DerivationUpdate { derived, .. } => Some(derived.id()),
            Self::ExhaustedL1 { source, .. } => Some(source.id()),
            Self::BlockReplacement { replacement, .. } => Some(replacement.id()),
        }
    }
}
