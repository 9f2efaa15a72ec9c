//! Bisection for the last block a node and the supervisor agree on.

use crate::syncnode::{ClientError, ManagedNodeClient, ManagedNodeError};
use alloy_eips::BlockNumHash;
use alloy_primitives::B256;
use derive_more::Constructor;
use kona_interop::BlockInfo;
use kona_supervisor_storage::{DerivationStorageReader, StorageError};
use std::time::Duration;
use tracing::{debug, trace};

/// Where a diverged node should be reset to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetTarget {
    /// The last block the node and the supervisor agree on.
    Block(BlockNumHash),
    /// No agreement in range; the node must go back to its pre-interop state.
    PreInterop,
}

/// A [`ResetTarget`] together with the number of node queries it took to find it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BisectionOutcome {
    /// The reset target.
    pub target: ResetTarget,
    /// Number of block queries sent to the node.
    pub probes: u64,
}

/// Bisects a block range against a managed node and the supervisor's local-safe records.
#[derive(Debug, Constructor)]
pub struct ResetTracker<'a, C, DB> {
    client: &'a C,
    db: &'a DB,
    /// Deadline for each node query.
    query_timeout: Duration,
}

impl<C, DB> ResetTracker<'_, C, DB>
where
    C: ManagedNodeClient,
    DB: DerivationStorageReader,
{
    async fn block_at(&self, number: u64) -> Result<BlockInfo, ClientError> {
        tokio::time::timeout(self.query_timeout, self.client.block_ref_by_number(number))
            .await
            .map_err(|_| ClientError::Timeout)?
    }

    /// Finds the last block in `[a, z]` that the node agrees on.
    ///
    /// `a` must be known to the supervisor; if the node does not have it, the node has to be
    /// reset to its pre-interop state. A `z` with a zero hash is a height whose block is not
    /// known yet and never matches.
    ///
    /// Missing, future and conflicting blocks steer the search. Every other failure aborts it.
    pub async fn find_reset_target(
        &self,
        mut a: BlockNumHash,
        mut z: BlockNumHash,
    ) -> Result<BisectionOutcome, ManagedNodeError> {
        let mut probes = 0;

        probes += 1;
        match self.block_at(z.number).await {
            Ok(block) if z.hash != B256::ZERO && block.id() == z => {
                debug!(target: "supervisor::syncnode_resetter", block_number = z.number, "Node agrees with range end");
                return Ok(BisectionOutcome { target: ResetTarget::Block(z), probes });
            }
            Ok(_) | Err(ClientError::BlockNotFound) => {}
            Err(err) => return Err(err.into()),
        }

        probes += 1;
        match self.block_at(a.number).await {
            Ok(block) if block.id() == a => {}
            Ok(block) => {
                debug!(
                    target: "supervisor::syncnode_resetter",
                    expected = ?a,
                    actual = ?block.id(),
                    "Node disagrees with range start"
                );
                return Ok(BisectionOutcome { target: ResetTarget::PreInterop, probes });
            }
            Err(ClientError::BlockNotFound) => {
                debug!(target: "supervisor::syncnode_resetter", block_number = a.number, "Node is missing range start");
                return Ok(BisectionOutcome { target: ResetTarget::PreInterop, probes });
            }
            Err(err) => return Err(err.into()),
        }

        loop {
            if a.number + 1 >= z.number {
                return Ok(BisectionOutcome { target: ResetTarget::Block(a), probes });
            }

            let i = a.number + (z.number - a.number) / 2;
            probes += 1;
            let node_block = match self.block_at(i).await {
                Ok(block) => block,
                Err(ClientError::BlockNotFound) => {
                    trace!(target: "supervisor::syncnode_resetter", block_number = i, "Probe not found on node");
                    z = BlockNumHash { number: i, hash: B256::ZERO };
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            // A block the supervisor has no record of cannot be vouched for.
            match self.db.is_local_safe(node_block.id()) {
                Ok(()) => a = node_block.id(),
                Err(
                    StorageError::ConflictError(_) |
                    StorageError::FutureData(_) |
                    StorageError::EntryNotFound(_),
                ) => z = node_block.id(),
                Err(err) => return Err(err.into()),
            }
            trace!(
                target: "supervisor::syncnode_resetter",
                a = a.number,
                z = z.number,
                "Narrowed reset range"
            );
        }
    }
}
