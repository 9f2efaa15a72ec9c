//! Brings a diverged managed node back in line with the supervisor.

use crate::syncnode::{ManagedNodeClient, ManagedNodeError, Metrics, ResetTarget, ResetTracker};
use alloy_primitives::ChainId;
use kona_interop::{ResetTargets, SafetyLevel};
use kona_supervisor_storage::{
    DerivationStorageReader, HeadRefStorageReader, LogStorageReader, StorageError,
};
use serde::{Deserialize, Serialize};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Configuration of the [`Resetter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetterConfig {
    /// Deadline for each node query made while bisecting.
    pub query_timeout: Duration,
}

impl Default for ResetterConfig {
    fn default() -> Self {
        Self { query_timeout: Duration::from_secs(5) }
    }
}

/// What a reset ended up doing to the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    /// The node heads were reset to these targets.
    Reset(ResetTargets),
    /// The node was reset to its pre-interop state.
    PreInterop,
}

/// The reset currently allowed to run for the chain.
#[derive(Debug, Default)]
struct ResetSlot {
    generation: u64,
    token: Option<CancellationToken>,
}

/// Resets a managed node to the last block it agrees on with the supervisor.
///
/// At most one reset runs per chain. Starting a reset cancels the one in flight.
#[derive(Debug)]
pub struct Resetter<DB, C> {
    chain_id: ChainId,
    client: Arc<C>,
    db_provider: Arc<DB>,
    config: ResetterConfig,
    slot: Mutex<ResetSlot>,
    running: Mutex<()>,
}

impl<DB, C> Resetter<DB, C>
where
    DB: LogStorageReader + DerivationStorageReader + HeadRefStorageReader + Send + Sync,
    C: ManagedNodeClient,
{
    /// Creates a new [`Resetter`].
    pub fn new(
        chain_id: ChainId,
        client: Arc<C>,
        db_provider: Arc<DB>,
        config: ResetterConfig,
    ) -> Self {
        Metrics::init();
        Self {
            chain_id,
            client,
            db_provider,
            config,
            slot: Mutex::new(ResetSlot::default()),
            running: Mutex::new(()),
        }
    }

    /// Resets the node.
    ///
    /// Fails with [`ManagedNodeError::ResetCancelled`] if another reset is started before this
    /// one completes. A cancelled reset leaves the node untouched unless the reset call
    /// itself was already sent.
    pub async fn reset(&self) -> Result<ResetOutcome, ManagedNodeError> {
        let (generation, token) = self.supersede().await;
        let _running = self.running.lock().await;

        let started_at = Instant::now();
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => Err(ManagedNodeError::ResetCancelled),
            result = self.run_reset() => result,
        };
        self.release(generation).await;

        Metrics::record_reset(self.chain_id, started_at, &result);
        match &result {
            Ok(outcome) => {
                info!(target: "supervisor::syncnode_resetter", chain_id = self.chain_id, ?outcome, "Reset managed node");
            }
            Err(ManagedNodeError::ResetCancelled) => {
                info!(target: "supervisor::syncnode_resetter", chain_id = self.chain_id, "Reset superseded");
            }
            Err(err) => {
                error!(target: "supervisor::syncnode_resetter", chain_id = self.chain_id, %err, "Failed to reset managed node");
            }
        }
        result
    }

    /// Cancels the reset in flight, if any, and claims the slot for a new one.
    async fn supersede(&self) -> (u64, CancellationToken) {
        let mut slot = self.slot.lock().await;
        if let Some(previous) = slot.token.take() {
            info!(target: "supervisor::syncnode_resetter", chain_id = self.chain_id, "Cancelling in-flight reset");
            previous.cancel();
        }

        slot.generation += 1;
        let token = CancellationToken::new();
        slot.token = Some(token.clone());
        (slot.generation, token)
    }

    async fn release(&self, generation: u64) {
        let mut slot = self.slot.lock().await;
        if slot.generation == generation {
            slot.token = None;
        }
    }

    async fn run_reset(&self) -> Result<ResetOutcome, ManagedNodeError> {
        let activation = match self.db_provider.get_activation_block() {
            Ok(block) => block,
            Err(StorageError::DatabaseNotInitialised) => {
                info!(target: "supervisor::syncnode_resetter", chain_id = self.chain_id, "No activation block recorded");
                return self.reset_pre_interop().await;
            }
            Err(err) => return Err(err.into()),
        };

        let local_safe = match self.db_provider.get_safety_head_ref(SafetyLevel::LocalSafe) {
            Ok(block) => block,
            Err(StorageError::EntryNotFound(_) | StorageError::DatabaseNotInitialised) => {
                activation
            }
            Err(err) => return Err(err.into()),
        };

        let tracker =
            ResetTracker::new(&*self.client, &*self.db_provider, self.config.query_timeout);
        let bisection = tracker.find_reset_target(activation.id(), local_safe.id()).await?;
        Metrics::record_bisection_probes(self.chain_id, bisection.probes);

        let target = match bisection.target {
            ResetTarget::Block(target) => target,
            ResetTarget::PreInterop => return self.reset_pre_interop().await,
        };

        // Never move a level past what the supervisor already trusts at that level.
        let super_head = self.db_provider.get_super_head()?;
        let mut targets = ResetTargets::default();
        for level in SafetyLevel::ALL {
            let trusted = super_head.get(level).map_or_else(|| activation.id(), |block| block.id());
            *targets.get_mut(level) = if trusted.number < target.number { trusted } else { target };
        }
        if let Err(err) = targets.validate_ordering() {
            warn!(target: "supervisor::syncnode_resetter", chain_id = self.chain_id, %err, "Reset targets out of order");
        }

        info!(
            target: "supervisor::syncnode_resetter",
            chain_id = self.chain_id,
            block_number = target.number,
            "Resetting managed node"
        );
        self.client
            .reset(
                targets.local_unsafe,
                targets.cross_unsafe,
                targets.local_safe,
                targets.cross_safe,
                targets.finalized,
            )
            .await?;
        Ok(ResetOutcome::Reset(targets))
    }

    async fn reset_pre_interop(&self) -> Result<ResetOutcome, ManagedNodeError> {
        info!(target: "supervisor::syncnode_resetter", chain_id = self.chain_id, "Resetting managed node to pre-interop state");
        self.client.reset_pre_interop().await?;
        Ok(ResetOutcome::PreInterop)
    }
}
