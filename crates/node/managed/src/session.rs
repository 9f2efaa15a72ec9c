//! The node's side of a managed-mode connection.

use crate::{
    EventQueue, InteropLifecycleEvent, InteropRequest, L1BlockStore, L2BlockStore, L2Payload,
    ManagedModeConfig, ManagedModeError, ReplacementBlock, RollupConfig, SessionState,
    dedup::EventDeduper,
    metrics::{EventOutcome, Metrics},
    replacement::{invalidated_output, replacement_transactions},
    search::{LocalValidity, lookup},
};
use alloy_eips::BlockNumHash;
use alloy_primitives::{B256, ChainId};
use kona_interop::{
    BlockInfo, BlockSeal, DerivedRefPair, L2BlockInfo, ManagedEvent, OutputV0, Receipts,
    ResetTargets, SafetyLevel,
};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{
        Mutex,
        mpsc::{self, error::TrySendError},
        watch,
    },
    time::Instant,
};
use tracing::{debug, info, trace, warn};

/// Serves the supervisor on behalf of the node.
///
/// Lifecycle events from the node's pipeline go through [`Self::handle_lifecycle_event`] and
/// end up in the outbound [`EventQueue`]. Commands from the supervisor are validated against
/// the node's stores and handed to the pipeline as [`InteropRequest`]s; returning from a
/// command does not mean the pipeline has applied it.
#[derive(Debug)]
pub struct ManagedModeSession<L2, L1> {
    rollup: RollupConfig,
    l2: Arc<L2>,
    l1: Arc<L1>,
    queue: Arc<EventQueue>,
    deduper: Mutex<EventDeduper>,
    requests: mpsc::Sender<InteropRequest>,
    /// Serializes commands that change the node's heads.
    commands: Mutex<()>,
    state: watch::Sender<SessionState>,
    query_timeout: Duration,
}

impl<L2, L1> ManagedModeSession<L2, L1>
where
    L2: L2BlockStore,
    L1: L1BlockStore,
{
    /// Creates a stopped session and the receiver of its requests to the pipeline.
    pub fn new(
        rollup: RollupConfig,
        config: &ManagedModeConfig,
        l2: Arc<L2>,
        l1: Arc<L1>,
    ) -> (Self, mpsc::Receiver<InteropRequest>) {
        Metrics::init();
        let (requests, request_rx) = mpsc::channel(config.queue_capacity.max(1));
        let session = Self {
            rollup,
            l2,
            l1,
            queue: Arc::new(EventQueue::new(config.queue_capacity)),
            deduper: Mutex::new(EventDeduper::new(config.dedup)),
            requests,
            commands: Mutex::new(()),
            state: watch::Sender::new(SessionState::Stopped),
            query_timeout: config.query_timeout,
        };
        (session, request_rx)
    }

    /// Returns the rollup configuration.
    pub const fn rollup_config(&self) -> &RollupConfig {
        &self.rollup
    }

    /// Returns the current state.
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Returns a receiver of state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Returns the outbound queue.
    pub fn events(&self) -> Arc<EventQueue> {
        self.queue.clone()
    }

    /// Starts serving the supervisor.
    pub fn start(&self) {
        self.transition(SessionState::Starting);
        self.transition(SessionState::Running);
    }

    /// Stops serving the supervisor.
    pub fn stop(&self) {
        self.transition(SessionState::Stopping);
        self.transition(SessionState::Stopped);
    }

    fn transition(&self, next: SessionState) -> bool {
        self.state.send_if_modified(|state| {
            if !state.can_transition_to(next) {
                warn!(target: "managed_mode", from = %state, to = %next, "Rejected session state transition");
                return false;
            }
            if *state != next {
                info!(target: "managed_mode", from = %state, to = %next, "Session state changed");
            }
            *state = next;
            true
        })
    }

    /// Queues the [`ManagedEvent`] for a pipeline event, unless it predates interop or
    /// duplicates a recent event.
    pub async fn handle_lifecycle_event(&self, event: InteropLifecycleEvent) {
        if matches!(event, InteropLifecycleEvent::ResetConfirmed) {
            if self.state() == SessionState::Resetting {
                self.transition(SessionState::Running);
            }
            return;
        }

        let Some(managed) = event.to_managed_event() else {
            return;
        };
        let kind = managed.kind();

        if let Some(block) = event.l2_block() &&
            !self.rollup.is_interop(block.timestamp())
        {
            trace!(target: "managed_mode", %kind, block_number = block.number(), "Dropped pre-interop event");
            Metrics::record_event(kind, EventOutcome::Filtered);
            return;
        }

        if self.deduper.lock().await.is_duplicate(kind, managed.block_id(), Instant::now()) {
            trace!(target: "managed_mode", %kind, "Dropped duplicate event");
            Metrics::record_event(kind, EventOutcome::Deduplicated);
            return;
        }

        debug!(target: "managed_mode", %kind, block = ?managed.block_id(), "Queued event");
        self.queue.push(managed);
        Metrics::record_event(kind, EventOutcome::Emitted);
    }

    /// Pops the next queued event.
    pub fn pull_event(&self) -> Option<ManagedEvent> {
        self.queue.pop()
    }

    fn ensure_running(&self) -> Result<(), ManagedModeError> {
        if self.state().accepts_commands() { Ok(()) } else { Err(ManagedModeError::NotRunning) }
    }

    /// Hands `request` to the pipeline without waiting for room in the channel.
    fn request(&self, request: InteropRequest) -> Result<(), ManagedModeError> {
        self.requests.try_send(request).map_err(|err| match err {
            TrySendError::Full(request) => {
                warn!(target: "managed_mode", ?request, "Pipeline is not draining requests");
                ManagedModeError::RequestQueueFull
            }
            TrySendError::Closed(_) => ManagedModeError::ChannelClosed,
        })
    }

    /// Returns the canonical L2 block identified by `id`.
    async fn resolve_l2(&self, id: BlockNumHash) -> Result<L2BlockInfo, ManagedModeError> {
        let what = format!("L2 block #{}", id.number);
        let block =
            lookup(self.query_timeout, what, self.l2.l2_block_ref_by_number(id.number)).await?;
        if block.hash() != id.hash {
            return Err(ManagedModeError::ConflictingBlock {
                number: id.number,
                expected: id.hash,
                actual: block.hash(),
            });
        }
        Ok(block)
    }

    /// Returns the canonical L1 block identified by `id`.
    async fn resolve_l1(&self, id: BlockNumHash) -> Result<BlockInfo, ManagedModeError> {
        let what = format!("L1 block #{}", id.number);
        let block =
            lookup(self.query_timeout, what, self.l1.l1_block_ref_by_number(id.number)).await?;
        if block.hash != id.hash {
            return Err(ManagedModeError::ConflictingBlock {
                number: id.number,
                expected: id.hash,
                actual: block.hash,
            });
        }
        Ok(block)
    }

    async fn resolve_reset_target(
        &self,
        level: SafetyLevel,
        id: BlockNumHash,
    ) -> Result<L2BlockInfo, ManagedModeError> {
        self.resolve_l2(id).await.map_err(|err| match err {
            ManagedModeError::BlockNotFound(_) => {
                ManagedModeError::ResetTargetNotFound { level, block: id }
            }
            ManagedModeError::ConflictingBlock { number, expected, actual } => {
                ManagedModeError::ResetTargetConflict { level, number, expected, actual }
            }
            other => ManagedModeError::ResetTargetUnavailable { level, reason: other.to_string() },
        })
    }

    /// Promotes `id` to cross-unsafe.
    pub async fn update_cross_unsafe(&self, id: BlockNumHash) -> Result<(), ManagedModeError> {
        let _guard = self.commands.lock().await;
        self.ensure_running()?;
        let block = self.resolve_l2(id).await?;
        self.request(InteropRequest::PromoteCrossUnsafe { block })
    }

    /// Promotes `derived` to cross-safe, derived from the L1 block `derived_from`.
    pub async fn update_cross_safe(
        &self,
        derived: BlockNumHash,
        derived_from: BlockNumHash,
    ) -> Result<(), ManagedModeError> {
        let _guard = self.commands.lock().await;
        self.ensure_running()?;
        let derived = self.resolve_l2(derived).await?;
        let source = self.resolve_l1(derived_from).await?;
        self.request(InteropRequest::PromoteSafe { source, derived })
    }

    /// Promotes `id` to finalized.
    pub async fn update_finalized(&self, id: BlockNumHash) -> Result<(), ManagedModeError> {
        let _guard = self.commands.lock().await;
        self.ensure_running()?;
        let block = self.resolve_l2(id).await?;
        self.request(InteropRequest::PromoteFinalized { block })
    }

    /// Requests the block sealed by `seal` to be replaced.
    ///
    /// Completion is reported as a [`ManagedEvent::BlockReplacement`].
    pub async fn invalidate_block(&self, seal: BlockSeal) -> Result<(), ManagedModeError> {
        let _guard = self.commands.lock().await;
        self.ensure_running()?;

        let what = format!("L2 block {}", seal.hash);
        let payload = lookup(self.query_timeout, what, self.l2.payload_by_hash(seal.hash)).await?;
        if payload.block.number() != seal.number {
            return Err(ManagedModeError::ConflictingBlock {
                number: seal.number,
                expected: seal.hash,
                actual: payload.block.hash(),
            });
        }
        let Some(parent_number) = seal.number.checked_sub(1) else {
            return Err(ManagedModeError::InvalidParams("cannot invalidate genesis".to_string()));
        };

        let output = payload.output();
        let replacement = ReplacementBlock {
            invalidated: payload.block.id(),
            parent: BlockNumHash { number: parent_number, hash: payload.block.block_info.parent_hash },
            timestamp: payload.block.timestamp(),
            transactions: replacement_transactions(&payload.transactions, &output),
        };
        info!(
            target: "managed_mode",
            block_number = seal.number,
            block_hash = %seal.hash,
            output_root = %output.output_root(),
            "Invalidating block"
        );
        self.request(InteropRequest::InvalidateBlock(replacement))
    }

    /// Returns the latest local-unsafe block whose L1 origin is canonical, searching from
    /// `target`.
    pub async fn find_latest_valid_local_unsafe(
        &self,
        target: u64,
    ) -> Result<L2BlockInfo, ManagedModeError> {
        let genesis = self.rollup.genesis.l2.number;
        LocalValidity::new(&*self.l2, &*self.l1, genesis, self.query_timeout)
            .find_latest_valid_local_unsafe(target)
            .await
    }

    /// Resets the node's heads to `targets`.
    ///
    /// Every target must exist on the node's canonical chain and the targets must respect the
    /// safety ordering. Targets are checked from finalized upwards, so the reported level is the
    /// lowest offending one. The local-unsafe head is re-derived from its target, and the other
    /// heads are clamped to it.
    pub async fn reset(&self, targets: ResetTargets) -> Result<(), ManagedModeError> {
        let _guard = self.commands.lock().await;
        self.ensure_running()?;

        targets.validate_ordering()?;
        let finalized =
            self.resolve_reset_target(SafetyLevel::Finalized, targets.finalized).await?;
        let cross_safe =
            self.resolve_reset_target(SafetyLevel::CrossSafe, targets.cross_safe).await?;
        let local_safe =
            self.resolve_reset_target(SafetyLevel::LocalSafe, targets.local_safe).await?;
        let cross_unsafe =
            self.resolve_reset_target(SafetyLevel::CrossUnsafe, targets.cross_unsafe).await?;
        let local_unsafe_target =
            self.resolve_reset_target(SafetyLevel::LocalUnsafe, targets.local_unsafe).await?;

        let local_unsafe =
            self.find_latest_valid_local_unsafe(local_unsafe_target.number()).await?;
        let clamp = |block: L2BlockInfo| {
            if block.number() > local_unsafe.number() { local_unsafe } else { block }
        };

        info!(
            target: "managed_mode",
            local_unsafe = local_unsafe.number(),
            requested_local_unsafe = targets.local_unsafe.number,
            cross_unsafe = targets.cross_unsafe.number,
            local_safe = targets.local_safe.number,
            cross_safe = targets.cross_safe.number,
            finalized = targets.finalized.number,
            "Resetting node"
        );
        self.request(InteropRequest::ForceReset {
            local_unsafe,
            cross_unsafe: clamp(cross_unsafe),
            local_safe: clamp(local_safe),
            cross_safe: clamp(cross_safe),
            finalized: clamp(finalized),
        })?;
        self.transition(SessionState::Resetting);
        Ok(())
    }

    /// Resets the node to its state before interop activation.
    pub async fn reset_pre_interop(&self) -> Result<(), ManagedModeError> {
        let _guard = self.commands.lock().await;
        self.ensure_running()?;

        info!(target: "managed_mode", "Resetting node to pre-interop state");
        self.request(InteropRequest::ResetEngine)?;
        self.transition(SessionState::Resetting);
        Ok(())
    }

    /// Returns the genesis `(L1, L2)` pair.
    pub async fn anchor_point(&self) -> Result<DerivedRefPair, ManagedModeError> {
        let genesis = self.rollup.genesis;
        if !self.rollup.is_interop(genesis.l2_time) {
            return Err(ManagedModeError::InteropInactive);
        }

        let source = self.resolve_l1(genesis.l1).await?;
        let derived = self.resolve_l2(genesis.l2).await?;
        Ok(DerivedRefPair::new(source, derived.block_info))
    }

    /// Hands the next L1 block to derive from to the pipeline.
    pub async fn provide_l1(&self, next_l1: BlockInfo) -> Result<(), ManagedModeError> {
        self.ensure_running()?;
        debug!(target: "managed_mode", block_number = next_l1.number, "Received next L1 block");
        self.request(InteropRequest::ProvideL1 { block: next_l1 })
    }

    /// Returns the receipts of the block with the given hash.
    pub async fn fetch_receipts(&self, block_hash: B256) -> Result<Receipts, ManagedModeError> {
        let what = format!("receipts of {block_hash}");
        lookup(self.query_timeout, what, self.l2.receipts_by_hash(block_hash)).await
    }

    /// Returns the L2 chain id.
    pub const fn chain_id(&self) -> ChainId {
        self.rollup.l2_chain_id
    }

    /// Returns the canonical L2 block at `number`.
    pub async fn block_ref_by_number(&self, number: u64) -> Result<BlockInfo, ManagedModeError> {
        let what = format!("L2 block #{number}");
        let block =
            lookup(self.query_timeout, what, self.l2.l2_block_ref_by_number(number)).await?;
        Ok(block.block_info)
    }

    /// Returns the canonical L2 block at `timestamp`.
    pub async fn l2_block_ref_by_timestamp(
        &self,
        timestamp: u64,
    ) -> Result<L2BlockInfo, ManagedModeError> {
        let number = self.rollup.target_block_number(timestamp)?;
        let what = format!("L2 block #{number}");
        lookup(self.query_timeout, what, self.l2.l2_block_ref_by_number(number)).await
    }

    async fn payload_at_timestamp(
        &self,
        timestamp: u64,
    ) -> Result<L2Payload, ManagedModeError> {
        let block = self.l2_block_ref_by_timestamp(timestamp).await?;
        let what = format!("L2 block {}", block.hash());
        lookup(self.query_timeout, what, self.l2.payload_by_hash(block.hash())).await
    }

    /// Returns the output of the canonical L2 block at `timestamp`.
    pub async fn output_v0_at_timestamp(&self, timestamp: u64) -> Result<OutputV0, ManagedModeError> {
        Ok(self.payload_at_timestamp(timestamp).await?.output())
    }

    /// Returns the output at `timestamp` as it was before the block there got replaced.
    ///
    /// Falls back to the canonical output for blocks that are not replacements.
    pub async fn pending_output_v0_at_timestamp(
        &self,
        timestamp: u64,
    ) -> Result<OutputV0, ManagedModeError> {
        let payload = self.payload_at_timestamp(timestamp).await?;
        if payload.block.number() == self.rollup.genesis.l2.number {
            return Ok(payload.output());
        }
        Ok(invalidated_output(&payload.transactions).unwrap_or_else(|| payload.output()))
    }
}
