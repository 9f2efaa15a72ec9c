use crate::syncnode::{
    ManagedNodeClient, ManagedNodeCommand, ManagedNodeController, ManagedNodeError,
    SubscriptionHandler, utils::spawn_task_with_retry,
};
use derive_more::Constructor;
use kona_interop::{BlockReplacement, DerivedRefPair, ManagedEvent};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Actor for managing a node in the supervisor environment.
///
/// Runs two tasks: one relaying [`ManagedNodeCommand`]s to the node, one consuming the
/// node's event subscription and resubscribing whenever it drops.
#[derive(Debug, Constructor)]
pub struct ManagedNodeActor<C, N> {
    client: Arc<C>,
    node: Arc<N>,
    cancel_token: CancellationToken,
}

impl<C, N> ManagedNodeActor<C, N>
where
    C: ManagedNodeClient + 'static,
    N: ManagedNodeController + SubscriptionHandler + 'static,
{
    /// Starts the managed node actor, processing commands from the provided channel.
    pub fn start(self, command_rx: mpsc::Receiver<ManagedNodeCommand>) {
        // Task 1: Command handling
        let node = self.node.clone();
        let cancel_token = self.cancel_token.clone();
        tokio::spawn(async move {
            run_command_task(node, command_rx, cancel_token).await;
        });

        // Task 2: Subscription handling
        spawn_task_with_retry(
            move || {
                let handler = self.node.clone();
                let client = self.client.clone();

                async move { run_subscription_task(client, handler).await }
            },
            self.cancel_token.clone(),
            usize::MAX,
        );
    }
}

async fn run_command_task<N>(
    node: Arc<N>,
    mut command_rx: mpsc::Receiver<ManagedNodeCommand>,
    cancel_token: CancellationToken,
) where
    N: ManagedNodeController + 'static,
{
    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                info!(target: "supervisor::syncnode", "Cancellation requested, shutting down command task");
                break;
            }
            maybe_cmd = command_rx.recv() => {
                let Some(cmd) = maybe_cmd else {
                    info!(target: "supervisor::syncnode", "Command channel closed, shutting down command task");
                    break;
                };
                let (result, action) = match cmd {
                    ManagedNodeCommand::UpdateFinalized { block_id } => {
                        (node.update_finalized(block_id).await, "update finalized block")
                    }
                    ManagedNodeCommand::UpdateCrossUnsafe { block_id } => {
                        (node.update_cross_unsafe(block_id).await, "update cross unsafe block")
                    }
                    ManagedNodeCommand::UpdateCrossSafe { source_block_id, derived_block_id } => (
                        node.update_cross_safe(source_block_id, derived_block_id).await,
                        "update cross safe block",
                    ),
                    ManagedNodeCommand::Reset {} => (node.reset().await, "reset managed node"),
                    ManagedNodeCommand::InvalidateBlock { seal } => {
                        (node.invalidate_block(seal).await, "invalidate block")
                    }
                    ManagedNodeCommand::ProvideL1 { block } => {
                        (node.provide_l1(block).await, "provide L1 block")
                    }
                };
                if let Err(err) = result {
                    warn!(target: "supervisor::syncnode", %err, action, "Managed node command failed");
                }
            }
        }
    }
}

async fn run_subscription_task<C: ManagedNodeClient, N: SubscriptionHandler>(
    client: Arc<C>,
    handler: Arc<N>,
) -> Result<(), ManagedNodeError> {
    let mut subscription = client.subscribe_events().await.inspect_err(|err| {
        error!(
            target: "supervisor::syncnode",
            %err,
            "Failed to subscribe to node events"
        );
    })?;

    info!(target: "supervisor::syncnode", "Subscription stream started");
    loop {
        match subscription.next().await {
            Some(Ok(event)) => handle_subscription_event(&handler, event).await,
            Some(Err(err)) => {
                // A single undecodable event does not invalidate the stream.
                error!(
                    target: "supervisor::syncnode",
                    %err,
                    "Error in event deserialization"
                );
            }
            None => {
                warn!(target: "supervisor::syncnode", "Subscription closed by server");
                client.reset_ws_client().await;
                return Err(ManagedNodeError::SubscriptionClosed);
            }
        }
    }
}

async fn handle_subscription_event<N: SubscriptionHandler>(handler: &Arc<N>, event: ManagedEvent) {
    debug!(target: "supervisor::syncnode", kind = %event.kind(), "Received managed event");
    let result = match event {
        ManagedEvent::Reset(reason) => handler.handle_reset(&reason).await,
        ManagedEvent::UnsafeBlockUpdate(block) => handler.handle_unsafe_block(&block).await,
        ManagedEvent::DerivationUpdate { source, is_l1_origin_advance: true, .. } => {
            handler.handle_derivation_origin_update(&source).await
        }
        ManagedEvent::DerivationUpdate { source, derived, .. } => {
            handler.handle_derivation_update(&DerivedRefPair::new(source, derived)).await
        }
        ManagedEvent::ExhaustedL1 { source, derived } => {
            handler.handle_exhaust_l1(&DerivedRefPair::new(source, derived)).await
        }
        ManagedEvent::BlockReplacement { replacement, invalidated } => {
            handler.handle_replace_block(&BlockReplacement::new(replacement, invalidated)).await
        }
    };

    if let Err(err) = result {
        warn!(
            target: "supervisor::syncnode",
            %err,
            "Failed to handle managed event"
        );
    }
}
