//! The interop RPC server the supervisor connects to.

use crate::{
    JwtAuthLayer, L1BlockStore, L2BlockStore, ManagedModeError, ManagedModeSession,
    metrics::Metrics,
};
use alloy_eips::BlockNumHash;
use alloy_primitives::{B256, ChainId};
use alloy_rpc_types_engine::JwtSecret;
use async_trait::async_trait;
use jsonrpsee::{
    PendingSubscriptionSink, SubscriptionMessage,
    core::{RpcResult, SubscriptionResult},
    server::{Server, ServerHandle},
};
use kona_interop::{
    BlockInfo, BlockSeal, DerivedRefPair, L2BlockInfo, ManagedEvent, OutputV0, Receipts,
    ResetTargets,
};
use kona_supervisor_rpc::ManagedModeApiServer;
use std::{net::SocketAddr, sync::Arc};
use tracing::{debug, info, warn};

/// Serves [`ManagedModeApiServer`] from a [`ManagedModeSession`].
#[derive(Debug)]
pub struct ManagedModeRpc<L2, L1> {
    session: Arc<ManagedModeSession<L2, L1>>,
}

impl<L2, L1> Clone for ManagedModeRpc<L2, L1> {
    fn clone(&self) -> Self {
        Self { session: self.session.clone() }
    }
}

impl<L2, L1> ManagedModeRpc<L2, L1>
where
    L2: L2BlockStore + 'static,
    L1: L1BlockStore + 'static,
{
    /// Constructs a new [`ManagedModeRpc`].
    pub const fn new(session: Arc<ManagedModeSession<L2, L1>>) -> Self {
        Self { session }
    }

    /// Binds the server to `socket` behind JWT authentication and starts serving.
    ///
    /// Returns the bound address alongside the handle.
    pub async fn launch(
        self,
        socket: SocketAddr,
        jwt_secret: JwtSecret,
    ) -> std::io::Result<(SocketAddr, ServerHandle)> {
        let middleware = tower::ServiceBuilder::new().layer(JwtAuthLayer::new(jwt_secret));
        let server = Server::builder().set_http_middleware(middleware).build(socket).await?;
        let addr = server.local_addr()?;
        info!(target: "managed_mode::rpc", %addr, "Interop RPC server bound to address");

        Ok((addr, server.start(self.into_rpc())))
    }
}

fn record<T>(method: &'static str, result: Result<T, ManagedModeError>) -> RpcResult<T> {
    Metrics::record_command(method, &result);
    result
        .inspect_err(|err| debug!(target: "managed_mode::rpc", method, %err, "Command failed"))
        .map_err(Into::into)
}

#[async_trait]
impl<L2, L1> ManagedModeApiServer for ManagedModeRpc<L2, L1>
where
    L2: L2BlockStore + 'static,
    L1: L1BlockStore + 'static,
{
    async fn subscribe_events(&self, sink: PendingSubscriptionSink) -> SubscriptionResult {
        let sink = sink.accept().await?;
        let queue = self.session.events();
        info!(target: "managed_mode::rpc", "Supervisor subscribed to events");

        tokio::spawn(async move {
            loop {
                let event: ManagedEvent = tokio::select! {
                    _ = sink.closed() => break,
                    event = queue.next() => match event {
                        Some(event) => event,
                        None => break,
                    },
                };

                let message = match SubscriptionMessage::new(
                    sink.method_name(),
                    sink.subscription_id(),
                    &event,
                ) {
                    Ok(message) => message,
                    Err(err) => {
                        warn!(target: "managed_mode::rpc", %err, "Failed to encode event");
                        continue;
                    }
                };
                if let Err(err) = sink.send(message).await {
                    warn!(target: "managed_mode::rpc", %err, "Event subscription closed");
                    break;
                }
            }
            debug!(target: "managed_mode::rpc", "Event subscription ended");
        });
        Ok(())
    }

    async fn pull_event(&self) -> RpcResult<Option<ManagedEvent>> {
        Ok(self.session.pull_event())
    }

    async fn update_cross_unsafe(&self, id: BlockNumHash) -> RpcResult<()> {
        record("updateCrossUnsafe", self.session.update_cross_unsafe(id).await)
    }

    async fn update_cross_safe(
        &self,
        derived: BlockNumHash,
        derived_from: BlockNumHash,
    ) -> RpcResult<()> {
        record("updateCrossSafe", self.session.update_cross_safe(derived, derived_from).await)
    }

    async fn update_finalized(&self, id: BlockNumHash) -> RpcResult<()> {
        record("updateFinalized", self.session.update_finalized(id).await)
    }

    async fn invalidate_block(&self, seal: BlockSeal) -> RpcResult<()> {
        record("invalidateBlock", self.session.invalidate_block(seal).await)
    }

    async fn reset(
        &self,
        local_unsafe: BlockNumHash,
        cross_unsafe: BlockNumHash,
        local_safe: BlockNumHash,
        cross_safe: BlockNumHash,
        finalized: BlockNumHash,
    ) -> RpcResult<()> {
        let targets =
            ResetTargets { local_unsafe, cross_unsafe, local_safe, cross_safe, finalized };
        record("reset", self.session.reset(targets).await)
    }

    async fn reset_pre_interop(&self) -> RpcResult<()> {
        record("resetPreInterop", self.session.reset_pre_interop().await)
    }

    async fn anchor_point(&self) -> RpcResult<DerivedRefPair> {
        record("anchorPoint", self.session.anchor_point().await)
    }

    async fn provide_l1(&self, next_l1: BlockInfo) -> RpcResult<()> {
        record("provideL1", self.session.provide_l1(next_l1).await)
    }

    async fn fetch_receipts(&self, block_hash: B256) -> RpcResult<Receipts> {
        record("fetchReceipts", self.session.fetch_receipts(block_hash).await)
    }

    async fn chain_id(&self) -> RpcResult<ChainId> {
        Ok(self.session.chain_id())
    }

    async fn block_ref_by_number(&self, number: u64) -> RpcResult<BlockInfo> {
        record("blockRefByNumber", self.session.block_ref_by_number(number).await)
    }

    async fn l2_block_ref_by_timestamp(&self, timestamp: u64) -> RpcResult<L2BlockInfo> {
        record("l2BlockRefByTimestamp", self.session.l2_block_ref_by_timestamp(timestamp).await)
    }

    async fn output_v0_at_timestamp(&self, timestamp: u64) -> RpcResult<OutputV0> {
        record("outputV0AtTimestamp", self.session.output_v0_at_timestamp(timestamp).await)
    }

    async fn pending_output_v0_at_timestamp(&self, timestamp: u64) -> RpcResult<OutputV0> {
        record(
            "pendingOutputV0AtTimestamp",
            self.session.pending_output_v0_at_timestamp(timestamp).await,
        )
    }
}
