//! [`ManagedNode`] ties the client, the resetter and the chain processor together.

use crate::{
    event::ChainEvent,
    syncnode::{
        ManagedNodeClient, ManagedNodeController, ManagedNodeError, Resetter, SubscriptionHandler,
    },
};
use alloy_eips::BlockNumHash;
use alloy_primitives::ChainId;
use async_trait::async_trait;
use kona_interop::{BlockInfo, BlockReplacement, BlockSeal, DerivedRefPair};
use kona_supervisor_storage::{DerivationStorageReader, HeadRefStorageReader, LogStorageReader};
use std::{fmt::Debug, sync::Arc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// The supervisor's handle on a single node running in managed mode.
///
/// Forwards the node's events to the chain processor, relays commands to the node, and
/// resets the node when it asks for it.
#[derive(Debug)]
pub struct ManagedNode<DB, C> {
    chain_id: ChainId,
    client: Arc<C>,
    resetter: Arc<Resetter<DB, C>>,
    event_tx: mpsc::Sender<ChainEvent>,
}

impl<DB, C> ManagedNode<DB, C>
where
    DB: LogStorageReader + DerivationStorageReader + HeadRefStorageReader + Send + Sync,
    C: ManagedNodeClient,
{
    /// Creates a new [`ManagedNode`].
    pub const fn new(
        chain_id: ChainId,
        client: Arc<C>,
        resetter: Arc<Resetter<DB, C>>,
        event_tx: mpsc::Sender<ChainEvent>,
    ) -> Self {
        Self { chain_id, client, resetter, event_tx }
    }

    /// Returns the chain id of the node.
    pub const fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    async fn forward(&self, event: ChainEvent) -> Result<(), ManagedNodeError> {
        self.event_tx.send(event).await.map_err(|err| {
            warn!(target: "supervisor::syncnode", chain_id = self.chain_id, %err, "Chain processor is gone");
            ManagedNodeError::ChannelSendFailed
        })
    }
}

#[async_trait]
impl<DB, C> SubscriptionHandler for ManagedNode<DB, C>
where
    DB: LogStorageReader + DerivationStorageReader + HeadRefStorageReader + Send + Sync + Debug + 'static,
    C: ManagedNodeClient + 'static,
{
    /// Starts a reset in the background so the subscription keeps draining events. A later
    /// reset request supersedes this one.
    async fn handle_reset(&self, reason: &str) -> Result<(), ManagedNodeError> {
        info!(target: "supervisor::syncnode", chain_id = self.chain_id, reason, "Node requested a reset");
        let resetter = self.resetter.clone();
        tokio::spawn(async move {
            // The resetter logs and records the outcome.
            let _ = resetter.reset().await;
        });
        Ok(())
    }

    async fn handle_unsafe_block(&self, block: &BlockInfo) -> Result<(), ManagedNodeError> {
        debug!(target: "supervisor::syncnode", chain_id = self.chain_id, block_number = block.number, "Unsafe block");
        self.forward(ChainEvent::UnsafeBlock { block: *block }).await
    }

    async fn handle_derivation_update(
        &self,
        derived_ref_pair: &DerivedRefPair,
    ) -> Result<(), ManagedNodeError> {
        debug!(
            target: "supervisor::syncnode",
            chain_id = self.chain_id,
            block_number = derived_ref_pair.derived.number,
            "Derivation update"
        );
        self.forward(ChainEvent::DerivedBlock { derived_ref_pair: *derived_ref_pair }).await
    }

    async fn handle_derivation_origin_update(
        &self,
        origin: &BlockInfo,
    ) -> Result<(), ManagedNodeError> {
        debug!(target: "supervisor::syncnode", chain_id = self.chain_id, block_number = origin.number, "Derivation origin update");
        self.forward(ChainEvent::DerivationOriginUpdate { origin: *origin }).await
    }

    async fn handle_exhaust_l1(
        &self,
        derived_ref_pair: &DerivedRefPair,
    ) -> Result<(), ManagedNodeError> {
        info!(
            target: "supervisor::syncnode",
            chain_id = self.chain_id,
            l1_block_number = derived_ref_pair.source.number,
            "Node exhausted L1"
        );
        self.forward(ChainEvent::ExhaustedL1 { derived_ref_pair: *derived_ref_pair }).await
    }

    async fn handle_replace_block(
        &self,
        replacement: &BlockReplacement,
    ) -> Result<(), ManagedNodeError> {
        info!(
            target: "supervisor::syncnode",
            chain_id = self.chain_id,
            block_number = replacement.replacement.number,
            invalidated = %replacement.invalidated,
            "Block replaced"
        );
        self.forward(ChainEvent::BlockReplaced { replacement: *replacement }).await
    }
}

#[async_trait]
impl<DB, C> ManagedNodeController for ManagedNode<DB, C>
where
    DB: LogStorageReader + DerivationStorageReader + HeadRefStorageReader + Send + Sync + Debug + 'static,
    C: ManagedNodeClient + 'static,
{
    async fn update_finalized(
        &self,
        finalized_block_id: BlockNumHash,
    ) -> Result<(), ManagedNodeError> {
        self.client.update_finalized(finalized_block_id).await?;
        Ok(())
    }

    async fn update_cross_unsafe(
        &self,
        cross_unsafe_block_id: BlockNumHash,
    ) -> Result<(), ManagedNodeError> {
        self.client.update_cross_unsafe(cross_unsafe_block_id).await?;
        Ok(())
    }

    async fn update_cross_safe(
        &self,
        source_block_id: BlockNumHash,
        derived_block_id: BlockNumHash,
    ) -> Result<(), ManagedNodeError> {
        self.client.update_cross_safe(source_block_id, derived_block_id).await?;
        Ok(())
    }

    async fn reset(&self) -> Result<(), ManagedNodeError> {
        self.resetter.reset().await?;
        Ok(())
    }

    async fn invalidate_block(&self, seal: BlockSeal) -> Result<(), ManagedNodeError> {
        self.client.invalidate_block(seal).await?;
        Ok(())
    }

    async fn provide_l1(&self, block: BlockInfo) -> Result<(), ManagedNodeError> {
        self.client.provide_l1(block).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syncnode::{
        ResetterConfig,
        mocks::{MockDb, MockNodeClient, supervisor_block},
    };
    use crate::syncnode::ClientError;
    use alloy_primitives::B256;
    use jsonrpsee::core::client::Subscription;
    use kona_interop::{L2BlockInfo, ManagedEvent, OutputV0, Receipts, SuperHead};
    use kona_supervisor_storage::StorageError;
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    fn managed_node(
        client: MockNodeClient,
        db: MockDb,
    ) -> (ManagedNode<MockDb, MockNodeClient>, mpsc::Receiver<ChainEvent>) {
        let client = Arc::new(client);
        let resetter =
            Arc::new(Resetter::new(901, client.clone(), Arc::new(db), ResetterConfig::default()));
        let (event_tx, event_rx) = mpsc::channel(8);
        (ManagedNode::new(901, client, resetter, event_tx), event_rx)
    }

    #[tokio::test]
    async fn test_events_are_forwarded_to_chain_processor() {
        let (node, mut event_rx) = managed_node(MockNodeClient::new(), MockDb::new());

        let block = supervisor_block(3);
        node.handle_unsafe_block(&block).await.unwrap();
        assert_eq!(event_rx.recv().await, Some(ChainEvent::UnsafeBlock { block }));

        let pair = DerivedRefPair::new(supervisor_block(1), block);
        node.handle_exhaust_l1(&pair).await.unwrap();
        assert_eq!(event_rx.recv().await, Some(ChainEvent::ExhaustedL1 { derived_ref_pair: pair }));

        let replacement = BlockReplacement::new(block, B256::repeat_byte(0x0d));
        node.handle_replace_block(&replacement).await.unwrap();
        assert_eq!(event_rx.recv().await, Some(ChainEvent::BlockReplaced { replacement }));
    }

    #[tokio::test]
    async fn test_forward_fails_without_receiver() {
        let (node, event_rx) = managed_node(MockNodeClient::new(), MockDb::new());
        drop(event_rx);

        let err = node.handle_derivation_origin_update(&supervisor_block(1)).await.unwrap_err();
        assert!(matches!(err, ManagedNodeError::ChannelSendFailed));
    }

    #[tokio::test]
    async fn test_reset_event_runs_reset() {
        let mut db = MockDb::new();
        db.expect_get_activation_block().returning(|| Err(StorageError::DatabaseNotInitialised));
        let (reset_tx, mut reset_rx) = mpsc::unbounded_channel();
        let mut client = MockNodeClient::new();
        client.expect_reset_pre_interop().times(1).returning(move || {
            reset_tx.send(()).unwrap();
            Ok(())
        });

        let (node, _event_rx) = managed_node(client, db);
        node.handle_reset("engine reset").await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), reset_rx.recv()).await.unwrap().unwrap();
    }

    /// Answers block queries from the supervisor's chain, except the first one, which never
    /// completes.
    #[derive(Debug)]
    struct FirstQueryHangs {
        queries: AtomicUsize,
        reset_tx: mpsc::UnboundedSender<BlockNumHash>,
    }

    #[async_trait]
    impl ManagedNodeClient for FirstQueryHangs {
        async fn chain_id(&self) -> Result<ChainId, ClientError> {
            Ok(901)
        }
        async fn subscribe_events(&self) -> Result<Subscription<ManagedEvent>, ClientError> {
            Err(ClientError::Timeout)
        }
        async fn fetch_receipts(&self, _: B256) -> Result<Receipts, ClientError> {
            Err(ClientError::BlockNotFound)
        }
        async fn output_v0_at_timestamp(&self, _: u64) -> Result<OutputV0, ClientError> {
            Err(ClientError::BlockNotFound)
        }
        async fn pending_output_v0_at_timestamp(&self, _: u64) -> Result<OutputV0, ClientError> {
            Err(ClientError::BlockNotFound)
        }
        async fn l2_block_ref_by_timestamp(&self, _: u64) -> Result<L2BlockInfo, ClientError> {
            Err(ClientError::BlockNotFound)
        }
        async fn block_ref_by_number(&self, block_number: u64) -> Result<BlockInfo, ClientError> {
            if self.queries.fetch_add(1, Ordering::SeqCst) == 0 {
                std::future::pending::<()>().await;
            }
            Ok(supervisor_block(block_number))
        }
        async fn anchor_point(&self) -> Result<DerivedRefPair, ClientError> {
            Err(ClientError::InteropInactive)
        }
        async fn reset_pre_interop(&self) -> Result<(), ClientError> {
            Ok(())
        }
        async fn reset(
            &self,
            unsafe_id: BlockNumHash,
            _: BlockNumHash,
            _: BlockNumHash,
            _: BlockNumHash,
            _: BlockNumHash,
        ) -> Result<(), ClientError> {
            let _ = self.reset_tx.send(unsafe_id);
            Ok(())
        }
        async fn invalidate_block(&self, _: BlockSeal) -> Result<(), ClientError> {
            Ok(())
        }
        async fn provide_l1(&self, _: BlockInfo) -> Result<(), ClientError> {
            Ok(())
        }
        async fn update_finalized(&self, _: BlockNumHash) -> Result<(), ClientError> {
            Ok(())
        }
        async fn update_cross_unsafe(&self, _: BlockNumHash) -> Result<(), ClientError> {
            Ok(())
        }
        async fn update_cross_safe(
            &self,
            _: BlockNumHash,
            _: BlockNumHash,
        ) -> Result<(), ClientError> {
            Ok(())
        }
        async fn reset_ws_client(&self) {}
    }

    #[tokio::test]
    async fn test_reset_event_supersedes_in_flight_reset() {
        let mut db = MockDb::new();
        db.expect_get_activation_block().returning(|| Ok(supervisor_block(1)));
        db.expect_get_safety_head_ref().returning(|_| Ok(supervisor_block(10)));
        db.expect_get_super_head().returning(|| {
            Ok(SuperHead { local_unsafe: Some(supervisor_block(12)), ..Default::default() })
        });

        let (reset_tx, mut reset_rx) = mpsc::unbounded_channel();
        let client = Arc::new(FirstQueryHangs { queries: AtomicUsize::new(0), reset_tx });
        let resetter =
            Arc::new(Resetter::new(901, client.clone(), Arc::new(db), ResetterConfig::default()));
        let (event_tx, _event_rx) = mpsc::channel(8);
        let node = ManagedNode::new(901, client, resetter, event_tx);

        // The first reset hangs on its first query; handling the event must not wait for it.
        node.handle_reset("first").await.unwrap();
        tokio::task::yield_now().await;
        node.handle_reset("second").await.unwrap();

        let applied =
            tokio::time::timeout(Duration::from_secs(5), reset_rx.recv()).await.unwrap().unwrap();
        assert_eq!(applied, supervisor_block(10).id());
        assert!(reset_rx.try_recv().is_err(), "the superseded reset never completes");
    }

    #[tokio::test]
    async fn test_cross_safe_update_is_relayed() {
        let source = supervisor_block(2).id();
        let derived = supervisor_block(5).id();
        let mut client = MockNodeClient::new();
        client
            .expect_update_cross_safe()
            .withf(move |s, d| *s == source && *d == derived)
            .times(1)
            .returning(|_, _| Ok(()));

        let (node, _event_rx) = managed_node(client, MockDb::new());
        node.update_cross_safe(source, derived).await.unwrap();
    }
}
