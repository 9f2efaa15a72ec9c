//! Client for the managed-mode API of a node.

use crate::syncnode::{ClientError, ManagedNodeError};
use alloy_eips::BlockNumHash;
use alloy_primitives::{B256, ChainId};
use alloy_rpc_types_engine::{Claims, JwtSecret};
use async_trait::async_trait;
use jsonrpsee::{
    core::client::Subscription,
    ws_client::{HeaderMap, HeaderValue, WsClient, WsClientBuilder},
};
use kona_interop::{
    BlockInfo, BlockSeal, DerivedRefPair, L2BlockInfo, ManagedEvent, OutputV0, Receipts,
};
use kona_supervisor_rpc::ManagedModeApiClient;
use serde::{Deserialize, Serialize};
use std::{
    fmt::Debug,
    future::Future,
    path::PathBuf,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tokio::sync::Mutex;
use tracing::{error, info};

/// Configuration for the connection to a managed node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedNodeConfig {
    /// The URL + port of the managed node.
    pub url: String,
    /// The path to the JWT secret shared with the managed node.
    pub jwt_path: PathBuf,
    /// Deadline for a single request to the node.
    #[serde(default = "ManagedNodeConfig::default_request_timeout")]
    pub request_timeout: Duration,
}

impl ManagedNodeConfig {
    /// Default deadline for a single request to the node.
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

    /// Creates a new [`ManagedNodeConfig`] with the default request timeout.
    pub fn new(url: impl Into<String>, jwt_path: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            jwt_path: jwt_path.into(),
            request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
        }
    }

    const fn default_request_timeout() -> Duration {
        Self::DEFAULT_REQUEST_TIMEOUT
    }

    /// Reads the hex encoded JWT secret from [`Self::jwt_path`].
    pub fn jwt_secret(&self) -> Result<JwtSecret, ManagedNodeError> {
        let secret = std::fs::read_to_string(&self.jwt_path).map_err(|err| {
            ManagedNodeError::Jwt(format!("{}: {err}", self.jwt_path.display()))
        })?;
        JwtSecret::from_hex(secret.trim()).map_err(|err| ManagedNodeError::Jwt(err.to_string()))
    }

    /// Returns the websocket URL of the node.
    pub fn ws_url(&self) -> String {
        if self.url.starts_with("ws://") || self.url.starts_with("wss://") {
            self.url.clone()
        } else {
            format!("ws://{}", self.url)
        }
    }
}

/// The managed-mode API of a node, as used by the supervisor.
#[async_trait]
pub trait ManagedNodeClient: Send + Sync + Debug {
    /// Returns the chain id of the node.
    async fn chain_id(&self) -> Result<ChainId, ClientError>;

    /// Subscribes to the events of the node.
    async fn subscribe_events(&self) -> Result<Subscription<ManagedEvent>, ClientError>;

    /// Returns the receipts of the block with the given hash.
    async fn fetch_receipts(&self, block_hash: B256) -> Result<Receipts, ClientError>;

    /// Returns the output of the block at `timestamp`.
    async fn output_v0_at_timestamp(&self, timestamp: u64) -> Result<OutputV0, ClientError>;

    /// Returns the pre-invalidation output of the block at `timestamp`.
    async fn pending_output_v0_at_timestamp(&self, timestamp: u64)
    -> Result<OutputV0, ClientError>;

    /// Returns the L2 block at `timestamp`.
    async fn l2_block_ref_by_timestamp(&self, timestamp: u64) -> Result<L2BlockInfo, ClientError>;

    /// Returns the canonical block at `block_number`.
    async fn block_ref_by_number(&self, block_number: u64) -> Result<BlockInfo, ClientError>;

    /// Returns the genesis `(L1, L2)` pair of the node.
    async fn anchor_point(&self) -> Result<DerivedRefPair, ClientError>;

    /// Resets the node to its pre-interop state.
    async fn reset_pre_interop(&self) -> Result<(), ClientError>;

    /// Resets the node heads to the given targets.
    async fn reset(
        &self,
        unsafe_id: BlockNumHash,
        cross_unsafe_id: BlockNumHash,
        local_safe_id: BlockNumHash,
        cross_safe_id: BlockNumHash,
        finalised_id: BlockNumHash,
    ) -> Result<(), ClientError>;

    /// Invalidates the block sealed by `seal`.
    async fn invalidate_block(&self, seal: BlockSeal) -> Result<(), ClientError>;

    /// Hands the next L1 block to the node.
    async fn provide_l1(&self, block_info: BlockInfo) -> Result<(), ClientError>;

    /// Promotes a block to finalized.
    async fn update_finalized(&self, finalized_block_id: BlockNumHash) -> Result<(), ClientError>;

    /// Promotes a block to cross-unsafe.
    async fn update_cross_unsafe(
        &self,
        cross_unsafe_block_id: BlockNumHash,
    ) -> Result<(), ClientError>;

    /// Promotes a block to cross-safe.
    async fn update_cross_safe(
        &self,
        source_block_id: BlockNumHash,
        derived_block_id: BlockNumHash,
    ) -> Result<(), ClientError>;

    /// Drops the current connection; the next call reconnects.
    async fn reset_ws_client(&self);
}

/// [`ManagedNodeClient`] over an authenticated websocket.
///
/// The connection is opened on first use and every call is bounded by
/// [`ManagedNodeConfig::request_timeout`].
#[derive(Debug)]
pub struct Client {
    config: ManagedNodeConfig,
    jwt_secret: JwtSecret,
    ws_client: Mutex<Option<Arc<WsClient>>>,
}

impl Client {
    /// Creates a new [`Client`], loading the JWT secret from the configured path.
    pub fn new(config: ManagedNodeConfig) -> Result<Self, ManagedNodeError> {
        let jwt_secret = config.jwt_secret()?;
        Ok(Self::with_secret(config, jwt_secret))
    }

    /// Creates a new [`Client`] with an already loaded JWT secret.
    pub fn with_secret(config: ManagedNodeConfig, jwt_secret: JwtSecret) -> Self {
        Self { config, jwt_secret, ws_client: Mutex::new(None) }
    }

    /// Builds the `Authorization` header with a freshly issued token.
    fn auth_headers(&self) -> Result<HeaderMap, ClientError> {
        let iat = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|err| ClientError::Authentication(err.to_string()))?
            .as_secs();
        let token = self
            .jwt_secret
            .encode(&Claims { iat, exp: None })
            .map_err(|err| ClientError::Authentication(err.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|err| ClientError::Authentication(err.to_string()))?,
        );
        Ok(headers)
    }

    async fn ws_client(&self) -> Result<Arc<WsClient>, ClientError> {
        let mut ws_client = self.ws_client.lock().await;
        if let Some(client) = ws_client.as_ref() {
            return Ok(client.clone());
        }

        let ws_url = self.config.ws_url();
        info!(target: "supervisor::syncnode", %ws_url, "Connecting to managed node");
        let client = WsClientBuilder::default()
            .set_headers(self.auth_headers()?)
            .request_timeout(self.config.request_timeout)
            .connection_timeout(self.config.request_timeout)
            .build(&ws_url)
            .await
            .inspect_err(|err| {
                error!(target: "supervisor::syncnode", %ws_url, %err, "Failed to connect to managed node");
            })?;

        let client = Arc::new(client);
        *ws_client = Some(client.clone());
        Ok(client)
    }

    async fn call<T, F, Fut>(&self, f: F) -> Result<T, ClientError>
    where
        F: FnOnce(Arc<WsClient>) -> Fut + Send,
        Fut: Future<Output = Result<T, jsonrpsee::core::ClientError>> + Send,
        T: Send,
    {
        let client = self.ws_client().await?;
        tokio::time::timeout(self.config.request_timeout, f(client))
            .await
            .map_err(|_| ClientError::Timeout)?
            .map_err(ClientError::from)
    }
}

#[async_trait]
impl ManagedNodeClient for Client {
    async fn chain_id(&self) -> Result<ChainId, ClientError> {
        self.call(|c| async move { ManagedModeApiClient::chain_id(&*c).await }).await
    }

    async fn subscribe_events(&self) -> Result<Subscription<ManagedEvent>, ClientError> {
        self.call(|c| async move { ManagedModeApiClient::subscribe_events(&*c).await }).await
    }

    async fn fetch_receipts(&self, block_hash: B256) -> Result<Receipts, ClientError> {
        self.call(|c| async move { ManagedModeApiClient::fetch_receipts(&*c, block_hash).await })
            .await
    }

    async fn output_v0_at_timestamp(&self, timestamp: u64) -> Result<OutputV0, ClientError> {
        self.call(|c| async move {
            ManagedModeApiClient::output_v0_at_timestamp(&*c, timestamp).await
        })
        .await
    }

    async fn pending_output_v0_at_timestamp(
        &self,
        timestamp: u64,
    ) -> Result<OutputV0, ClientError> {
        self.call(|c| async move {
            ManagedModeApiClient::pending_output_v0_at_timestamp(&*c, timestamp).await
        })
        .await
    }

    async fn l2_block_ref_by_timestamp(&self, timestamp: u64) -> Result<L2BlockInfo, ClientError> {
        self.call(|c| async move {
            ManagedModeApiClient::l2_block_ref_by_timestamp(&*c, timestamp).await
        })
        .await
    }

    async fn block_ref_by_number(&self, block_number: u64) -> Result<BlockInfo, ClientError> {
        self.call(|c| async move {
            ManagedModeApiClient::block_ref_by_number(&*c, block_number).await
        })
        .await
    }

    async fn anchor_point(&self) -> Result<DerivedRefPair, ClientError> {
        self.call(|c| async move { ManagedModeApiClient::anchor_point(&*c).await }).await
    }

    async fn reset_pre_interop(&self) -> Result<(), ClientError> {
        self.call(|c| async move { ManagedModeApiClient::reset_pre_interop(&*c).await }).await
    }

    async fn reset(
        &self,
        unsafe_id: BlockNumHash,
        cross_unsafe_id: BlockNumHash,
        local_safe_id: BlockNumHash,
        cross_safe_id: BlockNumHash,
        finalised_id: BlockNumHash,
    ) -> Result<(), ClientError> {
        self.call(|c| async move {
            ManagedModeApiClient::reset(
                &*c,
                unsafe_id,
                cross_unsafe_id,
                local_safe_id,
                cross_safe_id,
                finalised_id,
            )
            .await
        })
        .await
    }

    async fn invalidate_block(&self, seal: BlockSeal) -> Result<(), ClientError> {
        self.call(|c| async move { ManagedModeApiClient::invalidate_block(&*c, seal).await })
            .await
    }

    async fn provide_l1(&self, block_info: BlockInfo) -> Result<(), ClientError> {
        self.call(|c| async move { ManagedModeApiClient::provide_l1(&*c, block_info).await })
            .await
    }

    async fn update_finalized(&self, finalized_block_id: BlockNumHash) -> Result<(), ClientError> {
        self.call(|c| async move {
            ManagedModeApiClient::update_finalized(&*c, finalized_block_id).await
        })
        .await
    }

    async fn update_cross_unsafe(
        &self,
        cross_unsafe_block_id: BlockNumHash,
    ) -> Result<(), ClientError> {
        self.call(|c| async move {
            ManagedModeApiClient::update_cross_unsafe(&*c, cross_unsafe_block_id).await
        })
        .await
    }

    async fn update_cross_safe(
        &self,
        source_block_id: BlockNumHash,
        derived_block_id: BlockNumHash,
    ) -> Result<(), ClientError> {
        self.call(|c| async move {
            ManagedModeApiClient::update_cross_safe(&*c, derived_block_id, source_block_id).await
        })
        .await
    }

    async fn reset_ws_client(&self) {
        let mut ws_client = self.ws_client.lock().await;
        if ws_client.take().is_some() {
            info!(target: "supervisor::syncnode", "Dropped websocket connection to managed node");
        }
    }
}
