//! Configuration of the managed-mode session.

use crate::ManagedModeError;
use alloy_eips::BlockNumHash;
use alloy_primitives::ChainId;
use alloy_rpc_types_engine::JwtSecret;
use kona_interop::{BlockInfo, ManagedEventKind};
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    time::Duration,
};

/// The blocks the rollup starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Genesis {
    /// The L1 block the rollup is anchored to.
    pub l1: BlockNumHash,
    /// The first L2 block.
    pub l2: BlockNumHash,
    /// Timestamp of the first L2 block.
    pub l2_time: u64,
}

/// The parts of the rollup configuration managed mode depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollupConfig {
    /// The L2 chain id.
    pub l2_chain_id: ChainId,
    /// The genesis anchor.
    pub genesis: Genesis,
    /// Seconds between two L2 blocks.
    pub block_time: u64,
    /// Activation timestamp of interop, `None` if it is not scheduled.
    pub interop_time: Option<u64>,
}

impl Default for RollupConfig {
    fn default() -> Self {
        Self { l2_chain_id: 10, genesis: Genesis::default(), block_time: 2, interop_time: None }
    }
}

impl RollupConfig {
    /// Returns true if interop is active at `timestamp`.
    pub fn is_interop(&self, timestamp: u64) -> bool {
        self.interop_time.is_some_and(|activation| timestamp >= activation)
    }

    /// Returns true if `block` is the first block with interop active.
    ///
    /// Interop activating at genesis makes the genesis block the activation block.
    pub fn is_interop_activation_block(&self, block: &BlockInfo) -> bool {
        self.is_interop(block.timestamp) &&
            (block.timestamp < self.genesis.l2_time + self.block_time ||
                !self.is_interop(block.timestamp - self.block_time))
    }

    /// Returns the number of the L2 block at `timestamp`.
    pub fn target_block_number(&self, timestamp: u64) -> Result<u64, ManagedModeError> {
        if timestamp < self.genesis.l2_time {
            return Err(ManagedModeError::InvalidParams(format!(
                "timestamp {timestamp} is before genesis at {}",
                self.genesis.l2_time
            )));
        }
        if self.block_time == 0 {
            return Err(ManagedModeError::Internal("block time is zero".to_string()));
        }
        Ok(self.genesis.l2.number + (timestamp - self.genesis.l2_time) / self.block_time)
    }
}

/// Per-kind windows in which a repeated `(kind, block)` event is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DedupConfig {
    /// Window for reset requests.
    pub reset: Duration,
    /// Window for unsafe block updates.
    pub unsafe_update: Duration,
    /// Window for local-safe updates.
    pub safe_update: Duration,
    /// Window for L1 origin advances.
    pub l1_traversal: Duration,
    /// Window for L1 exhaustion.
    pub l1_exhausted: Duration,
    /// Window for block replacements.
    pub block_replacement: Duration,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            reset: Duration::from_millis(100),
            unsafe_update: Duration::from_millis(100),
            safe_update: Duration::from_millis(100),
            l1_traversal: Duration::from_millis(500),
            l1_exhausted: Duration::from_millis(500),
            block_replacement: Duration::from_millis(100),
        }
    }
}

impl DedupConfig {
    /// Returns the window for `kind`.
    pub const fn window(&self, kind: ManagedEventKind) -> Duration {
        match kind {
            ManagedEventKind::Reset => self.reset,
            ManagedEventKind::UnsafeUpdate => self.unsafe_update,
            ManagedEventKind::SafeUpdate => self.safe_update,
            ManagedEventKind::L1Traversal => self.l1_traversal,
            ManagedEventKind::ExhaustedL1 => self.l1_exhausted,
            ManagedEventKind::BlockReplacement => self.block_replacement,
        }
    }
}

/// Configuration of the managed-mode session and its RPC endpoint.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedModeConfig {
    /// Address the interop RPC server binds to.
    #[serde(default = "ManagedModeConfig::default_socket")]
    pub socket: SocketAddr,
    /// Path to the hex-encoded JWT secret shared with the supervisor.
    ///
    /// A random secret is generated when unset.
    #[serde(default)]
    pub jwt_path: Option<PathBuf>,
    /// Capacity of the outbound event queue.
    #[serde(default = "ManagedModeConfig::default_queue_capacity")]
    pub queue_capacity: usize,
    /// De-duplication windows.
    #[serde(default)]
    pub dedup: DedupConfig,
    /// Deadline for a single lookup in the node's block stores.
    #[serde(default = "ManagedModeConfig::default_query_timeout")]
    pub query_timeout: Duration,
}

impl Default for ManagedModeConfig {
    fn default() -> Self {
        Self {
            socket: Self::default_socket(),
            jwt_path: None,
            queue_capacity: Self::default_queue_capacity(),
            dedup: DedupConfig::default(),
            query_timeout: Self::default_query_timeout(),
        }
    }
}

impl ManagedModeConfig {
    /// Default capacity of the outbound event queue.
    pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

    const fn default_queue_capacity() -> usize {
        Self::DEFAULT_QUEUE_CAPACITY
    }

    /// Default deadline for a single store lookup.
    pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

    const fn default_query_timeout() -> Duration {
        Self::DEFAULT_QUERY_TIMEOUT
    }

    const fn default_socket() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 9645)
    }

    /// Loads the JWT secret from [`Self::jwt_path`], or generates one.
    pub fn jwt_secret(&self) -> Result<JwtSecret, ManagedModeError> {
        let Some(path) = &self.jwt_path else {
            let secret = JwtSecret::random();
            tracing::warn!(
                target: "managed_mode",
                "No JWT secret configured for the interop RPC, generated a random one"
            );
            return Ok(secret);
        };

        let contents = std::fs::read_to_string(path).map_err(|err| {
            ManagedModeError::Internal(format!("failed to read JWT secret {}: {err}", path.display()))
        })?;
        JwtSecret::from_hex(contents.trim()).map_err(|err| {
            ManagedModeError::Internal(format!("invalid JWT secret {}: {err}", path.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;

    fn config() -> RollupConfig {
        RollupConfig {
            l2_chain_id: 901,
            genesis: Genesis {
                l1: BlockNumHash { number: 10, hash: B256::from([1u8; 32]) },
                l2: BlockNumHash { number: 0, hash: B256::from([2u8; 32]) },
                l2_time: 1000,
            },
            block_time: 2,
            interop_time: Some(1010),
        }
    }

    fn block_at(timestamp: u64) -> BlockInfo {
        BlockInfo::new(B256::ZERO, (timestamp - 1000) / 2, B256::ZERO, timestamp)
    }

    #[test]
    fn test_is_interop() {
        let config = config();
        assert!(!config.is_interop(1008));
        assert!(config.is_interop(1010));
        assert!(config.is_interop(2000));
        assert!(!RollupConfig { interop_time: None, ..config }.is_interop(u64::MAX));
    }

    #[test]
    fn test_is_interop_activation_block() {
        let config = config();
        assert!(!config.is_interop_activation_block(&block_at(1008)));
        assert!(config.is_interop_activation_block(&block_at(1010)));
        assert!(!config.is_interop_activation_block(&block_at(1012)));

        let at_genesis = RollupConfig { interop_time: Some(0), ..config };
        assert!(at_genesis.is_interop_activation_block(&block_at(1000)));
        assert!(!at_genesis.is_interop_activation_block(&block_at(1002)));
    }

    #[test]
    fn test_target_block_number() {
        let config = config();
        assert_eq!(config.target_block_number(1000).unwrap(), 0);
        assert_eq!(config.target_block_number(1003).unwrap(), 1);
        assert_eq!(config.target_block_number(1020).unwrap(), 10);
        assert!(matches!(
            config.target_block_number(999),
            Err(ManagedModeError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_dedup_defaults() {
        let dedup = DedupConfig::default();
        assert_eq!(dedup.window(ManagedEventKind::UnsafeUpdate), Duration::from_millis(100));
        assert_eq!(dedup.window(ManagedEventKind::L1Traversal), Duration::from_millis(500));
        assert_eq!(dedup.window(ManagedEventKind::ExhaustedL1), Duration::from_millis(500));
    }

    #[test]
    fn test_managed_mode_config_defaults() {
        let config: ManagedModeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ManagedModeConfig::default());
        assert_eq!(config.queue_capacity, 100);
        assert_eq!(config.socket.port(), 9645);
        assert_eq!(config.query_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_jwt_secret_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jwt.hex");
        let hex = "f79ae8046bc11c9927afe911db7143c51a806c4a537cc08e0d37140b0192f430";
        std::fs::write(&path, format!("{hex}\n")).unwrap();

        let config = ManagedModeConfig { jwt_path: Some(path), ..Default::default() };
        assert_eq!(config.jwt_secret().unwrap(), JwtSecret::from_hex(hex).unwrap());

        let missing =
            ManagedModeConfig { jwt_path: Some(dir.path().join("missing.hex")), ..Default::default() };
        assert!(matches!(missing.jwt_secret(), Err(ManagedModeError::Internal(_))));
    }
}
