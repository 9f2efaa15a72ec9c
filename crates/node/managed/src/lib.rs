//! Node side of the managed-mode protocol.
//!
//! A rollup node running in managed mode hands control over its cross-chain safety to the
//! supervisor. The [`ManagedModeSession`] turns the node's pipeline events into
//! [`ManagedEvent`](kona_interop::ManagedEvent)s for the supervisor, validates the supervisor's
//! commands against the node's stores and forwards them to the pipeline as [`InteropRequest`]s.
//! [`ManagedModeRpc`] serves the session over JWT-authenticated JSON-RPC.

mod config;
pub use config::{DedupConfig, Genesis, ManagedModeConfig, RollupConfig};

mod error;
pub use error::{ManagedModeError, StoreError};

mod traits;
pub use traits::{L1BlockStore, L2BlockStore, L2Payload};

mod events;
pub use events::{InteropLifecycleEvent, InteropRequest, ReplacementBlock};

mod queue;
pub use queue::EventQueue;

mod state;
pub use state::SessionState;

mod session;
pub use session::ManagedModeSession;

pub mod replacement;

mod rpc;
pub use rpc::{JwtAuthLayer, JwtAuthMiddleware, ManagedModeRpc};

mod dedup;
mod metrics;
mod search;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
