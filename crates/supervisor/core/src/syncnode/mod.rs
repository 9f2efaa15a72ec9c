//! Communication with a node running in managed mode.

mod command;
pub use command::ManagedNodeCommand;

mod error;
pub use error::{ClientError, ManagedNodeError};

mod traits;
pub use traits::{ManagedNodeController, SubscriptionHandler};

mod client;
pub use client::{Client, ManagedNodeClient, ManagedNodeConfig};

mod reset_tracker;
pub use reset_tracker::{BisectionOutcome, ResetTarget, ResetTracker};

mod resetter;
pub use resetter::{ResetOutcome, Resetter, ResetterConfig};

mod node;
pub use node::ManagedNode;

mod actor;
pub use actor::ManagedNodeActor;

mod metrics;
pub(crate) use metrics::Metrics;

mod utils;

#[cfg(test)]
pub(crate) mod mocks;
