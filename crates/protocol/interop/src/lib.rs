//! Core primitives of the managed-mode interop protocol spoken between a rollup node and the
//! supervisor.
//!
//! Everything in here is plain value data: block identifiers, the ordered [`SafetyLevel`]s,
//! the [`ManagedEvent`]s the node emits and the [`ResetTargets`] the supervisor sends back.

mod block;
pub use block::{BlockInfo, L2BlockInfo};

mod safety;
pub use safety::SafetyLevel;

mod derived;
pub use derived::{BlockReplacement, BlockSeal, DerivedRefPair};

mod event;
pub use event::{ManagedEvent, ManagedEventKind};

mod output;
pub use output::{OutputV0, OutputV0Error};

mod reset;
pub use reset::{ResetOrderingError, ResetTargets, SuperHead};

/// Receipts of a single block, as served to the supervisor.
pub type Receipts = Vec<op_alloy_consensus::OpReceiptEnvelope>;
