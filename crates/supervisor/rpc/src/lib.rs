//! The `interop` JSON-RPC namespace a rollup node exposes to the supervisor while running in
//! managed mode, together with the error codes both sides agree on.

mod error;
pub use error::ManagedModeErrorCode;

#[cfg(feature = "jsonrpsee")]
mod jsonrpsee;
#[cfg(feature = "jsonrpsee")]
pub use jsonrpsee::ManagedModeApiServer;
#[cfg(all(feature = "jsonrpsee", feature = "client"))]
pub use jsonrpsee::ManagedModeApiClient;
