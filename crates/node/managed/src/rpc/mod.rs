//! The authenticated interop RPC endpoint.

mod auth;
pub use auth::{JwtAuthLayer, JwtAuthMiddleware};

mod server;
pub use server::ManagedModeRpc;
