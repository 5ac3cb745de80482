//! HTTP surface: one POST route per function plus `/health`.
//!
//! Handlers validate their collaborators first, so a missing secret fails
//! the request before any model, store or push call is made.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::relay_router;
pub use server::{start_relay_server, RelayServer};
pub use types::{ApiContext, ContextError};
