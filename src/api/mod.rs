//! Local HTTP API for the intake form.
//!
//! Routes are nested under `/api/`. The caller's model API key travels in
//! the `X-Api-Key` header and is read by the credentials middleware.
//!
//! The router is composable: `api_router()` returns a `Router` that can be
//! mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{start_api_server, start_api_server_on, ApiServer, ServerSession};
pub use types::ApiContext;
