//! API middleware.
//!
//! Execution order (outermost → innermost):
//! 1. CORS (configured origin only)
//! 2. HTTP trace (method, path, status, latency)
//! 3. Credential extraction
//! 4. Access token check (all routes but `/health`)

pub mod auth;
pub mod credentials;

pub use auth::require_access_token;
pub use credentials::{extract_credentials, RequestCredentials, API_KEY_HEADER};
