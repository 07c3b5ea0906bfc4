//! API endpoint handlers.
//!
//! Each module corresponds to one feature of the form. Handlers stay thin:
//! they resolve credentials and state, then call into `pipeline` and
//! `archive`.

pub mod health;
pub mod history;
pub mod intake;
pub mod interviews;
pub mod reports;
pub mod translate;
