//! Generative model access: request types, the client trait, the Gemini
//! HTTP client and a scripted mock.

pub mod gemini;
pub mod mock;
pub mod types;

pub use gemini::*;
pub use mock::*;
pub use types::*;

use thiserror::Error;

/// Failures of a single model call.
///
/// Three families matter to callers: credential errors (the UI re-prompts
/// for a key and replays the action), transport/provider errors and
/// validation errors (both shown as a generic failure).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("No API key provided. Enter your API key to use AI features.")]
    MissingApiKey,

    #[error("The API key was rejected by the model provider.")]
    InvalidApiKey,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Model provider returned an error (HTTP {status}): {message}")]
    Provider { status: u16, message: String },

    #[error("Model returned no content")]
    EmptyResponse,

    #[error("Model response failed validation: {0}")]
    Validation(String),
}

impl ModelError {
    /// Missing or rejected API key.
    pub fn is_credential(&self) -> bool {
        matches!(self, Self::MissingApiKey | Self::InvalidApiKey)
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingApiKey => "API_KEY_REQUIRED",
            Self::InvalidApiKey => "API_KEY_INVALID",
            Self::Network(_) => "MODEL_UNREACHABLE",
            Self::Provider { .. } => "MODEL_PROVIDER_ERROR",
            Self::EmptyResponse => "MODEL_EMPTY_RESPONSE",
            Self::Validation(_) => "MODEL_INVALID_RESPONSE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_errors_are_distinct() {
        assert!(ModelError::MissingApiKey.is_credential());
        assert!(ModelError::InvalidApiKey.is_credential());
        assert!(!ModelError::Network("down".into()).is_credential());
        assert!(!ModelError::Validation("bad".into()).is_credential());
        assert!(!ModelError::Provider {
            status: 500,
            message: "oops".into()
        }
        .is_credential());
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(ModelError::MissingApiKey.code(), "API_KEY_REQUIRED");
        assert_eq!(ModelError::InvalidApiKey.code(), "API_KEY_INVALID");
        assert_eq!(ModelError::EmptyResponse.code(), "MODEL_EMPTY_RESPONSE");
    }
}
