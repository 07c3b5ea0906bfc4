//! API error types with structured JSON responses.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::core_state::CoreError;
use crate::db::DatabaseError;
use crate::pipeline::model::ModelError;
use crate::pipeline::{IntakeError, InterviewError, ReportError, TranslationError};

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
///
/// Credential problems get their own 401 codes so the form can re-prompt
/// for a key and replay the action; every other model problem is a 502.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Access token missing or invalid")]
    Unauthorized,
    #[error("API key required")]
    ApiKeyRequired,
    #[error("API key rejected")]
    ApiKeyInvalid,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Interview not complete")]
    InterviewNotComplete,
    #[error("Invalid interview state: {0}")]
    InvalidState(String),
    #[error("Concurrent modification")]
    Conflict,
    #[error("Model failure: {0}")]
    ModelFailure(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "A valid access token is required".to_string(),
            ),
            ApiError::ApiKeyRequired => (
                StatusCode::UNAUTHORIZED,
                "API_KEY_REQUIRED",
                "An API key is required. Provide it in the X-Api-Key header.".to_string(),
            ),
            ApiError::ApiKeyInvalid => (
                StatusCode::UNAUTHORIZED,
                "API_KEY_INVALID",
                "The API key was rejected by the AI service. Please enter a valid key."
                    .to_string(),
            ),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail.clone()),
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail.clone())
            }
            ApiError::Validation(detail) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION_FAILED",
                detail.clone(),
            ),
            ApiError::InterviewNotComplete => (
                StatusCode::CONFLICT,
                "INTERVIEW_NOT_COMPLETE",
                "Finish the interview before generating a report".to_string(),
            ),
            ApiError::InvalidState(detail) => {
                (StatusCode::CONFLICT, "INVALID_STATE", detail.clone())
            }
            ApiError::Conflict => (
                StatusCode::CONFLICT,
                "CONFLICT",
                "The interview changed while this request was running; reload and retry"
                    .to_string(),
            ),
            ApiError::ModelFailure(detail) => {
                tracing::warn!(detail, "Model failure");
                (
                    StatusCode::BAD_GATEWAY,
                    "MODEL_FAILURE",
                    "The AI service did not return a usable response. Please try again."
                        .to_string(),
                )
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

impl From<ModelError> for ApiError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::MissingApiKey => ApiError::ApiKeyRequired,
            ModelError::InvalidApiKey => ApiError::ApiKeyInvalid,
            other => ApiError::ModelFailure(format!("{}: {other}", other.code())),
        }
    }
}

impl From<InterviewError> for ApiError {
    fn from(err: InterviewError) -> Self {
        match err {
            InterviewError::Model(e) => e.into(),
            InterviewError::InvalidIntake(e) => ApiError::Validation(e.to_string()),
            InterviewError::EmptyAnswer => ApiError::Validation(err.to_string()),
            InterviewError::TurnNotFound(_) => ApiError::NotFound(err.to_string()),
            InterviewError::NotAnAnswer(_) => ApiError::BadRequest(err.to_string()),
            InterviewError::AlreadyComplete | InterviewError::InvalidTransition { .. } => {
                ApiError::InvalidState(err.to_string())
            }
        }
    }
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::InterviewNotComplete => ApiError::InterviewNotComplete,
            ReportError::Generation { section, source } => match source {
                ModelError::MissingApiKey | ModelError::InvalidApiKey => source.into(),
                other => ApiError::ModelFailure(format!("{section}: {other}")),
            },
        }
    }
}

impl From<IntakeError> for ApiError {
    fn from(err: IntakeError) -> Self {
        match err {
            IntakeError::Model(e) => e.into(),
            other => ApiError::Validation(other.to_string()),
        }
    }
}

impl From<TranslationError> for ApiError {
    fn from(err: TranslationError) -> Self {
        match err {
            TranslationError::Model(e) => e.into(),
            TranslationError::EmptyInput => ApiError::Validation(err.to_string()),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InterviewNotFound(id) => {
                ApiError::NotFound(format!("Interview {id} not found"))
            }
            CoreError::Conflict(_) => ApiError::Conflict,
            CoreError::Model(e) => e.into(),
            CoreError::Database(e) => e.into(),
            CoreError::LockPoisoned => ApiError::Internal("lock poisoned".into()),
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { entity_type, id } => {
                ApiError::NotFound(format!("{entity_type} {id} not found"))
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
