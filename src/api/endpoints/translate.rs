//! `POST /api/translate`: single-shot clinical translation.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::middleware::RequestCredentials;
use crate::api::types::ApiContext;
use crate::models::enums::Language;
use crate::pipeline::Translator;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRequest {
    pub text: String,
    pub target_language: Language,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateResponse {
    pub translated_text: String,
}

pub async fn translate(
    State(ctx): State<ApiContext>,
    Extension(creds): Extension<RequestCredentials>,
    payload: Result<Json<TranslateRequest>, JsonRejection>,
) -> Result<Json<TranslateResponse>, ApiError> {
    let Json(body) = payload?;
    if body.text.trim().is_empty() {
        return Err(ApiError::Validation("Nothing to translate".into()));
    }
    let client = ctx.core.model_client(creds.api_key())?;

    let translated_text = Translator::new(client.as_ref())
        .translate(&body.text, body.target_language)
        .await?;
    Ok(Json(TranslateResponse { translated_text }))
}
