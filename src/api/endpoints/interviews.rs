//! Interview endpoints.
//!
//! - `POST   /api/interviews`: validate intake, create session, first question
//! - `GET    /api/interviews/:id`: current session
//! - `POST   /api/interviews/:id/next`: request (or retry) the next action
//! - `POST   /api/interviews/:id/answers`: record an answer, then next action
//! - `POST   /api/interviews/:id/turns/:index/translate`: translate an answer
//! - `POST   /api/interviews/:id/report`: report for a complete interview (saving also drops it from memory)
//! - `DELETE /api/interviews/:id`
//!
//! Registry updates follow snapshot → model call → `replace_interview`, so
//! no lock is held while the model runs.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::middleware::RequestCredentials;
use crate::api::types::{ApiContext, ReportOptions, ReportResponse};
use crate::archive::SessionArchive;
use crate::models::enums::Language;
use crate::models::PatientDetails;
use crate::pipeline::{
    InterviewController, InterviewSession, ReportError, ReportOrchestrator, Translator,
};

/// `POST /api/interviews`
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(creds): Extension<RequestCredentials>,
    payload: Result<Json<PatientDetails>, JsonRejection>,
) -> Result<(StatusCode, Json<InterviewSession>), ApiError> {
    let Json(details) = payload?;
    details
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    let client = ctx.core.model_client(creds.api_key())?;

    let session = InterviewController::new(client.as_ref())
        .begin(details)
        .await?;
    ctx.core.insert_interview(session.clone())?;

    tracing::info!(session_id = %session.id, "Interview created");
    Ok((StatusCode::CREATED, Json(session)))
}

/// `GET /api/interviews/:id`
pub async fn get(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<InterviewSession>, ApiError> {
    Ok(Json(ctx.core.interview(&id)?))
}

/// `POST /api/interviews/:id/next`
pub async fn next(
    State(ctx): State<ApiContext>,
    Extension(creds): Extension<RequestCredentials>,
    Path(id): Path<Uuid>,
) -> Result<Json<InterviewSession>, ApiError> {
    let client = ctx.core.model_client(creds.api_key())?;
    let snapshot = ctx.core.interview(&id)?;

    let advanced = InterviewController::new(client.as_ref())
        .request_next(&snapshot)
        .await?;
    ctx.core.replace_interview(&snapshot, advanced.clone())?;
    Ok(Json(advanced))
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub text: String,
}

/// `POST /api/interviews/:id/answers`
///
/// The answer is recorded before the model call. If that call fails the
/// session stays `awaiting_question` and `/next` retries it.
pub async fn answer(
    State(ctx): State<ApiContext>,
    Extension(creds): Extension<RequestCredentials>,
    Path(id): Path<Uuid>,
    payload: Result<Json<AnswerRequest>, JsonRejection>,
) -> Result<Json<InterviewSession>, ApiError> {
    let Json(body) = payload?;
    let client = ctx.core.model_client(creds.api_key())?;

    let snapshot = ctx.core.interview(&id)?;
    let answered = snapshot.submit_answer(&body.text)?;
    ctx.core.replace_interview(&snapshot, answered.clone())?;

    let advanced = InterviewController::new(client.as_ref())
        .request_next(&answered)
        .await?;
    ctx.core.replace_interview(&answered, advanced.clone())?;
    Ok(Json(advanced))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateTurnRequest {
    pub target_language: Option<Language>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateTurnResponse {
    pub index: usize,
    pub translated_text: String,
    pub session: InterviewSession,
}

/// `POST /api/interviews/:id/turns/:index/translate`
///
/// Target defaults to Persian. The body is optional.
pub async fn translate_turn(
    State(ctx): State<ApiContext>,
    Extension(creds): Extension<RequestCredentials>,
    Path((id, index)): Path<(Uuid, usize)>,
    payload: Option<Json<TranslateTurnRequest>>,
) -> Result<Json<TranslateTurnResponse>, ApiError> {
    let target = payload
        .and_then(|Json(body)| body.target_language)
        .unwrap_or(Language::Persian);
    let client = ctx.core.model_client(creds.api_key())?;

    let text = ctx.core.interview(&id)?.answer_text(index)?.to_string();
    let translated = Translator::new(client.as_ref())
        .translate(&text, target)
        .await?;

    // Apply to the latest version; later turns do not affect this one.
    let current = ctx.core.interview(&id)?;
    let updated = current.with_answer_translation(index, translated.clone())?;
    ctx.core.replace_interview(&current, updated.clone())?;

    Ok(Json(TranslateTurnResponse {
        index,
        translated_text: translated,
        session: updated,
    }))
}

/// `POST /api/interviews/:id/report`
pub async fn report(
    State(ctx): State<ApiContext>,
    Extension(creds): Extension<RequestCredentials>,
    Path(id): Path<Uuid>,
    payload: Option<Json<ReportOptions>>,
) -> Result<Json<ReportResponse>, ApiError> {
    let options = payload.map(|Json(o)| o).unwrap_or_default();
    let session = ctx.core.interview(&id)?;
    if !session.is_complete() {
        return Err(ReportError::InterviewNotComplete.into());
    }
    let client = ctx.core.model_client(creds.api_key())?;

    let report = ReportOrchestrator::new(client.as_ref())
        .with_language_preference(options.language_preference)
        .generate(&session.transcript())
        .await?;

    // A saved interview lives on in the archive; drop the in-memory copy.
    let history_id = if options.save {
        let conn = ctx.core.open_db()?;
        let entry = SessionArchive::new(&conn).save(session.patient_details, report.clone())?;
        if let Err(e) = ctx.core.remove_interview(&id) {
            tracing::debug!(session_id = %id, error = %e, "Interview already gone after save");
        }
        Some(entry.id)
    } else {
        None
    };

    Ok(Json(ReportResponse { report, history_id }))
}

/// `DELETE /api/interviews/:id`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    ctx.core.remove_interview(&id)?;
    tracing::info!(session_id = %id, "Interview discarded");
    Ok(StatusCode::NO_CONTENT)
}
