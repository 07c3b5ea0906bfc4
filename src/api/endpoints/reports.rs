//! Stateless report endpoint.
//!
//! `POST /api/reports`: report from patient details plus a turn list the
//! caller already holds (e.g. an interview kept client-side).

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{Extension, Json};
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::middleware::RequestCredentials;
use crate::api::types::{ApiContext, ReportOptions, ReportResponse};
use crate::archive::SessionArchive;
use crate::models::{ConversationTurn, PatientDetails};
use crate::pipeline::{ReportOrchestrator, Transcript};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub patient_details: PatientDetails,
    #[serde(default)]
    pub transcript: Vec<ConversationTurn>,
    #[serde(flatten)]
    pub options: ReportOptions,
}

/// `POST /api/reports`
pub async fn generate(
    State(ctx): State<ApiContext>,
    Extension(creds): Extension<RequestCredentials>,
    payload: Result<Json<ReportRequest>, JsonRejection>,
) -> Result<Json<ReportResponse>, ApiError> {
    let Json(body) = payload?;
    body.patient_details
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    let client = ctx.core.model_client(creds.api_key())?;

    let transcript = Transcript::new(&body.patient_details, &body.transcript);
    let report = ReportOrchestrator::new(client.as_ref())
        .with_language_preference(body.options.language_preference)
        .generate(&transcript)
        .await?;

    let history_id = if body.options.save {
        let conn = ctx.core.open_db()?;
        let entry = SessionArchive::new(&conn).save(body.patient_details, report.clone())?;
        Some(entry.id)
    } else {
        None
    };

    Ok(Json(ReportResponse { report, history_id }))
}
