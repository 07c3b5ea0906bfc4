//! Session archive endpoints.
//!
//! - `GET    /api/history`: all entries, newest first
//! - `POST   /api/history`: save patient details + report
//! - `DELETE /api/history`: clear
//! - `GET    /api/history/:id`
//! - `DELETE /api/history/:id`

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::archive::SessionArchive;
use crate::models::{HistoryEntry, PatientDetails, Report};

/// `GET /api/history`
pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    let conn = ctx.core.open_db()?;
    let entries = SessionArchive::new(&conn).list()?;
    Ok(Json(entries))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    pub patient_details: PatientDetails,
    pub report: Report,
}

/// `POST /api/history`
pub async fn save(
    State(ctx): State<ApiContext>,
    payload: Result<Json<SaveRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<HistoryEntry>), ApiError> {
    let Json(body) = payload?;
    let conn = ctx.core.open_db()?;
    let entry = SessionArchive::new(&conn).save(body.patient_details, body.report)?;
    Ok((StatusCode::CREATED, Json(entry)))
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub removed: usize,
}

/// `DELETE /api/history`
pub async fn clear(State(ctx): State<ApiContext>) -> Result<Json<ClearResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    let removed = SessionArchive::new(&conn).clear()?;
    Ok(Json(ClearResponse { removed }))
}

/// `GET /api/history/:id`
pub async fn get(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<HistoryEntry>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(SessionArchive::new(&conn).get(&id)?))
}

/// `DELETE /api/history/:id`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let conn = ctx.core.open_db()?;
    SessionArchive::new(&conn).delete(&id)?;
    Ok(StatusCode::NO_CONTENT)
}
