//! Document intake endpoint.
//!
//! `POST /api/intake/extract`: read patient details from a photographed
//! form. The image comes as `photoDataUri` or as `data` + `mimeType`. When
//! the current form is supplied the extracted fields are merged into it.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::middleware::RequestCredentials;
use crate::api::types::ApiContext;
use crate::models::PatientDetailsPatch;
use crate::pipeline::{DocumentImage, DocumentIntakeExtractor};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRequest {
    pub photo_data_uri: Option<String>,
    pub data: Option<String>,
    pub mime_type: Option<String>,
    /// Current form values to merge into.
    pub form: Option<PatientDetailsPatch>,
    /// Replace values the user already entered.
    #[serde(default)]
    pub overwrite: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResponse {
    pub extracted: PatientDetailsPatch,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged: Option<PatientDetailsPatch>,
    pub applied_fields: Vec<&'static str>,
}

impl ExtractRequest {
    fn image(&self) -> Result<DocumentImage, ApiError> {
        let image = match (&self.photo_data_uri, &self.data, &self.mime_type) {
            (Some(uri), None, _) => DocumentImage::from_data_uri(uri)?,
            (None, Some(data), Some(mime)) => DocumentImage::from_parts(data, mime)?,
            (None, Some(_), None) => {
                return Err(ApiError::BadRequest("mimeType is required with data".into()))
            }
            (Some(_), Some(_), _) => {
                return Err(ApiError::BadRequest(
                    "Provide either photoDataUri or data, not both".into(),
                ))
            }
            (None, None, _) => {
                return Err(ApiError::BadRequest(
                    "photoDataUri or data + mimeType is required".into(),
                ))
            }
        };
        Ok(image)
    }
}

/// `POST /api/intake/extract`
pub async fn extract(
    State(ctx): State<ApiContext>,
    Extension(creds): Extension<RequestCredentials>,
    payload: Result<Json<ExtractRequest>, JsonRejection>,
) -> Result<Json<ExtractResponse>, ApiError> {
    let Json(body) = payload?;
    let image = body.image()?;
    let client = ctx.core.model_client(creds.api_key())?;

    let extracted = DocumentIntakeExtractor::new(client.as_ref())
        .extract(&image)
        .await?;

    let (merged, applied_fields) = match body.form {
        Some(mut form) => {
            let applied = extracted.merge_into(&mut form, body.overwrite);
            (Some(form), applied)
        }
        None => (None, Vec::new()),
    };

    Ok(Json(ExtractResponse {
        extracted,
        merged,
        applied_fields,
    }))
}
