//! Document intake: read patient details off a photographed form.

use std::sync::LazyLock;

use base64::Engine;
use regex::Regex;
use thiserror::Error;
use tracing::Instrument;

use crate::models::PatientDetailsPatch;

use super::model::{CallKind, GenerationRequest, InlineImage, ModelClient, ModelError};
use super::parser::parse_document_patch;
use super::prompt::{build_document_extraction_prompt, DOCUMENT_EXTRACTION_SYSTEM_PROMPT};

/// Largest accepted image, decoded.
pub const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

static DATA_URI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^data:([A-Za-z0-9.+-]+/[A-Za-z0-9.+-]+)((?:;[A-Za-z0-9=._+-]+)*);base64,(.*)$")
        .unwrap()
});

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntakeError {
    #[error("Expected a data URI of the form data:<mime>;base64,<data>")]
    InvalidDataUri,

    #[error("Unsupported MIME type {0}: only images are accepted")]
    UnsupportedMimeType(String),

    #[error("Image data is not valid base64: {0}")]
    InvalidBase64(String),

    #[error("Image data is empty")]
    EmptyImage,

    #[error("Image is too large ({size} bytes, max {max})")]
    ImageTooLarge { size: usize, max: usize },

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// A validated document image, ready to send inline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentImage {
    mime_type: String,
    data_base64: String,
    decoded_len: usize,
}

impl DocumentImage {
    /// Parse `data:<mime>;base64,<data>`.
    pub fn from_data_uri(uri: &str) -> Result<Self, IntakeError> {
        let caps = DATA_URI
            .captures(uri.trim())
            .ok_or(IntakeError::InvalidDataUri)?;
        let mime = caps.get(1).map_or("", |m| m.as_str());
        let data = caps.get(3).map_or("", |m| m.as_str());
        Self::from_parts(data, mime)
    }

    /// Raw base64 plus MIME type.
    pub fn from_parts(data_base64: &str, mime_type: &str) -> Result<Self, IntakeError> {
        let mime_type = mime_type.trim().to_ascii_lowercase();
        if !mime_type.starts_with("image/") || mime_type.len() <= "image/".len() {
            return Err(IntakeError::UnsupportedMimeType(mime_type));
        }

        let data: String = data_base64
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        if data.is_empty() {
            return Err(IntakeError::EmptyImage);
        }

        // Reject oversized payloads before decoding them.
        let estimated = data.len() / 4 * 3;
        if estimated > MAX_IMAGE_BYTES + 3 {
            return Err(IntakeError::ImageTooLarge {
                size: estimated,
                max: MAX_IMAGE_BYTES,
            });
        }

        let decoded = base64::engine::general_purpose::STANDARD
            .decode(data.as_bytes())
            .map_err(|e| IntakeError::InvalidBase64(e.to_string()))?;
        if decoded.is_empty() {
            return Err(IntakeError::EmptyImage);
        }
        if decoded.len() > MAX_IMAGE_BYTES {
            return Err(IntakeError::ImageTooLarge {
                size: decoded.len(),
                max: MAX_IMAGE_BYTES,
            });
        }

        Ok(Self {
            mime_type,
            data_base64: data,
            decoded_len: decoded.len(),
        })
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn decoded_len(&self) -> usize {
        self.decoded_len
    }

    fn to_inline(&self) -> InlineImage {
        InlineImage {
            mime_type: self.mime_type.clone(),
            data_base64: self.data_base64.clone(),
        }
    }
}

/// Sends one image to the model and maps the answer onto the intake form.
pub struct DocumentIntakeExtractor<'a> {
    client: &'a dyn ModelClient,
}

impl<'a> DocumentIntakeExtractor<'a> {
    pub fn new(client: &'a dyn ModelClient) -> Self {
        Self { client }
    }

    /// Best-effort extraction. Fields the model does not report stay `None`;
    /// merging into the form is left to `PatientDetailsPatch::merge_into`.
    pub async fn extract(&self, image: &DocumentImage) -> Result<PatientDetailsPatch, IntakeError> {
        let span = tracing::info_span!(
            "document_intake",
            mime_type = %image.mime_type,
            image_bytes = image.decoded_len,
        );

        async {
            let start = std::time::Instant::now();
            let request = GenerationRequest::json(
                CallKind::DocumentExtraction,
                DOCUMENT_EXTRACTION_SYSTEM_PROMPT,
                build_document_extraction_prompt(),
            )
            .with_image(image.to_inline());

            let response = self.client.generate(&request).await?;
            let patch = parse_document_patch(&response)?;

            tracing::info!(
                fields_found = patch.present_count(),
                elapsed_ms = %start.elapsed().as_millis(),
                "Document extraction complete"
            );
            Ok::<_, IntakeError>(patch)
        }
        .instrument(span)
        .await
    }
}
