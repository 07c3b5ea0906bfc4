use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::ModelError;

/// Which flow a request belongs to. Used for logging and for scripting mocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
    NextQuestion,
    SoapNote,
    DifferentialDiagnosis,
    TreatmentPlan,
    DocumentExtraction,
    Translation,
}

impl CallKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NextQuestion => "next_question",
            Self::SoapNote => "soap_note",
            Self::DifferentialDiagnosis => "differential_diagnosis",
            Self::TreatmentPlan => "treatment_plan",
            Self::DocumentExtraction => "document_extraction",
            Self::Translation => "translation",
        }
    }
}

/// An image sent inline with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    /// Standard base64, no data-URI prefix.
    pub data_base64: String,
}

/// Sampling parameters. Clinical flows keep temperature low.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_output_tokens: Option<u32>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_output_tokens: None,
        }
    }
}

/// One request/response exchange with the model.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub kind: CallKind,
    pub system: Option<String>,
    pub prompt: String,
    pub image: Option<InlineImage>,
    /// Ask the provider for `application/json` output.
    pub json_response: bool,
    pub options: GenerationOptions,
}

impl GenerationRequest {
    /// JSON-mode request, the shape every flow uses.
    pub fn json(kind: CallKind, system: &str, prompt: String) -> Self {
        Self {
            kind,
            system: Some(system.to_string()),
            prompt,
            image: None,
            json_response: true,
            options: GenerationOptions::default(),
        }
    }

    pub fn with_image(mut self, image: InlineImage) -> Self {
        self.image = Some(image);
        self
    }
}

/// Text-completion access to the external model (allows mocking).
///
/// Returns the raw text of the first candidate; structure is validated by
/// the caller's parser.
pub trait ModelClient: Send + Sync {
    fn generate<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> BoxFuture<'a, Result<String, ModelError>>;

    /// Model identifier, for logging.
    fn model_name(&self) -> &str;
}

/// Builds a client bound to the caller-held API key.
pub trait ModelProvider: Send + Sync {
    fn client(&self, api_key: Option<&ApiKey>) -> Result<Arc<dyn ModelClient>, ModelError>;
}

/// Caller-supplied API key. Zeroed on drop, never printed.
#[derive(Clone)]
pub struct ApiKey(Zeroizing<String>);

impl ApiKey {
    /// Trimmed key, or `None` when blank.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(Zeroizing::new(trimmed.to_string())))
        }
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(***)")
    }
}
