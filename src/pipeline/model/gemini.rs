//! Google Generative Language (`generateContent`) client.
//!
//! One `GeminiClient` is built per request from the caller-held key; the
//! underlying `reqwest::Client` (connection pool) is shared via the provider.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};

use super::types::{ApiKey, GenerationRequest, ModelClient, ModelProvider};
use super::ModelError;

/// Header carrying the API key.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini HTTP client for one API key.
pub struct GeminiClient {
    base_url: String,
    model: String,
    api_key: ApiKey,
    http: reqwest::Client,
}

impl GeminiClient {
    pub fn new(base_url: &str, model: &str, api_key: ApiKey, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
            http,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    async fn generate_inner(&self, request: &GenerationRequest) -> Result<String, ModelError> {
        let body = build_request_body(request);

        let response = self
            .http
            .post(self.endpoint())
            .header(API_KEY_HEADER, self.api_key.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Network("request timed out".into())
                } else if e.is_connect() {
                    ModelError::Network(format!("cannot reach {}", self.base_url))
                } else {
                    ModelError::Network(e.without_url().to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_error(status.as_u16(), &text));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Validation(format!("unreadable provider envelope: {e}")))?;

        extract_text(parsed)
    }
}

impl ModelClient for GeminiClient {
    fn generate<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> BoxFuture<'a, Result<String, ModelError>> {
        async move {
            let start = std::time::Instant::now();
            let result = self.generate_inner(request).await;
            match &result {
                Ok(text) => tracing::info!(
                    call_kind = request.kind.as_str(),
                    model = %self.model,
                    elapsed_ms = %start.elapsed().as_millis(),
                    response_len = text.len(),
                    "Model call complete"
                ),
                Err(e) => tracing::warn!(
                    call_kind = request.kind.as_str(),
                    model = %self.model,
                    elapsed_ms = %start.elapsed().as_millis(),
                    error_code = e.code(),
                    "Model call failed"
                ),
            }
            result
        }
        .boxed()
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Builds `GeminiClient`s sharing one connection pool.
pub struct GeminiProvider {
    base_url: String,
    model: String,
    http: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(base_url: &str, model: &str, timeout_secs: u64) -> Result<Self, ModelError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ModelError::Network(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            http,
        })
    }
}

impl ModelProvider for GeminiProvider {
    fn client(&self, api_key: Option<&ApiKey>) -> Result<Arc<dyn ModelClient>, ModelError> {
        let key = api_key.ok_or(ModelError::MissingApiKey)?;
        Ok(Arc::new(GeminiClient::new(
            &self.base_url,
            &self.model,
            key.clone(),
            self.http.clone(),
        )))
    }
}

// ──────────────────────────────────────────────
// Wire types
// ──────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    details: Vec<serde_json::Value>,
}

fn build_request_body(request: &GenerationRequest) -> GenerateContentRequest {
    let mut parts = vec![Part {
        text: Some(request.prompt.clone()),
        inline_data: None,
    }];
    if let Some(image) = &request.image {
        parts.push(Part {
            text: None,
            inline_data: Some(InlineData {
                mime_type: image.mime_type.clone(),
                data: image.data_base64.clone(),
            }),
        });
    }

    GenerateContentRequest {
        system_instruction: request.system.as_ref().map(|s| Content {
            role: None,
            parts: vec![Part {
                text: Some(s.clone()),
                inline_data: None,
            }],
        }),
        contents: vec![Content {
            role: Some("user".into()),
            parts,
        }],
        generation_config: GenerationConfig {
            temperature: request.options.temperature,
            max_output_tokens: request.options.max_output_tokens,
            response_mime_type: request.json_response.then_some("application/json"),
        },
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(response: GenerateContentResponse) -> Result<String, ModelError> {
    if let Some(reason) = response
        .prompt_feedback
        .and_then(|f| f.block_reason)
    {
        return Err(ModelError::Provider {
            status: 200,
            message: format!("prompt blocked: {reason}"),
        });
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or(ModelError::EmptyResponse)?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        if let Some(reason) = candidate.finish_reason.filter(|r| r != "STOP") {
            return Err(ModelError::Provider {
                status: 200,
                message: format!("generation stopped: {reason}"),
            });
        }
        return Err(ModelError::EmptyResponse);
    }
    Ok(text)
}

/// Map a non-2xx response to the error taxonomy. Key problems come back as
/// 400 `API_KEY_INVALID`, 401 or 403.
fn classify_error(status: u16, body: &str) -> ModelError {
    let envelope: Option<ErrorEnvelope> = serde_json::from_str(body).ok();

    if status == 401 || status == 403 {
        return ModelError::InvalidApiKey;
    }

    match envelope {
        Some(env) => {
            let key_rejected = env
                .error
                .details
                .iter()
                .any(|d| d.get("reason").and_then(|r| r.as_str()) == Some("API_KEY_INVALID"))
                || env.error.message.contains("API key not valid");
            if key_rejected {
                ModelError::InvalidApiKey
            } else {
                let message = match env.error.status {
                    Some(s) => format!("{s}: {}", env.error.message),
                    None => env.error.message,
                };
                ModelError::Provider { status, message }
            }
        }
        None => ModelError::Provider {
            status,
            message: truncate(body, 200),
        },
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
