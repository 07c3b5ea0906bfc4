use thiserror::Error;

use crate::models::enums::Language;

use super::model::{CallKind, GenerationRequest, ModelClient, ModelError};
use super::parser::parse_translation;
use super::prompt::{build_translation_prompt, TRANSLATION_SYSTEM_PROMPT};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranslationError {
    #[error("Nothing to translate")]
    EmptyInput,

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Single-shot clinical translation. Stateless: no retry, no cache.
pub struct Translator<'a> {
    client: &'a dyn ModelClient,
}

impl<'a> Translator<'a> {
    pub fn new(client: &'a dyn ModelClient) -> Self {
        Self { client }
    }

    pub async fn translate(&self, text: &str, target: Language) -> Result<String, TranslationError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TranslationError::EmptyInput);
        }

        let start = std::time::Instant::now();
        let request = GenerationRequest::json(
            CallKind::Translation,
            TRANSLATION_SYSTEM_PROMPT,
            build_translation_prompt(text, target),
        );
        let response = self.client.generate(&request).await?;
        let translated = parse_translation(&response)?;

        tracing::debug!(
            target_language = target.as_str(),
            input_chars = text.chars().count(),
            elapsed_ms = %start.elapsed().as_millis(),
            "Translation complete"
        );
        Ok(translated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::model::MockModelClient;

    #[tokio::test]
    async fn translates_to_target_language() {
        let mock = MockModelClient::new(r#"{"translatedText": "سردرد شدید"}"#);
        let out = Translator::new(&mock)
            .translate("severe headache", Language::Persian)
            .await
            .unwrap();
        assert_eq!(out, "سردرد شدید");

        let requests = mock.requests();
        assert_eq!(requests[0].kind, CallKind::Translation);
        assert!(requests[0].prompt.contains("Persian (Farsi)"));
        assert!(requests[0].prompt.contains("severe headache"));
    }

    #[tokio::test]
    async fn empty_input_skips_model() {
        let mock = MockModelClient::new(r#"{"translatedText": "x"}"#);
        let err = Translator::new(&mock)
            .translate("   ", Language::English)
            .await
            .unwrap_err();
        assert_eq!(err, TranslationError::EmptyInput);
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn model_failure_surfaces() {
        let mock = MockModelClient::failing(ModelError::MissingApiKey);
        let err = Translator::new(&mock)
            .translate("درد", Language::English)
            .await
            .unwrap_err();
        assert_eq!(err, TranslationError::Model(ModelError::MissingApiKey));
    }
}
