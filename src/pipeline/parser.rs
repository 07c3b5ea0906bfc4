use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::models::{
    BilingualText, DifferentialDiagnosis, PatientDetailsPatch, SoapNote, TreatmentPlan,
};

use super::model::ModelError;
use super::validation::{require_bilingual, require_bilingual_text, validate_diagnoses};

/// What the interview should do next, as decided by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextAction {
    Question {
        text: BilingualText,
        options: Option<Vec<BilingualText>>,
    },
    Complete,
}

/// Locate the JSON object in a model response.
///
/// Accepts a ```json fenced block, a bare ``` fence, or raw text starting
/// with `{`. Surrounding prose is ignored.
pub fn extract_json(response: &str) -> Result<&str, ModelError> {
    if let Some(start) = response.find("```json") {
        let content_start = start + 7;
        let end = response[content_start..]
            .find("```")
            .ok_or_else(|| ModelError::Validation("Unclosed JSON block".into()))?;
        return Ok(response[content_start..content_start + end].trim());
    }
    if let Some(start) = response.find("```") {
        let content_start = start + 3;
        if let Some(end) = response[content_start..].find("```") {
            let inner = response[content_start..content_start + end].trim();
            if inner.starts_with('{') {
                return Ok(inner);
            }
        }
    }

    let start = response
        .find('{')
        .ok_or_else(|| ModelError::Validation("No JSON object found".into()))?;
    let end = response
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| ModelError::Validation("Unterminated JSON object".into()))?;
    Ok(&response[start..=end])
}

fn parse_json<T: DeserializeOwned>(response: &str) -> Result<T, ModelError> {
    let json = extract_json(response)?;
    serde_json::from_str(json).map_err(|e| ModelError::Validation(e.to_string()))
}

// ──────────────────────────────────────────────
// Interview
// ──────────────────────────────────────────────

/// Parse the next-question response. `isComplete` is required.
pub fn parse_next_action(response: &str) -> Result<NextAction, ModelError> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct RawNext {
        is_complete: bool,
        next_question: Option<RawQuestion>,
    }

    #[derive(Deserialize)]
    struct RawQuestion {
        english: String,
        persian: String,
        #[serde(default)]
        options: Option<Vec<BilingualText>>,
    }

    let raw: RawNext = parse_json(response)?;
    if raw.is_complete {
        return Ok(NextAction::Complete);
    }

    let question = raw.next_question.ok_or_else(|| {
        ModelError::Validation("isComplete is false but nextQuestion is missing".into())
    })?;
    let text = BilingualText::new(question.english, question.persian);
    require_bilingual_text("nextQuestion", &text)?;

    let options = match question.options {
        Some(options) if !options.is_empty() => {
            for (i, option) in options.iter().enumerate() {
                require_bilingual_text(&format!("option {}", i + 1), option)?;
            }
            Some(options)
        }
        _ => None,
    };

    Ok(NextAction::Question { text, options })
}

// ──────────────────────────────────────────────
// Report
// ──────────────────────────────────────────────

pub fn parse_soap_note(response: &str) -> Result<SoapNote, ModelError> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct RawSoap {
        soap_note_english: String,
        soap_note_persian: String,
    }

    let raw: RawSoap = parse_json(response)?;
    require_bilingual("SOAP note", &raw.soap_note_english, &raw.soap_note_persian)?;
    Ok(SoapNote {
        english: raw.soap_note_english,
        persian: raw.soap_note_persian,
    })
}

/// Parse and validate the DDx list; the result is sorted by rank.
pub fn parse_differential_diagnoses(
    response: &str,
) -> Result<Vec<DifferentialDiagnosis>, ModelError> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct RawDdx {
        differential_diagnoses: Vec<RawDiagnosis>,
    }

    // Models sometimes emit ranks as 1.0.
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct RawDiagnosis {
        diagnosis_en: String,
        diagnosis_fa: String,
        rank: f64,
    }

    let raw: RawDdx = parse_json(response)?;
    let diagnoses = raw
        .differential_diagnoses
        .into_iter()
        .map(|d| {
            if d.rank.fract() != 0.0 || d.rank < 1.0 || d.rank > f64::from(u32::MAX) {
                return Err(ModelError::Validation(format!(
                    "invalid diagnosis rank {}",
                    d.rank
                )));
            }
            Ok(DifferentialDiagnosis {
                diagnosis_en: d.diagnosis_en,
                diagnosis_fa: d.diagnosis_fa,
                rank: d.rank as u32,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    validate_diagnoses(diagnoses)
}

pub fn parse_treatment_plan(response: &str) -> Result<TreatmentPlan, ModelError> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct RawPlan {
        treatment_plan_english: String,
        treatment_plan_persian: String,
    }

    let raw: RawPlan = parse_json(response)?;
    require_bilingual(
        "treatment plan",
        &raw.treatment_plan_english,
        &raw.treatment_plan_persian,
    )?;
    Ok(TreatmentPlan {
        english: raw.treatment_plan_english,
        persian: raw.treatment_plan_persian,
    })
}

// ──────────────────────────────────────────────
// Intake & translation
// ──────────────────────────────────────────────

/// Parse a document extraction response into a patch.
///
/// Lenient per field: null, blank or ill-typed values are dropped and the
/// field stays absent. Unknown keys are ignored. Only a response that is not
/// a JSON object at all is an error.
pub fn parse_document_patch(response: &str) -> Result<PatientDetailsPatch, ModelError> {
    let value: serde_json::Value = parse_json(response)?;
    let object = value
        .as_object()
        .ok_or_else(|| ModelError::Validation("expected a JSON object".into()))?;

    let mut accepted = serde_json::Map::new();
    for (key, field) in object {
        let keep = match field {
            serde_json::Value::Null => false,
            serde_json::Value::String(s) => !s.trim().is_empty(),
            _ => true,
        };
        if !keep {
            continue;
        }
        let field = match field {
            serde_json::Value::String(s) => serde_json::Value::String(s.trim().to_string()),
            other => other.clone(),
        };

        let mut single = serde_json::Map::new();
        single.insert(key.clone(), field.clone());
        match serde_json::from_value::<PatientDetailsPatch>(serde_json::Value::Object(single)) {
            Ok(single) if !single.is_empty() => {
                accepted.insert(key.clone(), field);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(field = %key, error = %e, "Dropping unreadable extracted field");
            }
        }
    }

    serde_json::from_value(serde_json::Value::Object(accepted))
        .map_err(|e| ModelError::Validation(e.to_string()))
}

pub fn parse_translation(response: &str) -> Result<String, ModelError> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct RawTranslation {
        translated_text: String,
    }

    let raw: RawTranslation = parse_json(response)?;
    if raw.translated_text.trim().is_empty() {
        return Err(ModelError::Validation("translation is empty".into()));
    }
    Ok(raw.translated_text)
}
