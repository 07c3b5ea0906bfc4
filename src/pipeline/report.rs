//! Report generation: SOAP note, differential diagnoses and treatment plan
//! requested concurrently over one frozen transcript.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Instrument;

use crate::models::enums::LanguagePreference;
use crate::models::{ConversationTurn, PatientDetails, Report};

use super::interview::qa_pairs;
use super::model::{CallKind, GenerationRequest, ModelClient, ModelError};
use super::parser::{parse_differential_diagnoses, parse_soap_note, parse_treatment_plan};
use super::prompt::{
    build_differential_prompt, build_soap_note_prompt, build_treatment_plan_prompt,
    combine_patient_data, DIAGNOSIS_PLACEHOLDER, DIFFERENTIAL_SYSTEM_PROMPT,
    SOAP_NOTE_SYSTEM_PROMPT, TREATMENT_PLAN_SYSTEM_PROMPT,
};

/// Immutable input to report generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
    /// `key: value, ...` patient summary.
    pub patient_information: String,
    /// `"<question>: <answer>"` lines.
    pub answers: String,
}

impl Transcript {
    pub fn new(details: &PatientDetails, turns: &[ConversationTurn]) -> Self {
        Self {
            patient_information: details.to_prompt_summary(),
            answers: qa_pairs(turns),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReportError {
    #[error("The interview must be complete before generating a report")]
    InterviewNotComplete,

    #[error("{section} generation failed: {source}")]
    Generation {
        section: &'static str,
        #[source]
        source: ModelError,
    },
}

impl ReportError {
    /// Underlying model error, if any.
    pub fn model_error(&self) -> Option<&ModelError> {
        match self {
            Self::Generation { source, .. } => Some(source),
            Self::InterviewNotComplete => None,
        }
    }

    pub fn is_credential(&self) -> bool {
        self.model_error().is_some_and(ModelError::is_credential)
    }
}

/// Issues the three report requests concurrently. All-or-nothing: the first
/// failure fails the whole report.
pub struct ReportOrchestrator<'a> {
    client: &'a dyn ModelClient,
    language_preference: LanguagePreference,
}

impl<'a> ReportOrchestrator<'a> {
    pub fn new(client: &'a dyn ModelClient) -> Self {
        Self {
            client,
            language_preference: LanguagePreference::default(),
        }
    }

    pub fn with_language_preference(mut self, preference: LanguagePreference) -> Self {
        self.language_preference = preference;
        self
    }

    pub async fn generate(&self, transcript: &Transcript) -> Result<Report, ReportError> {
        let span = tracing::info_span!(
            "report_generate",
            model = self.client.model_name(),
            answer_lines = transcript.answers.lines().count(),
        );

        async {
            let start = std::time::Instant::now();
            let patient_data =
                combine_patient_data(&transcript.patient_information, &transcript.answers);

            let soap_request = GenerationRequest::json(
                CallKind::SoapNote,
                SOAP_NOTE_SYSTEM_PROMPT,
                build_soap_note_prompt(&transcript.patient_information, &transcript.answers),
            );
            let ddx_request = GenerationRequest::json(
                CallKind::DifferentialDiagnosis,
                DIFFERENTIAL_SYSTEM_PROMPT,
                build_differential_prompt(&patient_data),
            );
            let plan_request = GenerationRequest::json(
                CallKind::TreatmentPlan,
                TREATMENT_PLAN_SYSTEM_PROMPT,
                build_treatment_plan_prompt(
                    &patient_data,
                    DIAGNOSIS_PLACEHOLDER,
                    self.language_preference,
                ),
            );

            let result = tokio::try_join!(
                self.run(&soap_request, "SOAP note", parse_soap_note),
                self.run(
                    &ddx_request,
                    "Differential diagnosis",
                    parse_differential_diagnoses
                ),
                self.run(&plan_request, "Treatment plan", parse_treatment_plan),
            );

            match result {
                Ok((soap_note, differential_diagnoses, treatment_plan)) => {
                    tracing::info!(
                        diagnoses = differential_diagnoses.len(),
                        elapsed_ms = %start.elapsed().as_millis(),
                        "Report generated"
                    );
                    Ok(Report {
                        soap_note,
                        differential_diagnoses,
                        treatment_plan,
                    })
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        elapsed_ms = %start.elapsed().as_millis(),
                        "Report generation failed"
                    );
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run<T>(
        &self,
        request: &GenerationRequest,
        section: &'static str,
        parse: fn(&str) -> Result<T, ModelError>,
    ) -> Result<T, ReportError> {
        let wrap = |source| ReportError::Generation { section, source };
        let response = self.client.generate(request).await.map_err(wrap)?;
        parse(&response).map_err(wrap)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::patient::tests::sample_details;
    use crate::models::BilingualText;
    use crate::pipeline::model::MockModelClient;

    pub(crate) const SOAP_JSON: &str = r####"{"soapNoteEnglish": "### Subjective (S)\n* Chest pain", "soapNotePersian": "### Subjective (S)\n* درد قفسه سینه"}"####;
    pub(crate) const DDX_JSON: &str = r#"{"differentialDiagnoses": [{"diagnosisEn": "Stable angina", "diagnosisFa": "آنژین پایدار", "rank": 2}, {"diagnosisEn": "Acute coronary syndrome", "diagnosisFa": "سندرم حاد کرونری", "rank": 1}]}"#;
    pub(crate) const PLAN_JSON: &str = r#"{"treatmentPlanEnglish": "ECG, troponin, aspirin 325mg.", "treatmentPlanPersian": "نوار قلب، تروپونین، آسپرین ۳۲۵ میلی‌گرم."}"#;

    pub(crate) fn scripted() -> MockModelClient {
        MockModelClient::new("{}")
            .with_response(CallKind::SoapNote, SOAP_JSON)
            .with_response(CallKind::DifferentialDiagnosis, DDX_JSON)
            .with_response(CallKind::TreatmentPlan, PLAN_JSON)
    }

    fn transcript() -> Transcript {
        Transcript::new(
            &sample_details(),
            &[
                ConversationTurn::question(BilingualText::new("Onset?", "شروع؟"), None),
                ConversationTurn::answer("2 hours ago"),
            ],
        )
    }

    #[test]
    fn transcript_built_from_session_parts() {
        let t = transcript();
        assert!(t.patient_information.starts_with("name: Ali"));
        assert_eq!(t.answers, "Onset?: 2 hours ago");
    }

    #[tokio::test]
    async fn all_three_sections_assembled() {
        let mock = scripted();
        let report = ReportOrchestrator::new(&mock)
            .generate(&transcript())
            .await
            .unwrap();

        assert!(report.soap_note.english.contains("Chest pain"));
        assert_eq!(report.differential_diagnoses.len(), 2);
        assert_eq!(
            report.differential_diagnoses[0].diagnosis_en,
            "Acute coronary syndrome"
        );
        assert!(report.treatment_plan.persian.contains("تروپونین"));
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn prompts_carry_transcript_and_placeholder() {
        let mock = scripted();
        ReportOrchestrator::new(&mock)
            .with_language_preference(LanguagePreference::Persian)
            .generate(&transcript())
            .await
            .unwrap();

        let requests = mock.requests();
        let plan = requests
            .iter()
            .find(|r| r.kind == CallKind::TreatmentPlan)
            .unwrap();
        assert!(plan.prompt.contains("Diagnosis: Based on provided info."));
        assert!(plan.prompt.contains("Patient Language Preference: persian"));
        assert!(plan.prompt.contains("Onset?: 2 hours ago"));

        let soap = requests.iter().find(|r| r.kind == CallKind::SoapNote).unwrap();
        assert!(soap.prompt.contains("Onset?: 2 hours ago"));
    }

    #[tokio::test]
    async fn one_failure_fails_whole_report() {
        let mock = MockModelClient::new("{}")
            .with_response(CallKind::SoapNote, SOAP_JSON)
            .with_response(CallKind::DifferentialDiagnosis, DDX_JSON)
            .with_error(
                CallKind::TreatmentPlan,
                ModelError::Network("connection reset".into()),
            );

        let err = ReportOrchestrator::new(&mock)
            .generate(&transcript())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ReportError::Generation {
                section: "Treatment plan",
                source: ModelError::Network(_)
            }
        ));
        assert!(!err.is_credential());
    }

    #[tokio::test]
    async fn malformed_section_fails_whole_report() {
        let mock = MockModelClient::new("{}")
            .with_response(CallKind::SoapNote, SOAP_JSON)
            .with_response(CallKind::DifferentialDiagnosis, r#"{"differentialDiagnoses": []}"#)
            .with_response(CallKind::TreatmentPlan, PLAN_JSON);

        let err = ReportOrchestrator::new(&mock)
            .generate(&transcript())
            .await
            .unwrap_err();
        assert!(matches!(
            err.model_error(),
            Some(ModelError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn invalid_key_is_credential_error() {
        let mock = MockModelClient::failing(ModelError::InvalidApiKey);
        let err = ReportOrchestrator::new(&mock)
            .generate(&transcript())
            .await
            .unwrap_err();
        assert!(err.is_credential());
        assert_eq!(err.model_error(), Some(&ModelError::InvalidApiKey));
    }
}
