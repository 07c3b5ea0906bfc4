//! Prompt templates for every model flow.
//!
//! Each builder takes explicit parameters and returns the user prompt; the
//! matching `*_SYSTEM_PROMPT` goes into the system instruction. Every prompt
//! ends with the JSON shape the parser expects.

use crate::models::enums::{Language, LanguagePreference, TurnRole};

/// Diagnosis placeholder handed to the treatment plan flow.
pub const DIAGNOSIS_PLACEHOLDER: &str = "Based on provided info.";

/// One line of interview history as shown to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryMessage {
    pub role: TurnRole,
    pub content: String,
}

// ──────────────────────────────────────────────
// Interview
// ──────────────────────────────────────────────

pub const NEXT_QUESTION_SYSTEM_PROMPT: &str = r#"
You are a helpful medical AI assistant conducting a consultation. Your goal is
to gather enough information through a series of questions to suggest a
diagnosis.

RULES:
1. You are given the patient's initial details and the conversation history
   between you (model) and the patient (user).
2. Generate the next logical question to ask.
3. Every question and every option must be written in both English and
   Persian (Farsi).
4. Provide multiple-choice options where it helps guide the conversation.
5. Review the entire conversation. Do not ask questions that have already
   been answered.
6. If you have sufficient information to make a differential diagnosis, set
   "isComplete" to true and omit "nextQuestion". Otherwise set "isComplete"
   to false and provide "nextQuestion".
7. Keep questions simple and focused.
"#;

/// Build the next-question prompt from the patient summary and the full
/// interview history.
pub fn build_next_question_prompt(patient_information: &str, history: &[HistoryMessage]) -> String {
    let history_block = if history.is_empty() {
        "(no questions asked yet)".to_string()
    } else {
        history
            .iter()
            .map(|m| format!("**{}**: {}", m.role.as_str(), m.content))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"Initial Patient Information:
{patient_information}

Conversation History:
{history_block}

Respond with a single JSON object:

```json
{{
  "isComplete": false,
  "nextQuestion": {{
    "english": "Question in English",
    "persian": "Question in Persian",
    "options": [
      {{"english": "Option in English", "persian": "Option in Persian"}}
    ]
  }}
}}
```

"options" may be omitted when the question is open-ended."#
    )
}

// ──────────────────────────────────────────────
// Report
// ──────────────────────────────────────────────

pub const SOAP_NOTE_SYSTEM_PROMPT: &str = r#"
You are an AI assistant specialized in generating medical SOAP notes in both
English and Persian. Use Markdown for formatting (headings, lists, bold text).

Structure the note for each language with Subjective (S), Objective (O),
Assessment (A) and Plan (P) sections using ### headers:
- S (Subjective): chief complaint and history of present illness.
- O (Objective): measurable findings such as vital signs and exam results.
- A (Assessment): the primary diagnosis or differential diagnoses.
- P (Plan): tests, medications and follow-up.

Example English format:
### Subjective (S)
* Patient reports chest pain that started 2 hours ago...
* Denies shortness of breath.

### Objective (O)
* **Vitals**: BP 140/90, HR 88

### Assessment (A)
1. Suspected Angina

### Plan (P)
* Recommend EKG and cardiac enzyme test.

Use the same headers in the Persian note, with Persian content.
"#;

pub fn build_soap_note_prompt(patient_information: &str, answers: &str) -> String {
    format!(
        r#"**Patient Information**: {patient_information}
**Interview Answers**:
{answers}

Synthesize a comprehensive SOAP note in both languages. Respond with a single
JSON object:

```json
{{
  "soapNoteEnglish": "Markdown SOAP note in English",
  "soapNotePersian": "Markdown SOAP note in Persian"
}}
```"#
    )
}

pub const DIFFERENTIAL_SYSTEM_PROMPT: &str = r#"
You are an AI assistant that generates a ranked list of potential
differential diagnoses in Persian and English based on the available patient
data. Rank 1 is the most likely diagnosis. Ranks must be unique positive
integers. Ensure every diagnosis is relevant to the data provided.
"#;

/// `patient_data` is the patient summary followed by the interview answers.
pub fn build_differential_prompt(patient_data: &str) -> String {
    format!(
        r#"Patient Data:
{patient_data}

Respond with a single JSON object:

```json
{{
  "differentialDiagnoses": [
    {{"diagnosisEn": "Diagnosis in English", "diagnosisFa": "Diagnosis in Persian", "rank": 1}}
  ]
}}
```"#
    )
}

pub const TREATMENT_PLAN_SYSTEM_PROMPT: &str = r#"
You are an expert medical professional formulating a treatment plan for a
patient. Create a comprehensive plan in both English and Persian including
medications, dosage adjustments and test recommendations. Pay close attention
to the patient's language preference and tailor the output accordingly.
"#;

pub fn build_treatment_plan_prompt(
    patient_details: &str,
    diagnosis: &str,
    language_preference: LanguagePreference,
) -> String {
    format!(
        r#"Patient Details:
{patient_details}

Diagnosis: {diagnosis}
Patient Language Preference: {preference}

Respond with a single JSON object:

```json
{{
  "treatmentPlanEnglish": "Treatment plan in English",
  "treatmentPlanPersian": "Treatment plan in Persian"
}}
```"#,
        preference = language_preference.as_str(),
    )
}

/// Patient summary and interview answers combined for the DDx and
/// treatment plan flows.
pub fn combine_patient_data(patient_information: &str, answers: &str) -> String {
    format!("{patient_information}\n\nInterview answers:\n{answers}")
}

// ──────────────────────────────────────────────
// Intake & translation
// ──────────────────────────────────────────────

pub const DOCUMENT_EXTRACTION_SYSTEM_PROMPT: &str = r#"
You are an expert at analyzing medical documents and forms, including
handwritten notes. Extract the patient's information from the provided image.

RULES:
1. If a value is not present in the document, do not include the key.
2. Translate Persian names or terms to their English equivalent where
   appropriate (e.g. field names), but keep the original data as is.
3. Dates use YYYY-MM-DD. Age is a whole number of years.
"#;

pub fn build_document_extraction_prompt() -> String {
    r#"Extract the patient details from the attached image. Respond with a single
JSON object containing only the keys you found:

```json
{
  "name": "first name",
  "familyName": "family name",
  "fatherName": "father's name",
  "age": 0,
  "gender": "male | female | other",
  "dob": "YYYY-MM-DD",
  "ward": "admission ward",
  "room": "room number",
  "bed": "bed number",
  "dateOfAdmission": "YYYY-MM-DD",
  "attendingPhysician": "physician name",
  "bp": "e.g. 120/80",
  "rr": "e.g. 18",
  "pr": "e.g. 72",
  "spo2": "e.g. 98%",
  "eyeColor": "eye color",
  "skinColor": "skin color",
  "bruises": "description",
  "rashUlcers": "description",
  "pastMedicalHistory": "history",
  "pastSurgicalHistory": "history",
  "medication": "medication",
  "familyHistory": "history"
}
```"#
        .to_string()
}

pub const TRANSLATION_SYSTEM_PROMPT: &str = r#"
You are a medical translation expert. Translate accurately, maintaining the
original medical context, meaning and clinical terminology. The translation
must be appropriate for use in a medical setting.
"#;

pub fn build_translation_prompt(text: &str, target: Language) -> String {
    format!(
        r#"Translate the following text to {language}.

Text to translate:
<text>
{text}
</text>

Respond with a single JSON object:

```json
{{"translatedText": "the translation"}}
```"#,
        language = target.display_name(),
    )
}
