use serde::{Deserialize, Serialize};

/// Bilingual SOAP note, Markdown with S/O/A/P sections per language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoapNote {
    pub english: String,
    pub persian: String,
}

/// One candidate diagnosis. Lower rank = more likely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifferentialDiagnosis {
    pub diagnosis_en: String,
    pub diagnosis_fa: String,
    pub rank: u32,
}

/// Bilingual treatment plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreatmentPlan {
    pub english: String,
    pub persian: String,
}

/// The three artifacts generated from one completed interview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub soap_note: SoapNote,
    pub differential_diagnoses: Vec<DifferentialDiagnosis>,
    pub treatment_plan: TreatmentPlan,
}

impl Report {
    /// Most likely diagnosis, if any.
    pub fn leading_diagnosis(&self) -> Option<&DifferentialDiagnosis> {
        self.differential_diagnoses.iter().min_by_key(|d| d.rank)
    }
}
