// Structural checks applied to parsed model output before it reaches a caller.
// Anything that fails here is reported as ModelError::Validation.

use std::collections::HashSet;

use crate::models::{BilingualText, DifferentialDiagnosis};

use super::model::ModelError;

/// Maximum plausible number of differential diagnoses in one response.
const MAX_DIAGNOSES: usize = 20;

/// Both language variants of `field` must carry text.
pub fn require_bilingual(field: &str, english: &str, persian: &str) -> Result<(), ModelError> {
    match (english.trim().is_empty(), persian.trim().is_empty()) {
        (false, false) => Ok(()),
        (true, true) => Err(ModelError::Validation(format!("{field} is empty"))),
        (true, false) => Err(ModelError::Validation(format!(
            "{field} is missing the English text"
        ))),
        (false, true) => Err(ModelError::Validation(format!(
            "{field} is missing the Persian text"
        ))),
    }
}

pub fn require_bilingual_text(field: &str, text: &BilingualText) -> Result<(), ModelError> {
    require_bilingual(field, &text.english, &text.persian)
}

/// Check ranks and bilingual names, then return the list sorted by rank.
///
/// Ranks must be unique positive integers. Gaps are allowed.
pub fn validate_diagnoses(
    mut diagnoses: Vec<DifferentialDiagnosis>,
) -> Result<Vec<DifferentialDiagnosis>, ModelError> {
    if diagnoses.is_empty() {
        return Err(ModelError::Validation(
            "differential diagnosis list is empty".into(),
        ));
    }
    if diagnoses.len() > MAX_DIAGNOSES {
        return Err(ModelError::Validation(format!(
            "implausible number of diagnoses ({})",
            diagnoses.len()
        )));
    }

    let mut seen = HashSet::new();
    for diagnosis in &diagnoses {
        if diagnosis.rank == 0 {
            return Err(ModelError::Validation("diagnosis rank must be positive".into()));
        }
        if !seen.insert(diagnosis.rank) {
            return Err(ModelError::Validation(format!(
                "duplicate diagnosis rank {}",
                diagnosis.rank
            )));
        }
        require_bilingual(
            &format!("diagnosis #{}", diagnosis.rank),
            &diagnosis.diagnosis_en,
            &diagnosis.diagnosis_fa,
        )?;
    }

    diagnoses.sort_by_key(|d| d.rank);
    Ok(diagnoses)
}
