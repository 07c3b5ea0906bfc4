use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use super::enums::{ConsciousnessLevel, Gender, Perspective};

/// Minimum length of the patient's name on the intake form.
pub const MIN_NAME_CHARS: usize = 2;
/// Minimum length of the chief complaint on the intake form.
pub const MIN_CHIEF_COMPLAINT_CHARS: usize = 10;
/// Upper bound accepted for the age field.
pub const MAX_AGE_YEARS: u32 = 150;

/// Intake data for one patient. Created once and immutable for the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientDetails {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub father_name: Option<String>,
    pub dob: NaiveDate,
    #[serde(
        default,
        deserialize_with = "deserialize_age",
        skip_serializing_if = "Option::is_none"
    )]
    pub age: Option<u32>,
    pub gender: Gender,
    pub perspective: Perspective,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consciousness_level: Option<ConsciousnessLevel>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ward: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bed: Option<String>,
    pub date_of_admission: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attending_physician: Option<String>,

    pub chief_complaint: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spo2: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eye_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skin_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bruises: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rash_ulcers: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub past_medical_history: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub past_surgical_history: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medication: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_history: Option<String>,
}

/// Intake form validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntakeValidationError {
    #[error("Name must be at least 2 characters")]
    NameTooShort,
    #[error("Chief complaint must be at least 10 characters")]
    ChiefComplaintTooShort,
    #[error("Age must be between 0 and 150")]
    AgeOutOfRange,
    #[error("Required field missing: {0}")]
    MissingField(&'static str),
}

impl PatientDetails {
    /// Check the intake form rules.
    pub fn validate(&self) -> Result<(), IntakeValidationError> {
        if self.name.trim().chars().count() < MIN_NAME_CHARS {
            return Err(IntakeValidationError::NameTooShort);
        }
        if self.chief_complaint.trim().chars().count() < MIN_CHIEF_COMPLAINT_CHARS {
            return Err(IntakeValidationError::ChiefComplaintTooShort);
        }
        if matches!(self.age, Some(age) if age > MAX_AGE_YEARS) {
            return Err(IntakeValidationError::AgeOutOfRange);
        }
        Ok(())
    }

    /// Flatten into the `key: value, key: value` form sent to the model.
    /// Absent optional fields are left out.
    pub fn to_prompt_summary(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        let mut push = |key: &str, value: Option<String>| {
            if let Some(v) = value {
                let v = v.trim().to_string();
                if !v.is_empty() {
                    parts.push(format!("{key}: {v}"));
                }
            }
        };

        push("name", Some(self.name.clone()));
        push("familyName", self.family_name.clone());
        push("fatherName", self.father_name.clone());
        push("dob", Some(self.dob.to_string()));
        push("age", self.age.map(|a| a.to_string()));
        push("gender", Some(self.gender.to_string()));
        push("perspective", Some(self.perspective.to_string()));
        push(
            "consciousnessLevel",
            self.consciousness_level.map(|c| c.to_string()),
        );
        push("ward", self.ward.clone());
        push("room", self.room.clone());
        push("bed", self.bed.clone());
        push("dateOfAdmission", Some(self.date_of_admission.to_string()));
        push("attendingPhysician", self.attending_physician.clone());
        push("chiefComplaint", Some(self.chief_complaint.clone()));
        push("bp", self.bp.clone());
        push("rr", self.rr.clone());
        push("pr", self.pr.clone());
        push("spo2", self.spo2.clone());
        push("eyeColor", self.eye_color.clone());
        push("skinColor", self.skin_color.clone());
        push("bruises", self.bruises.clone());
        push("rashUlcers", self.rash_ulcers.clone());
        push("pastMedicalHistory", self.past_medical_history.clone());
        push("pastSurgicalHistory", self.past_surgical_history.clone());
        push("medication", self.medication.clone());
        push("familyHistory", self.family_history.clone());

        parts.join(", ")
    }
}

/// Partial patient details: the in-progress form and the shape returned by
/// document extraction. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientDetailsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub father_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dob: Option<NaiveDate>,
    #[serde(
        default,
        deserialize_with = "deserialize_age",
        skip_serializing_if = "Option::is_none"
    )]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perspective: Option<Perspective>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consciousness_level: Option<ConsciousnessLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ward: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_admission: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attending_physician: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chief_complaint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spo2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eye_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skin_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bruises: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rash_ulcers: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub past_medical_history: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub past_surgical_history: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medication: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_history: Option<String>,
}

/// Applies each listed field of `$src` onto `$dst` when present, recording
/// the field name in `$applied`.
macro_rules! merge_fields {
    ($src:expr, $dst:expr, $overwrite:expr, $applied:expr; $($field:ident => $key:literal),+ $(,)?) => {
        $(
            if let Some(value) = &$src.$field {
                if $overwrite || $dst.$field.is_none() {
                    $dst.$field = Some(value.clone());
                    $applied.push($key);
                }
            }
        )+
    };
}

impl PatientDetailsPatch {
    /// Merge the present fields of `self` into `form`.
    ///
    /// Fields absent from `self` never touch `form`. With `overwrite = false`
    /// values already present in `form` are kept. Returns the names of the
    /// fields that were written.
    pub fn merge_into(&self, form: &mut PatientDetailsPatch, overwrite: bool) -> Vec<&'static str> {
        let mut applied = Vec::new();
        merge_fields!(self, form, overwrite, applied;
            name => "name",
            family_name => "familyName",
            father_name => "fatherName",
            dob => "dob",
            age => "age",
            gender => "gender",
            perspective => "perspective",
            consciousness_level => "consciousnessLevel",
            ward => "ward",
            room => "room",
            bed => "bed",
            date_of_admission => "dateOfAdmission",
            attending_physician => "attendingPhysician",
            chief_complaint => "chiefComplaint",
            bp => "bp",
            rr => "rr",
            pr => "pr",
            spo2 => "spo2",
            eye_color => "eyeColor",
            skin_color => "skinColor",
            bruises => "bruises",
            rash_ulcers => "rashUlcers",
            past_medical_history => "pastMedicalHistory",
            past_surgical_history => "pastSurgicalHistory",
            medication => "medication",
            family_history => "familyHistory",
        );
        applied
    }

    /// Number of fields carrying a value.
    pub fn present_count(&self) -> usize {
        let mut scratch = PatientDetailsPatch::default();
        self.merge_into(&mut scratch, true).len()
    }

    pub fn is_empty(&self) -> bool {
        self.present_count() == 0
    }

    /// Finalize a completed form into validated `PatientDetails`.
    pub fn into_details(self) -> Result<PatientDetails, IntakeValidationError> {
        let details = PatientDetails {
            name: self.name.ok_or(IntakeValidationError::MissingField("name"))?,
            family_name: self.family_name,
            father_name: self.father_name,
            dob: self.dob.ok_or(IntakeValidationError::MissingField("dob"))?,
            age: self.age,
            gender: self.gender.ok_or(IntakeValidationError::MissingField("gender"))?,
            perspective: self
                .perspective
                .ok_or(IntakeValidationError::MissingField("perspective"))?,
            consciousness_level: self.consciousness_level,
            ward: self.ward,
            room: self.room,
            bed: self.bed,
            date_of_admission: self
                .date_of_admission
                .ok_or(IntakeValidationError::MissingField("dateOfAdmission"))?,
            attending_physician: self.attending_physician,
            chief_complaint: self
                .chief_complaint
                .ok_or(IntakeValidationError::MissingField("chiefComplaint"))?,
            bp: self.bp,
            rr: self.rr,
            pr: self.pr,
            spo2: self.spo2,
            eye_color: self.eye_color,
            skin_color: self.skin_color,
            bruises: self.bruises,
            rash_ulcers: self.rash_ulcers,
            past_medical_history: self.past_medical_history,
            past_surgical_history: self.past_surgical_history,
            medication: self.medication,
            family_history: self.family_history,
        };
        details.validate()?;
        Ok(details)
    }
}

/// Ages arrive as JSON numbers; whole floats (`42.0`) are accepted,
/// fractional or negative values are not.
fn deserialize_age<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<serde_json::Number> = Option::deserialize(deserializer)?;
    let Some(number) = value else {
        return Ok(None);
    };

    if let Some(n) = number.as_u64() {
        return u32::try_from(n)
            .map(Some)
            .map_err(|_| serde::de::Error::custom("age out of range"));
    }
    match number.as_f64() {
        Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= f64::from(u32::MAX) => Ok(Some(f as u32)),
        _ => Err(serde::de::Error::custom(format!("invalid age: {number}"))),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_details() -> PatientDetails {
        PatientDetails {
            name: "Ali".into(),
            family_name: Some("Rezaei".into()),
            father_name: None,
            dob: NaiveDate::from_ymd_opt(1980, 3, 21).unwrap(),
            age: Some(44),
            gender: Gender::Male,
            perspective: Perspective::FirstPerson,
            consciousness_level: Some(ConsciousnessLevel::Alert),
            ward: Some("Cardiology".into()),
            room: Some("12".into()),
            bed: Some("B".into()),
            date_of_admission: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            attending_physician: Some("Dr. Karimi".into()),
            chief_complaint: "chest pain radiating to the left arm".into(),
            bp: Some("140/90".into()),
            rr: Some("18".into()),
            pr: Some("88".into()),
            spo2: Some("97%".into()),
            eye_color: None,
            skin_color: None,
            bruises: None,
            rash_ulcers: None,
            past_medical_history: Some("Hypertension".into()),
            past_surgical_history: None,
            medication: Some("Amlodipine 5mg".into()),
            family_history: None,
        }
    }

    #[test]
    fn valid_details_pass() {
        assert!(sample_details().validate().is_ok());
    }

    #[test]
    fn short_name_rejected() {
        let mut details = sample_details();
        details.name = "A".into();
        assert_eq!(details.validate(), Err(IntakeValidationError::NameTooShort));
    }

    #[test]
    fn short_chief_complaint_rejected() {
        let mut details = sample_details();
        details.chief_complaint = "pain".into();
        assert_eq!(
            details.validate(),
            Err(IntakeValidationError::ChiefComplaintTooShort)
        );
    }

    #[test]
    fn absurd_age_rejected() {
        let mut details = sample_details();
        details.age = Some(420);
        assert_eq!(details.validate(), Err(IntakeValidationError::AgeOutOfRange));
    }

    #[test]
    fn prompt_summary_skips_absent_fields() {
        let summary = sample_details().to_prompt_summary();
        assert!(summary.starts_with("name: Ali, familyName: Rezaei, dob: 1980-03-21"));
        assert!(summary.contains("chiefComplaint: chest pain radiating to the left arm"));
        assert!(summary.contains("gender: male"));
        assert!(!summary.contains("fatherName"));
        assert!(!summary.contains("eyeColor"));
    }

    #[test]
    fn details_json_uses_camel_case() {
        let json = serde_json::to_value(sample_details()).unwrap();
        assert_eq!(json["dateOfAdmission"], "2024-05-02");
        assert_eq!(json["chiefComplaint"], "chest pain radiating to the left arm");
        assert!(json.get("fatherName").is_none());
    }

    #[test]
    fn form_consciousness_label_accepted() {
        let mut json = serde_json::to_value(sample_details()).unwrap();
        json["consciousnessLevel"] = "Drowsy".into();
        let details: PatientDetails = serde_json::from_value(json).unwrap();
        assert_eq!(details.consciousness_level, Some(ConsciousnessLevel::Drowsy));
        assert!(details.validate().is_ok());
    }

    #[test]
    fn merge_only_applies_present_fields() {
        let mut form = PatientDetailsPatch {
            name: Some("Sara".into()),
            ward: Some("ICU".into()),
            ..Default::default()
        };
        let extracted = PatientDetailsPatch {
            bp: Some("120/80".into()),
            family_name: Some("Ahmadi".into()),
            ..Default::default()
        };

        let applied = extracted.merge_into(&mut form, false);

        assert_eq!(applied, vec!["familyName", "bp"]);
        assert_eq!(form.name.as_deref(), Some("Sara"));
        assert_eq!(form.ward.as_deref(), Some("ICU"));
        assert_eq!(form.bp.as_deref(), Some("120/80"));
        assert_eq!(form.family_name.as_deref(), Some("Ahmadi"));
    }

    #[test]
    fn merge_keeps_user_values_without_overwrite() {
        let mut form = PatientDetailsPatch {
            name: Some("Sara".into()),
            ..Default::default()
        };
        let extracted = PatientDetailsPatch {
            name: Some("Zahra".into()),
            ..Default::default()
        };

        assert!(extracted.merge_into(&mut form, false).is_empty());
        assert_eq!(form.name.as_deref(), Some("Sara"));

        assert_eq!(extracted.merge_into(&mut form, true), vec!["name"]);
        assert_eq!(form.name.as_deref(), Some("Zahra"));
    }

    #[test]
    fn present_count_counts_fields() {
        let patch = PatientDetailsPatch {
            name: Some("Ali".into()),
            age: Some(30),
            ..Default::default()
        };
        assert_eq!(patch.present_count(), 2);
        assert!(PatientDetailsPatch::default().is_empty());
    }

    #[test]
    fn completed_form_becomes_details() {
        let details = sample_details();
        let form: PatientDetailsPatch =
            serde_json::from_value(serde_json::to_value(&details).unwrap()).unwrap();
        assert_eq!(form.into_details().unwrap(), details);
    }

    #[test]
    fn incomplete_form_reports_missing_field() {
        let form = PatientDetailsPatch {
            name: Some("Ali".into()),
            ..Default::default()
        };
        assert_eq!(
            form.into_details(),
            Err(IntakeValidationError::MissingField("dob"))
        );
    }

    #[test]
    fn age_accepts_whole_floats() {
        let patch: PatientDetailsPatch = serde_json::from_str(r#"{"age": 42.0}"#).unwrap();
        assert_eq!(patch.age, Some(42));
        assert!(serde_json::from_str::<PatientDetailsPatch>(r#"{"age": 42.5}"#).is_err());
        assert!(serde_json::from_str::<PatientDetailsPatch>(r#"{"age": -3}"#).is_err());
    }
}
