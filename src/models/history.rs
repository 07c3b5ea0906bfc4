use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::patient::PatientDetails;
use super::report::Report;

/// A finished session kept in the archive for later browsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub patient_details: PatientDetails,
    pub report: Report,
}

impl HistoryEntry {
    pub fn new(patient_details: PatientDetails, report: Report) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            patient_details,
            report,
        }
    }
}

/// Row shown in the history list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySummary {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub patient_name: String,
    pub chief_complaint: String,
    pub leading_diagnosis: Option<String>,
}

impl From<&HistoryEntry> for HistorySummary {
    fn from(entry: &HistoryEntry) -> Self {
        let details = &entry.patient_details;
        let patient_name = match &details.family_name {
            Some(family) if !family.trim().is_empty() => format!("{} {}", details.name, family),
            _ => details.name.clone(),
        };
        Self {
            id: entry.id,
            timestamp: entry.timestamp,
            patient_name,
            chief_complaint: details.chief_complaint.clone(),
            leading_diagnosis: entry
                .report
                .leading_diagnosis()
                .map(|d| d.diagnosis_en.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::patient::tests::sample_details;
    use crate::models::report::tests::sample_report;

    #[test]
    fn new_entry_gets_fresh_id() {
        let a = HistoryEntry::new(sample_details(), sample_report());
        let b = HistoryEntry::new(sample_details(), sample_report());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn summary_joins_names_and_picks_leading_diagnosis() {
        let entry = HistoryEntry::new(sample_details(), sample_report());
        let summary = HistorySummary::from(&entry);
        assert_eq!(summary.patient_name, "Ali Rezaei");
        assert_eq!(
            summary.leading_diagnosis.as_deref(),
            Some("Acute coronary syndrome")
        );
    }
}
