//! Session archive: completed interviews with their generated report.
//!
//! Thin layer over the history repository that owns entry creation and
//! logs every mutation. Callers open one connection per operation.

use rusqlite::Connection;
use uuid::Uuid;

use crate::db::{self, DatabaseError};
use crate::models::{HistoryEntry, HistorySummary, PatientDetails, Report};

pub struct SessionArchive<'a> {
    conn: &'a Connection,
}

impl<'a> SessionArchive<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Stamp and persist a new entry.
    pub fn save(
        &self,
        patient_details: PatientDetails,
        report: Report,
    ) -> Result<HistoryEntry, DatabaseError> {
        let entry = HistoryEntry::new(patient_details, report);
        self.save_entry(&entry)?;
        Ok(entry)
    }

    /// Persist an entry as-is (id and timestamp already assigned).
    pub fn save_entry(&self, entry: &HistoryEntry) -> Result<(), DatabaseError> {
        db::insert_history_entry(self.conn, entry)?;
        tracing::info!(entry_id = %entry.id, "History entry saved");
        Ok(())
    }

    /// All entries, newest first.
    pub fn list(&self) -> Result<Vec<HistoryEntry>, DatabaseError> {
        db::list_history_entries(self.conn)
    }

    pub fn summaries(&self) -> Result<Vec<HistorySummary>, DatabaseError> {
        db::list_history_summaries(self.conn)
    }

    pub fn get(&self, id: &Uuid) -> Result<HistoryEntry, DatabaseError> {
        db::get_history_entry(self.conn, id)?.ok_or_else(|| DatabaseError::NotFound {
            entity_type: "HistoryEntry".into(),
            id: id.to_string(),
        })
    }

    pub fn delete(&self, id: &Uuid) -> Result<(), DatabaseError> {
        db::delete_history_entry(self.conn, id)?;
        tracing::info!(entry_id = %id, "History entry deleted");
        Ok(())
    }

    /// Remove every entry. Returns how many were removed.
    pub fn clear(&self) -> Result<usize, DatabaseError> {
        let removed = db::clear_history(self.conn)?;
        tracing::info!(removed, "History cleared");
        Ok(removed)
    }
}
