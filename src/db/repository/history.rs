use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{HistoryEntry, HistorySummary, PatientDetails, Report};

/// Fixed-width RFC 3339 so the text column sorts chronologically.
fn timestamp_to_sql(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn timestamp_from_sql(raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| DatabaseError::CorruptRecord(format!("timestamp '{raw}': {e}")))
}

fn id_from_sql(raw: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(raw).map_err(|e| DatabaseError::CorruptRecord(format!("id '{raw}': {e}")))
}

pub fn insert_history_entry(conn: &Connection, entry: &HistoryEntry) -> Result<(), DatabaseError> {
    let patient_name = match &entry.patient_details.family_name {
        Some(family) if !family.trim().is_empty() => {
            format!("{} {}", entry.patient_details.name, family)
        }
        _ => entry.patient_details.name.clone(),
    };
    conn.execute(
        "INSERT INTO history_entries (id, timestamp, patient_name, chief_complaint, patient_details, report)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            entry.id.to_string(),
            timestamp_to_sql(&entry.timestamp),
            patient_name,
            entry.patient_details.chief_complaint,
            serde_json::to_string(&entry.patient_details)?,
            serde_json::to_string(&entry.report)?,
        ],
    )?;
    Ok(())
}

pub fn get_history_entry(conn: &Connection, id: &Uuid) -> Result<Option<HistoryEntry>, DatabaseError> {
    let result = conn.query_row(
        "SELECT id, timestamp, patient_details, report FROM history_entries WHERE id = ?1",
        params![id.to_string()],
        |row| {
            Ok(HistoryRow {
                id: row.get(0)?,
                timestamp: row.get(1)?,
                patient_details: row.get(2)?,
                report: row.get(3)?,
            })
        },
    );

    match result {
        Ok(row) => Ok(Some(entry_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// All entries, newest first.
pub fn list_history_entries(conn: &Connection) -> Result<Vec<HistoryEntry>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, timestamp, patient_details, report
         FROM history_entries ORDER BY timestamp DESC",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(HistoryRow {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            patient_details: row.get(2)?,
            report: row.get(3)?,
        })
    })?;

    let mut entries = Vec::new();
    for row in rows {
        entries.push(entry_from_row(row?)?);
    }
    Ok(entries)
}

/// Lightweight list for the history browser, newest first.
pub fn list_history_summaries(conn: &Connection) -> Result<Vec<HistorySummary>, DatabaseError> {
    Ok(list_history_entries(conn)?
        .iter()
        .map(HistorySummary::from)
        .collect())
}

pub fn delete_history_entry(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM history_entries WHERE id = ?1",
        params![id.to_string()],
    )?;
    if deleted == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "HistoryEntry".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Remove every entry. Returns the number of rows deleted.
pub fn clear_history(conn: &Connection) -> Result<usize, DatabaseError> {
    Ok(conn.execute("DELETE FROM history_entries", [])?)
}

struct HistoryRow {
    id: String,
    timestamp: String,
    patient_details: String,
    report: String,
}

fn entry_from_row(row: HistoryRow) -> Result<HistoryEntry, DatabaseError> {
    let patient_details: PatientDetails = serde_json::from_str(&row.patient_details)?;
    let report: Report = serde_json::from_str(&row.report)?;
    Ok(HistoryEntry {
        id: id_from_sql(&row.id)?,
        timestamp: timestamp_from_sql(&row.timestamp)?,
        patient_details,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::models::patient::tests::sample_details;
    use crate::models::report::tests::sample_report;
    use chrono::Duration;

    fn entry_at(offset_secs: i64) -> HistoryEntry {
        let mut entry = HistoryEntry::new(sample_details(), sample_report());
        entry.timestamp += Duration::seconds(offset_secs);
        entry
    }

    #[test]
    fn saved_entry_reloads_identically() {
        let conn = open_memory_database().unwrap();
        let entry = entry_at(0);
        insert_history_entry(&conn, &entry).unwrap();

        let loaded = get_history_entry(&conn, &entry.id).unwrap().unwrap();
        assert_eq!(loaded, entry);
        assert_eq!(loaded.patient_details, entry.patient_details);
        assert_eq!(loaded.report, entry.report);
    }

    #[test]
    fn missing_entry_is_none() {
        let conn = open_memory_database().unwrap();
        assert!(get_history_entry(&conn, &Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn list_is_newest_first() {
        let conn = open_memory_database().unwrap();
        let older = entry_at(-3600);
        let newer = entry_at(0);
        insert_history_entry(&conn, &older).unwrap();
        insert_history_entry(&conn, &newer).unwrap();

        let entries = list_history_entries(&conn).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, newer.id);
        assert_eq!(entries[1].id, older.id);

        let summaries = list_history_summaries(&conn).unwrap();
        assert_eq!(summaries[0].patient_name, "Ali Rezaei");
    }

    #[test]
    fn delete_one_entry() {
        let conn = open_memory_database().unwrap();
        let keep = entry_at(0);
        let removed = entry_at(1);
        insert_history_entry(&conn, &keep).unwrap();
        insert_history_entry(&conn, &removed).unwrap();

        delete_history_entry(&conn, &removed.id).unwrap();

        let entries = list_history_entries(&conn).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, keep.id);
    }

    #[test]
    fn delete_missing_entry_is_not_found() {
        let conn = open_memory_database().unwrap();
        let result = delete_history_entry(&conn, &Uuid::new_v4());
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[test]
    fn clear_removes_everything() {
        let conn = open_memory_database().unwrap();
        insert_history_entry(&conn, &entry_at(0)).unwrap();
        insert_history_entry(&conn, &entry_at(1)).unwrap();

        assert_eq!(clear_history(&conn).unwrap(), 2);
        assert!(list_history_entries(&conn).unwrap().is_empty());
        assert_eq!(clear_history(&conn).unwrap(), 0);
    }

    #[test]
    fn corrupt_json_surfaces_error() {
        let conn = open_memory_database().unwrap();
        let id = Uuid::new_v4();
        conn.execute(
            "INSERT INTO history_entries (id, timestamp, patient_name, chief_complaint, patient_details, report)
             VALUES (?1, '2024-01-01T00:00:00.000000000Z', 'x', 'y', '{bad', '{}')",
            params![id.to_string()],
        )
        .unwrap();
        assert!(matches!(
            get_history_entry(&conn, &id),
            Err(DatabaseError::Serialization(_))
        ));
    }
}
