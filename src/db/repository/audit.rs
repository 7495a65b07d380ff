use std::str::FromStr;

use rusqlite::{params, Connection};

use crate::db::repository::patient::parse_ts;
use crate::db::DatabaseError;
use crate::models::enums::AuditAction;
use crate::models::AuditEntry;

/// Append one audit row. The timestamp is assigned by the database at
/// insert time, never passed in by the caller.
pub fn insert_audit_entry(
    conn: &Connection,
    username: &str,
    role: &str,
    action: AuditAction,
    patient_name: Option<&str>,
    details: Option<&str>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO trazabilidad (username, role, action, patient_name, details)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![username, role, action.as_str(), patient_name, details],
    )?;
    Ok(())
}

/// Most recent audit entries, newest first.
pub fn recent_entries(conn: &Connection, limit: i64) -> Result<Vec<AuditEntry>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, username, role, action, timestamp, patient_name, details
         FROM trazabilidad ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt
        .query_map(params![limit], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, Option<String>>(6)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, username, role, action, timestamp, patient_name, details)| {
            Ok(AuditEntry {
                id,
                username,
                role,
                action: AuditAction::from_str(&action)?,
                timestamp: parse_ts(&timestamp).unwrap_or_default(),
                patient_name,
                details,
            })
        })
        .collect()
}

/// Entries touching one patient name, newest first. The trail survives
/// deletion of the patient row itself.
pub fn entries_for_patient(
    conn: &Connection,
    patient_name: &str,
) -> Result<Vec<AuditEntry>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, username, role, action, timestamp, patient_name, details
         FROM trazabilidad WHERE patient_name = ?1 ORDER BY id DESC",
    )?;
    let rows = stmt
        .query_map(params![patient_name], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, Option<String>>(6)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, username, role, action, timestamp, patient_name, details)| {
            Ok(AuditEntry {
                id,
                username,
                role,
                action: AuditAction::from_str(&action)?,
                timestamp: parse_ts(&timestamp).unwrap_or_default(),
                patient_name,
                details,
            })
        })
        .collect()
}
