use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, params_from_iter, Connection};

use crate::db::DatabaseError;
use crate::models::enums::*;
use crate::models::{NewPatient, Patient, PatientFilter, StageTimestamps};

/// Timestamps are stored as TEXT in the shared schema; SQLite's own
/// `datetime('now')` uses the space-separated form, older rows may carry
/// the `T` separator.
pub(crate) const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub(crate) fn format_ts(ts: &NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

pub(crate) fn parse_ts(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TS_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

/// Timestamp columns on `pacientes`. Writes go through this enum so the
/// column name is never caller-supplied text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampColumn {
    TriagedAt,
    CiNotDoneAt,
    CiDoneAt,
    LabsOrderedAt,
    LabsDoneAt,
    ImagingOrderedAt,
    ImagingDoneAt,
    InterconsultOpenedAt,
    InterconsultCompletedAt,
    RevaluationNotDoneAt,
    RevaluationDoneAt,
    ObservationStartedAt,
    DischargedAt,
}

impl TimestampColumn {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::TriagedAt => "triaged_at",
            Self::CiNotDoneAt => "ci_not_done_at",
            Self::CiDoneAt => "ci_done_at",
            Self::LabsOrderedAt => "labs_ordered_at",
            Self::LabsDoneAt => "labs_done_at",
            Self::ImagingOrderedAt => "imaging_ordered_at",
            Self::ImagingDoneAt => "imaging_done_at",
            Self::InterconsultOpenedAt => "interconsult_opened_at",
            Self::InterconsultCompletedAt => "interconsult_completed_at",
            Self::RevaluationNotDoneAt => "revaluation_not_done_at",
            Self::RevaluationDoneAt => "revaluation_done_at",
            Self::ObservationStartedAt => "observation_started_at",
            Self::DischargedAt => "discharged_at",
        }
    }
}

const PATIENT_COLUMNS: &str = "id, name, document_id, triage_level, ci_status, labs_status, \
     imaging_status, interconsult_status, revaluation_status, disposition, pending_tasks, \
     location, admitted_at, triaged_at, ci_not_done_at, ci_done_at, labs_ordered_at, \
     labs_done_at, imaging_ordered_at, imaging_done_at, interconsult_opened_at, \
     interconsult_completed_at, revaluation_not_done_at, revaluation_done_at, \
     observation_started_at, discharged_at";

/// Insert a new visit row. Returns the surrogate id assigned by the store.
pub fn insert_patient(
    conn: &Connection,
    patient: &NewPatient,
    admitted_at: &NaiveDateTime,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO pacientes (name, document_id, triage_level, location, admitted_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            patient.name,
            patient.document_id,
            patient.triage_level.map(|t| t.as_str()),
            patient.location,
            format_ts(admitted_at),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_patient(conn: &Connection, id: i64) -> Result<Option<Patient>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PATIENT_COLUMNS} FROM pacientes WHERE id = ?1"
    ))?;

    let result = stmt.query_row(params![id], read_patient_row);

    match result {
        Ok(row) => Ok(Some(patient_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// List patients for the board, most severe triage first, unsorted
/// (untriaged) patients last, then by arrival.
pub fn list_patients(
    conn: &Connection,
    filter: &PatientFilter,
) -> Result<Vec<Patient>, DatabaseError> {
    let mut conditions: Vec<&str> = Vec::new();
    let mut args: Vec<String> = Vec::new();

    if filter.active_only {
        conditions.push("(disposition IS NULL OR disposition != 'discharged')");
    }
    if let Some(level) = filter.triage_level {
        conditions.push("triage_level = ?");
        args.push(level.as_str().to_string());
    }
    if let Some(area) = &filter.area {
        conditions.push("location LIKE ?");
        args.push(format!("{area}%"));
    }
    if let Some(name) = &filter.name_contains {
        conditions.push("name LIKE ?");
        args.push(format!("%{name}%"));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let mut stmt = conn.prepare(&format!(
        "SELECT {PATIENT_COLUMNS} FROM pacientes {where_clause}
         ORDER BY triage_level IS NULL, triage_level, admitted_at"
    ))?;

    let rows = stmt
        .query_map(params_from_iter(args), read_patient_row)?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter().map(patient_from_row).collect()
}

/// Write the mutable basic fields and stage statuses of an existing row.
///
/// Transition timestamps and the pending-task text are maintained by
/// their own writers; this update never touches them.
pub fn update_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE pacientes SET
         name = ?1, document_id = ?2, triage_level = ?3, ci_status = ?4,
         labs_status = ?5, imaging_status = ?6, interconsult_status = ?7,
         revaluation_status = ?8, disposition = ?9, location = ?10
         WHERE id = ?11",
        params![
            patient.name,
            patient.document_id,
            patient.triage_level.map(|v| v.as_str()),
            patient.ci_status.map(|v| v.as_str()),
            patient.labs_status.map(|v| v.as_str()),
            patient.imaging_status.map(|v| v.as_str()),
            patient.interconsult_status.map(|v| v.as_str()),
            patient.revaluation_status.map(|v| v.as_str()),
            patient.disposition.map(|v| v.as_str()),
            patient.location,
            patient.id,
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::patient_not_found(patient.id));
    }
    Ok(())
}

pub fn set_pending_tasks(conn: &Connection, id: i64, text: &str) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE pacientes SET pending_tasks = ?1 WHERE id = ?2",
        params![text, id],
    )?;
    if changed == 0 {
        return Err(DatabaseError::patient_not_found(id));
    }
    Ok(())
}

/// Stamp (or clear, with `None`) a single transition timestamp.
pub fn set_timestamp(
    conn: &Connection,
    id: i64,
    column: TimestampColumn,
    value: Option<&NaiveDateTime>,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        &format!("UPDATE pacientes SET {} = ?1 WHERE id = ?2", column.as_sql()),
        params![value.map(format_ts), id],
    )?;
    if changed == 0 {
        return Err(DatabaseError::patient_not_found(id));
    }
    Ok(())
}

/// Read one stage-status column as its raw stored text. The column name
/// comes from `StageField::status_column`, never from user input.
pub fn get_status_text(
    conn: &Connection,
    id: i64,
    column: &'static str,
) -> Result<Option<String>, DatabaseError> {
    let result = conn.query_row(
        &format!("SELECT {column} FROM pacientes WHERE id = ?1"),
        params![id],
        |row| row.get::<_, Option<String>>(0),
    );
    match result {
        Ok(v) => Ok(v),
        Err(rusqlite::Error::QueryReturnedNoRows) => Err(DatabaseError::patient_not_found(id)),
        Err(e) => Err(e.into()),
    }
}

/// Physically remove a visit row. Assignments and metrics cascade; the
/// audit trail row for the deletion is written by the caller.
pub fn delete_patient(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let changed = conn.execute("DELETE FROM pacientes WHERE id = ?1", params![id])?;
    if changed == 0 {
        return Err(DatabaseError::patient_not_found(id));
    }
    Ok(())
}

// Internal row type for Patient mapping
struct PatientRow {
    id: i64,
    name: String,
    document_id: Option<String>,
    triage_level: Option<String>,
    ci_status: Option<String>,
    labs_status: Option<String>,
    imaging_status: Option<String>,
    interconsult_status: Option<String>,
    revaluation_status: Option<String>,
    disposition: Option<String>,
    pending_tasks: String,
    location: String,
    admitted_at: String,
    timestamps: Vec<Option<String>>,
}

fn read_patient_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PatientRow> {
    let mut timestamps = Vec::with_capacity(13);
    for idx in 13..26 {
        timestamps.push(row.get::<_, Option<String>>(idx)?);
    }
    Ok(PatientRow {
        id: row.get(0)?,
        name: row.get(1)?,
        document_id: row.get(2)?,
        triage_level: row.get(3)?,
        ci_status: row.get(4)?,
        labs_status: row.get(5)?,
        imaging_status: row.get(6)?,
        interconsult_status: row.get(7)?,
        revaluation_status: row.get(8)?,
        disposition: row.get(9)?,
        pending_tasks: row.get(10)?,
        location: row.get(11)?,
        admitted_at: row.get(12)?,
        timestamps,
    })
}

fn opt_enum<T: FromStr<Err = DatabaseError>>(
    value: Option<String>,
) -> Result<Option<T>, DatabaseError> {
    value.as_deref().map(T::from_str).transpose()
}

fn patient_from_row(row: PatientRow) -> Result<Patient, DatabaseError> {
    let ts = |idx: usize| row.timestamps[idx].as_deref().and_then(parse_ts);
    Ok(Patient {
        id: row.id,
        name: row.name,
        document_id: row.document_id,
        triage_level: opt_enum(row.triage_level)?,
        ci_status: opt_enum(row.ci_status)?,
        labs_status: opt_enum(row.labs_status)?,
        imaging_status: opt_enum(row.imaging_status)?,
        interconsult_status: opt_enum(row.interconsult_status)?,
        revaluation_status: opt_enum(row.revaluation_status)?,
        disposition: opt_enum(row.disposition)?,
        pending_tasks: row.pending_tasks,
        location: row.location,
        admitted_at: parse_ts(&row.admitted_at).unwrap_or_default(),
        timestamps: StageTimestamps {
            triaged_at: ts(0),
            ci_not_done_at: ts(1),
            ci_done_at: ts(2),
            labs_ordered_at: ts(3),
            labs_done_at: ts(4),
            imaging_ordered_at: ts(5),
            imaging_done_at: ts(6),
            interconsult_opened_at: ts(7),
            interconsult_completed_at: ts(8),
            revaluation_not_done_at: ts(9),
            revaluation_done_at: ts(10),
            observation_started_at: ts(11),
            discharged_at: ts(12),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;

    fn sample(name: &str) -> NewPatient {
        NewPatient {
            name: name.into(),
            document_id: Some("CC-1020".into()),
            triage_level: Some(TriageLevel::Level3),
            location: "ER - Bay 4".into(),
        }
    }

    fn now() -> NaiveDateTime {
        parse_ts("2026-03-01 08:30:00").unwrap()
    }

    #[test]
    fn insert_and_get_round_trip() {
        let conn = open_memory_database().unwrap();
        let id = insert_patient(&conn, &sample("Ana Maria Lopez"), &now()).unwrap();

        let patient = get_patient(&conn, id).unwrap().unwrap();
        assert_eq!(patient.id, id);
        assert_eq!(patient.name, "Ana Maria Lopez");
        assert_eq!(patient.document_id.as_deref(), Some("CC-1020"));
        assert_eq!(patient.triage_level, Some(TriageLevel::Level3));
        assert_eq!(patient.admitted_at, now());
        assert!(patient.ci_status.is_none());
        assert!(patient.timestamps.discharged_at.is_none());
    }

    #[test]
    fn get_missing_patient_returns_none() {
        let conn = open_memory_database().unwrap();
        assert!(get_patient(&conn, 99).unwrap().is_none());
    }

    #[test]
    fn update_writes_statuses() {
        let conn = open_memory_database().unwrap();
        let id = insert_patient(&conn, &sample("Ana Maria Lopez"), &now()).unwrap();

        let mut patient = get_patient(&conn, id).unwrap().unwrap();
        patient.ci_status = Some(CiStatus::Done);
        patient.labs_status = Some(StudyStatus::AwaitingResults);
        update_patient(&conn, &patient).unwrap();

        let reread = get_patient(&conn, id).unwrap().unwrap();
        assert_eq!(reread.ci_status, Some(CiStatus::Done));
        assert_eq!(reread.labs_status, Some(StudyStatus::AwaitingResults));
    }

    #[test]
    fn update_missing_patient_fails() {
        let conn = open_memory_database().unwrap();
        let id = insert_patient(&conn, &sample("Ana Maria Lopez"), &now()).unwrap();
        let mut patient = get_patient(&conn, id).unwrap().unwrap();
        patient.id = 4242;
        assert!(matches!(
            update_patient(&conn, &patient),
            Err(DatabaseError::NotFound { .. })
        ));
    }

    #[test]
    fn set_timestamp_stamps_and_clears() {
        let conn = open_memory_database().unwrap();
        let id = insert_patient(&conn, &sample("Ana Maria Lopez"), &now()).unwrap();

        set_timestamp(&conn, id, TimestampColumn::CiDoneAt, Some(&now())).unwrap();
        let patient = get_patient(&conn, id).unwrap().unwrap();
        assert_eq!(patient.timestamps.ci_done_at, Some(now()));

        set_timestamp(&conn, id, TimestampColumn::CiDoneAt, None).unwrap();
        let patient = get_patient(&conn, id).unwrap().unwrap();
        assert!(patient.timestamps.ci_done_at.is_none());
    }

    #[test]
    fn list_orders_by_triage_then_arrival() {
        let conn = open_memory_database().unwrap();
        let mut late_severe = sample("Luis Carlos Rojas");
        late_severe.triage_level = Some(TriageLevel::Level1);
        let mut untriaged = sample("Mario Perez Gil");
        untriaged.triage_level = None;

        let first = insert_patient(&conn, &sample("Ana Maria Lopez"), &now()).unwrap();
        let severe =
            insert_patient(&conn, &late_severe, &parse_ts("2026-03-01 09:00:00").unwrap()).unwrap();
        let none =
            insert_patient(&conn, &untriaged, &parse_ts("2026-03-01 07:00:00").unwrap()).unwrap();

        let listed = list_patients(&conn, &PatientFilter::default()).unwrap();
        let ids: Vec<i64> = listed.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![severe, first, none]);
    }

    #[test]
    fn active_filter_excludes_discharged() {
        let conn = open_memory_database().unwrap();
        let id = insert_patient(&conn, &sample("Ana Maria Lopez"), &now()).unwrap();
        insert_patient(&conn, &sample("Luis Carlos Rojas"), &now()).unwrap();

        let mut patient = get_patient(&conn, id).unwrap().unwrap();
        patient.disposition = Some(Disposition::Discharged);
        update_patient(&conn, &patient).unwrap();

        let filter = PatientFilter { active_only: true, ..Default::default() };
        let listed = list_patients(&conn, &filter).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Luis Carlos Rojas");
    }

    #[test]
    fn delete_removes_row() {
        let conn = open_memory_database().unwrap();
        let id = insert_patient(&conn, &sample("Ana Maria Lopez"), &now()).unwrap();
        delete_patient(&conn, id).unwrap();
        assert!(get_patient(&conn, id).unwrap().is_none());
        assert!(matches!(
            delete_patient(&conn, id),
            Err(DatabaseError::NotFound { .. })
        ));
    }

    #[test]
    fn parse_ts_accepts_both_separators() {
        assert!(parse_ts("2026-03-01 08:30:00").is_some());
        assert!(parse_ts("2026-03-01T08:30:00").is_some());
        assert!(parse_ts("not a timestamp").is_none());
    }
}
