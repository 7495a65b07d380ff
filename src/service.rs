//! Patient-tracking operations, one unit of work per call.
//!
//! Each operation opens its own connection, runs validation, and applies
//! the record write, transition stamps, pending-task rebuild, metrics
//! recompute, and audit entry inside a single transaction — they all land
//! or none do. The GUI table refreshes by polling [`PatientService::list_board`]
//! every [`BOARD_POLL_INTERVAL`].

use std::path::PathBuf;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use rusqlite::Connection;
use serde::Serialize;
use thiserror::Error;

use crate::audit::log_action;
use crate::config::{self, AppConfig};
use crate::db::repository::orders::{self, OrderKind};
use crate::db::repository::{audit as audit_repo, metrics as metrics_repo, patient as patient_repo};
use crate::db::{open_database, DatabaseError};
use crate::models::enums::AuditAction;
use crate::models::{AuditEntry, NewPatient, Patient, PatientFilter};
use crate::session::Session;
use crate::workflow::metrics::recompute_metrics;
use crate::workflow::pending::{derive_pending, render_pending};
use crate::workflow::transitions::{record_transition, StageField};
use crate::workflow::validator::{validate, validate_identity, ValidationError};

/// How often the GUI re-reads the board.
pub const BOARD_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// One row of the live board table.
#[derive(Debug, Clone, Serialize)]
pub struct BoardRow {
    pub id: i64,
    pub name: String,
    pub location: String,
    pub triage_level: Option<String>,
    pub ci_status: Option<String>,
    pub labs_status: Option<String>,
    pub imaging_status: Option<String>,
    pub interconsult_status: Option<String>,
    pub revaluation_status: Option<String>,
    pub disposition: Option<String>,
    pub pending_tasks: String,
    pub admitted_at: NaiveDateTime,
    pub minutes_in_department: i64,
}

pub struct PatientService {
    db_path: PathBuf,
}

impl PatientService {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self { db_path: db_path.into() }
    }

    pub fn from_config(app_config: &AppConfig) -> Self {
        Self::new(config::database_path(app_config))
    }

    // One connection per operation, dropped when the operation ends.
    fn connect(&self) -> Result<Connection, DatabaseError> {
        open_database(&self.db_path)
    }

    /// Register a new arrival. Stamps `admitted_at`, and the shared
    /// triage timestamp when the patient is triaged on arrival.
    pub fn register_patient(
        &self,
        session: &Session,
        new: &NewPatient,
    ) -> Result<i64, ServiceError> {
        validate_identity(&new.name, new.document_id.as_deref())?;

        let mut conn = self.connect()?;
        let tx = conn.transaction().map_err(DatabaseError::from)?;
        let now = Local::now().naive_local();

        let id = patient_repo::insert_patient(&tx, new, &now)?;
        if new.triage_level.is_some() {
            patient_repo::set_timestamp(
                &tx,
                id,
                patient_repo::TimestampColumn::TriagedAt,
                Some(&now),
            )?;
            recompute_metrics(&tx, id)?;
        }
        let tasks = derive_pending(&tx, id)?;
        patient_repo::set_pending_tasks(&tx, id, &render_pending(&tasks))?;
        log_action(&tx, session, AuditAction::Create, Some(&new.name), Some("patient registered"))?;

        tx.commit().map_err(DatabaseError::from)?;
        tracing::info!(patient_id = id, "patient registered");
        Ok(id)
    }

    /// Persist an edited record. The candidate must pass the precedence
    /// chain; on success every changed stage field gets its transition
    /// stamp, pending tasks and metrics are rebuilt, and the change set
    /// is audited.
    pub fn update_patient(&self, session: &Session, candidate: &Patient) -> Result<(), ServiceError> {
        validate_identity(&candidate.name, candidate.document_id.as_deref())?;
        validate(candidate)?;

        let mut conn = self.connect()?;
        let tx = conn.transaction().map_err(DatabaseError::from)?;
        let existing = patient_repo::get_patient(&tx, candidate.id)?
            .ok_or_else(|| DatabaseError::patient_not_found(candidate.id))?;
        let now = Local::now().naive_local();

        // Stamps compare against stored values, so they run before the
        // status columns are rewritten.
        for field in StageField::ALL {
            let new_value = stage_value(candidate, field);
            if stage_value(&existing, field) != new_value {
                record_transition(&tx, candidate.id, field, new_value, &now)?;
            }
        }

        patient_repo::update_patient(&tx, candidate)?;
        // The candidate may carry pending-task text the user edited by
        // hand; store it first so the deriver can pick up the manual
        // entries, then replace it with the rebuilt list.
        patient_repo::set_pending_tasks(&tx, candidate.id, &candidate.pending_tasks)?;
        let tasks = derive_pending(&tx, candidate.id)?;
        patient_repo::set_pending_tasks(&tx, candidate.id, &render_pending(&tasks))?;

        let details = describe_changes(&existing, candidate);
        log_action(&tx, session, AuditAction::Update, Some(&candidate.name), Some(&details))?;

        tx.commit().map_err(DatabaseError::from)?;
        tracing::info!(patient_id = candidate.id, "patient updated");
        Ok(())
    }

    /// Replace the patient's lab or imaging order set and rebuild the
    /// pending list around it.
    pub fn assign_orders(
        &self,
        session: &Session,
        patient_id: i64,
        kind: OrderKind,
        names: &[String],
    ) -> Result<(), ServiceError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction().map_err(DatabaseError::from)?;
        let record = patient_repo::get_patient(&tx, patient_id)?
            .ok_or_else(|| DatabaseError::patient_not_found(patient_id))?;

        orders::set_assignments(&tx, patient_id, kind, names)?;
        let tasks = derive_pending(&tx, patient_id)?;
        patient_repo::set_pending_tasks(&tx, patient_id, &render_pending(&tasks))?;

        let details = format!("{} assigned: {}", kind.label(), names.join(", "));
        log_action(&tx, session, AuditAction::Update, Some(&record.name), Some(&details))?;

        tx.commit().map_err(DatabaseError::from)?;
        Ok(())
    }

    /// Staff-initiated destructive delete. The visit row and its
    /// assignments and metrics go; the audit trail keeps the deletion.
    pub fn delete_patient(&self, session: &Session, patient_id: i64) -> Result<(), ServiceError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction().map_err(DatabaseError::from)?;
        let record = patient_repo::get_patient(&tx, patient_id)?
            .ok_or_else(|| DatabaseError::patient_not_found(patient_id))?;

        patient_repo::delete_patient(&tx, patient_id)?;
        log_action(&tx, session, AuditAction::Delete, Some(&record.name), Some("record deleted"))?;

        tx.commit().map_err(DatabaseError::from)?;
        tracing::info!(patient_id, "patient record deleted");
        Ok(())
    }

    /// Full board for the polling table refresh.
    pub fn list_board(&self, filter: &PatientFilter) -> Result<Vec<BoardRow>, ServiceError> {
        let conn = self.connect()?;
        let now = Local::now().naive_local();
        let rows = patient_repo::list_patients(&conn, filter)?
            .into_iter()
            .map(|p| board_row(p, &now))
            .collect();
        Ok(rows)
    }

    pub fn patient_detail(&self, patient_id: i64) -> Result<Patient, ServiceError> {
        let conn = self.connect()?;
        let record = patient_repo::get_patient(&conn, patient_id)?
            .ok_or_else(|| DatabaseError::patient_not_found(patient_id))?;
        Ok(record)
    }

    pub fn assigned_orders(
        &self,
        patient_id: i64,
        kind: OrderKind,
    ) -> Result<Vec<String>, ServiceError> {
        let conn = self.connect()?;
        Ok(orders::assigned_names(&conn, patient_id, kind)?)
    }

    /// Per-stage department averages for the reporting screens.
    pub fn department_averages(&self) -> Result<Vec<(String, f64)>, ServiceError> {
        let conn = self.connect()?;
        Ok(metrics_repo::average_minutes(&conn)?)
    }

    pub fn recent_audit(&self, limit: i64) -> Result<Vec<AuditEntry>, ServiceError> {
        let conn = self.connect()?;
        Ok(audit_repo::recent_entries(&conn, limit)?)
    }
}

fn stage_value(record: &Patient, field: StageField) -> Option<&'static str> {
    match field {
        StageField::Triage => record.triage_level.map(|v| v.as_str()),
        StageField::Ci => record.ci_status.map(|v| v.as_str()),
        StageField::Labs => record.labs_status.map(|v| v.as_str()),
        StageField::Imaging => record.imaging_status.map(|v| v.as_str()),
        StageField::Interconsult => record.interconsult_status.map(|v| v.as_str()),
        StageField::Revaluation => record.revaluation_status.map(|v| v.as_str()),
        StageField::Disposition => record.disposition.map(|v| v.as_str()),
    }
}

/// Human-readable change set for the audit entry.
fn describe_changes(existing: &Patient, candidate: &Patient) -> String {
    let mut parts = Vec::new();

    for field in StageField::ALL {
        let old = stage_value(existing, field);
        let new = stage_value(candidate, field);
        if old != new {
            parts.push(format!(
                "{}: {} -> {}",
                field.status_column(),
                old.unwrap_or("-"),
                new.unwrap_or("-"),
            ));
        }
    }
    if existing.name != candidate.name {
        parts.push(format!("name: {} -> {}", existing.name, candidate.name));
    }
    if existing.document_id != candidate.document_id {
        parts.push("document id changed".into());
    }
    if existing.location != candidate.location {
        parts.push(format!("location: {} -> {}", existing.location, candidate.location));
    }

    if parts.is_empty() {
        "no field changes".into()
    } else {
        parts.join("; ")
    }
}

fn board_row(record: Patient, now: &NaiveDateTime) -> BoardRow {
    let minutes_in_department = (*now - record.admitted_at).num_seconds().div_euclid(60);
    BoardRow {
        id: record.id,
        name: record.name,
        location: record.location,
        triage_level: record.triage_level.map(|v| v.as_str().into()),
        ci_status: record.ci_status.map(|v| v.as_str().into()),
        labs_status: record.labs_status.map(|v| v.as_str().into()),
        imaging_status: record.imaging_status.map(|v| v.as_str().into()),
        interconsult_status: record.interconsult_status.map(|v| v.as_str().into()),
        revaluation_status: record.revaluation_status.map(|v| v.as_str().into()),
        disposition: record.disposition.map(|v| v.as_str().into()),
        pending_tasks: record.pending_tasks,
        admitted_at: record.admitted_at,
        minutes_in_department,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::metrics::get_metrics;
    use crate::db::repository::user::insert_user;
    use crate::models::enums::*;
    use crate::models::UserRoles;

    struct Fixture {
        _dir: tempfile::TempDir,
        service: PatientService,
        session: Session,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("urgencia.db");
        let service = PatientService::new(&db_path);
        {
            let conn = open_database(&db_path).unwrap();
            insert_user(
                &conn,
                "rmedina",
                "h",
                "Rosa Medina",
                UserRoles { admin: false, physician: true, nurse: false },
            )
            .unwrap();
        }
        Fixture {
            _dir: dir,
            service,
            session: Session { username: "rmedina".into() },
        }
    }

    fn new_patient(triage: Option<TriageLevel>) -> NewPatient {
        NewPatient {
            name: "Ana Maria Lopez".into(),
            document_id: Some("CC-1020".into()),
            triage_level: triage,
            location: "ER - Bay 1".into(),
        }
    }

    #[test]
    fn register_derives_pending_and_audits() {
        let f = fixture();
        let id = f.service.register_patient(&f.session, &new_patient(None)).unwrap();

        let record = f.service.patient_detail(id).unwrap();
        assert_eq!(record.pending_tasks, "pending triage");

        let entries = f.service.recent_audit(1).unwrap();
        assert_eq!(entries[0].action, AuditAction::Create);
        assert_eq!(entries[0].patient_name.as_deref(), Some("Ana Maria Lopez"));
        assert_eq!(entries[0].role, "physician");
    }

    #[test]
    fn register_with_triage_stamps_and_computes_metrics() {
        let f = fixture();
        let id = f
            .service
            .register_patient(&f.session, &new_patient(Some(TriageLevel::Level2)))
            .unwrap();

        let record = f.service.patient_detail(id).unwrap();
        assert!(record.timestamps.triaged_at.is_some());
        assert_eq!(record.pending_tasks, "pending CI evaluation");

        let conn = open_database(f.service.db_path.as_path()).unwrap();
        let metrics = get_metrics(&conn, id).unwrap().unwrap();
        assert_eq!(metrics.minutes_triage, Some(0));
    }

    #[test]
    fn register_rejects_bad_identity() {
        let f = fixture();
        let mut short = new_patient(None);
        short.name = "Ana Lopez".into();
        assert!(matches!(
            f.service.register_patient(&f.session, &short),
            Err(ServiceError::Validation(ValidationError::NameTooShort))
        ));
    }

    #[test]
    fn anonymous_registration_allowed_without_document() {
        let f = fixture();
        let anonymous = NewPatient {
            name: "NN - 2026-03-01 - 08:00:00".into(),
            document_id: None,
            triage_level: None,
            location: "ER - Bay 2".into(),
        };
        assert!(f.service.register_patient(&f.session, &anonymous).is_ok());
    }

    #[test]
    fn update_rejects_precedence_violation_without_persisting() {
        let f = fixture();
        let id = f.service.register_patient(&f.session, &new_patient(None)).unwrap();

        let mut candidate = f.service.patient_detail(id).unwrap();
        candidate.ci_status = Some(CiStatus::Done); // no triage yet
        let result = f.service.update_patient(&f.session, &candidate);
        assert!(matches!(
            result,
            Err(ServiceError::Validation(ValidationError::CiBeforeTriage))
        ));

        let stored = f.service.patient_detail(id).unwrap();
        assert!(stored.ci_status.is_none());
        assert!(stored.timestamps.ci_done_at.is_none());
    }

    #[test]
    fn update_stamps_transitions_and_rebuilds_pending() {
        let f = fixture();
        let id = f
            .service
            .register_patient(&f.session, &new_patient(Some(TriageLevel::Level3)))
            .unwrap();

        let mut candidate = f.service.patient_detail(id).unwrap();
        candidate.ci_status = Some(CiStatus::Done);
        f.service.update_patient(&f.session, &candidate).unwrap();

        let stored = f.service.patient_detail(id).unwrap();
        assert!(stored.timestamps.ci_done_at.is_some());
        assert!(stored.pending_tasks.contains("open interconsult"));
        assert!(stored.pending_tasks.contains("pending revaluation"));

        let entries = f.service.recent_audit(1).unwrap();
        assert_eq!(entries[0].action, AuditAction::Update);
        assert!(entries[0].details.as_deref().unwrap().contains("ci_status: - -> done"));
    }

    #[test]
    fn assigned_labs_show_in_pending_until_complete() {
        let f = fixture();
        let id = f
            .service
            .register_patient(&f.session, &new_patient(Some(TriageLevel::Level3)))
            .unwrap();

        let mut candidate = f.service.patient_detail(id).unwrap();
        candidate.ci_status = Some(CiStatus::Done);
        candidate.labs_status = Some(StudyStatus::AwaitingResults);
        f.service.update_patient(&f.session, &candidate).unwrap();
        f.service
            .assign_orders(&f.session, id, OrderKind::Lab, &["Troponin".into(), "CBC".into()])
            .unwrap();

        let stored = f.service.patient_detail(id).unwrap();
        assert!(stored.pending_tasks.contains("labs: CBC / Troponin"));

        let mut candidate = f.service.patient_detail(id).unwrap();
        candidate.labs_status = Some(StudyStatus::ResultsComplete);
        f.service.update_patient(&f.session, &candidate).unwrap();

        let stored = f.service.patient_detail(id).unwrap();
        assert!(!stored.pending_tasks.contains("labs:"));
        assert!(stored.timestamps.labs_done_at.is_some());
    }

    #[test]
    fn full_flow_to_discharge() {
        let f = fixture();
        let id = f
            .service
            .register_patient(&f.session, &new_patient(Some(TriageLevel::Level3)))
            .unwrap();

        let mut c = f.service.patient_detail(id).unwrap();
        c.ci_status = Some(CiStatus::Done);
        c.labs_status = Some(StudyStatus::AwaitingResults);
        f.service.update_patient(&f.session, &c).unwrap();

        let mut c = f.service.patient_detail(id).unwrap();
        c.labs_status = Some(StudyStatus::ResultsComplete);
        c.interconsult_status = Some(InterconsultStatus::Opened);
        f.service.update_patient(&f.session, &c).unwrap();

        let mut c = f.service.patient_detail(id).unwrap();
        c.interconsult_status = Some(InterconsultStatus::Completed);
        c.revaluation_status = Some(RevaluationStatus::Done);
        f.service.update_patient(&f.session, &c).unwrap();

        let mut c = f.service.patient_detail(id).unwrap();
        c.disposition = Some(Disposition::Discharged);
        f.service.update_patient(&f.session, &c).unwrap();

        let stored = f.service.patient_detail(id).unwrap();
        assert!(stored.timestamps.discharged_at.is_some());
        assert_eq!(stored.pending_tasks, "");

        let conn = open_database(f.service.db_path.as_path()).unwrap();
        let metrics = get_metrics(&conn, id).unwrap().unwrap();
        assert!(metrics.minutes_total.is_some());
        assert!(metrics.minutes_labs.is_some());
    }

    #[test]
    fn discharge_blocked_by_open_interconsult() {
        let f = fixture();
        let id = f
            .service
            .register_patient(&f.session, &new_patient(Some(TriageLevel::Level3)))
            .unwrap();

        let mut c = f.service.patient_detail(id).unwrap();
        c.ci_status = Some(CiStatus::Done);
        c.labs_status = Some(StudyStatus::ResultsComplete);
        c.interconsult_status = Some(InterconsultStatus::Opened);
        c.revaluation_status = Some(RevaluationStatus::Done);
        f.service.update_patient(&f.session, &c).unwrap();

        let mut c = f.service.patient_detail(id).unwrap();
        c.disposition = Some(Disposition::Discharged);
        assert!(matches!(
            f.service.update_patient(&f.session, &c),
            Err(ServiceError::Validation(ValidationError::DischargeInterconsultOpen))
        ));
    }

    #[test]
    fn manual_pending_note_survives_updates() {
        let f = fixture();
        let id = f
            .service
            .register_patient(&f.session, &new_patient(Some(TriageLevel::Level3)))
            .unwrap();

        let mut candidate = f.service.patient_detail(id).unwrap();
        candidate.pending_tasks.push_str(", call family about allergies");
        f.service.update_patient(&f.session, &candidate).unwrap();

        let stored = f.service.patient_detail(id).unwrap();
        assert_eq!(
            stored.pending_tasks,
            "pending CI evaluation, call family about allergies"
        );

        // The note rides along through a later stage transition.
        let mut candidate = f.service.patient_detail(id).unwrap();
        candidate.ci_status = Some(CiStatus::Done);
        f.service.update_patient(&f.session, &candidate).unwrap();

        let stored = f.service.patient_detail(id).unwrap();
        assert!(stored.pending_tasks.ends_with("call family about allergies"));
        assert!(!stored.pending_tasks.contains("pending CI evaluation"));
    }

    #[test]
    fn delete_is_audited_and_removes_row() {
        let f = fixture();
        let id = f.service.register_patient(&f.session, &new_patient(None)).unwrap();

        f.service.delete_patient(&f.session, id).unwrap();
        assert!(matches!(
            f.service.patient_detail(id),
            Err(ServiceError::Database(DatabaseError::NotFound { .. }))
        ));

        let entries = f.service.recent_audit(1).unwrap();
        assert_eq!(entries[0].action, AuditAction::Delete);
        assert_eq!(entries[0].patient_name.as_deref(), Some("Ana Maria Lopez"));
    }

    #[test]
    fn board_lists_active_patients() {
        let f = fixture();
        f.service.register_patient(&f.session, &new_patient(Some(TriageLevel::Level1))).unwrap();
        let mut second = new_patient(None);
        second.name = "Luis Carlos Rojas".into();
        f.service.register_patient(&f.session, &second).unwrap();

        let board = f
            .service
            .list_board(&PatientFilter { active_only: true, ..Default::default() })
            .unwrap();
        assert_eq!(board.len(), 2);
        assert_eq!(board[0].name, "Ana Maria Lopez");
        assert_eq!(board[0].triage_level.as_deref(), Some("1"));
        assert!(board[0].minutes_in_department >= 0);
    }

    #[test]
    fn audit_soft_failure_does_not_block_operation() {
        let f = fixture();
        let ghost = Session { username: "ghost".into() };

        let id = f.service.register_patient(&ghost, &new_patient(None)).unwrap();
        assert!(f.service.patient_detail(id).is_ok());
        assert!(f.service.recent_audit(10).unwrap().is_empty());
    }
}
