//! Workflow-timing metrics.
//!
//! Elapsed minutes per stage, derived from the transition timestamp pairs
//! and upserted into `metricas_pacientes` whenever a relevant timestamp
//! changes. A missing timestamp pair simply omits that metric — NULL in
//! the store, never zero.

use chrono::NaiveDateTime;
use rusqlite::Connection;

use crate::db::repository::{metrics as metrics_repo, patient};
use crate::db::DatabaseError;
use crate::models::{Patient, PatientMetrics};

/// Recompute and persist the metrics row for one patient.
pub fn recompute_metrics(conn: &Connection, patient_id: i64) -> Result<(), DatabaseError> {
    let record = patient::get_patient(conn, patient_id)?
        .ok_or_else(|| DatabaseError::patient_not_found(patient_id))?;
    let computed = compute(&record);
    metrics_repo::upsert_metrics(conn, &computed)?;
    Ok(())
}

/// Derive the metric values from a record's timestamps. `computed_at` is
/// assigned by the store on upsert.
pub fn compute(record: &Patient) -> PatientMetrics {
    let ts = &record.timestamps;

    // Total attention runs from admission to whichever endpoint the visit
    // reached last: discharge, observation start, or revaluation done.
    let attention_end = [ts.discharged_at, ts.observation_started_at, ts.revaluation_done_at]
        .into_iter()
        .flatten()
        .max();

    PatientMetrics {
        patient_id: record.id,
        minutes_triage: elapsed_minutes(Some(record.admitted_at), ts.triaged_at),
        minutes_ci: elapsed_minutes(ts.ci_not_done_at, ts.ci_done_at),
        minutes_labs: elapsed_minutes(ts.labs_ordered_at, ts.labs_done_at),
        minutes_imaging: elapsed_minutes(ts.imaging_ordered_at, ts.imaging_done_at),
        minutes_interconsult: elapsed_minutes(ts.interconsult_opened_at, ts.interconsult_completed_at),
        minutes_revaluation: elapsed_minutes(ts.revaluation_not_done_at, ts.revaluation_done_at),
        minutes_total: elapsed_minutes(Some(record.admitted_at), attention_end),
        computed_at: NaiveDateTime::default(),
    }
}

/// Whole minutes between two timestamps, floored. Clock skew between
/// installations can make this negative; the value is stored as computed.
fn elapsed_minutes(start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Option<i64> {
    match (start, end) {
        (Some(start), Some(end)) => Some((end - start).num_seconds().div_euclid(60)),
        _ => None,
    }
}
