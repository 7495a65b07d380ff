//! Timestamp-on-transition recording.
//!
//! Each stage-status value has a matching "entered this value" timestamp
//! column. A stamp happens only when the incoming value differs from what
//! is currently stored, so re-saving a record without changes never
//! rewrites history. Triage is the exception: its single shared timestamp
//! is cleared when the level reverts to unset and re-stamped on every
//! change between two valid levels.

use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::Connection;

use crate::db::repository::patient::{self, TimestampColumn};
use crate::db::DatabaseError;
use crate::models::enums::TriageLevel;
use crate::workflow::metrics;

/// The mutable stage-status fields of a patient record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageField {
    Triage,
    Ci,
    Labs,
    Imaging,
    Interconsult,
    Revaluation,
    Disposition,
}

impl StageField {
    pub fn status_column(&self) -> &'static str {
        match self {
            Self::Triage => "triage_level",
            Self::Ci => "ci_status",
            Self::Labs => "labs_status",
            Self::Imaging => "imaging_status",
            Self::Interconsult => "interconsult_status",
            Self::Revaluation => "revaluation_status",
            Self::Disposition => "disposition",
        }
    }

    pub const ALL: [StageField; 7] = [
        Self::Triage,
        Self::Ci,
        Self::Labs,
        Self::Imaging,
        Self::Interconsult,
        Self::Revaluation,
        Self::Disposition,
    ];
}

/// Stamp the transition timestamp for one stage field moving to
/// `new_value`, then recompute the patient's metrics.
///
/// Must run before the status column itself is rewritten — the change
/// check compares against the currently stored value. Values without a
/// timestamp column ("not ordered", "not opened", unset) stamp nothing;
/// timestamps of values not re-entered are left untouched.
pub fn record_transition(
    conn: &Connection,
    patient_id: i64,
    field: StageField,
    new_value: Option<&str>,
    now: &NaiveDateTime,
) -> Result<(), DatabaseError> {
    let stored = patient::get_status_text(conn, patient_id, field.status_column())?;
    if stored.as_deref() == new_value {
        return Ok(());
    }

    let stamp = |column: TimestampColumn| patient::set_timestamp(conn, patient_id, column, Some(now));

    match field {
        StageField::Triage => match new_value {
            Some(v) if TriageLevel::from_str(v).is_ok() => stamp(TimestampColumn::TriagedAt)?,
            // Reverting to an invalid/unset level clears the shared stamp.
            _ => patient::set_timestamp(conn, patient_id, TimestampColumn::TriagedAt, None)?,
        },
        StageField::Ci => match new_value {
            Some("not done") => stamp(TimestampColumn::CiNotDoneAt)?,
            Some("done") => stamp(TimestampColumn::CiDoneAt)?,
            _ => {}
        },
        StageField::Labs => match new_value {
            Some("awaiting results") => stamp(TimestampColumn::LabsOrderedAt)?,
            Some("results complete") => stamp(TimestampColumn::LabsDoneAt)?,
            _ => {}
        },
        StageField::Imaging => match new_value {
            Some("awaiting results") => stamp(TimestampColumn::ImagingOrderedAt)?,
            Some("results complete") => stamp(TimestampColumn::ImagingDoneAt)?,
            _ => {}
        },
        StageField::Interconsult => match new_value {
            Some("opened") => stamp(TimestampColumn::InterconsultOpenedAt)?,
            Some("completed") => stamp(TimestampColumn::InterconsultCompletedAt)?,
            _ => {}
        },
        StageField::Revaluation => match new_value {
            Some("not done") => stamp(TimestampColumn::RevaluationNotDoneAt)?,
            Some("done") => stamp(TimestampColumn::RevaluationDoneAt)?,
            _ => {}
        },
        StageField::Disposition => match new_value {
            Some("observation") => stamp(TimestampColumn::ObservationStartedAt)?,
            Some("discharged") => stamp(TimestampColumn::DischargedAt)?,
            _ => {}
        },
    }

    metrics::recompute_metrics(conn, patient_id)?;
    Ok(())
}
