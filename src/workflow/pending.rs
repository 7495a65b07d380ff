//! Pending-task derivation.
//!
//! The board's "pending" column is never patched in place — it is rebuilt
//! from the stage statuses and order lists on every write, which keeps it
//! from drifting out of sync with the record. Tasks are tagged values
//! ([`PendingTask`]) and only become text at the presentation boundary
//! ([`render_pending`]). Free-text notes staff typed into the column are
//! recognized by exclusion and carried through recomputation verbatim.

use rusqlite::Connection;

use crate::db::repository::orders::{self, OrderKind};
use crate::db::repository::patient;
use crate::db::DatabaseError;
use crate::models::enums::{CiStatus, InterconsultStatus, RevaluationStatus, StudyStatus};

pub const PENDING_TRIAGE: &str = "pending triage";
pub const PENDING_CI: &str = "pending CI evaluation";
pub const OPEN_INTERCONSULT: &str = "open interconsult";
pub const AWAIT_INTERCONSULT: &str = "await interconsult response";
pub const PENDING_REVALUATION: &str = "pending revaluation";

const LABS_PREFIX: &str = "labs: ";
const IMAGING_PREFIX: &str = "imaging: ";

/// One outstanding task. Study entries carry the distinct assigned test
/// names, already sorted and deduplicated by the assignment query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingTask {
    Triage,
    CiEvaluation,
    OpenInterconsult,
    AwaitInterconsultResponse,
    Revaluation,
    Labs(Vec<String>),
    Imaging(Vec<String>),
    /// Free-text note entered by staff; preserved verbatim.
    Manual(String),
}

impl PendingTask {
    fn render(&self) -> String {
        match self {
            Self::Triage => PENDING_TRIAGE.into(),
            Self::CiEvaluation => PENDING_CI.into(),
            Self::OpenInterconsult => OPEN_INTERCONSULT.into(),
            Self::AwaitInterconsultResponse => AWAIT_INTERCONSULT.into(),
            Self::Revaluation => PENDING_REVALUATION.into(),
            Self::Labs(names) => format!("{LABS_PREFIX}{}", names.join(" / ")),
            Self::Imaging(names) => format!("{IMAGING_PREFIX}{}", names.join(" / ")),
            Self::Manual(text) => text.clone(),
        }
    }
}

/// Rebuild the pending-task list for one patient from scratch.
///
/// Rule order is fixed so the rendered text is stable: triage, CI,
/// interconsult, revaluation, labs, imaging, then any preserved manual
/// entries in their original order. Calling this twice without an
/// intervening state change yields the same list.
pub fn derive_pending(conn: &Connection, patient_id: i64) -> Result<Vec<PendingTask>, DatabaseError> {
    let record = patient::get_patient(conn, patient_id)?
        .ok_or_else(|| DatabaseError::patient_not_found(patient_id))?;

    let mut tasks = Vec::new();

    if record.triage_level.is_none() {
        tasks.push(PendingTask::Triage);
    } else if record.ci_status != Some(CiStatus::Done) {
        tasks.push(PendingTask::CiEvaluation);
    } else {
        match record.interconsult_status {
            None | Some(InterconsultStatus::NotOpened) => tasks.push(PendingTask::OpenInterconsult),
            Some(InterconsultStatus::Opened) => tasks.push(PendingTask::AwaitInterconsultResponse),
            Some(InterconsultStatus::Completed) => {}
        }
        if record.revaluation_status != Some(RevaluationStatus::Done) {
            tasks.push(PendingTask::Revaluation);
        }
    }

    if record.ci_status == Some(CiStatus::Done) {
        if study_pending(record.labs_status) {
            let names = orders::assigned_names(conn, patient_id, OrderKind::Lab)?;
            if !names.is_empty() {
                tasks.push(PendingTask::Labs(names));
            }
        }
        if study_pending(record.imaging_status) {
            let names = orders::assigned_names(conn, patient_id, OrderKind::Imaging)?;
            if !names.is_empty() {
                tasks.push(PendingTask::Imaging(names));
            }
        }
    }

    // Carry staff notes through the rebuild. A note is anything in the
    // stored text that is not part of the automatic vocabulary and not a
    // known catalog test name.
    let lab_catalog = orders::list_catalog(conn, OrderKind::Lab)?;
    let imaging_catalog = orders::list_catalog(conn, OrderKind::Imaging)?;
    for entry in parse_entries(&record.pending_tasks) {
        if !is_automatic_entry(&entry, &lab_catalog, &imaging_catalog) {
            tasks.push(PendingTask::Manual(entry));
        }
    }

    Ok(tasks)
}

fn study_pending(status: Option<StudyStatus>) -> bool {
    matches!(
        status,
        Some(StudyStatus::NotOrdered) | Some(StudyStatus::AwaitingResults)
    )
}

/// Serialize to the comma-separated presentation text stored in the
/// `pending_tasks` column and shown on the board.
pub fn render_pending(tasks: &[PendingTask]) -> String {
    tasks.iter().map(PendingTask::render).collect::<Vec<_>>().join(", ")
}

fn parse_entries(text: &str) -> Vec<String> {
    text.split(", ")
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_automatic_entry(entry: &str, lab_catalog: &[String], imaging_catalog: &[String]) -> bool {
    matches!(
        entry,
        PENDING_TRIAGE | PENDING_CI | OPEN_INTERCONSULT | AWAIT_INTERCONSULT | PENDING_REVALUATION
    ) || entry.starts_with(LABS_PREFIX)
        || entry.starts_with(IMAGING_PREFIX)
        || lab_catalog.iter().any(|n| n == entry)
        || imaging_catalog.iter().any(|n| n == entry)
}
