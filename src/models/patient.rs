use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::enums::{
    CiStatus, Disposition, InterconsultStatus, RevaluationStatus, StudyStatus, TriageLevel,
};

/// One visit/encounter. The same person admitted twice has two rows.
///
/// Stage-status fields are `None` while the stage has not been reached;
/// the validator enforces the triage → CI → studies → interconsult →
/// revaluation → discharge precedence chain before any row is written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    pub name: String,
    pub document_id: Option<String>,
    pub triage_level: Option<TriageLevel>,
    pub ci_status: Option<CiStatus>,
    pub labs_status: Option<StudyStatus>,
    pub imaging_status: Option<StudyStatus>,
    pub interconsult_status: Option<InterconsultStatus>,
    pub revaluation_status: Option<RevaluationStatus>,
    pub disposition: Option<Disposition>,
    /// Rendered pending-task text. Derived — rebuilt from statuses and
    /// order lists on every write, with manual entries preserved.
    pub pending_tasks: String,
    /// `"<area> - <bay>"`.
    pub location: String,
    pub admitted_at: NaiveDateTime,
    pub timestamps: StageTimestamps,
}

impl Patient {
    /// Anonymous placeholder prefix: unidentified patients are registered
    /// as `"NN - <timestamp>"` until their identity is established.
    pub fn is_anonymous(&self) -> bool {
        crate::workflow::validator::is_anonymous_name(&self.name)
    }
}

/// When each status value was entered. One (entered-pending, entered-done)
/// pair per stage; triage has a single shared timestamp that is cleared if
/// the level reverts to unset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageTimestamps {
    pub triaged_at: Option<NaiveDateTime>,
    pub ci_not_done_at: Option<NaiveDateTime>,
    pub ci_done_at: Option<NaiveDateTime>,
    pub labs_ordered_at: Option<NaiveDateTime>,
    pub labs_done_at: Option<NaiveDateTime>,
    pub imaging_ordered_at: Option<NaiveDateTime>,
    pub imaging_done_at: Option<NaiveDateTime>,
    pub interconsult_opened_at: Option<NaiveDateTime>,
    pub interconsult_completed_at: Option<NaiveDateTime>,
    pub revaluation_not_done_at: Option<NaiveDateTime>,
    pub revaluation_done_at: Option<NaiveDateTime>,
    pub observation_started_at: Option<NaiveDateTime>,
    pub discharged_at: Option<NaiveDateTime>,
}

/// Registration payload. `admitted_at` and the surrogate id are assigned
/// at insert; everything downstream of triage starts unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPatient {
    pub name: String,
    pub document_id: Option<String>,
    pub triage_level: Option<TriageLevel>,
    pub location: String,
}
