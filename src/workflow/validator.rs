//! Precedence-chain validation for candidate patient records.
//!
//! The department's workflow is linear: triage → initial consultation →
//! labs/imaging → interconsult → revaluation → discharge. Every write goes
//! through [`validate`] first; a candidate that skips ahead in the chain is
//! rejected with the first violated rule's message. Pure functions — no
//! database access here.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::models::enums::{
    CiStatus, Disposition, InterconsultStatus, RevaluationStatus, StudyStatus,
};
use crate::models::Patient;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("initial consultation cannot be completed before a triage level is assigned")]
    CiBeforeTriage,

    #[error("{stage} cannot progress before the initial consultation is completed")]
    StageBeforeCi { stage: &'static str },

    #[error("an interconsult requires at least one completed lab or imaging result")]
    InterconsultWithoutResults,

    #[error("revaluation cannot be completed before an interconsult is opened")]
    RevaluationWithoutInterconsult,

    #[error("revaluation requires at least one completed lab or imaging result")]
    RevaluationWithoutResults,

    #[error("cannot discharge: no triage level assigned")]
    DischargeWithoutTriage,

    #[error("cannot discharge: initial consultation not completed")]
    DischargeCiNotDone,

    #[error("cannot discharge: interconsult is still open")]
    DischargeInterconsultOpen,

    #[error("cannot discharge: interconsult not completed")]
    DischargeInterconsultNotCompleted,

    #[error("cannot discharge: revaluation not completed")]
    DischargeRevaluationNotDone,

    #[error("cannot discharge: no completed lab or imaging results")]
    DischargeNoCompletedResults,

    #[error("cannot discharge: lab results still pending")]
    DischargeLabsAwaiting,

    #[error("cannot discharge: imaging results still pending")]
    DischargeImagingAwaiting,

    #[error("patient name must have at least three words")]
    NameTooShort,

    #[error("a document id is required for identified patients")]
    MissingDocument,
}

/// Unidentified patients are registered under `"NN - <timestamp>"` until
/// their identity is established.
pub fn is_anonymous_name(name: &str) -> bool {
    static NN: OnceLock<Regex> = OnceLock::new();
    NN.get_or_init(|| Regex::new(r"^NN - ").expect("static pattern"))
        .is_match(name)
}

/// Identity checks. Anonymous ("NN") patients skip both; the stage
/// precedence rules in [`validate`] still apply to them identically.
pub fn validate_identity(name: &str, document_id: Option<&str>) -> Result<(), ValidationError> {
    if is_anonymous_name(name) {
        return Ok(());
    }
    if name.split_whitespace().count() < 3 {
        return Err(ValidationError::NameTooShort);
    }
    match document_id {
        Some(doc) if !doc.trim().is_empty() => Ok(()),
        _ => Err(ValidationError::MissingDocument),
    }
}

/// Check the candidate's stage-status fields against the precedence
/// chain. Rules run in fixed order and the first violation wins, so the
/// surfaced message always names the earliest broken link.
///
/// Callers re-run this on every candidate write, insert or update, and
/// block persistence on an error.
pub fn validate(candidate: &Patient) -> Result<(), ValidationError> {
    let labs = candidate.labs_status;
    let imaging = candidate.imaging_status;
    let interconsult = candidate.interconsult_status;
    let revaluation = candidate.revaluation_status;
    let some_result_complete = labs == Some(StudyStatus::ResultsComplete)
        || imaging == Some(StudyStatus::ResultsComplete);

    // 1. CI requires triage. A missing triage level blocks the whole
    //    chain: everything further down is gated on CI below.
    if candidate.ci_status == Some(CiStatus::Done) && candidate.triage_level.is_none() {
        return Err(ValidationError::CiBeforeTriage);
    }

    // 2. Nothing downstream may show progress before CI is done.
    if candidate.ci_status != Some(CiStatus::Done) {
        if study_in_progress(labs) {
            return Err(ValidationError::StageBeforeCi { stage: "labs" });
        }
        if study_in_progress(imaging) {
            return Err(ValidationError::StageBeforeCi { stage: "imaging" });
        }
        if interconsult_underway(interconsult) {
            return Err(ValidationError::StageBeforeCi { stage: "the interconsult" });
        }
        if revaluation == Some(RevaluationStatus::Done) {
            return Err(ValidationError::StageBeforeCi { stage: "revaluation" });
        }
    }

    // 3. Interconsults are opened off a completed result.
    if interconsult_underway(interconsult) && !some_result_complete {
        return Err(ValidationError::InterconsultWithoutResults);
    }

    // 4. Revaluation closes out an interconsult. The strict "completed"
    //    requirement lives in the discharge rule; here an opened
    //    interconsult is enough.
    if revaluation == Some(RevaluationStatus::Done) {
        if !interconsult_underway(interconsult) {
            return Err(ValidationError::RevaluationWithoutInterconsult);
        }
        if !some_result_complete {
            return Err(ValidationError::RevaluationWithoutResults);
        }
    }

    // 5. Discharge re-checks the full chain, in the same order the ward
    //    walks it.
    if candidate.disposition == Some(Disposition::Discharged) {
        if candidate.triage_level.is_none() {
            return Err(ValidationError::DischargeWithoutTriage);
        }
        if candidate.ci_status != Some(CiStatus::Done) {
            return Err(ValidationError::DischargeCiNotDone);
        }
        if interconsult == Some(InterconsultStatus::Opened) {
            return Err(ValidationError::DischargeInterconsultOpen);
        }
        if interconsult != Some(InterconsultStatus::Completed) {
            return Err(ValidationError::DischargeInterconsultNotCompleted);
        }
        if revaluation != Some(RevaluationStatus::Done) {
            return Err(ValidationError::DischargeRevaluationNotDone);
        }
        if !some_result_complete {
            return Err(ValidationError::DischargeNoCompletedResults);
        }
        if labs == Some(StudyStatus::AwaitingResults) {
            return Err(ValidationError::DischargeLabsAwaiting);
        }
        if imaging == Some(StudyStatus::AwaitingResults) {
            return Err(ValidationError::DischargeImagingAwaiting);
        }
    }

    Ok(())
}

fn study_in_progress(status: Option<StudyStatus>) -> bool {
    matches!(
        status,
        Some(StudyStatus::AwaitingResults) | Some(StudyStatus::ResultsComplete)
    )
}

fn interconsult_underway(status: Option<InterconsultStatus>) -> bool {
    matches!(
        status,
        Some(InterconsultStatus::Opened) | Some(InterconsultStatus::Completed)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::TriageLevel;
    use crate::models::StageTimestamps;

    fn blank(name: &str) -> Patient {
        Patient {
            id: 1,
            name: name.into(),
            document_id: Some("CC-1020".into()),
            triage_level: None,
            ci_status: None,
            labs_status: None,
            imaging_status: None,
            interconsult_status: None,
            revaluation_status: None,
            disposition: None,
            pending_tasks: String::new(),
            location: "ER - Bay 1".into(),
            admitted_at: chrono::NaiveDateTime::default(),
            timestamps: StageTimestamps::default(),
        }
    }

    /// Fully worked-through encounter ready for discharge.
    fn dischargeable() -> Patient {
        let mut p = blank("Ana Maria Lopez");
        p.triage_level = Some(TriageLevel::Level3);
        p.ci_status = Some(CiStatus::Done);
        p.labs_status = Some(StudyStatus::ResultsComplete);
        p.interconsult_status = Some(InterconsultStatus::Completed);
        p.revaluation_status = Some(RevaluationStatus::Done);
        p.disposition = Some(Disposition::Discharged);
        p
    }

    #[test]
    fn fresh_registration_is_valid() {
        assert_eq!(validate(&blank("Ana Maria Lopez")), Ok(()));
    }

    #[test]
    fn ci_done_without_triage_rejected() {
        let mut p = blank("Ana Maria Lopez");
        p.ci_status = Some(CiStatus::Done);
        assert_eq!(validate(&p), Err(ValidationError::CiBeforeTriage));
    }

    #[test]
    fn labs_progress_before_ci_rejected() {
        let mut p = blank("Ana Maria Lopez");
        p.triage_level = Some(TriageLevel::Level2);
        p.labs_status = Some(StudyStatus::AwaitingResults);
        assert_eq!(
            validate(&p),
            Err(ValidationError::StageBeforeCi { stage: "labs" })
        );
    }

    #[test]
    fn missing_triage_blocks_downstream_progress() {
        let mut p = blank("Ana Maria Lopez");
        p.imaging_status = Some(StudyStatus::ResultsComplete);
        assert_eq!(
            validate(&p),
            Err(ValidationError::StageBeforeCi { stage: "imaging" })
        );
    }

    #[test]
    fn idle_markers_allowed_before_ci() {
        let mut p = blank("Ana Maria Lopez");
        p.triage_level = Some(TriageLevel::Level4);
        p.ci_status = Some(CiStatus::NotDone);
        p.labs_status = Some(StudyStatus::NotOrdered);
        p.interconsult_status = Some(InterconsultStatus::NotOpened);
        p.revaluation_status = Some(RevaluationStatus::NotDone);
        assert_eq!(validate(&p), Ok(()));
    }

    #[test]
    fn interconsult_without_completed_result_rejected() {
        let mut p = blank("Ana Maria Lopez");
        p.triage_level = Some(TriageLevel::Level3);
        p.ci_status = Some(CiStatus::Done);
        p.labs_status = Some(StudyStatus::AwaitingResults);
        p.interconsult_status = Some(InterconsultStatus::Opened);
        assert_eq!(validate(&p), Err(ValidationError::InterconsultWithoutResults));
    }

    #[test]
    fn revaluation_without_interconsult_rejected() {
        let mut p = blank("Ana Maria Lopez");
        p.triage_level = Some(TriageLevel::Level3);
        p.ci_status = Some(CiStatus::Done);
        p.labs_status = Some(StudyStatus::ResultsComplete);
        p.revaluation_status = Some(RevaluationStatus::Done);
        assert_eq!(validate(&p), Err(ValidationError::RevaluationWithoutInterconsult));
    }

    #[test]
    fn full_chain_discharge_accepted() {
        // triage 3, CI done, labs complete, imaging unset, interconsult
        // completed, revaluation done, discharged
        assert_eq!(validate(&dischargeable()), Ok(()));
    }

    #[test]
    fn discharge_with_open_interconsult_rejected() {
        let mut p = dischargeable();
        p.interconsult_status = Some(InterconsultStatus::Opened);
        assert_eq!(validate(&p), Err(ValidationError::DischargeInterconsultOpen));
    }

    #[test]
    fn discharge_with_awaiting_labs_rejected() {
        // Imaging result satisfies every other rule; only the pending lab
        // blocks discharge.
        let mut p = dischargeable();
        p.labs_status = Some(StudyStatus::AwaitingResults);
        p.imaging_status = Some(StudyStatus::ResultsComplete);
        assert_eq!(validate(&p), Err(ValidationError::DischargeLabsAwaiting));
    }

    #[test]
    fn discharge_with_awaiting_imaging_rejected() {
        let mut p = dischargeable();
        p.imaging_status = Some(StudyStatus::AwaitingResults);
        assert_eq!(validate(&p), Err(ValidationError::DischargeImagingAwaiting));
    }

    #[test]
    fn discharge_without_revaluation_rejected() {
        let mut p = dischargeable();
        p.revaluation_status = Some(RevaluationStatus::NotDone);
        assert_eq!(validate(&p), Err(ValidationError::DischargeRevaluationNotDone));
    }

    #[test]
    fn discharge_without_any_result_rejected() {
        let mut p = dischargeable();
        p.labs_status = None;
        p.interconsult_status = None;
        p.revaluation_status = None;
        // With no studies the chain fails earlier: nothing justified the
        // discharge's missing interconsult.
        assert_eq!(validate(&p), Err(ValidationError::DischargeInterconsultNotCompleted));
    }

    #[test]
    fn anonymous_name_detection() {
        assert!(is_anonymous_name("NN - 2024-01-01 - 00:00:00"));
        assert!(!is_anonymous_name("Ana Maria Lopez"));
        assert!(!is_anonymous_name("N N - 2024"));
    }

    #[test]
    fn identity_checks_for_identified_patients() {
        assert_eq!(validate_identity("Ana Maria Lopez", Some("CC-1020")), Ok(()));
        assert_eq!(
            validate_identity("Ana Lopez", Some("CC-1020")),
            Err(ValidationError::NameTooShort)
        );
        assert_eq!(
            validate_identity("Ana Maria Lopez", None),
            Err(ValidationError::MissingDocument)
        );
        assert_eq!(
            validate_identity("Ana Maria Lopez", Some("  ")),
            Err(ValidationError::MissingDocument)
        );
    }

    #[test]
    fn anonymous_patient_skips_identity_checks_only() {
        assert_eq!(validate_identity("NN - 2024-01-01 - 00:00:00", None), Ok(()));

        // Stage precedence still applies to anonymous patients.
        let mut p = blank("NN - 2024-01-01 - 00:00:00");
        p.document_id = None;
        p.ci_status = Some(CiStatus::Done);
        assert_eq!(validate(&p), Err(ValidationError::CiBeforeTriage));
    }
}
