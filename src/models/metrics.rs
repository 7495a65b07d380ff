use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Computed workflow-timing metrics for one patient. All values are whole
/// minutes, floored. `None` means the underlying timestamp pair is
/// incomplete — never zero-filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientMetrics {
    pub patient_id: i64,
    /// Admission to triage classification.
    pub minutes_triage: Option<i64>,
    /// CI pending to CI done.
    pub minutes_ci: Option<i64>,
    /// Labs ordered to results complete.
    pub minutes_labs: Option<i64>,
    /// Imaging ordered to results complete.
    pub minutes_imaging: Option<i64>,
    /// Interconsult opened to completed.
    pub minutes_interconsult: Option<i64>,
    /// Revaluation pending to done.
    pub minutes_revaluation: Option<i64>,
    /// Admission to the latest of discharge / observation start /
    /// revaluation done.
    pub minutes_total: Option<i64>,
    pub computed_at: NaiveDateTime,
}
