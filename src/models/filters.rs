use super::enums::TriageLevel;

/// Board query filter. Defaults list every patient still in the
/// department.
#[derive(Debug, Default)]
pub struct PatientFilter {
    /// Exclude discharged patients (the live board view).
    pub active_only: bool,
    pub triage_level: Option<TriageLevel>,
    /// Substring match on the `"<area> - <bay>"` location.
    pub area: Option<String>,
    pub name_contains: Option<String>,
}
