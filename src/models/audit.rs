use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::enums::AuditAction;

/// Append-only audit record. Timestamp is assigned by the database at
/// insert; the application never updates or deletes these rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub username: String,
    /// Role label resolved at the moment the action happened, not cached
    /// from login.
    pub role: String,
    pub action: AuditAction,
    pub timestamp: NaiveDateTime,
    pub patient_name: Option<String>,
    pub details: Option<String>,
}
