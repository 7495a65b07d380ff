//! Audit trail writer.
//!
//! Every create/update/delete and every account change appends one row to
//! `trazabilidad`. The acting user's role is looked up at call time, not
//! cached from login, and the timestamp is assigned by the database.
//! Audit failure never blocks the action it describes: if the acting user
//! cannot be resolved the entry is skipped and reported as a soft
//! failure.

use rusqlite::Connection;

use crate::db::repository::{audit as audit_repo, user};
use crate::db::DatabaseError;
use crate::models::enums::AuditAction;
use crate::session::Session;

/// Append one audit entry for the session's user.
///
/// Returns `Ok(false)` when the entry was skipped because the acting user
/// no longer exists in `usuarios`.
pub fn log_action(
    conn: &Connection,
    session: &Session,
    action: AuditAction,
    patient_name: Option<&str>,
    details: Option<&str>,
) -> Result<bool, DatabaseError> {
    let Some(acting_user) = user::get_user(conn, &session.username)? else {
        tracing::warn!(
            username = %session.username,
            action = action.as_str(),
            "audit entry skipped: acting user not found"
        );
        return Ok(false);
    };

    audit_repo::insert_audit_entry(
        conn,
        &acting_user.username,
        acting_user.role_label(),
        action,
        patient_name,
        details,
    )?;
    Ok(true)
}
