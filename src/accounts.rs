//! Staff account management.
//!
//! The first account comes from the `admin` section of the config file
//! ([`bootstrap_admin`]); everything after that is provisioned by an
//! admin through these functions. Role changes and credential changes are
//! audited like any other mutation.

use rusqlite::Connection;
use thiserror::Error;

use crate::audit::log_action;
use crate::config::AppConfig;
use crate::db::repository::user;
use crate::db::DatabaseError;
use crate::models::enums::AuditAction;
use crate::models::UserRoles;
use crate::session::{hash_password, Session};

#[derive(Error, Debug)]
pub enum AccountError {
    #[error("only administrators may manage accounts")]
    NotAuthorized,

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Create the bootstrap admin account when the store has no users yet.
/// Returns whether an account was created. No session exists at this
/// point, so the creation itself is not audited.
pub fn bootstrap_admin(conn: &Connection, config: &AppConfig) -> Result<bool, DatabaseError> {
    if user::count_users(conn)? > 0 {
        return Ok(false);
    }
    user::insert_user(
        conn,
        &config.admin.user,
        &hash_password(&config.admin.password),
        "Administrator",
        UserRoles { admin: true, physician: false, nurse: false },
    )?;
    tracing::info!(username = %config.admin.user, "bootstrap admin account created");
    Ok(true)
}

/// Provision a new staff account. Admin only.
pub fn create_user(
    conn: &Connection,
    session: &Session,
    username: &str,
    password: &str,
    full_name: &str,
    roles: UserRoles,
) -> Result<(), AccountError> {
    require_admin(conn, session)?;
    user::insert_user(conn, username, &hash_password(password), full_name, roles)?;
    log_action(
        conn,
        session,
        AuditAction::Create,
        None,
        Some(&format!("account created: {username}")),
    )?;
    Ok(())
}

/// Replace a user's role flags. Admin only.
pub fn set_role(
    conn: &Connection,
    session: &Session,
    username: &str,
    roles: UserRoles,
) -> Result<(), AccountError> {
    require_admin(conn, session)?;
    user::set_roles(conn, username, roles)?;
    log_action(
        conn,
        session,
        AuditAction::RoleChange,
        None,
        Some(&format!(
            "roles for {username}: admin={} physician={} nurse={}",
            roles.admin, roles.physician, roles.nurse
        )),
    )?;
    Ok(())
}

/// Change a password. Users may change their own; admins may change
/// anyone's.
pub fn change_password(
    conn: &Connection,
    session: &Session,
    username: &str,
    new_password: &str,
) -> Result<(), AccountError> {
    if session.username != username {
        require_admin(conn, session)?;
    }
    user::set_password_hash(conn, username, &hash_password(new_password))?;
    log_action(
        conn,
        session,
        AuditAction::CredentialChange,
        None,
        Some(&format!("password changed for {username}")),
    )?;
    Ok(())
}

fn require_admin(conn: &Connection, session: &Session) -> Result<(), AccountError> {
    match user::get_user(conn, &session.username)? {
        Some(acting) if acting.roles.admin => Ok(()),
        _ => Err(AccountError::NotAuthorized),
    }
}
