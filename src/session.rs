//! Authenticated sessions.
//!
//! A [`Session`] is created by [`authenticate`] and passed explicitly into
//! every call that writes an audit entry. Nothing about the active user is
//! held in process-wide state; the caller owns the session for as long as
//! the login lasts.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use rusqlite::Connection;
use sha2::Sha256;
use thiserror::Error;

use crate::db::repository::user;
use crate::db::DatabaseError;

pub const PBKDF2_ITERATIONS: u32 = 600_000;
const HASH_LENGTH: usize = 32;
const SALT_LENGTH: usize = 32;
const SCHEME: &str = "pbkdf2-sha256";

/// The acting user for a run of the application. Only the username is
/// carried; roles are looked up at audit time so a role change takes
/// effect immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Verify credentials against `usuarios` and return a session.
pub fn authenticate(
    conn: &Connection,
    username: &str,
    password: &str,
) -> Result<Session, AuthError> {
    let stored = user::get_password_hash(conn, username)?
        .ok_or(AuthError::InvalidCredentials)?;
    if !verify_password(password, &stored) {
        return Err(AuthError::InvalidCredentials);
    }
    tracing::info!(username, "user authenticated");
    Ok(Session { username: username.to_string() })
}

/// Hash a password for storage: `pbkdf2-sha256$<iters>$<salt>$<hash>`.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    let hash = derive(password, &salt, PBKDF2_ITERATIONS);
    format!(
        "{SCHEME}${PBKDF2_ITERATIONS}${}${}",
        BASE64.encode(salt),
        BASE64.encode(hash)
    )
}

/// Check a password against a stored hash string. Unparseable stored
/// values simply fail verification.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(scheme), Some(iterations), Some(salt), Some(hash)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    if scheme != SCHEME {
        return false;
    }
    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };
    let (Ok(salt), Ok(hash)) = (BASE64.decode(salt), BASE64.decode(hash)) else {
        return false;
    };
    derive(password, &salt, iterations).to_vec() == hash
}

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; HASH_LENGTH] {
    let mut out = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out);
    out
}
