use rusqlite::{params, Connection};

use crate::db::repository::patient::parse_ts;
use crate::db::DatabaseError;
use crate::models::{User, UserRoles};

pub fn insert_user(
    conn: &Connection,
    username: &str,
    password_hash: &str,
    full_name: &str,
    roles: UserRoles,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO usuarios (username, password_hash, full_name, is_admin, is_physician, is_nurse)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            username,
            password_hash,
            full_name,
            roles.admin as i32,
            roles.physician as i32,
            roles.nurse as i32,
        ],
    )?;
    Ok(())
}

pub fn get_user(conn: &Connection, username: &str) -> Result<Option<User>, DatabaseError> {
    let result = conn.query_row(
        "SELECT username, full_name, is_admin, is_physician, is_nurse, created_at
         FROM usuarios WHERE username = ?1",
        params![username],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i32>(2)?,
                row.get::<_, i32>(3)?,
                row.get::<_, i32>(4)?,
                row.get::<_, String>(5)?,
            ))
        },
    );

    match result {
        Ok((username, full_name, admin, physician, nurse, created_at)) => Ok(Some(User {
            username,
            full_name,
            roles: UserRoles {
                admin: admin != 0,
                physician: physician != 0,
                nurse: nurse != 0,
            },
            created_at: parse_ts(&created_at).unwrap_or_default(),
        })),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_password_hash(
    conn: &Connection,
    username: &str,
) -> Result<Option<String>, DatabaseError> {
    let result = conn.query_row(
        "SELECT password_hash FROM usuarios WHERE username = ?1",
        params![username],
        |row| row.get::<_, String>(0),
    );
    match result {
        Ok(hash) => Ok(Some(hash)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn set_password_hash(
    conn: &Connection,
    username: &str,
    password_hash: &str,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE usuarios SET password_hash = ?1 WHERE username = ?2",
        params![password_hash, username],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound { entity: "user", id: username.to_string() });
    }
    Ok(())
}

pub fn set_roles(conn: &Connection, username: &str, roles: UserRoles) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE usuarios SET is_admin = ?1, is_physician = ?2, is_nurse = ?3 WHERE username = ?4",
        params![roles.admin as i32, roles.physician as i32, roles.nurse as i32, username],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound { entity: "user", id: username.to_string() });
    }
    Ok(())
}

pub fn count_users(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM usuarios", [], |row| row.get(0))?;
    Ok(count)
}
