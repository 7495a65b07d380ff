use rusqlite::{params, Connection};

use crate::db::DatabaseError;

/// Which orderable-test catalog a query targets. The two catalogs share
/// their shape but live in separate tables of the departmental schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKind {
    Lab,
    Imaging,
}

impl OrderKind {
    fn catalog_table(&self) -> &'static str {
        match self {
            Self::Lab => "laboratorios",
            Self::Imaging => "imagenes",
        }
    }

    fn assignment_table(&self) -> &'static str {
        match self {
            Self::Lab => "pacientes_laboratorios",
            Self::Imaging => "pacientes_ixs",
        }
    }

    fn assignment_fk(&self) -> &'static str {
        match self {
            Self::Lab => "lab_id",
            Self::Imaging => "imaging_id",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Lab => "labs",
            Self::Imaging => "imaging",
        }
    }
}

/// All orderable test names in a catalog, alphabetical.
pub fn list_catalog(conn: &Connection, kind: OrderKind) -> Result<Vec<String>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT name FROM {} ORDER BY name",
        kind.catalog_table()
    ))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

/// Add a test name to a catalog. Admin-screen operation; duplicates are a
/// constraint violation surfaced to the caller.
pub fn add_catalog_entry(
    conn: &Connection,
    kind: OrderKind,
    name: &str,
) -> Result<(), DatabaseError> {
    conn.execute(
        &format!("INSERT INTO {} (name) VALUES (?1)", kind.catalog_table()),
        params![name],
    )?;
    Ok(())
}

/// Replace a patient's assigned order set with the given catalog names.
///
/// Unknown names are rejected before anything is written, so a typo does
/// not wipe the existing assignment.
pub fn set_assignments(
    conn: &Connection,
    patient_id: i64,
    kind: OrderKind,
    names: &[String],
) -> Result<(), DatabaseError> {
    let mut ids = Vec::with_capacity(names.len());
    for name in names {
        let id: Option<i64> = conn
            .query_row(
                &format!("SELECT id FROM {} WHERE name = ?1", kind.catalog_table()),
                params![name],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;
        match id {
            Some(id) => ids.push(id),
            None => {
                return Err(DatabaseError::NotFound {
                    entity: match kind {
                        OrderKind::Lab => "laboratorio",
                        OrderKind::Imaging => "imagen",
                    },
                    id: name.clone(),
                })
            }
        }
    }

    conn.execute(
        &format!(
            "DELETE FROM {} WHERE patient_id = ?1",
            kind.assignment_table()
        ),
        params![patient_id],
    )?;

    let mut stmt = conn.prepare(&format!(
        "INSERT OR IGNORE INTO {} (patient_id, {}) VALUES (?1, ?2)",
        kind.assignment_table(),
        kind.assignment_fk(),
    ))?;
    for id in ids {
        stmt.execute(params![patient_id, id])?;
    }
    Ok(())
}

/// Distinct names assigned to a patient, alphabetical. Feeds the
/// pending-task deriver's aggregated study entries.
pub fn assigned_names(
    conn: &Connection,
    patient_id: i64,
    kind: OrderKind,
) -> Result<Vec<String>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT DISTINCT c.name FROM {} c
         JOIN {} a ON a.{} = c.id
         WHERE a.patient_id = ?1
         ORDER BY c.name",
        kind.catalog_table(),
        kind.assignment_table(),
        kind.assignment_fk(),
    ))?;
    let names = stmt
        .query_map(params![patient_id], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}
