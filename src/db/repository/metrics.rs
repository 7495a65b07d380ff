use rusqlite::{params, Connection};

use crate::db::repository::patient::parse_ts;
use crate::db::DatabaseError;
use crate::models::PatientMetrics;

/// Upsert the computed metrics row for a patient. `computed_at` is
/// refreshed by the database on every write.
pub fn upsert_metrics(conn: &Connection, metrics: &PatientMetrics) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO metricas_pacientes
         (patient_id, minutes_triage, minutes_ci, minutes_labs, minutes_imaging,
          minutes_interconsult, minutes_revaluation, minutes_total, computed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, datetime('now', 'localtime'))
         ON CONFLICT(patient_id) DO UPDATE SET
          minutes_triage = excluded.minutes_triage,
          minutes_ci = excluded.minutes_ci,
          minutes_labs = excluded.minutes_labs,
          minutes_imaging = excluded.minutes_imaging,
          minutes_interconsult = excluded.minutes_interconsult,
          minutes_revaluation = excluded.minutes_revaluation,
          minutes_total = excluded.minutes_total,
          computed_at = excluded.computed_at",
        params![
            metrics.patient_id,
            metrics.minutes_triage,
            metrics.minutes_ci,
            metrics.minutes_labs,
            metrics.minutes_imaging,
            metrics.minutes_interconsult,
            metrics.minutes_revaluation,
            metrics.minutes_total,
        ],
    )?;
    Ok(())
}

pub fn get_metrics(conn: &Connection, patient_id: i64) -> Result<Option<PatientMetrics>, DatabaseError> {
    let result = conn.query_row(
        "SELECT patient_id, minutes_triage, minutes_ci, minutes_labs, minutes_imaging,
                minutes_interconsult, minutes_revaluation, minutes_total, computed_at
         FROM metricas_pacientes WHERE patient_id = ?1",
        params![patient_id],
        |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Option<i64>>(1)?,
                row.get::<_, Option<i64>>(2)?,
                row.get::<_, Option<i64>>(3)?,
                row.get::<_, Option<i64>>(4)?,
                row.get::<_, Option<i64>>(5)?,
                row.get::<_, Option<i64>>(6)?,
                row.get::<_, Option<i64>>(7)?,
                row.get::<_, String>(8)?,
            ))
        },
    );

    match result {
        Ok((patient_id, triage, ci, labs, imaging, interconsult, revaluation, total, computed_at)) => {
            Ok(Some(PatientMetrics {
                patient_id,
                minutes_triage: triage,
                minutes_ci: ci,
                minutes_labs: labs,
                minutes_imaging: imaging,
                minutes_interconsult: interconsult,
                minutes_revaluation: revaluation,
                minutes_total: total,
                computed_at: parse_ts(&computed_at).unwrap_or_default(),
            }))
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Department-level averages over patients that have the metric, for the
/// reporting screens. NULL rows are excluded per metric, not zero-filled.
pub fn average_minutes(conn: &Connection) -> Result<Vec<(String, f64)>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT 'triage', AVG(minutes_triage) FROM metricas_pacientes WHERE minutes_triage IS NOT NULL
         UNION ALL
         SELECT 'ci', AVG(minutes_ci) FROM metricas_pacientes WHERE minutes_ci IS NOT NULL
         UNION ALL
         SELECT 'labs', AVG(minutes_labs) FROM metricas_pacientes WHERE minutes_labs IS NOT NULL
         UNION ALL
         SELECT 'imaging', AVG(minutes_imaging) FROM metricas_pacientes WHERE minutes_imaging IS NOT NULL
         UNION ALL
         SELECT 'interconsult', AVG(minutes_interconsult) FROM metricas_pacientes WHERE minutes_interconsult IS NOT NULL
         UNION ALL
         SELECT 'revaluation', AVG(minutes_revaluation) FROM metricas_pacientes WHERE minutes_revaluation IS NOT NULL
         UNION ALL
         SELECT 'total', AVG(minutes_total) FROM metricas_pacientes WHERE minutes_total IS NOT NULL",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Option<f64>>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows
        .into_iter()
        .filter_map(|(stage, avg)| avg.map(|a| (stage, a)))
        .collect())
}
