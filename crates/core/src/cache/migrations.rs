//! Cache schema migrations.
//!
//! `_migrations` records every applied version. Each pending step runs in its
//! own transaction together with its bookkeeping row, so a failed step leaves
//! the schema at the previous version.

use super::Error;
use tokio_rusqlite::{Connection, params};

/// Ordered schema steps. Versions must be strictly increasing.
const MIGRATIONS: &[(i64, &str)] = &[
    (1, include_str!("../../migrations/001_partitions.sql")),
    (2, include_str!("../../migrations/002_registration.sql")),
];

/// Bring the schema up to the newest version.
///
/// # Errors
///
/// Returns [`Error::MigrationFailed`] naming the step whose SQL failed.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    upgrade(conn, MIGRATIONS).await
}

async fn upgrade(conn: &Connection, steps: &[(i64, &'static str)]) -> Result<(), Error> {
    let steps = steps.to_vec();
    conn.call(move |conn| -> Result<(), Error> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )?;

        let current: i64 =
            conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))?;

        for &(version, sql) in steps.iter().filter(|(version, _)| *version > current) {
            tracing::debug!(version, "applying cache migration");
            let tx = conn.transaction()?;
            tx.execute_batch(sql)
                .map_err(|e| Error::MigrationFailed(format!("step {version}: {e}")))?;
            tx.execute(
                "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
                params![version, chrono::Utc::now().to_rfc3339()],
            )?;
            tx.commit()?;
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}
