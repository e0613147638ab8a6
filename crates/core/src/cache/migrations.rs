//! Partition store schema.
//!
//! Each step runs inside its own transaction together with its row in the
//! `schema_migrations` ledger, so a failed step leaves neither half behind.

use tokio_rusqlite::{Connection, params, rusqlite};

use super::Error;

/// One schema step.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub sql: &'static str,
}

/// Schema steps in application order.
pub(crate) const MIGRATIONS: &[Migration] = &[
    Migration { version: 1, name: "partitions", sql: include_str!("../../migrations/001_caches.sql") },
    Migration { version: 2, name: "get_entries", sql: include_str!("../../migrations/002_cache_entries.sql") },
];

/// Bring the schema up to date.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| apply(conn, MIGRATIONS)).await.map_err(Error::from)
}

fn apply(conn: &mut rusqlite::Connection, migrations: &[Migration]) -> Result<(), Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
    )?;

    let applied: i64 = conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_migrations", [], |row| row.get(0))?;

    for migration in migrations.iter().filter(|m| m.version > applied) {
        let failed = |e: rusqlite::Error| Error::MigrationFailed(format!("{} ({}): {e}", migration.version, migration.name));

        let tx = conn.transaction().map_err(failed)?;
        tx.execute_batch(migration.sql).map_err(failed)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
            params![migration.version, migration.name, chrono::Utc::now().to_rfc3339()],
        )
        .map_err(failed)?;
        tx.commit().map_err(failed)?;

        tracing::debug!(version = migration.version, name = migration.name, "applied schema step");
    }

    Ok(())
}
