use std::path::Path;

use rusqlite::Connection;

use super::DatabaseError;

/// Ordered schema steps for a database file.
pub type Migrations = &'static [(i64, &'static str)];

/// Record store schema: users and uploaded documents.
pub const RECORD_MIGRATIONS: Migrations = &[
    (1, include_str!("../../resources/migrations/records/001_initial.sql")),
];

/// Knowledge index schema: namespaced chunk embeddings.
pub const INDEX_MIGRATIONS: Migrations = &[
    (1, include_str!("../../resources/migrations/index/001_knowledge_chunks.sql")),
];

/// Open a SQLite connection to the given path and run migrations
pub fn open_database(path: &Path, migrations: Migrations) -> Result<Connection, DatabaseError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    configure_pragmas(&conn)?;
    run_migrations(&conn, migrations)?;
    Ok(conn)
}

/// Open an in-memory database (for testing)
pub fn open_memory_database(migrations: Migrations) -> Result<Connection, DatabaseError> {
    let conn = Connection::open_in_memory()?;
    configure_pragmas(&conn)?;
    run_migrations(&conn, migrations)?;
    Ok(conn)
}

fn configure_pragmas(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "PRAGMA journal_mode=DELETE;
         PRAGMA foreign_keys=ON;"
    )?;
    Ok(())
}

/// Run all pending migrations
pub fn run_migrations(conn: &Connection, migrations: Migrations) -> Result<(), DatabaseError> {
    let current_version = get_current_version(conn);

    for &(version, sql) in migrations {
        if version > current_version {
            tracing::info!("Running migration v{version}");
            conn.execute_batch(sql).map_err(|e| DatabaseError::MigrationFailed {
                version,
                reason: e.to_string(),
            })?;
        }
    }

    Ok(())
}

/// Get the current schema version (0 if no schema exists yet)
fn get_current_version(conn: &Connection) -> i64 {
    conn.query_row(
        "SELECT MAX(version) FROM schema_version",
        [],
        |row| row.get::<_, i64>(0),
    )
    .unwrap_or(0)
}

/// Count tables in the database (for verification)
pub fn count_tables(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(count)
}
