//! Database schema migrations.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Returns 0 if no version is set (fresh database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: templates and the key-value store.
///
/// Templates are stored as JSON documents; the indexed columns mirror the
/// fields the selector and listings read.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS templates (
            id           TEXT PRIMARY KEY,
            name         TEXT NOT NULL,
            is_default   INTEGER NOT NULL DEFAULT 0,
            last_used_at TEXT,
            data         TEXT NOT NULL,
            updated_at   TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS kv (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )?;
    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: history tables.
///
/// - `conditional_responses`: every answer given to a conditional habit
/// - `session_history`: one summary row per finished session
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS conditional_responses (
            id          TEXT PRIMARY KEY,
            habit_id    TEXT NOT NULL,
            option_id   TEXT NOT NULL,
            answered_at TEXT NOT NULL,
            data        TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS session_history (
            session_id   TEXT PRIMARY KEY,
            routine_id   TEXT NOT NULL,
            started_at   TEXT NOT NULL,
            completed_at TEXT,
            data         TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_responses_habit ON conditional_responses(habit_id, answered_at);
        CREATE INDEX IF NOT EXISTS idx_history_started ON session_history(started_at);",
    )?;
    set_schema_version(&tx, 2)?;
    tx.commit()
}
