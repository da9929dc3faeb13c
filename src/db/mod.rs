pub mod migrations;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;

/// Open (or create) the FlowFriend database at the given path with the schema
/// initialized and migrations applied.
pub fn open_database(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    let mut conn = Connection::open(path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;

    // WAL lets the device listener write while a screen reads
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(std::time::Duration::from_millis(5000))?;

    schema::init_schema(&conn).context("failed to initialize schema")?;
    migrations::run_migrations(&mut conn).context("failed to run migrations")?;

    tracing::info!(path = %path.display(), "database initialized");
    Ok(conn)
}

/// Open an in-memory database with schema and migrations applied.
pub fn open_memory_database() -> Result<Connection> {
    let mut conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    schema::init_schema(&conn).context("failed to initialize schema")?;
    migrations::run_migrations(&mut conn).context("failed to run migrations")?;
    Ok(conn)
}

/// Result of [`check_database_health`].
#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub schema_version: u32,
    pub user_count: u64,
    pub entry_count: u64,
    pub device_entry_count: u64,
    pub current_user: Option<String>,
    pub integrity_ok: bool,
    pub integrity_details: String,
}

/// Run `PRAGMA integrity_check` and gather row counts.
pub fn check_database_health(conn: &Connection) -> Result<HealthReport> {
    let schema_version = migrations::get_schema_version(conn)?;
    let count = |sql: &str| -> Result<u64> {
        let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
        Ok(n.max(0) as u64)
    };

    let user_count = count("SELECT COUNT(*) FROM users")?;
    let entry_count = count("SELECT COUNT(*) FROM entries")?;
    let device_entry_count = count("SELECT COUNT(*) FROM entries WHERE source = 'device'")?;
    let current_user = migrations::get_meta(conn, crate::tracking::identity::CURRENT_USER_KEY)?;

    let integrity_details: String =
        conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;

    Ok(HealthReport {
        schema_version,
        user_count,
        entry_count,
        device_entry_count,
        current_user,
        integrity_ok: integrity_details == "ok",
        integrity_details,
    })
}
