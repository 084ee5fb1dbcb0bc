pub mod migrations;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::Path;

/// Open (or create) the remote Re:Birth database at the given path with schema
/// initialized and migrations applied.
pub fn open_database(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();
    let conn = open_file(path)?;

    schema::init_schema(&conn).context("failed to initialize schema")?;
    migrations::run_migrations(&conn).context("failed to run migrations")?;

    tracing::info!(path = %path.display(), "database initialized");
    Ok(conn)
}

/// Open (or create) the local cache database. It holds only `kv_cache`.
pub fn open_cache_database(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();
    let conn = open_file(path)?;

    schema::init_cache_schema(&conn).context("failed to initialize cache schema")?;

    tracing::info!(path = %path.display(), "cache database initialized");
    Ok(conn)
}

/// Open an in-memory remote database with schema and migrations applied.
pub fn open_memory_database() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    schema::init_schema(&conn).context("failed to initialize schema")?;
    migrations::run_migrations(&conn).context("failed to run migrations")?;
    Ok(conn)
}

/// Open an in-memory cache database.
pub fn open_memory_cache() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    schema::init_cache_schema(&conn).context("failed to initialize cache schema")?;
    Ok(conn)
}

fn open_file(path: &Path) -> Result<Connection> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    let conn = Connection::open(path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;

    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(std::time::Duration::from_millis(5000))?;
    Ok(conn)
}

/// Result of [`check_database_health`].
///
/// Counts are `None` for tables the database does not have (the local cache
/// only has `kv_cache`).
#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub integrity_ok: bool,
    pub integrity_details: String,
    pub schema_version: Option<u32>,
    pub cache_entries: Option<u64>,
    pub user_count: Option<u64>,
    pub message_count: Option<u64>,
    pub milestone_count: Option<u64>,
}

/// Run `PRAGMA integrity_check` and gather row counts.
pub fn check_database_health(conn: &Connection) -> Result<HealthReport> {
    let integrity_details: String = conn
        .query_row("PRAGMA integrity_check", [], |row| row.get(0))
        .context("integrity check failed to run")?;

    let count = |table: &str| -> Result<Option<u64>> {
        if !table_exists(conn, table)? {
            return Ok(None);
        }
        let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
            row.get(0)
        })?;
        Ok(Some(n as u64))
    };

    let schema_version = if table_exists(conn, "schema_meta")? {
        Some(migrations::get_schema_version(conn)?)
    } else {
        None
    };

    Ok(HealthReport {
        integrity_ok: integrity_details == "ok",
        integrity_details,
        schema_version,
        cache_entries: count("kv_cache")?,
        user_count: count("users")?,
        message_count: count("messages")?,
        milestone_count: count("milestones")?,
    })
}

fn table_exists(conn: &Connection, name: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![name],
        |row| row.get(0),
    )
}
