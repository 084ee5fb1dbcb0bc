//! SQL DDL for all Re:Birth tables.
//!
//! The local cache database holds only `kv_cache`. The remote database holds
//! `users` (accounts for the auth provider) and the per-user records of the
//! remote store: `profiles`, `progress`, `milestones`, and `messages`. All DDL
//! uses `IF NOT EXISTS` for idempotent initialization.

use rusqlite::Connection;

/// Local key-value cache (JSON values).
const CACHE_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS kv_cache (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

/// All schema DDL statements for the v1 remote tables.
const SCHEMA_SQL: &str = r#"
-- Accounts. `password_hash` is an argon2 PHC string (salt included).
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- Onboarding profile, one per user
CREATE TABLE IF NOT EXISTS profiles (
    user_id TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    core_memory TEXT NOT NULL,
    stated_need TEXT NOT NULL,
    feeling_tag TEXT NOT NULL,
    first_interaction_at TEXT NOT NULL,
    last_interaction_at TEXT NOT NULL
);

-- Level/experience totals, one per user
CREATE TABLE IF NOT EXISTS progress (
    user_id TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
    level INTEGER NOT NULL CHECK(level >= 1),
    experience INTEGER NOT NULL CHECK(experience >= 0),
    next_level_at INTEGER NOT NULL CHECK(next_level_at > 0),
    updated_at TEXT NOT NULL
);

-- Append-only experience awards
CREATE TABLE IF NOT EXISTS milestones (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    reason TEXT NOT NULL,
    experience_awarded INTEGER NOT NULL CHECK(experience_awarded > 0),
    created_at TEXT NOT NULL
);

-- Conversation history
CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    sender TEXT NOT NULL CHECK(sender IN ('user','agent')),
    content TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize the local cache table. Idempotent.
pub fn init_cache_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(CACHE_SCHEMA_SQL)
}

/// Initialize all remote schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // Set initial schema version if not already present
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}
