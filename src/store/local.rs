//! Local key-value cache.
//!
//! Synchronous, always available, JSON values in the `kv_cache` table. This is
//! the source of truth for an active session.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// The entries the cache holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKey {
    ConversationHistory,
    Profile,
    Progress,
    /// The signed-in account, kept so the next launch can restore it.
    AuthSession,
}

impl CacheKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConversationHistory => "conversation_history",
            Self::Profile => "profile",
            Self::Progress => "progress",
            Self::AuthSession => "auth_session",
        }
    }

    pub const ALL: [CacheKey; 4] = [
        Self::ConversationHistory,
        Self::Profile,
        Self::Progress,
        Self::AuthSession,
    ];
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct LocalCache {
    conn: Connection,
}

impl LocalCache {
    /// Open (or create) the cache database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            conn: crate::db::open_cache_database(path)?,
        })
    }

    /// A throwaway in-memory cache.
    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            conn: crate::db::open_memory_cache()?,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Read and decode the value at `key`, or `None` if absent.
    pub fn load<T: DeserializeOwned>(&self, key: CacheKey) -> Result<Option<T>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM kv_cache WHERE key = ?1",
                params![key.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|json| {
            serde_json::from_str(&json).with_context(|| format!("corrupt cache entry `{key}`"))
        })
        .transpose()
    }

    /// Encode and write `value` at `key`, replacing any previous value.
    pub fn save<T: Serialize + ?Sized>(&self, key: CacheKey, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        let now = chrono::Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO kv_cache (key, value, updated_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key.as_str(), json, now],
        )?;
        Ok(())
    }

    pub fn remove(&self, key: CacheKey) -> Result<()> {
        self.conn
            .execute("DELETE FROM kv_cache WHERE key = ?1", params![key.as_str()])?;
        Ok(())
    }

    /// Raw JSON of every present entry, keyed by name.
    pub fn dump(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        let mut out = serde_json::Map::new();
        for key in CacheKey::ALL {
            if let Some(value) = self.load::<serde_json::Value>(key)? {
                out.insert(key.as_str().to_string(), value);
            }
        }
        Ok(out)
    }
}
