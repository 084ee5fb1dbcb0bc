//! Remote relational store, keyed by authenticated user id.
//!
//! [`RemoteStore`] is the contract the session depends on; [`SqliteRemoteStore`]
//! implements it over a shared SQLite connection, moving blocking work onto
//! `spawn_blocking`. Writes are best-effort from the session's point of view.
//! Writes spanning several tables run in one transaction.

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::conversation::types::{Message, Profile, Sender};
use crate::progress::{Milestone, ProgressState};

/// Per-user tables, children first.
const USER_TABLES: &[&str] = &["messages", "milestones", "progress", "profiles"];

/// Everything stored for one user.
#[derive(Debug, Clone, Default)]
pub struct UserData {
    pub profile: Option<Profile>,
    pub progress: Option<ProgressState>,
    pub messages: Vec<Message>,
}

impl UserData {
    /// Nothing has been saved for this user.
    pub fn is_empty(&self) -> bool {
        self.profile.is_none() && self.progress.is_none() && self.messages.is_empty()
    }
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn load_profile(&self, user_id: &str) -> Result<Option<Profile>>;
    /// Insert or replace the user's profile.
    async fn save_profile(&self, user_id: &str, profile: &Profile) -> Result<()>;
    /// Totals plus the full milestone log, or `None` if nothing was saved yet.
    async fn load_progress(&self, user_id: &str) -> Result<Option<ProgressState>>;
    /// Insert or replace the totals. Milestones go through [`RemoteStore::add_milestone`].
    async fn save_progress(&self, user_id: &str, progress: &ProgressState) -> Result<()>;
    async fn add_milestone(&self, user_id: &str, milestone: &Milestone) -> Result<()>;
    async fn append_message(&self, user_id: &str, message: &Message) -> Result<()>;
    /// Full history, oldest first.
    async fn load_messages(&self, user_id: &str) -> Result<Vec<Message>>;
    async fn delete_messages(&self, user_id: &str) -> Result<()>;
    async fn delete_profile(&self, user_id: &str) -> Result<()>;
    /// Remove profile, progress, milestones, and messages. The account stays.
    async fn delete_user_data(&self, user_id: &str) -> Result<()>;

    /// Store `data` for a user with nothing saved yet, all or nothing.
    ///
    /// Returns `false` and writes nothing if any of the user's tables already
    /// has rows.
    async fn seed_user_data(&self, user_id: &str, data: &UserData) -> Result<bool>;

    async fn load_user_data(&self, user_id: &str) -> Result<UserData> {
        Ok(UserData {
            profile: self.load_profile(user_id).await?,
            progress: self.load_progress(user_id).await?,
            messages: self.load_messages(user_id).await?,
        })
    }
}

/// [`RemoteStore`] backed by a SQLite database shared with the auth provider.
#[derive(Clone)]
pub struct SqliteRemoteStore {
    db: Arc<Mutex<Connection>>,
}

impl SqliteRemoteStore {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    /// Run `f` against the connection on the blocking pool.
    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let mut conn = db
                .lock()
                .map_err(|e| anyhow::anyhow!("db lock poisoned: {e}"))?;
            f(&mut conn)
        })
        .await
        .context("remote store task failed")?
    }

    /// Delete a user's rows from each of `tables` in one transaction.
    async fn delete_rows(&self, user_id: &str, tables: &'static [&'static str]) -> Result<()> {
        let user_id = user_id.to_string();
        self.run(move |conn| {
            let tx = conn.transaction()?;
            for table in tables {
                tx.execute(
                    &format!("DELETE FROM {table} WHERE user_id = ?1"),
                    params![user_id],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl RemoteStore for SqliteRemoteStore {
    async fn load_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        let user_id = user_id.to_string();
        self.run(move |conn| {
            let profile = conn
                .query_row(
                    "SELECT name, core_memory, stated_need, feeling_tag, first_interaction_at, last_interaction_at \
                     FROM profiles WHERE user_id = ?1",
                    params![user_id],
                    |row| {
                        Ok(Profile {
                            name: row.get(0)?,
                            core_memory: row.get(1)?,
                            stated_need: row.get(2)?,
                            feeling_tag: row.get(3)?,
                            first_interaction_at: row.get(4)?,
                            last_interaction_at: row.get(5)?,
                        })
                    },
                )
                .optional()?;
            Ok(profile)
        })
        .await
    }

    async fn save_profile(&self, user_id: &str, profile: &Profile) -> Result<()> {
        let user_id = user_id.to_string();
        let profile = profile.clone();
        self.run(move |conn| upsert_profile(conn, &user_id, &profile))
            .await
    }

    async fn load_progress(&self, user_id: &str) -> Result<Option<ProgressState>> {
        let user_id = user_id.to_string();
        self.run(move |conn| {
            let totals: Option<(u32, u32, u32)> = conn
                .query_row(
                    "SELECT level, experience, next_level_at FROM progress WHERE user_id = ?1",
                    params![user_id],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()?;

            let Some((level, experience, next_level_at)) = totals else {
                return Ok(None);
            };

            let mut stmt = conn.prepare(
                "SELECT reason, experience_awarded, created_at FROM milestones \
                 WHERE user_id = ?1 ORDER BY created_at, id",
            )?;
            let milestones = stmt
                .query_map(params![user_id], |row| {
                    Ok(Milestone {
                        reason: row.get(0)?,
                        experience_awarded: row.get(1)?,
                        timestamp: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(Some(ProgressState {
                level,
                experience,
                next_level_at,
                milestones,
            }))
        })
        .await
    }

    async fn save_progress(&self, user_id: &str, progress: &ProgressState) -> Result<()> {
        let user_id = user_id.to_string();
        let progress = progress.clone();
        self.run(move |conn| upsert_progress(conn, &user_id, &progress))
            .await
    }

    async fn add_milestone(&self, user_id: &str, milestone: &Milestone) -> Result<()> {
        let user_id = user_id.to_string();
        let milestone = milestone.clone();
        self.run(move |conn| insert_milestone(conn, &user_id, &milestone))
            .await
    }

    async fn append_message(&self, user_id: &str, message: &Message) -> Result<()> {
        let user_id = user_id.to_string();
        let message = message.clone();
        self.run(move |conn| insert_message(conn, &user_id, &message))
            .await
    }

    async fn load_messages(&self, user_id: &str) -> Result<Vec<Message>> {
        let user_id = user_id.to_string();
        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT content, sender, created_at FROM messages WHERE user_id = ?1 ORDER BY created_at, id",
            )?;
            let messages = stmt
                .query_map(params![user_id], |row| {
                    let sender: String = row.get(1)?;
                    let timestamp: DateTime<Utc> = row.get(2)?;
                    Ok(Message {
                        content: row.get(0)?,
                        sender: sender
                            .parse::<Sender>()
                            .map_err(|_| rusqlite::Error::InvalidQuery)?,
                        timestamp,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(messages)
        })
        .await
    }

    async fn delete_messages(&self, user_id: &str) -> Result<()> {
        self.delete_rows(user_id, &["messages"]).await
    }

    async fn delete_profile(&self, user_id: &str) -> Result<()> {
        self.delete_rows(user_id, &["profiles"]).await
    }

    async fn delete_user_data(&self, user_id: &str) -> Result<()> {
        self.delete_rows(user_id, USER_TABLES).await
    }

    async fn seed_user_data(&self, user_id: &str, data: &UserData) -> Result<bool> {
        let user_id = user_id.to_string();
        let data = data.clone();
        self.run(move |conn| {
            let tx = conn.transaction()?;
            for table in USER_TABLES {
                let taken: bool = tx.query_row(
                    &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE user_id = ?1)"),
                    params![user_id],
                    |row| row.get(0),
                )?;
                if taken {
                    return Ok(false);
                }
            }

            if let Some(profile) = &data.profile {
                upsert_profile(&tx, &user_id, profile)?;
            }
            if let Some(progress) = &data.progress {
                upsert_progress(&tx, &user_id, progress)?;
                for milestone in &progress.milestones {
                    insert_milestone(&tx, &user_id, milestone)?;
                }
            }
            for message in &data.messages {
                insert_message(&tx, &user_id, message)?;
            }
            tx.commit()?;
            Ok(true)
        })
        .await
    }
}

fn upsert_profile(conn: &Connection, user_id: &str, profile: &Profile) -> Result<()> {
    conn.execute(
        "INSERT INTO profiles (user_id, name, core_memory, stated_need, feeling_tag, first_interaction_at, last_interaction_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
         ON CONFLICT(user_id) DO UPDATE SET name = excluded.name, core_memory = excluded.core_memory, \
         stated_need = excluded.stated_need, feeling_tag = excluded.feeling_tag, \
         first_interaction_at = excluded.first_interaction_at, last_interaction_at = excluded.last_interaction_at",
        params![
            user_id,
            profile.name,
            profile.core_memory,
            profile.stated_need,
            profile.feeling_tag,
            profile.first_interaction_at,
            profile.last_interaction_at,
        ],
    )?;
    Ok(())
}

fn upsert_progress(conn: &Connection, user_id: &str, progress: &ProgressState) -> Result<()> {
    conn.execute(
        "INSERT INTO progress (user_id, level, experience, next_level_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5) \
         ON CONFLICT(user_id) DO UPDATE SET level = excluded.level, experience = excluded.experience, \
         next_level_at = excluded.next_level_at, updated_at = excluded.updated_at",
        params![
            user_id,
            progress.level,
            progress.experience,
            progress.next_level_at,
            Utc::now()
        ],
    )?;
    Ok(())
}

fn insert_milestone(conn: &Connection, user_id: &str, milestone: &Milestone) -> Result<()> {
    conn.execute(
        "INSERT INTO milestones (user_id, reason, experience_awarded, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            user_id,
            milestone.reason,
            milestone.experience_awarded,
            milestone.timestamp,
        ],
    )?;
    Ok(())
}

fn insert_message(conn: &Connection, user_id: &str, message: &Message) -> Result<()> {
    conn.execute(
        "INSERT INTO messages (user_id, sender, content, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            user_id,
            message.sender.as_str(),
            message.content,
            message.timestamp,
        ],
    )?;
    Ok(())
}
