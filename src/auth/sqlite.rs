//! Account storage in the `users` table.
//!
//! Passwords are stored as argon2id PHC strings, which carry their own salt and
//! parameters. The active session is published on a `watch` channel.

use std::sync::{Arc, Mutex};

use anyhow::Context;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::watch;

use super::{check_password, normalize_email, AuthError, AuthProvider, AuthSession};

pub struct SqliteAuth {
    db: Arc<Mutex<Connection>>,
    session: watch::Sender<Option<AuthSession>>,
}

struct UserRow {
    id: String,
    hash: String,
}

impl SqliteAuth {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        let (session, _) = watch::channel(None);
        Self { db, session }
    }

    /// The currently published session, if any.
    pub fn current(&self) -> Option<AuthSession> {
        self.session.borrow().clone()
    }

    async fn run<T, F>(&self, f: F) -> Result<T, AuthError>
    where
        F: FnOnce(&Connection) -> Result<T, AuthError> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|e| anyhow::anyhow!("db lock poisoned: {e}"))?;
            f(&conn)
        })
        .await
        .context("auth task failed")?
    }

    fn publish(&self, session: Option<AuthSession>) {
        self.session.send_replace(session);
    }
}

fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::encode_b64(uuid::Uuid::new_v4().as_bytes())
        .map_err(|e| anyhow::anyhow!("failed to encode salt: {e}"))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("failed to hash password: {e}"))?;
    Ok(hash.to_string())
}

/// Constant-time check of `password` against a stored PHC string.
fn verify_password(stored: &str, password: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::error!(error = %e, "stored password hash is malformed");
            false
        }
    }
}

fn find_user(conn: &Connection, email: &str) -> rusqlite::Result<Option<UserRow>> {
    conn.query_row(
        "SELECT id, password_hash FROM users WHERE email = ?1",
        params![email],
        |row| {
            Ok(UserRow {
                id: row.get(0)?,
                hash: row.get(1)?,
            })
        },
    )
    .optional()
}

fn db_err(e: rusqlite::Error) -> AuthError {
    AuthError::Backend(e.into())
}

#[async_trait]
impl AuthProvider for SqliteAuth {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let email = normalize_email(email)?;
        check_password(password)?;
        let password = password.to_string();

        let session = self
            .run(move |conn| {
                if find_user(conn, &email).map_err(db_err)?.is_some() {
                    return Err(AuthError::EmailTaken);
                }

                let id = uuid::Uuid::now_v7().to_string();
                let hash = hash_password(&password)?;
                let now = Utc::now();
                conn.execute(
                    "INSERT INTO users (id, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
                    params![id, email, hash, now],
                )
                .map_err(db_err)?;

                Ok(AuthSession {
                    user_id: id,
                    email,
                    signed_in_at: now,
                })
            })
            .await?;

        tracing::info!(user_id = %session.user_id, "account created");
        self.publish(Some(session.clone()));
        Ok(session)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let email = normalize_email(email)?;
        let password = password.to_string();

        let session = self
            .run(move |conn| {
                let user = find_user(conn, &email)
                    .map_err(db_err)?
                    .ok_or(AuthError::InvalidCredentials)?;
                if !verify_password(&user.hash, &password) {
                    return Err(AuthError::InvalidCredentials);
                }
                Ok(AuthSession {
                    user_id: user.id,
                    email,
                    signed_in_at: Utc::now(),
                })
            })
            .await?;

        tracing::info!(user_id = %session.user_id, "signed in");
        self.publish(Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if let Some(session) = self.current() {
            tracing::info!(user_id = %session.user_id, "signed out");
        }
        self.publish(None);
        Ok(())
    }

    async fn restore(&self, session: &AuthSession) -> Result<(), AuthError> {
        let user_id = session.user_id.clone();
        let exists = self
            .run(move |conn| {
                conn.query_row(
                    "SELECT COUNT(*) > 0 FROM users WHERE id = ?1",
                    params![user_id],
                    |row| row.get::<_, bool>(0),
                )
                .map_err(db_err)
            })
            .await?;

        if !exists {
            return Err(AuthError::UnknownSession);
        }
        tracing::debug!(user_id = %session.user_id, "session restored");
        self.publish(Some(session.clone()));
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<Option<AuthSession>> {
        self.session.subscribe()
    }
}
