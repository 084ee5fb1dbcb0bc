//! Auth boundary.
//!
//! Provides the [`AuthProvider`] trait (sign-up, sign-in, sign-out, and a
//! session-change channel) and a SQLite-backed implementation. The rest of the
//! crate only cares whether an [`AuthSession`] is present.

pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;

pub use sqlite::SqliteAuth;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 6;

/// A signed-in account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub user_id: String,
    pub email: String,
    pub signed_in_at: DateTime<Utc>,
}

/// Auth failures. `Display` is meant to be shown inline to the user.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("please enter a valid email address")]
    InvalidEmail,
    #[error("password must be at least 6 characters")]
    WeakPassword,
    #[error("an account with this email already exists")]
    EmailTaken,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("saved session is no longer valid, please sign in again")]
    UnknownSession,
    #[error("auth backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;
    async fn sign_out(&self) -> Result<(), AuthError>;
    /// Re-activate a session persisted by an earlier run.
    async fn restore(&self, session: &AuthSession) -> Result<(), AuthError>;
    /// Session-change notifications. The current value is the active session.
    fn subscribe(&self) -> watch::Receiver<Option<AuthSession>>;
}

/// Trim and lowercase, then check for `local@domain.tld` shape.
pub fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        }
        None => false,
    };
    if valid {
        Ok(email)
    } else {
        Err(AuthError::InvalidEmail)
    }
}

pub fn check_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        Err(AuthError::WeakPassword)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_normalized() {
        assert_eq!(normalize_email("  Sam@Example.COM ").unwrap(), "sam@example.com");
    }

    #[test]
    fn malformed_emails_rejected() {
        for bad in ["", "sam", "@example.com", "sam@", "sam@example", "sam@.com", "a@b@c.com"] {
            assert!(
                matches!(normalize_email(bad), Err(AuthError::InvalidEmail)),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn short_password_rejected() {
        assert!(matches!(check_password("12345"), Err(AuthError::WeakPassword)));
        assert!(check_password("123456").is_ok());
    }
}
