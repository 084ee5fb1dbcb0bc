pub mod auth;
pub mod chat;
pub mod doctor;
pub mod export;
pub mod history;
pub mod reset;
pub mod status;

use std::io::Write;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tokio::sync::watch;

use rebirth::auth::{AuthError, AuthProvider, AuthSession, SqliteAuth};
use rebirth::completion::{create_provider, CompletionProvider};
use rebirth::config::RebirthConfig;
use rebirth::session::{Session, SessionDeps};
use rebirth::store::{CacheKey, LocalCache, RemoteStore, SqliteRemoteStore};

/// A session plus the auth provider backing it, if the remote store is enabled.
pub struct Runtime {
    pub session: Session,
    pub auth: Option<Arc<SqliteAuth>>,
}

/// Open the local cache, the remote database, and the completion provider,
/// restore any saved sign-in, and open a [`Session`].
pub async fn open_runtime(config: &RebirthConfig) -> Result<Runtime> {
    let cache = LocalCache::open(config.resolved_db_path())?;
    let saved: Option<AuthSession> = cache.load(CacheKey::AuthSession)?;

    let (auth, remote, rx) = if config.remote.enabled {
        let conn = rebirth::db::open_database(config.resolved_remote_db_path())
            .context("failed to open remote database")?;
        let db = Arc::new(Mutex::new(conn));
        let auth = Arc::new(SqliteAuth::new(Arc::clone(&db)));
        let remote: Arc<dyn RemoteStore> = Arc::new(SqliteRemoteStore::new(db));

        if let Some(saved) = &saved {
            match auth.restore(saved).await {
                Ok(()) => {}
                Err(AuthError::UnknownSession) => {
                    tracing::warn!(email = %saved.email, "saved session is stale, signing out");
                    cache.remove(CacheKey::AuthSession)?;
                }
                Err(e) => tracing::warn!(error = %e, "failed to restore saved session"),
            }
        }

        let rx = auth.subscribe();
        (Some(auth), Some(remote), rx)
    } else {
        let (_, rx) = watch::channel(None);
        (None, None, rx)
    };

    let completion: Arc<dyn CompletionProvider> = Arc::from(create_provider(&config.completion)?);

    let session = Session::open(SessionDeps {
        cache,
        completion,
        remote,
        auth: rx,
        progression: config.progression.clone(),
        temperature: config.completion.temperature,
    })
    .await?;

    Ok(Runtime { session, auth })
}

/// Print `label` and read one line from stdin. `None` on end of input.
pub fn read_line(label: &str) -> Result<Option<String>> {
    print!("{label}");
    std::io::stdout().flush()?;

    let mut input = String::new();
    if std::io::stdin().read_line(&mut input)? == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim_end_matches(['\r', '\n']).to_string()))
}

/// [`read_line`] with echo turned off while stdin is a terminal.
pub fn read_password(label: &str) -> Result<Option<String>> {
    #[cfg(unix)]
    {
        use rustix::termios::{tcgetattr, tcsetattr, LocalModes, OptionalActions};

        let stdin = std::io::stdin();
        if let Ok(original) = tcgetattr(&stdin) {
            let mut hidden = original.clone();
            hidden.local_modes.remove(LocalModes::ECHO);
            tcsetattr(&stdin, OptionalActions::Now, &hidden)?;
            let input = read_line(label);
            tcsetattr(&stdin, OptionalActions::Now, &original)?;
            println!();
            return input;
        }
    }
    read_line(label)
}

/// Text progress bar, e.g. `[#####---------------] 25%`.
pub fn progress_bar(percent: f64) -> String {
    const WIDTH: usize = 20;
    let percent = percent.clamp(0.0, 100.0);
    let filled = (percent / 100.0 * WIDTH as f64).round() as usize;
    format!(
        "[{}{}] {percent:.0}%",
        "#".repeat(filled),
        "-".repeat(WIDTH - filled)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_bar_fills_proportionally() {
        assert_eq!(progress_bar(0.0), "[--------------------] 0%");
        assert_eq!(progress_bar(25.0), "[#####---------------] 25%");
        assert_eq!(progress_bar(150.0), "[####################] 100%");
    }
}
