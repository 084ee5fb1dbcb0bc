#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rebirth::auth::{AuthProvider, SqliteAuth};
use rebirth::completion::{CompletionError, CompletionProvider, CompletionRequest};
use rebirth::config::ProgressionConfig;
use rebirth::conversation::types::Profile;
use rebirth::db;
use rebirth::session::{Session, SessionDeps};
use rebirth::store::{LocalCache, RemoteStore, SqliteRemoteStore};
use rusqlite::Connection;

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.pragma_update(None, "foreign_keys", "ON").unwrap();
    db::schema::init_schema(&conn).unwrap();
    db::migrations::run_migrations(&conn).unwrap();
    conn
}

pub fn shared_db() -> Arc<Mutex<Connection>> {
    Arc::new(Mutex::new(test_db()))
}

/// Completion provider that replays queued replies and records every request.
///
/// Once the queue is empty it answers with a fixed line.
#[derive(Default)]
pub struct ScriptedCompletion {
    replies: Mutex<VecDeque<Option<String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

pub const DEFAULT_REPLY: &str = "I'm right here with you.";

impl ScriptedCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_reply(&self, text: &str) {
        self.replies.lock().unwrap().push_back(Some(text.to_string()));
    }

    pub fn push_failure(&self) {
        self.replies.lock().unwrap().push_back(None);
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> CompletionRequest {
        self.requests().pop().expect("no completion requested")
    }
}

#[async_trait]
impl CompletionProvider for ScriptedCompletion {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        self.requests.lock().unwrap().push(request.clone());
        match self.replies.lock().unwrap().pop_front() {
            Some(Some(reply)) => Ok(reply),
            Some(None) => Err(CompletionError::Status {
                status: 503,
                message: "service unavailable".into(),
            }),
            None => Ok(DEFAULT_REPLY.to_string()),
        }
    }
}

pub fn test_profile(name: &str) -> Profile {
    let at = Utc.with_ymd_and_hms(2024, 3, 5, 9, 30, 0).unwrap();
    Profile {
        name: name.to_string(),
        core_memory: "Building a treehouse with my grandfather".to_string(),
        stated_need: "To be told it was okay to make mistakes".to_string(),
        feeling_tag: "😊".to_string(),
        first_interaction_at: at,
        last_interaction_at: at,
    }
}

/// A session wired to in-memory stores, plus handles to its collaborators.
pub struct Harness {
    pub session: Session,
    pub auth: Arc<SqliteAuth>,
    pub remote: Arc<SqliteRemoteStore>,
    pub remote_db: Arc<Mutex<Connection>>,
    pub completion: Arc<ScriptedCompletion>,
}

pub async fn harness() -> Harness {
    harness_with(LocalCache::in_memory().unwrap(), shared_db()).await
}

/// Build a session over `cache` and a remote database that may be shared
/// with other harnesses.
pub async fn harness_with(cache: LocalCache, remote_db: Arc<Mutex<Connection>>) -> Harness {
    let auth = Arc::new(SqliteAuth::new(Arc::clone(&remote_db)));
    let remote = Arc::new(SqliteRemoteStore::new(Arc::clone(&remote_db)));
    let completion = Arc::new(ScriptedCompletion::new());

    let session = Session::open(SessionDeps {
        cache,
        completion: completion.clone(),
        remote: Some(remote.clone() as Arc<dyn RemoteStore>),
        auth: auth.subscribe(),
        progression: ProgressionConfig::default(),
        temperature: 0.7,
    })
    .await
    .unwrap();

    Harness {
        session,
        auth,
        remote,
        remote_db,
        completion,
    }
}

/// Harness whose session has already finished onboarding.
pub async fn onboarded() -> Harness {
    let mut h = harness().await;
    h.session
        .complete_onboarding(test_profile("Sam"))
        .await
        .unwrap();
    h
}

/// Sign up through the harness's auth provider and let the session observe it.
pub async fn sign_up(h: &mut Harness, email: &str) -> String {
    let user = h.auth.sign_up(email, "hunter22").await.unwrap();
    h.session.sync_auth().await;
    user.user_id
}
