//! The conversation session.
//!
//! A [`Session`] owns the profile, the message history, and the progression
//! tracker for one user, and drives one exchange at a time:
//!
//! 1. digest the prior history and compose the persona instruction
//! 2. record the user message
//! 3. request a completion (a fixed apology replaces any failure)
//! 4. record the reply, score the exchange, and persist progress
//!
//! The local cache is written after every change and is authoritative for the
//! running session. Remote writes happen only while signed in and never block
//! or roll back local state.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;

use crate::auth::AuthSession;
use crate::completion::{ChatMessage, CompletionProvider, CompletionRequest};
use crate::config::ProgressionConfig;
use crate::conversation::prompt::{compose_persona, PromptError};
use crate::conversation::summary::summarize;
use crate::conversation::to_chat_messages;
use crate::conversation::types::{Message, Profile};
use crate::progress::{Award, ProgressState, ProgressTracker};
use crate::store::{CacheKey, LocalCache, RemoteStore, UserData};

/// Reply recorded when the completion boundary fails.
pub const FALLBACK_REPLY: &str = "Sorry, I couldn't process your request. Please try again.";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("onboarding has not been completed")]
    NotOnboarded,
    #[error("message is empty")]
    EmptyMessage,
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error("local cache write failed: {0}")]
    Cache(#[from] anyhow::Error),
}

/// Collaborators handed to [`Session::open`].
pub struct SessionDeps {
    pub cache: LocalCache,
    pub completion: Arc<dyn CompletionProvider>,
    pub remote: Option<Arc<dyn RemoteStore>>,
    pub auth: watch::Receiver<Option<AuthSession>>,
    pub progression: ProgressionConfig,
    pub temperature: f32,
}

/// Result of [`Session::send_message`].
#[derive(Debug, Clone)]
pub struct ExchangeOutcome {
    pub reply: Message,
    /// The completion failed and `reply` is [`FALLBACK_REPLY`].
    pub fallback: bool,
    /// Experience awarded for this exchange, in order. Empty on fallback.
    pub awards: Vec<Award>,
    /// Every local cache write for this exchange succeeded.
    pub durable: bool,
}

impl ExchangeOutcome {
    /// The "save your progress" prompt should be shown.
    pub fn signup_prompt(&self) -> bool {
        self.awards.iter().any(|a| a.signup_prompt)
    }

    /// New level, if this exchange crossed a level boundary.
    pub fn level_up(&self) -> Option<u32> {
        let first = self.awards.first()?;
        let last = self.awards.last()?;
        (last.level > first.previous_level).then_some(last.level)
    }
}

pub struct Session {
    cache: LocalCache,
    completion: Arc<dyn CompletionProvider>,
    remote: Option<Arc<dyn RemoteStore>>,
    auth: watch::Receiver<Option<AuthSession>>,
    user: Option<AuthSession>,
    profile: Option<Profile>,
    history: Vec<Message>,
    tracker: ProgressTracker,
    exchanges: u64,
    temperature: f32,
}

impl Session {
    /// Load cached state and resume.
    ///
    /// A cached profile gets its `last_interaction_at` bumped. When signed in
    /// with no local profile, the remote copy is adopted.
    pub async fn open(deps: SessionDeps) -> Result<Self> {
        let SessionDeps {
            cache,
            completion,
            remote,
            mut auth,
            progression,
            temperature,
        } = deps;

        let profile: Option<Profile> = cache.load(CacheKey::Profile)?;
        let history: Vec<Message> = cache.load(CacheKey::ConversationHistory)?.unwrap_or_default();
        let progress: ProgressState = cache
            .load(CacheKey::Progress)?
            .unwrap_or_else(|| ProgressState::new(progression.next_level_at));
        let user = auth.borrow_and_update().clone();

        let mut session = Self {
            cache,
            completion,
            remote,
            auth,
            user,
            profile,
            history,
            tracker: ProgressTracker::new(progress, progression.signup_prompt_percent),
            exchanges: 0,
            temperature,
        };

        if let Some(user) = session.user.clone() {
            session.persist_local(CacheKey::AuthSession, &user);
            if session.profile.is_none() {
                session.attach_remote().await;
            }
        }

        if let Some(profile) = session.profile.as_mut() {
            profile.touch(Utc::now());
        }
        session.persist_profile().await;

        tracing::info!(
            onboarded = session.profile.is_some(),
            messages = session.history.len(),
            level = session.tracker.state().level,
            authenticated = session.is_authenticated(),
            "session opened"
        );
        Ok(session)
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn progress(&self) -> &ProgressState {
        self.tracker.state()
    }

    pub fn user(&self) -> Option<&AuthSession> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Completed exchanges since the session opened.
    pub fn exchange_count(&self) -> u64 {
        self.exchanges
    }

    pub fn completion(&self) -> &dyn CompletionProvider {
        self.completion.as_ref()
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Store the profile produced by onboarding.
    ///
    /// The profile is kept in memory even if the local write fails.
    pub async fn complete_onboarding(&mut self, profile: Profile) -> Result<(), SessionError> {
        self.sync_auth().await;
        tracing::info!(name = %profile.name, "onboarding complete");
        self.profile = Some(profile);
        match self.persist_profile().await {
            Some(e) => Err(SessionError::Cache(e)),
            None => Ok(()),
        }
    }

    /// Run one exchange with the persona.
    ///
    /// Takes `&mut self`, so a conversation never has two requests in flight.
    pub async fn send_message(&mut self, text: &str) -> Result<ExchangeOutcome, SessionError> {
        self.sync_auth().await;

        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        let profile = self.profile.as_ref().ok_or(SessionError::NotOnboarded)?;

        let digest = summarize(&self.history);
        let system = compose_persona(profile, &digest)?;
        let mut messages = to_chat_messages(&self.history);
        messages.push(ChatMessage::user(text));
        let request = CompletionRequest {
            system,
            messages,
            temperature: self.temperature,
        };

        let mut durable = self.record_message(Message::user(text)).await;

        let (reply, fallback) = match self.completion.complete(&request).await {
            Ok(content) => (Message::agent(content), false),
            Err(e) => {
                tracing::warn!(error = %e, "completion failed, replying with fallback");
                (Message::agent(FALLBACK_REPLY), true)
            }
        };
        durable &= self.record_message(reply.clone()).await;

        let awards = if fallback {
            Vec::new()
        } else {
            self.exchanges += 1;
            let authenticated = self.is_authenticated();
            let awards = self.tracker.record_exchange(text, self.exchanges, authenticated);
            durable &= self.persist_progress(&awards).await;
            awards
        };

        Ok(ExchangeOutcome {
            reply,
            fallback,
            awards,
            durable,
        })
    }

    /// Apply pending session-change notifications from the auth provider.
    ///
    /// Signing in persists the session locally and reconciles with the remote
    /// store: an account that already holds data is adopted, replacing local
    /// state; an empty account is seeded with local state. Signing out forgets
    /// the session.
    pub async fn sync_auth(&mut self) {
        if !self.auth.has_changed().unwrap_or(false) {
            return;
        }
        let current = self.auth.borrow_and_update().clone();

        match current {
            Some(session) => {
                let same_user = self
                    .user
                    .as_ref()
                    .is_some_and(|u| u.user_id == session.user_id);
                self.persist_local(CacheKey::AuthSession, &session);
                self.user = Some(session);
                if !same_user {
                    tracing::info!("signed in, reconciling with remote store");
                    self.attach_remote().await;
                }
            }
            None => {
                if self.user.take().is_some() {
                    tracing::info!("session signed out");
                }
                self.forget_local(&[CacheKey::AuthSession]);
            }
        }
    }

    /// Drop the conversation and the profile. Progress is kept.
    ///
    /// Returns `false` if the local cache could not be updated; the in-memory
    /// state is cleared regardless.
    pub async fn clear_chat(&mut self) -> bool {
        self.sync_auth().await;
        self.history.clear();
        self.profile = None;
        self.exchanges = 0;

        if let Some((remote, user_id)) = self.remote_target() {
            log_remote(remote.delete_messages(&user_id).await, "delete_messages");
            log_remote(remote.delete_profile(&user_id).await, "delete_profile");
        }

        let durable = self.forget_local(&[CacheKey::ConversationHistory, CacheKey::Profile]);
        tracing::info!(durable, "chat cleared");
        durable
    }

    /// Clear history, profile, and progress, back to first-launch defaults.
    ///
    /// The signed-in account (if any) stays signed in; its remote records are
    /// deleted. Returns `false` if the local cache could not be updated.
    pub async fn reset_session(&mut self) -> bool {
        self.sync_auth().await;
        self.history.clear();
        self.profile = None;
        self.tracker.reset();
        self.exchanges = 0;

        if let Some((remote, user_id)) = self.remote_target() {
            log_remote(remote.delete_user_data(&user_id).await, "delete_user_data");
        }

        let durable = self.forget_local(&[
            CacheKey::ConversationHistory,
            CacheKey::Profile,
            CacheKey::Progress,
        ]);
        tracing::info!(durable, "session reset");
        durable
    }

    /// Flush everything to the local cache and release the session.
    pub fn close(self) -> Result<()> {
        self.cache.save(CacheKey::ConversationHistory, &self.history)?;
        self.cache.save(CacheKey::Progress, self.tracker.state())?;
        if let Some(profile) = &self.profile {
            self.cache.save(CacheKey::Profile, profile)?;
        }
        tracing::info!(exchanges = self.exchanges, "session closed");
        Ok(())
    }

    async fn record_message(&mut self, message: Message) -> bool {
        if let Some((remote, user_id)) = self.remote_target() {
            log_remote(remote.append_message(&user_id, &message).await, "append_message");
        }
        self.history.push(message);
        self.persist_local(CacheKey::ConversationHistory, &self.history)
    }

    async fn persist_progress(&self, awards: &[Award]) -> bool {
        let state = self.tracker.state();
        if let Some((remote, user_id)) = self.remote_target() {
            log_remote(remote.save_progress(&user_id, state).await, "save_progress");
            for award in awards {
                log_remote(
                    remote.add_milestone(&user_id, &award.milestone).await,
                    "add_milestone",
                );
            }
        }
        self.persist_local(CacheKey::Progress, state)
    }

    /// Write the profile locally and remotely. Returns the local error, if any.
    async fn persist_profile(&self) -> Option<anyhow::Error> {
        let profile = self.profile.as_ref()?;
        if let Some((remote, user_id)) = self.remote_target() {
            log_remote(remote.save_profile(&user_id, profile).await, "save_profile");
        }
        self.cache.save(CacheKey::Profile, profile).err().inspect(|e| {
            tracing::error!(key = %CacheKey::Profile, error = %e, "local cache write failed");
        })
    }

    fn persist_local<T: Serialize + ?Sized>(&self, key: CacheKey, value: &T) -> bool {
        match self.cache.save(key, value) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(key = %key, error = %e, "local cache write failed");
                false
            }
        }
    }

    /// Remove `keys` from the cache, logging failures. Returns `false` if any failed.
    fn forget_local(&self, keys: &[CacheKey]) -> bool {
        let mut durable = true;
        for &key in keys {
            if let Err(e) = self.cache.remove(key) {
                tracing::error!(key = %key, error = %e, "local cache remove failed");
                durable = false;
            }
        }
        durable
    }

    fn remote_target(&self) -> Option<(Arc<dyn RemoteStore>, String)> {
        match (&self.remote, &self.user) {
            (Some(remote), Some(user)) => Some((Arc::clone(remote), user.user_id.clone())),
            _ => None,
        }
    }

    /// Reconcile with the remote store for the signed-in user.
    ///
    /// Remote data wins: local state is uploaded only into an empty account,
    /// so signing in on a second device never overwrites the account.
    async fn attach_remote(&mut self) {
        let Some((remote, user_id)) = self.remote_target() else {
            return;
        };

        let stored = match remote.load_user_data(&user_id).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load remote state");
                return;
            }
        };
        if !stored.is_empty() {
            self.adopt_remote(remote.as_ref(), &user_id, stored).await;
            return;
        }
        if self.profile.is_none() {
            tracing::debug!(user_id = %user_id, "no remote state to adopt");
            return;
        }

        let local = UserData {
            profile: self.profile.clone(),
            progress: Some(self.tracker.state().clone()),
            messages: self.history.clone(),
        };
        match remote.seed_user_data(&user_id, &local).await {
            Ok(true) => tracing::info!(user_id = %user_id, "uploaded local state"),
            Ok(false) => {
                // Another device wrote first.
                match remote.load_user_data(&user_id).await {
                    Ok(stored) => self.adopt_remote(remote.as_ref(), &user_id, stored).await,
                    Err(e) => tracing::warn!(error = %e, "failed to load remote state"),
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to upload local state"),
        }
    }

    /// Replace local state with the account's stored data.
    ///
    /// An account with progress but no profile (cleared on another device)
    /// keeps the local profile and receives it.
    async fn adopt_remote(&mut self, remote: &dyn RemoteStore, user_id: &str, stored: UserData) {
        match stored.profile {
            Some(profile) => self.profile = Some(profile),
            None => {
                if let Some(profile) = &self.profile {
                    log_remote(remote.save_profile(user_id, profile).await, "save_profile");
                }
            }
        }
        self.history = stored.messages;
        if let Some(progress) = stored.progress {
            self.tracker.replace(progress);
        }

        self.persist_local(CacheKey::ConversationHistory, &self.history);
        self.persist_local(CacheKey::Progress, self.tracker.state());
        if let Some(profile) = &self.profile {
            self.persist_local(CacheKey::Profile, profile);
        }
        tracing::info!(
            user_id = %user_id,
            messages = self.history.len(),
            level = self.tracker.state().level,
            "adopted remote state"
        );
    }
}

fn log_remote(result: Result<()>, operation: &'static str) {
    if let Err(e) = result {
        tracing::warn!(operation, error = %e, "remote write failed");
    }
}
