//! Re:Birth — conversations with your younger self.
//!
//! A short onboarding wizard captures who the user is and a childhood memory.
//! After that, every message goes to a language model instructed to answer as
//! the user's younger self, grounded in that memory and a digest of the
//! conversation so far. Each completed exchange earns experience, and an
//! anonymous user is asked once to create an account so their progress can be
//! saved remotely.
//!
//! # Architecture
//!
//! - **Local cache**: SQLite key-value table, authoritative for the running session
//! - **Remote store**: SQLite relational tables keyed by account, written only while signed in
//! - **Completion**: any OpenAI-compatible chat completions endpoint
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`db`] — SQLite initialization, schema, migrations, and health checks
//! - [`conversation`] — Messages, profiles, the history digest, prompts, and onboarding
//! - [`progress`] — Experience scoring, levels, milestones, and the signup prompt
//! - [`completion`] — The language model boundary
//! - [`auth`] — Accounts and session-change notifications
//! - [`store`] — Local cache and remote store
//! - [`session`] — Ties everything together for one conversation

pub mod auth;
pub mod completion;
pub mod config;
pub mod conversation;
pub mod db;
pub mod progress;
pub mod session;
pub mod store;
