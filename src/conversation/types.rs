//! Conversation data model.
//!
//! Defines [`Sender`], [`Message`] (one immutable history entry), and
//! [`Profile`] (the facts gathered during onboarding).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    /// The person journaling.
    User,
    /// The inner-child persona.
    Agent,
}

impl Sender {
    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Agent => "agent",
        }
    }
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Sender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "agent" => Ok(Self::Agent),
            _ => Err(format!("unknown sender: {s}")),
        }
    }
}

/// One entry of the conversation history. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub content: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(content: impl Into<String>, sender: Sender, timestamp: DateTime<Utc>) -> Self {
        Self {
            content: content.into(),
            sender,
            timestamp,
        }
    }

    /// A user-authored message stamped now.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(content, Sender::User, Utc::now())
    }

    /// A persona-authored message stamped now.
    pub fn agent(content: impl Into<String>) -> Self {
        Self::new(content, Sender::Agent, Utc::now())
    }

    pub fn is_from_user(&self) -> bool {
        self.sender == Sender::User
    }
}

/// Facts gathered during onboarding. One per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// First name or nickname.
    pub name: String,
    /// The childhood story shared during onboarding.
    pub core_memory: String,
    /// What the younger self needed most.
    pub stated_need: String,
    /// Emoji from the five-point feeling scale.
    pub feeling_tag: String,
    pub first_interaction_at: DateTime<Utc>,
    /// Bumped each time a session resumes.
    pub last_interaction_at: DateTime<Utc>,
}

impl Profile {
    /// Record a session resumption.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_interaction_at = now;
    }
}
