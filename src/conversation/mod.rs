pub mod onboarding;
pub mod prompt;
pub mod summary;
pub mod types;

use crate::completion::ChatMessage;
use types::{Message, Sender};

/// Map stored history to role-tagged completion messages, oldest first.
pub fn to_chat_messages(history: &[Message]) -> Vec<ChatMessage> {
    history
        .iter()
        .map(|m| match m.sender {
            Sender::User => ChatMessage::user(m.content.clone()),
            Sender::Agent => ChatMessage::assistant(m.content.clone()),
        })
        .collect()
}
