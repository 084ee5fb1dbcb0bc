//! Context summarizer — turns conversation history into a bounded digest.
//!
//! Only user-authored messages count. Emotionally salient ones are kept whole,
//! everything else is clipped, and only the most recent few survive.

use super::types::Message;

/// Words that mark a message as emotionally salient (case-insensitive substring).
pub const SALIENT_KEYWORDS: [&str; 7] = ["feel", "remember", "hurt", "love", "afraid", "happy", "sad"];

/// Maximum number of digest lines.
pub const MAX_DIGEST_LINES: usize = 5;

/// Source characters kept from a non-salient message.
pub const BRIEF_CHARS: usize = 50;

const SALIENT_PREFIX: &str = "Memory: ";
const BRIEF_PREFIX: &str = "They told me: ";
const ELLIPSIS: &str = "...";

/// Whether `text` mentions any of the [`SALIENT_KEYWORDS`].
pub fn is_emotionally_salient(text: &str) -> bool {
    let lowered = text.to_lowercase();
    SALIENT_KEYWORDS.iter().any(|kw| lowered.contains(kw))
}

/// Render one user message as a single digest line.
///
/// Line breaks inside the message become spaces so one message is one line.
pub fn digest_line(content: &str) -> String {
    let content = content.replace(['\r', '\n'], " ");
    if is_emotionally_salient(&content) {
        format!("{SALIENT_PREFIX}{content}")
    } else {
        let brief: String = content.chars().take(BRIEF_CHARS).collect();
        format!("{BRIEF_PREFIX}{brief}{ELLIPSIS}")
    }
}

/// Build the digest of the last [`MAX_DIGEST_LINES`] user messages, oldest first.
///
/// Returns an empty string when the history holds no user messages.
pub fn summarize(history: &[Message]) -> String {
    let lines: Vec<String> = history
        .iter()
        .filter(|m| m.is_from_user())
        .map(|m| digest_line(&m.content))
        .collect();

    let start = lines.len().saturating_sub(MAX_DIGEST_LINES);
    lines[start..].join("\n")
}
