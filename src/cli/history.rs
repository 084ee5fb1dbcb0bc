//! CLI `history` command — print the cached conversation.

use anyhow::Result;

use rebirth::config::RebirthConfig;
use rebirth::conversation::types::{Message, Sender};
use rebirth::store::{CacheKey, LocalCache};

pub fn history(config: &RebirthConfig, limit: Option<usize>) -> Result<()> {
    let cache = LocalCache::open(config.resolved_db_path())?;
    let history: Vec<Message> = cache.load(CacheKey::ConversationHistory)?.unwrap_or_default();

    if history.is_empty() {
        println!("No messages yet.");
        return Ok(());
    }

    let skip = limit.map_or(0, |n| history.len().saturating_sub(n));
    for message in &history[skip..] {
        let who = match message.sender {
            Sender::User => "you",
            Sender::Agent => "younger self",
        };
        println!(
            "[{}] {who}: {}",
            message.timestamp.format("%Y-%m-%d %H:%M"),
            message.content
        );
    }

    Ok(())
}
