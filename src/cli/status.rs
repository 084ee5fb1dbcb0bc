//! CLI `status` command — level, experience, and account from the local cache.

use anyhow::Result;

use rebirth::auth::AuthSession;
use rebirth::config::RebirthConfig;
use rebirth::conversation::types::{Message, Profile};
use rebirth::progress::guide::{level_title, LEVEL_TITLES};
use rebirth::progress::scoring::Reward;
use rebirth::progress::ProgressState;
use rebirth::store::{CacheKey, LocalCache};

use super::progress_bar;

const RECENT_MILESTONES: usize = 5;

pub fn status(config: &RebirthConfig) -> Result<()> {
    let cache = LocalCache::open(config.resolved_db_path())?;
    let profile: Option<Profile> = cache.load(CacheKey::Profile)?;
    let progress: ProgressState = cache
        .load(CacheKey::Progress)?
        .unwrap_or_else(|| ProgressState::new(config.progression.next_level_at));
    let history: Vec<Message> = cache.load(CacheKey::ConversationHistory)?.unwrap_or_default();
    let user: Option<AuthSession> = cache.load(CacheKey::AuthSession)?;

    match &profile {
        Some(p) => {
            println!("Name:              {}", p.name);
            println!("Feeling:           {}", p.feeling_tag);
            println!("First visit:       {}", p.first_interaction_at.format("%Y-%m-%d %H:%M"));
            println!("Last visit:        {}", p.last_interaction_at.format("%Y-%m-%d %H:%M"));
        }
        None => println!("Profile:           (not onboarded, run `rebirth chat`)"),
    }
    println!();
    println!("Level:             {} ({})", progress.level, level_title(progress.level));
    println!("Experience:        {}", progress.experience);
    println!("Progress:          {}", progress_bar(progress.percent_into_level()));
    println!("Milestones:        {}", progress.milestones.len());
    println!("Messages:          {}", history.len());

    if !progress.milestones.is_empty() {
        println!();
        println!("Recent milestones:");
        let skip = progress.milestones.len().saturating_sub(RECENT_MILESTONES);
        for m in progress.milestones[skip..].iter().rev() {
            println!(
                "  {}  +{:<3} {}",
                m.timestamp.format("%Y-%m-%d %H:%M"),
                m.experience_awarded,
                m.reason
            );
        }
    }

    println!();
    println!("Level guide:");
    for (i, title) in LEVEL_TITLES.iter().enumerate() {
        let level = i as u32 + 1;
        let marker = if level == progress.level.min(LEVEL_TITLES.len() as u32) {
            ">"
        } else {
            " "
        };
        println!("  {marker} {level}. {title}");
    }
    println!();
    print_growth_guide();
    println!();
    match user {
        Some(u) => println!("Account:           {}", u.email),
        None => println!("Account:           (not signed in)"),
    }

    Ok(())
}

/// The "How to grow" list: every reward with its points.
pub fn print_growth_guide() {
    println!("How to grow:");
    for reward in Reward::ALL {
        println!(
            "  +{:>2} XP  {:<22} {}",
            reward.points(),
            reward.reason(),
            reward.hint()
        );
    }
}
