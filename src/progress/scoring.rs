//! Experience policy for a completed exchange.
//!
//! The primary reward is decided by the first matching rule (length, then
//! emotional keywords, then plain engagement). Every tenth exchange also earns
//! a consistency bonus.

/// Why experience was awarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reward {
    DeepReflection,
    ThoughtfulResponse,
    EmotionalConnection,
    Engagement,
    ConsistentReflection,
}

/// Keywords that earn [`Reward::EmotionalConnection`] (case-insensitive substring).
pub const EMOTIONAL_KEYWORDS: [&str; 4] = ["feel", "emotion", "remember", "childhood"];

/// Exchanges between consistency bonuses.
pub const CONSISTENCY_INTERVAL: u64 = 10;

impl Reward {
    pub fn points(&self) -> u32 {
        match self {
            Self::DeepReflection => 10,
            Self::ThoughtfulResponse => 5,
            Self::EmotionalConnection => 3,
            Self::Engagement => 1,
            Self::ConsistentReflection => 5,
        }
    }

    /// Milestone reason text.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::DeepReflection => "Deep Reflection",
            Self::ThoughtfulResponse => "Thoughtful Response",
            Self::EmotionalConnection => "Emotional Connection",
            Self::Engagement => "Engagement",
            Self::ConsistentReflection => "Consistent Reflection",
        }
    }

    /// How a user earns this reward.
    pub fn hint(&self) -> &'static str {
        match self {
            Self::DeepReflection => "share more than 200 characters",
            Self::ThoughtfulResponse => "share more than 100 characters",
            Self::EmotionalConnection => "talk about feelings, emotions, memories, or childhood",
            Self::Engagement => "any other message",
            Self::ConsistentReflection => "bonus on every 10th exchange",
        }
    }

    /// Every reward kind, in the order a guide would list them.
    pub const ALL: [Reward; 5] = [
        Self::DeepReflection,
        Self::ThoughtfulResponse,
        Self::EmotionalConnection,
        Self::Engagement,
        Self::ConsistentReflection,
    ];
}

impl std::fmt::Display for Reward {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.reason())
    }
}

/// Primary reward for a user message. Length is measured in characters.
pub fn score_message(text: &str) -> Reward {
    let length = text.chars().count();
    if length > 200 {
        Reward::DeepReflection
    } else if length > 100 {
        Reward::ThoughtfulResponse
    } else if mentions_emotion(text) {
        Reward::EmotionalConnection
    } else {
        Reward::Engagement
    }
}

/// Bonus owed for the `exchange_count`-th exchange of a session, if any.
pub fn consistency_bonus(exchange_count: u64) -> Option<Reward> {
    (exchange_count > 0 && exchange_count % CONSISTENCY_INTERVAL == 0)
        .then_some(Reward::ConsistentReflection)
}

/// All rewards owed for one exchange, primary first.
pub fn rewards_for_exchange(text: &str, exchange_count: u64) -> Vec<Reward> {
    let mut rewards = vec![score_message(text)];
    rewards.extend(consistency_bonus(exchange_count));
    rewards
}

fn mentions_emotion(text: &str) -> bool {
    let lowered = text.to_lowercase();
    EMOTIONAL_KEYWORDS.iter().any(|kw| lowered.contains(kw))
}
