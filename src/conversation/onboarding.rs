//! Onboarding wizard — the seven steps that produce a [`Profile`].
//!
//! Welcome → Name → Story → Connection → Feelings → Needs → Begin. Sharing the
//! story asks the completion provider for a first reply from the younger self
//! (the "echo") before the wizard moves on to Connection.

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::prompt::{compose_echo, ECHO_FALLBACK};
use super::types::Profile;
use crate::completion::{ChatMessage, CompletionProvider, CompletionRequest};

/// The five-point feeling scale, saddest first.
pub const FEELING_SCALE: [&str; 5] = ["😢", "😔", "😐", "😊", "🥰"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnboardingStep {
    Welcome,
    Name,
    Story,
    Connection,
    Feelings,
    Needs,
    Begin,
}

impl OnboardingStep {
    pub const ALL: [OnboardingStep; 7] = [
        Self::Welcome,
        Self::Name,
        Self::Story,
        Self::Connection,
        Self::Feelings,
        Self::Needs,
        Self::Begin,
    ];

    /// 1-based position in the wizard.
    pub fn position(&self) -> usize {
        Self::ALL
            .iter()
            .position(|s| s == self)
            .map(|i| i + 1)
            .unwrap_or(1)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Welcome => "Welcome",
            Self::Name => "Name",
            Self::Story => "Story",
            Self::Connection => "Connection",
            Self::Feelings => "Feelings",
            Self::Needs => "Needs",
            Self::Begin => "Begin",
        }
    }

    /// The question shown to the user at this step.
    pub fn prompt(&self) -> &'static str {
        match self {
            Self::Welcome => "Welcome to Re:Birth. We help you reconnect with your younger self so you can heal and thrive.",
            Self::Name => "What's your first name or nickname?",
            Self::Story => "Share your childhood story: your earliest memories, experiences that left a lasting impact, how they made you feel then and how they still affect you today.",
            Self::Connection => "Your younger self wants to connect.",
            Self::Feelings => "How do you feel seeing your memory echoed back? 😢 😔 😐 😊 🥰 (or 1-5)",
            Self::Needs => "If you could give your younger self just one thing they truly needed, what would it be?",
            Self::Begin => "Ready to begin your healing journey?",
        }
    }

    fn next(&self) -> Self {
        let idx = self.position();
        Self::ALL.get(idx).copied().unwrap_or(Self::Begin)
    }
}

impl std::fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OnboardingError {
    #[error("an answer is required at the {0} step")]
    EmptyAnswer(OnboardingStep),
    #[error("unknown feeling `{0}`; pick one of 😢 😔 😐 😊 🥰 or 1-5")]
    UnknownFeeling(String),
    #[error("onboarding is still at the {0} step")]
    Incomplete(OnboardingStep),
}

/// In-progress answers. Consumed by [`Onboarding::finish`].
#[derive(Debug, Clone)]
pub struct Onboarding {
    step: OnboardingStep,
    name: String,
    memory: String,
    feeling: String,
    need: String,
    echo: Option<String>,
}

impl Default for Onboarding {
    fn default() -> Self {
        Self::new()
    }
}

impl Onboarding {
    pub fn new() -> Self {
        Self {
            step: OnboardingStep::Welcome,
            name: String::new(),
            memory: String::new(),
            feeling: String::new(),
            need: String::new(),
            echo: None,
        }
    }

    pub fn step(&self) -> OnboardingStep {
        self.step
    }

    /// Progress through the wizard, 0 at Welcome and 100 at Begin.
    pub fn percent_complete(&self) -> u32 {
        let steps = OnboardingStep::ALL.len() - 1;
        ((self.step.position() - 1) * 100 / steps) as u32
    }

    /// The younger self's reply to the shared story, once requested.
    pub fn echo(&self) -> Option<&str> {
        self.echo.as_deref()
    }

    /// Answer the current step and advance.
    ///
    /// Welcome, Connection, and Begin take no input. Answering Story waits for the
    /// echo from `completion` (or [`ECHO_FALLBACK`]) before moving to Connection.
    pub async fn answer(
        &mut self,
        input: &str,
        completion: &dyn CompletionProvider,
        temperature: f32,
    ) -> Result<OnboardingStep, OnboardingError> {
        let input = input.trim();
        match self.step {
            OnboardingStep::Welcome | OnboardingStep::Connection => {}
            OnboardingStep::Begin => return Ok(self.step),
            OnboardingStep::Name => self.name = non_empty(self.step, input)?,
            OnboardingStep::Story => {
                self.memory = non_empty(self.step, input)?;
                self.echo = Some(self.request_echo(completion, temperature).await);
            }
            OnboardingStep::Feelings => self.feeling = parse_feeling(input)?,
            OnboardingStep::Needs => self.need = non_empty(self.step, input)?,
        }

        self.step = self.step.next();
        tracing::debug!(step = %self.step, "onboarding advanced");
        Ok(self.step)
    }

    /// Produce the profile. Only valid at the Begin step.
    pub fn finish(self, now: DateTime<Utc>) -> Result<Profile, OnboardingError> {
        if self.step != OnboardingStep::Begin {
            return Err(OnboardingError::Incomplete(self.step));
        }
        Ok(Profile {
            name: self.name,
            core_memory: self.memory,
            stated_need: self.need,
            feeling_tag: self.feeling,
            first_interaction_at: now,
            last_interaction_at: now,
        })
    }

    async fn request_echo(&self, completion: &dyn CompletionProvider, temperature: f32) -> String {
        let (system, user) = compose_echo(&self.name, &self.memory);
        let request = CompletionRequest {
            system,
            messages: vec![ChatMessage::user(user)],
            temperature,
        };

        match completion.complete(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, "onboarding echo failed, using fallback");
                ECHO_FALLBACK.to_string()
            }
        }
    }
}

fn non_empty(step: OnboardingStep, input: &str) -> Result<String, OnboardingError> {
    if input.is_empty() {
        Err(OnboardingError::EmptyAnswer(step))
    } else {
        Ok(input.to_string())
    }
}

/// Accept a scale emoji or its 1-based position.
pub fn parse_feeling(input: &str) -> Result<String, OnboardingError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(OnboardingError::EmptyAnswer(OnboardingStep::Feelings));
    }
    if let Some(emoji) = FEELING_SCALE.iter().find(|e| **e == input) {
        return Ok(emoji.to_string());
    }
    match input.parse::<usize>() {
        Ok(n) if (1..=FEELING_SCALE.len()).contains(&n) => Ok(FEELING_SCALE[n - 1].to_string()),
        _ => Err(OnboardingError::UnknownFeeling(input.to_string())),
    }
}
