//! The progression tracker — the only writer of [`ProgressState`].
//!
//! [`ProgressTracker::award_experience`] applies one award: add experience,
//! re-derive the level, append a milestone, and run the signup latch. Each
//! award is computed on a copy and swapped in whole.

use chrono::Utc;
use thiserror::Error;

use super::scoring::rewards_for_exchange;
use super::signup::{signup_condition, SignupLatch};
use super::types::{Milestone, ProgressState};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProgressError {
    #[error("experience awards must be positive")]
    ZeroAmount,
}

/// Outcome of a single award.
#[derive(Debug, Clone, PartialEq)]
pub struct Award {
    pub milestone: Milestone,
    pub previous_level: u32,
    pub level: u32,
    pub experience: u32,
    /// The signup prompt should be shown now.
    pub signup_prompt: bool,
}

impl Award {
    pub fn leveled_up(&self) -> bool {
        self.level > self.previous_level
    }
}

#[derive(Debug, Clone)]
pub struct ProgressTracker {
    state: ProgressState,
    latch: SignupLatch,
    signup_threshold_percent: u32,
}

impl ProgressTracker {
    pub fn new(state: ProgressState, signup_threshold_percent: u32) -> Self {
        Self {
            state: state.normalized(),
            latch: SignupLatch::default(),
            signup_threshold_percent,
        }
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    pub fn latch(&self) -> SignupLatch {
        self.latch
    }

    /// Add `amount` experience for `reason`.
    ///
    /// `authenticated` gates the signup prompt; it only fires while anonymous.
    pub fn award_experience(
        &mut self,
        amount: u32,
        reason: &str,
        authenticated: bool,
    ) -> Result<Award, ProgressError> {
        if amount == 0 {
            return Err(ProgressError::ZeroAmount);
        }

        let mut next = self.state.clone();
        let previous_level = next.level;

        next.experience = next.experience.saturating_add(amount);
        next.level = ProgressState::level_for(next.experience, next.next_level_at);
        let milestone = Milestone {
            reason: reason.to_string(),
            experience_awarded: amount,
            timestamp: Utc::now(),
        };
        next.milestones.push(milestone.clone());

        let condition = signup_condition(
            next.level,
            next.percent_into_level(),
            authenticated,
            self.signup_threshold_percent,
        );
        let signup_prompt = self.latch.observe(condition);

        let award = Award {
            milestone,
            previous_level,
            level: next.level,
            experience: next.experience,
            signup_prompt,
        };
        self.state = next;

        if award.leveled_up() {
            tracing::info!(level = award.level, experience = award.experience, "level up");
        }
        if signup_prompt {
            tracing::info!(experience = award.experience, "signup prompt triggered");
        }
        tracing::debug!(amount, reason, experience = award.experience, "experience awarded");

        Ok(award)
    }

    /// Score a completed exchange and apply every reward it earns.
    ///
    /// `exchange_count` is the 1-based count of completed exchanges this session.
    pub fn record_exchange(
        &mut self,
        message: &str,
        exchange_count: u64,
        authenticated: bool,
    ) -> Vec<Award> {
        rewards_for_exchange(message, exchange_count)
            .into_iter()
            .filter_map(|reward| {
                self.award_experience(reward.points(), reward.reason(), authenticated)
                    .ok()
            })
            .collect()
    }

    /// Replace the state wholesale (e.g. adopting a remote copy).
    pub fn replace(&mut self, state: ProgressState) {
        self.state = state.normalized();
    }

    /// Back to level 1 with no milestones, keeping the configured threshold.
    pub fn reset(&mut self) {
        self.state = ProgressState::new(self.state.next_level_at);
        self.latch.rearm();
    }
}
