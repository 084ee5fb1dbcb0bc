//! Progression data model: [`ProgressState`] and its append-only [`Milestone`] log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default experience quantum per level.
pub const DEFAULT_NEXT_LEVEL_AT: u32 = 100;

/// One recorded experience award.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub reason: String,
    pub experience_awarded: u32,
    pub timestamp: DateTime<Utc>,
}

/// Level and experience totals.
///
/// `level == experience / next_level_at + 1` holds after every update made by
/// the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressState {
    pub level: u32,
    pub experience: u32,
    pub next_level_at: u32,
    pub milestones: Vec<Milestone>,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::new(DEFAULT_NEXT_LEVEL_AT)
    }
}

impl ProgressState {
    /// Fresh level-1 state. A zero threshold is treated as 1.
    pub fn new(next_level_at: u32) -> Self {
        Self {
            level: 1,
            experience: 0,
            next_level_at: next_level_at.max(1),
            milestones: Vec::new(),
        }
    }

    /// Level implied by `experience` under the constant threshold.
    pub fn level_for(experience: u32, next_level_at: u32) -> u32 {
        experience / next_level_at.max(1) + 1
    }

    /// How far into the current level, in percent `[0, 100)`.
    pub fn percent_into_level(&self) -> f64 {
        let quantum = self.next_level_at.max(1);
        f64::from(self.experience % quantum) / f64::from(quantum) * 100.0
    }

    /// Re-derive `level` from `experience`, repairing a hand-edited or stale cache.
    pub fn normalized(mut self) -> Self {
        self.next_level_at = self.next_level_at.max(1);
        self.level = Self::level_for(self.experience, self.next_level_at);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state() {
        let state = ProgressState::default();
        assert_eq!(state.level, 1);
        assert_eq!(state.experience, 0);
        assert_eq!(state.next_level_at, 100);
        assert!(state.milestones.is_empty());
    }

    #[test]
    fn percent_into_level_wraps_per_level() {
        let mut state = ProgressState::default();
        state.experience = 125;
        assert!((state.percent_into_level() - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn normalized_repairs_level() {
        let state = ProgressState {
            level: 7,
            experience: 250,
            next_level_at: 100,
            milestones: vec![],
        }
        .normalized();
        assert_eq!(state.level, 3);
    }
}
