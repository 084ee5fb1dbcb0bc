//! Edge-triggered "save your progress" prompt.

/// Two-state latch for the signup prompt.
///
/// Fires on the first observation where the condition holds, then stays quiet
/// until the condition has been observed false again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignupLatch {
    #[default]
    Armed,
    Fired,
}

impl SignupLatch {
    /// Feed the current condition. Returns `true` exactly on a rising edge.
    pub fn observe(&mut self, condition: bool) -> bool {
        match (*self, condition) {
            (Self::Armed, true) => {
                *self = Self::Fired;
                true
            }
            (Self::Fired, false) => {
                *self = Self::Armed;
                false
            }
            _ => false,
        }
    }

    pub fn rearm(&mut self) {
        *self = Self::Armed;
    }
}

/// Whether an award leaves the user in signup-prompt territory.
pub fn signup_condition(level: u32, percent_into_level: f64, authenticated: bool, threshold_percent: u32) -> bool {
    !authenticated && level == 1 && percent_into_level >= f64::from(threshold_percent)
}
