pub mod guide;
pub mod scoring;
pub mod signup;
pub mod tracker;
pub mod types;

pub use tracker::{Award, ProgressError, ProgressTracker};
pub use types::{Milestone, ProgressState};
