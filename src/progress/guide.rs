//! Level titles shown alongside the progress bar.

pub const LEVEL_TITLES: [&str; 5] = [
    "Beginning the Journey",
    "Opening Up",
    "Building Trust",
    "Deep Connection",
    "Inner Child Harmony",
];

/// Title for `level`. Levels past the last title keep the last one.
pub fn level_title(level: u32) -> &'static str {
    let idx = (level.max(1) as usize - 1).min(LEVEL_TITLES.len() - 1);
    LEVEL_TITLES[idx]
}
