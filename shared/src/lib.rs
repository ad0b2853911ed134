mod counts;
pub mod score;

#[cfg(feature = "client")]
pub mod leetcode;

pub use counts::*;
pub use score::{breakdown, delta_score, weighted_score, ScoreBreakdown, ScoringMode, TierPoints};
