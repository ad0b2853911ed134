//! Leaderboard scoring.
//!
//! A tier is worth its multiplier per solved problem (easy 1, medium 2,
//! hard 3). Tracked accounts are scored on progress since their baseline,
//! never on lifetime totals, unless the deployment opts into
//! [`ScoringMode::Total`].

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{SolvedCounts, Tier};

/// `low*1 + mid*2 + high*3`, saturating at `u32::MAX`.
pub fn weighted_score(low: u32, mid: u32, high: u32) -> u32 {
    TierPoints::new(Tier::Easy, low)
        .points
        .saturating_add(TierPoints::new(Tier::Medium, mid).points)
        .saturating_add(TierPoints::new(Tier::Hard, high).points)
}

/// Weighted score of `max(0, current - baseline)` per tier.
pub fn delta_score(current: &SolvedCounts, baseline: &SolvedCounts) -> u32 {
    let delta = current.delta(baseline);
    weighted_score(delta.easy, delta.medium, delta.hard)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierPoints {
    pub count: u32,
    pub multiplier: u32,
    pub points: u32,
}

impl TierPoints {
    fn new(tier: Tier, count: u32) -> Self {
        let multiplier = tier.multiplier();
        Self {
            count,
            multiplier,
            points: count.saturating_mul(multiplier),
        }
    }
}

/// Per-tier view of how a score was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub easy: TierPoints,
    pub medium: TierPoints,
    pub hard: TierPoints,
    pub total_score: u32,
}

pub fn breakdown(counts: &SolvedCounts) -> ScoreBreakdown {
    let easy = TierPoints::new(Tier::Easy, counts.easy);
    let medium = TierPoints::new(Tier::Medium, counts.medium);
    let hard = TierPoints::new(Tier::Hard, counts.hard);
    ScoreBreakdown {
        easy,
        medium,
        hard,
        total_score: easy
            .points
            .saturating_add(medium.points)
            .saturating_add(hard.points),
    }
}

/// Which counts feed the score.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ScoringMode {
    /// Progress since the baseline.
    #[default]
    Delta,
    /// Lifetime totals reported upstream, baseline ignored.
    Total,
}

impl ScoringMode {
    pub fn scored_counts(&self, current: &SolvedCounts, baseline: &SolvedCounts) -> SolvedCounts {
        match self {
            ScoringMode::Delta => current.delta(baseline),
            ScoringMode::Total => *current,
        }
    }

    pub fn score(&self, current: &SolvedCounts, baseline: &SolvedCounts) -> u32 {
        let counts = self.scored_counts(current, baseline);
        weighted_score(counts.easy, counts.medium, counts.hard)
    }
}
