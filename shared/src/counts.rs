use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// Difficulty bucket of a solved problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Tier {
    Easy,
    Medium,
    Hard,
}

impl Tier {
    /// Maps an upstream difficulty label onto a tier, ignoring case.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "easy" => Some(Tier::Easy),
            "medium" => Some(Tier::Medium),
            "hard" => Some(Tier::Hard),
            _ => None,
        }
    }

    pub const fn multiplier(&self) -> u32 {
        match self {
            Tier::Easy => 1,
            Tier::Medium => 2,
            Tier::Hard => 3,
        }
    }
}

/// Solved-problem counts per tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SolvedCounts {
    pub easy: u32,
    pub medium: u32,
    pub hard: u32,
}

impl SolvedCounts {
    pub const fn new(easy: u32, medium: u32, hard: u32) -> Self {
        Self { easy, medium, hard }
    }

    pub fn set(&mut self, tier: Tier, count: u32) {
        match tier {
            Tier::Easy => self.easy = count,
            Tier::Medium => self.medium = count,
            Tier::Hard => self.hard = count,
        }
    }

    /// Progress since `baseline`. A tier whose baseline exceeds the current
    /// count contributes zero rather than going negative.
    pub fn delta(&self, baseline: &SolvedCounts) -> SolvedCounts {
        SolvedCounts {
            easy: self.easy.saturating_sub(baseline.easy),
            medium: self.medium.saturating_sub(baseline.medium),
            hard: self.hard.saturating_sub(baseline.hard),
        }
    }
}

/// Payload of one successful upstream lookup.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatsResult {
    pub counts: SolvedCounts,
    pub total_solved: Option<u32>,
    pub ranking: Option<u64>,
}

impl StatsResult {
    pub fn new(counts: SolvedCounts) -> Self {
        Self {
            counts,
            total_solved: None,
            ranking: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn tier_labels_are_case_insensitive() {
        assert_eq!(Tier::from_label("Easy"), Some(Tier::Easy));
        assert_eq!(Tier::from_label("MEDIUM"), Some(Tier::Medium));
        assert_eq!(Tier::from_label("hard"), Some(Tier::Hard));
        assert_eq!(Tier::from_label("All"), None);
        assert_eq!(Tier::from_label(""), None);
    }

    #[test]
    fn tiers_iterate_in_weight_order() {
        let multipliers: Vec<u32> = Tier::iter().map(|t| t.multiplier()).collect();
        assert_eq!(multipliers, vec![1, 2, 3]);
        assert_eq!(Tier::Medium.to_string(), "medium");
    }

    #[test]
    fn delta_clamps_each_tier_at_zero() {
        let current = SolvedCounts::new(10, 3, 7);
        let baseline = SolvedCounts::new(4, 5, 7);
        assert_eq!(current.delta(&baseline), SolvedCounts::new(6, 0, 0));
    }
}
