use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::SolvedCounts;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub id: i32,
    pub display_name: String,
    pub identifier: String,
    pub easy_count: i32,
    pub medium_count: i32,
    pub hard_count: i32,
    pub baseline_easy: i32,
    pub baseline_medium: i32,
    pub baseline_hard: i32,
    pub score: i32,
    pub last_updated: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn current_counts(&self) -> SolvedCounts {
        SolvedCounts::new(
            self.easy_count.max(0) as u32,
            self.medium_count.max(0) as u32,
            self.hard_count.max(0) as u32,
        )
    }

    pub fn baseline_counts(&self) -> SolvedCounts {
        SolvedCounts::new(
            self.baseline_easy.max(0) as u32,
            self.baseline_medium.max(0) as u32,
            self.baseline_hard.max(0) as u32,
        )
    }
}

/// Counts and scores are stored as `INTEGER`; anything wider is rejected
/// rather than wrapped.
pub fn to_column(value: u32) -> anyhow::Result<i32> {
    i32::try_from(value).map_err(|_| anyhow::anyhow!("{value} does not fit in an INTEGER column"))
}

/// A freshly tracked account: its first fetched counts are both current and
/// baseline, so it starts with a zero score.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub display_name: String,
    pub identifier: String,
    pub counts: SolvedCounts,
    pub created_at: DateTime<Utc>,
}
