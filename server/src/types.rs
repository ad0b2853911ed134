use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{breakdown, ScoringMode, TierPoints};
use utoipa::ToSchema;

use crate::db::types::Account;

pub const MAX_NAME_LENGTH: usize = 50;

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    pub message: String,
    pub version: String,
    pub docs: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
    pub success: bool,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: true,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub detail: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct LeaderboardEntry {
    pub rank: i64,
    pub id: i32,
    pub username: String,
    pub leetcode_username: String,
    pub easy_count: i32,
    pub medium_count: i32,
    pub hard_count: i32,
    pub score: i32,
    pub last_updated: DateTime<Utc>,
}

impl LeaderboardEntry {
    pub fn new(rank: i64, account: Account) -> Self {
        Self {
            rank,
            id: account.id,
            username: account.display_name,
            leetcode_username: account.identifier,
            easy_count: account.easy_count,
            medium_count: account.medium_count,
            hard_count: account.hard_count,
            score: account.score,
            last_updated: account.last_updated,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct LeaderboardResponse {
    pub total_users: i64,
    pub last_global_update: Option<DateTime<Utc>>,
    pub entries: Vec<LeaderboardEntry>,
}

impl LeaderboardResponse {
    /// Ranks are 1-based and continue across pages.
    pub fn new(
        total_users: i64,
        last_global_update: Option<DateTime<Utc>>,
        offset: i64,
        accounts: Vec<Account>,
    ) -> Self {
        let entries = accounts
            .into_iter()
            .zip(offset + 1..)
            .map(|(account, rank)| LeaderboardEntry::new(rank, account))
            .collect();
        Self {
            total_users,
            last_global_update,
            entries,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AccountResponse {
    pub id: i32,
    pub username: String,
    pub leetcode_username: String,
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

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            username: account.display_name,
            leetcode_username: account.identifier,
            easy_count: account.easy_count,
            medium_count: account.medium_count,
            hard_count: account.hard_count,
            baseline_easy: account.baseline_easy,
            baseline_medium: account.baseline_medium,
            baseline_hard: account.baseline_hard,
            score: account.score,
            last_updated: account.last_updated,
            created_at: account.created_at,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema)]
pub struct TierPointsResponse {
    pub count: u32,
    pub multiplier: u32,
    pub points: u32,
}

impl From<TierPoints> for TierPointsResponse {
    fn from(points: TierPoints) -> Self {
        Self {
            count: points.count,
            multiplier: points.multiplier,
            points: points.points,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct BreakdownResponse {
    pub id: i32,
    pub username: String,
    pub leetcode_username: String,
    /// `delta` or `total`.
    pub mode: String,
    pub easy: TierPointsResponse,
    pub medium: TierPointsResponse,
    pub hard: TierPointsResponse,
    pub total_score: u32,
}

impl BreakdownResponse {
    pub fn new(account: Account, mode: ScoringMode) -> Self {
        let counts = mode.scored_counts(&account.current_counts(), &account.baseline_counts());
        let result = breakdown(&counts);
        Self {
            id: account.id,
            username: account.display_name,
            leetcode_username: account.identifier,
            mode: mode.to_string(),
            easy: result.easy.into(),
            medium: result.medium.into(),
            hard: result.hard.into(),
            total_score: result.total_score,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateAccountRequest {
    pub username: String,
    pub leetcode_username: String,
}

impl CreateAccountRequest {
    /// Trimmed `(username, leetcode_username)`, or a message naming the
    /// offending field.
    pub fn validate(&self) -> Result<(String, String), String> {
        let username = validate_name("username", &self.username)?;
        let leetcode_username = validate_name("leetcode_username", &self.leetcode_username)?;
        Ok((username, leetcode_username))
    }
}

fn validate_name(field: &str, value: &str) -> Result<String, String> {
    let value = value.trim();
    let length = value.chars().count();
    if length == 0 || length > MAX_NAME_LENGTH {
        return Err(format!("{field} must be between 1 and {MAX_NAME_LENGTH} characters"));
    }
    Ok(value.to_string())
}
