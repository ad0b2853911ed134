use std::time::Duration;

use serde::Deserialize;
use shared::{
    leetcode::{DEFAULT_GRAPHQL_URL, DEFAULT_RATE_LIMIT_DELAY, DEFAULT_TIMEOUT},
    ScoringMode,
};

use crate::refresh::{RefreshOptions, DEFAULT_BATCH_LIMIT};

const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173,http://localhost:3000";

/// Process configuration, read from the environment (and `.env`).
#[derive(Debug, Clone, Deserialize)]
pub struct Env {
    pub admin_token: String,
    #[serde(default = "default_graphql_url")]
    pub leetcode_graphql_url: String,
    #[serde(default = "default_rate_limit_delay")]
    pub rate_limit_delay_in_millis: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_in_secs: u64,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_in_minutes: u64,
    #[serde(default = "default_true")]
    pub refresh_enabled: bool,
    #[serde(default = "default_batch_limit")]
    pub refresh_batch_limit: i64,
    #[serde(default)]
    pub scoring_mode: ScoringMode,
    pub cors_origins: Option<String>,
}

fn default_graphql_url() -> String {
    DEFAULT_GRAPHQL_URL.to_string()
}

fn default_rate_limit_delay() -> u64 {
    DEFAULT_RATE_LIMIT_DELAY.as_millis() as u64
}

fn default_request_timeout() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_refresh_interval() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

fn default_batch_limit() -> i64 {
    DEFAULT_BATCH_LIMIT
}

impl Env {
    pub fn refresh_options(&self) -> RefreshOptions {
        RefreshOptions {
            mode: self.scoring_mode,
            delay: Duration::from_millis(self.rate_limit_delay_in_millis),
            batch_limit: self.refresh_batch_limit.max(0),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_in_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_in_minutes.max(1) * 60)
    }

    /// `None` means any origin is allowed.
    pub fn cors_origins(&self) -> Option<Vec<String>> {
        let raw = self.cors_origins.as_deref().unwrap_or(DEFAULT_CORS_ORIGINS);
        let origins: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect();
        if origins.iter().any(|o| o == "*") {
            None
        } else {
            Some(origins)
        }
    }
}

/// Shared secret expected in the `X-Admin-Token` header.
pub struct AdminToken(pub String);
