//! Stats refresh pipeline.
//!
//! Pulls current counts for tracked accounts, rescores them against their
//! baselines and writes the result back. Bulk runs are best-effort: every
//! account is attempted and failures are tallied in an [`Outcome`] instead of
//! aborting the run. Nothing is retried within a run; the next scheduled or
//! manual run picks failed accounts up again.

use std::{collections::HashMap, time::Duration};

use chrono::Utc;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use shared::{
    leetcode::{fetch_many, StatsSource, DEFAULT_RATE_LIMIT_DELAY},
    ScoringMode, StatsResult,
};
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;

use crate::db::{
    types::{to_column, Account, NewAccount},
    AccountStore,
};

pub const DEFAULT_BATCH_LIMIT: i64 = 1000;

#[derive(Debug, Clone)]
pub struct RefreshOptions {
    pub mode: ScoringMode,
    /// Pause between consecutive upstream lookups in a bulk run.
    pub delay: Duration,
    /// Upper bound on accounts loaded by a bulk run.
    pub batch_limit: i64,
}

impl Default for RefreshOptions {
    fn default() -> Self {
        Self {
            mode: ScoringMode::Delta,
            delay: DEFAULT_RATE_LIMIT_DELAY,
            batch_limit: DEFAULT_BATCH_LIMIT,
        }
    }
}

/// Result of a single-account refresh or reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshStatus {
    Success(Account),
    NotFound,
    FetchFailed,
}

/// Summary of a bulk run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Outcome {
    pub success: bool,
    pub updated_count: u32,
    pub failed_count: u32,
    pub errors: Vec<String>,
}

impl Outcome {
    fn updated(&mut self) {
        self.updated_count += 1;
    }

    fn failed(&mut self, message: String) {
        self.failed_count += 1;
        self.errors.push(message);
    }

    fn finish(mut self) -> Self {
        self.success = self.failed_count == 0;
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CreateError {
    #[error("account is already tracked")]
    AlreadyExists,
    #[error("could not fetch initial stats")]
    FetchFailed,
    #[error("storage error: {0}")]
    Storage(anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Refresh,
    ResetBaseline,
}

impl Action {
    fn as_str(&self) -> &'static str {
        match self {
            Action::Refresh => "refresh",
            Action::ResetBaseline => "reset",
        }
    }
}

/// Writes fetched stats for one account. `Ok(None)` means the account no
/// longer exists.
async fn apply<S>(
    store: &S,
    account: &Account,
    stats: &StatsResult,
    action: Action,
    mode: ScoringMode,
) -> anyhow::Result<Option<Account>>
where
    S: AccountStore + ?Sized,
{
    let now = Utc::now();
    let counts = stats.counts;
    let mut updated = account.clone();
    updated.easy_count = to_column(counts.easy)?;
    updated.medium_count = to_column(counts.medium)?;
    updated.hard_count = to_column(counts.hard)?;
    updated.last_updated = now;

    let written = match action {
        Action::Refresh => {
            let score = mode.score(&counts, &account.baseline_counts());
            updated.score = to_column(score)?;
            store.update_stats(account.id, counts, score, now).await?
        }
        Action::ResetBaseline => {
            updated.baseline_easy = updated.easy_count;
            updated.baseline_medium = updated.medium_count;
            updated.baseline_hard = updated.hard_count;
            updated.score = 0;
            store.reset_baseline(account.id, counts, now).await?
        }
    };

    Ok(written.then_some(updated))
}

async fn run_one<S, C>(
    store: &S,
    source: &C,
    options: &RefreshOptions,
    id: i32,
    action: Action,
) -> anyhow::Result<RefreshStatus>
where
    S: AccountStore + ?Sized,
    C: StatsSource + ?Sized,
{
    let Some(account) = store.find_by_id(id).await? else {
        return Ok(RefreshStatus::NotFound);
    };

    let Some(stats) = source.fetch(&account.identifier).await else {
        warn!("Failed to fetch stats for {}", account.identifier);
        return Ok(RefreshStatus::FetchFailed);
    };

    Ok(match apply(store, &account, &stats, action, options.mode).await? {
        Some(updated) => RefreshStatus::Success(updated),
        None => RefreshStatus::NotFound,
    })
}

async fn run_all<S, C>(
    store: &S,
    source: &C,
    options: &RefreshOptions,
    action: Action,
) -> Outcome
where
    S: AccountStore + ?Sized,
    C: StatsSource + ?Sized,
{
    let accounts = match store.find_all(options.batch_limit).await {
        Ok(accounts) => accounts,
        Err(e) => {
            error!("Failed to load accounts for {}: {e:#}", action.as_str());
            return Outcome {
                success: false,
                errors: vec![format!("Failed to load accounts: {e}")],
                ..Default::default()
            };
        }
    };
    if options.batch_limit > 0 && accounts.len() as i64 >= options.batch_limit {
        warn!(
            "Loaded {} accounts, the batch limit; any further accounts are skipped",
            options.batch_limit
        );
    }

    let identifiers: Vec<String> = accounts
        .iter()
        .map(|a| a.identifier.clone())
        .unique()
        .collect();
    let fetched: HashMap<String, Option<StatsResult>> =
        fetch_many(source, &identifiers, options.delay).await;

    let mut outcome = Outcome::default();
    for account in &accounts {
        let Some(Some(stats)) = fetched.get(&account.identifier) else {
            outcome.failed(format!("Failed to fetch stats for {}", account.identifier));
            continue;
        };

        match apply(store, account, stats, action, options.mode).await {
            Ok(Some(_)) => outcome.updated(),
            Ok(None) => {
                warn!("Account {} was removed during the run", account.identifier);
                outcome.failed(format!("Account {} no longer exists", account.identifier));
            }
            Err(e) => {
                error!("Failed to store stats for {}: {e:#}", account.identifier);
                outcome.failed(format!(
                    "Failed to store stats for {}: {e}",
                    account.identifier
                ));
            }
        }
    }

    let outcome = outcome.finish();
    info!(
        "Finished {} of {} accounts: {} updated, {} failed",
        action.as_str(),
        accounts.len(),
        outcome.updated_count,
        outcome.failed_count
    );
    outcome
}

/// Fetches fresh counts for one account and rescores it.
#[instrument(skip(store, source, options))]
pub async fn refresh_one<S, C>(
    store: &S,
    source: &C,
    options: &RefreshOptions,
    id: i32,
) -> anyhow::Result<RefreshStatus>
where
    S: AccountStore + ?Sized,
    C: StatsSource + ?Sized,
{
    run_one(store, source, options, id, Action::Refresh).await
}

/// Refreshes every tracked account, up to the batch limit.
#[instrument(skip_all)]
pub async fn refresh_all<S, C>(store: &S, source: &C, options: &RefreshOptions) -> Outcome
where
    S: AccountStore + ?Sized,
    C: StatsSource + ?Sized,
{
    run_all(store, source, options, Action::Refresh).await
}

/// Moves the baseline of one account up to its freshly fetched counts.
#[instrument(skip(store, source, options))]
pub async fn reset_one<S, C>(
    store: &S,
    source: &C,
    options: &RefreshOptions,
    id: i32,
) -> anyhow::Result<RefreshStatus>
where
    S: AccountStore + ?Sized,
    C: StatsSource + ?Sized,
{
    run_one(store, source, options, id, Action::ResetBaseline).await
}

#[instrument(skip_all)]
pub async fn reset_all<S, C>(store: &S, source: &C, options: &RefreshOptions) -> Outcome
where
    S: AccountStore + ?Sized,
    C: StatsSource + ?Sized,
{
    run_all(store, source, options, Action::ResetBaseline).await
}

/// Starts tracking an account. The initial lookup establishes the baseline,
/// so an account whose stats cannot be fetched is never stored.
#[instrument(skip(store, source))]
pub async fn create_account<S, C>(
    store: &S,
    source: &C,
    display_name: &str,
    identifier: &str,
) -> Result<Account, CreateError>
where
    S: AccountStore + ?Sized,
    C: StatsSource + ?Sized,
{
    if store
        .find_by_identifier(identifier)
        .await
        .map_err(CreateError::Storage)?
        .is_some()
    {
        return Err(CreateError::AlreadyExists);
    }

    let Some(stats) = source.fetch(identifier).await else {
        warn!("Not tracking {identifier}: initial stats fetch failed");
        return Err(CreateError::FetchFailed);
    };

    let account = NewAccount {
        display_name: display_name.to_string(),
        identifier: identifier.to_string(),
        counts: stats.counts,
        created_at: Utc::now(),
    };
    match store.insert(account).await.map_err(CreateError::Storage)? {
        Some(account) => {
            info!("Started tracking {identifier}");
            Ok(account)
        }
        None => Err(CreateError::AlreadyExists),
    }
}
