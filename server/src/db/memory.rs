use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
};

use chrono::{DateTime, Utc};
use shared::SolvedCounts;

use super::{
    types::{to_column, Account, NewAccount},
    AccountStore,
};

/// In-process store for exercising the refresh pipeline without Postgres.
#[derive(Default)]
pub(crate) struct MemoryStore {
    accounts: Mutex<Vec<Account>>,
    failing_writes: Mutex<HashSet<i32>>,
    failing_reads: AtomicBool,
}

impl MemoryStore {
    pub fn with_accounts(accounts: Vec<Account>) -> Self {
        Self {
            accounts: Mutex::new(accounts),
            failing_writes: Default::default(),
            failing_reads: AtomicBool::new(false),
        }
    }

    /// Makes every bulk load fail.
    pub fn fail_reads(&self) {
        self.failing_reads.store(true, Ordering::SeqCst);
    }

    /// Makes every write to account `id` fail.
    pub fn fail_writes_for(&self, id: i32) {
        self.failing_writes.lock().unwrap().insert(id);
    }

    pub fn get(&self, id: i32) -> Option<Account> {
        self.accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == id)
            .cloned()
    }

    fn write<F: FnOnce(&mut Account)>(&self, id: i32, f: F) -> anyhow::Result<bool> {
        if self.failing_writes.lock().unwrap().contains(&id) {
            anyhow::bail!("write rejected for account {id}");
        }
        let mut accounts = self.accounts.lock().unwrap();
        Ok(match accounts.iter_mut().find(|a| a.id == id) {
            Some(account) => {
                f(account);
                true
            }
            None => false,
        })
    }
}

pub(crate) fn account(
    id: i32,
    identifier: &str,
    current: SolvedCounts,
    baseline: SolvedCounts,
) -> Account {
    let created_at = DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default();
    Account {
        id,
        display_name: identifier.to_uppercase(),
        identifier: identifier.to_string(),
        easy_count: current.easy as i32,
        medium_count: current.medium as i32,
        hard_count: current.hard as i32,
        baseline_easy: baseline.easy as i32,
        baseline_medium: baseline.medium as i32,
        baseline_hard: baseline.hard as i32,
        score: 0,
        last_updated: created_at,
        created_at,
    }
}

#[async_trait::async_trait]
impl AccountStore for MemoryStore {
    async fn find_all(&self, limit: i64) -> anyhow::Result<Vec<Account>> {
        if self.failing_reads.load(Ordering::SeqCst) {
            anyhow::bail!("accounts table is unavailable");
        }
        let mut accounts = self.accounts.lock().unwrap().clone();
        accounts.sort_by_key(|a| a.id);
        accounts.truncate(limit.max(0) as usize);
        Ok(accounts)
    }

    async fn find_by_id(&self, id: i32) -> anyhow::Result<Option<Account>> {
        Ok(self.get(id))
    }

    async fn find_by_identifier(&self, identifier: &str) -> anyhow::Result<Option<Account>> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.identifier == identifier)
            .cloned())
    }

    async fn insert(&self, new: NewAccount) -> anyhow::Result<Option<Account>> {
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.iter().any(|a| a.identifier == new.identifier) {
            return Ok(None);
        }
        for count in [new.counts.easy, new.counts.medium, new.counts.hard] {
            to_column(count)?;
        }
        let id = accounts.iter().map(|a| a.id).max().unwrap_or(0) + 1;
        let mut record = account(id, &new.identifier, new.counts, new.counts);
        record.display_name = new.display_name;
        record.created_at = new.created_at;
        record.last_updated = new.created_at;
        accounts.push(record.clone());
        Ok(Some(record))
    }

    async fn update_stats(
        &self,
        id: i32,
        current: SolvedCounts,
        score: u32,
        updated_at: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        let (easy, medium, hard, score) = (
            to_column(current.easy)?,
            to_column(current.medium)?,
            to_column(current.hard)?,
            to_column(score)?,
        );
        self.write(id, |a| {
            a.easy_count = easy;
            a.medium_count = medium;
            a.hard_count = hard;
            a.score = score;
            a.last_updated = updated_at;
        })
    }

    async fn reset_baseline(
        &self,
        id: i32,
        counts: SolvedCounts,
        updated_at: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        let (easy, medium, hard) = (
            to_column(counts.easy)?,
            to_column(counts.medium)?,
            to_column(counts.hard)?,
        );
        self.write(id, |a| {
            a.easy_count = easy;
            a.medium_count = medium;
            a.hard_count = hard;
            a.baseline_easy = easy;
            a.baseline_medium = medium;
            a.baseline_hard = hard;
            a.score = 0;
            a.last_updated = updated_at;
        })
    }

    async fn delete(&self, id: i32) -> anyhow::Result<bool> {
        let mut accounts = self.accounts.lock().unwrap();
        let before = accounts.len();
        accounts.retain(|a| a.id != id);
        Ok(accounts.len() < before)
    }

    async fn count(&self) -> anyhow::Result<i64> {
        Ok(self.accounts.lock().unwrap().len() as i64)
    }

    async fn latest_update(&self) -> anyhow::Result<Option<DateTime<Utc>>> {
        Ok(self.accounts.lock().unwrap().iter().map(|a| a.last_updated).max())
    }

    async fn leaderboard(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<Account>> {
        let mut accounts = self.accounts.lock().unwrap().clone();
        accounts.sort_by(|a, b| b.score.cmp(&a.score).then(a.id.cmp(&b.id)));
        Ok(accounts
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }
}
