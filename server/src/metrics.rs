use rocket_prometheus::prometheus::{IntCounterVec, Opts, Registry};

use crate::refresh::Outcome;

/// What started a bulk run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Scheduled,
    Manual,
    Background,
}

impl Trigger {
    fn as_str(&self) -> &'static str {
        match self {
            Trigger::Scheduled => "scheduled",
            Trigger::Manual => "manual",
            Trigger::Background => "background",
        }
    }
}

/// Counters for bulk refresh and reset runs, exported on `/metrics`.
#[derive(Clone)]
pub struct RefreshMetrics {
    accounts: IntCounterVec,
    runs: IntCounterVec,
}

impl RefreshMetrics {
    pub fn new() -> anyhow::Result<Self> {
        let accounts = IntCounterVec::new(
            Opts::new(
                "leaderboard_refresh_accounts_total",
                "Accounts processed by bulk runs",
            ),
            &["result"],
        )?;
        let runs = IntCounterVec::new(
            Opts::new("leaderboard_refresh_runs_total", "Bulk runs started"),
            &["trigger"],
        )?;
        Ok(Self { accounts, runs })
    }

    pub fn register(&self, registry: &Registry) -> anyhow::Result<()> {
        registry.register(Box::new(self.accounts.clone()))?;
        registry.register(Box::new(self.runs.clone()))?;
        Ok(())
    }

    pub fn observe(&self, trigger: Trigger, outcome: &Outcome) {
        self.runs.with_label_values(&[trigger.as_str()]).inc();
        self.accounts
            .with_label_values(&["updated"])
            .inc_by(outcome.updated_count as u64);
        self.accounts
            .with_label_values(&["failed"])
            .inc_by(outcome.failed_count as u64);
    }
}
