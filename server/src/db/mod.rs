use chrono::{DateTime, Utc};
use rocket::{
    fairing::{self, AdHoc},
    Build, Rocket,
};
use rocket_db_pools::Database;
use shared::SolvedCounts;
use sqlx::PgPool;
use tracing::instrument;

#[derive(Database, Clone, Debug)]
#[database("leaderboard")]
pub struct DB(PgPool);

#[cfg(test)]
pub(crate) mod memory;
pub mod types;

use types::{to_column, Account, NewAccount};

/// Persistence the refresh pipeline needs.
///
/// Every write targets a single account by id. Writes that return `false`
/// found no such account.
#[async_trait::async_trait]
pub trait AccountStore: Send + Sync {
    /// Accounts in stable (id) order, at most `limit` of them.
    async fn find_all(&self, limit: i64) -> anyhow::Result<Vec<Account>>;

    async fn find_by_id(&self, id: i32) -> anyhow::Result<Option<Account>>;

    async fn find_by_identifier(&self, identifier: &str) -> anyhow::Result<Option<Account>>;

    /// Returns `None` when the identifier is already tracked.
    async fn insert(&self, account: NewAccount) -> anyhow::Result<Option<Account>>;

    async fn update_stats(
        &self,
        id: i32,
        current: SolvedCounts,
        score: u32,
        updated_at: DateTime<Utc>,
    ) -> anyhow::Result<bool>;

    /// Sets both current and baseline counts to `counts` and zeroes the score.
    async fn reset_baseline(
        &self,
        id: i32,
        counts: SolvedCounts,
        updated_at: DateTime<Utc>,
    ) -> anyhow::Result<bool>;

    async fn delete(&self, id: i32) -> anyhow::Result<bool>;

    async fn count(&self) -> anyhow::Result<i64>;

    /// Most recent successful refresh across all accounts.
    async fn latest_update(&self) -> anyhow::Result<Option<DateTime<Utc>>>;

    /// Accounts ordered by score, highest first.
    async fn leaderboard(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<Account>>;
}

impl DB {
    pub async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1").execute(&self.0).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl AccountStore for DB {
    #[instrument(skip(self))]
    async fn find_all(&self, limit: i64) -> anyhow::Result<Vec<Account>> {
        Ok(sqlx::query_as!(
            Account,
            r#"
            SELECT id, display_name, identifier, easy_count, medium_count, hard_count,
                baseline_easy, baseline_medium, baseline_hard, score, last_updated, created_at
            FROM accounts
            ORDER BY id ASC
            LIMIT $1
            "#,
            limit
        )
        .fetch_all(&self.0)
        .await?)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i32) -> anyhow::Result<Option<Account>> {
        Ok(sqlx::query_as!(
            Account,
            r#"
            SELECT id, display_name, identifier, easy_count, medium_count, hard_count,
                baseline_easy, baseline_medium, baseline_hard, score, last_updated, created_at
            FROM accounts
            WHERE id = $1
            "#,
            id
        )
        .fetch_optional(&self.0)
        .await?)
    }

    #[instrument(skip(self))]
    async fn find_by_identifier(&self, identifier: &str) -> anyhow::Result<Option<Account>> {
        Ok(sqlx::query_as!(
            Account,
            r#"
            SELECT id, display_name, identifier, easy_count, medium_count, hard_count,
                baseline_easy, baseline_medium, baseline_hard, score, last_updated, created_at
            FROM accounts
            WHERE identifier = $1
            "#,
            identifier
        )
        .fetch_optional(&self.0)
        .await?)
    }

    #[instrument(skip(self, account), fields(identifier = %account.identifier))]
    async fn insert(&self, account: NewAccount) -> anyhow::Result<Option<Account>> {
        Ok(sqlx::query_as!(
            Account,
            r#"
            INSERT INTO accounts (display_name, identifier, easy_count, medium_count, hard_count,
                baseline_easy, baseline_medium, baseline_hard, score, last_updated, created_at)
            VALUES ($1, $2, $3, $4, $5, $3, $4, $5, 0, $6, $6)
            ON CONFLICT (identifier) DO NOTHING
            RETURNING id, display_name, identifier, easy_count, medium_count, hard_count,
                baseline_easy, baseline_medium, baseline_hard, score, last_updated, created_at
            "#,
            account.display_name,
            account.identifier,
            to_column(account.counts.easy)?,
            to_column(account.counts.medium)?,
            to_column(account.counts.hard)?,
            account.created_at
        )
        .fetch_optional(&self.0)
        .await?)
    }

    #[instrument(skip(self))]
    async fn update_stats(
        &self,
        id: i32,
        current: SolvedCounts,
        score: u32,
        updated_at: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query!(
            r#"
            UPDATE accounts
            SET easy_count = $2, medium_count = $3, hard_count = $4, score = $5, last_updated = $6
            WHERE id = $1
            "#,
            id,
            to_column(current.easy)?,
            to_column(current.medium)?,
            to_column(current.hard)?,
            to_column(score)?,
            updated_at
        )
        .execute(&self.0)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn reset_baseline(
        &self,
        id: i32,
        counts: SolvedCounts,
        updated_at: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query!(
            r#"
            UPDATE accounts
            SET easy_count = $2, medium_count = $3, hard_count = $4,
                baseline_easy = $2, baseline_medium = $3, baseline_hard = $4,
                score = 0, last_updated = $5
            WHERE id = $1
            "#,
            id,
            to_column(counts.easy)?,
            to_column(counts.medium)?,
            to_column(counts.hard)?,
            updated_at
        )
        .execute(&self.0)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i32) -> anyhow::Result<bool> {
        let result = sqlx::query!("DELETE FROM accounts WHERE id = $1", id)
            .execute(&self.0)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> anyhow::Result<i64> {
        let rec = sqlx::query!(r#"SELECT COUNT(*) as "count!" FROM accounts"#)
            .fetch_one(&self.0)
            .await?;
        Ok(rec.count)
    }

    async fn latest_update(&self) -> anyhow::Result<Option<DateTime<Utc>>> {
        let rec = sqlx::query!("SELECT MAX(last_updated) as latest FROM accounts")
            .fetch_one(&self.0)
            .await?;
        Ok(rec.latest)
    }

    #[instrument(skip(self))]
    async fn leaderboard(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<Account>> {
        Ok(sqlx::query_as!(
            Account,
            r#"
            SELECT id, display_name, identifier, easy_count, medium_count, hard_count,
                baseline_easy, baseline_medium, baseline_hard, score, last_updated, created_at
            FROM accounts
            ORDER BY score DESC, id ASC
            LIMIT $1 OFFSET $2
            "#,
            limit,
            offset
        )
        .fetch_all(&self.0)
        .await?)
    }
}

async fn run_migrations(rocket: Rocket<Build>) -> fairing::Result {
    match DB::fetch(&rocket) {
        Some(db) => match sqlx::migrate!("./migrations").run(&**db).await {
            Ok(_) => Ok(rocket),
            Err(e) => {
                tracing::error!("Failed to initialize SQLx database: {}", e);
                Err(rocket)
            }
        },
        None => Err(rocket),
    }
}

/// Opens the pool on ignite and closes it on shutdown.
pub fn stage() -> AdHoc {
    AdHoc::on_ignite("SQLx Stage", |rocket| async {
        rocket
            .attach(DB::init())
            .attach(AdHoc::try_on_ignite("SQLx Migrations", run_migrations))
    })
}
