//! Aggregate queries over the `logs` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use crate::dashboard::buckets::{BucketFormat, Window};
use crate::dashboard::source::{
    BucketSums, DailyActivity, ModelSums, ProviderSums, StatusSums, SummarySums, UsageSource, UsageTables,
};
use crate::db::errors::{DbError, Result};
use crate::db::models::usage::{BucketRow, CountRow, DailyRow, ModelRow, ProviderRow, StatusRow, SummaryRow, count_or_zero};

// `$2` is NULL for open-ended windows.
const WINDOW_FILTER: &str = "timestamp >= $1 AND ($2::timestamptz IS NULL OR timestamp <= $2)";

/// [`UsageSource`] backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgUsageSource {
    db: PgPool,
}

impl PgUsageSource {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UsageSource for PgUsageSource {
    #[instrument(skip(self), err)]
    async fn usage(&self, window: &Window, format: BucketFormat) -> Result<UsageTables> {
        // Execute all queries concurrently
        let (summary, success_count, buckets, providers, models, statuses) = tokio::try_join!(
            get_summary(&self.db, window),
            get_success_count(&self.db, window),
            get_buckets(&self.db, window, format),
            get_providers(&self.db, window),
            get_models(&self.db, window),
            get_statuses(&self.db, window),
        )?;

        Ok(UsageTables {
            summary,
            success_count,
            buckets,
            providers,
            models,
            statuses,
        })
    }

    #[instrument(skip(self), err)]
    async fn daily_activity(&self, since: DateTime<Utc>) -> Result<Vec<DailyActivity>> {
        get_daily_activity(&self.db, since).await
    }
}

fn convert<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = DbError>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[instrument(skip(db), err)]
async fn get_summary(db: &PgPool, window: &Window) -> Result<SummarySums> {
    let row = sqlx::query_as::<_, SummaryRow>(&format!(
        r#"
        SELECT
            COUNT(*) AS requests,
            SUM(prompt_tokens)::bigint AS prompt_tokens,
            SUM(completion_tokens)::bigint AS completion_tokens,
            SUM(total_tokens)::bigint AS total_tokens,
            SUM(cost) AS cost,
            SUM(latency)::bigint AS latency
        FROM logs
        WHERE {WINDOW_FILTER}
        "#
    ))
    .bind(window.start)
    .bind(window.end)
    .fetch_one(db)
    .await?;

    row.try_into()
}

#[instrument(skip(db), err)]
async fn get_success_count(db: &PgPool, window: &Window) -> Result<i64> {
    let row = sqlx::query_as::<_, CountRow>(&format!(
        "SELECT COUNT(*) AS count FROM logs WHERE {WINDOW_FILTER} AND status = 'success'"
    ))
    .bind(window.start)
    .bind(window.end)
    .fetch_one(db)
    .await?;

    count_or_zero("count", row.count)
}

#[instrument(skip(db), err)]
async fn get_buckets(db: &PgPool, window: &Window, format: BucketFormat) -> Result<Vec<BucketSums>> {
    let rows = sqlx::query_as::<_, BucketRow>(&format!(
        r#"
        SELECT
            date_trunc($3, timestamp AT TIME ZONE 'UTC') AT TIME ZONE 'UTC' AS bucket,
            SUM(prompt_tokens)::bigint AS prompt_tokens,
            SUM(completion_tokens)::bigint AS completion_tokens,
            SUM(cost) AS cost,
            COUNT(*) AS requests
        FROM logs
        WHERE {WINDOW_FILTER}
        GROUP BY 1
        ORDER BY 1
        "#
    ))
    .bind(window.start)
    .bind(window.end)
    .bind(format.trunc_unit())
    .fetch_all(db)
    .await?;

    convert(rows)
}

#[instrument(skip(db), err)]
async fn get_providers(db: &PgPool, window: &Window) -> Result<Vec<ProviderSums>> {
    let rows = sqlx::query_as::<_, ProviderRow>(&format!(
        r#"
        SELECT provider, SUM(total_tokens)::bigint AS tokens, SUM(cost) AS cost
        FROM logs
        WHERE {WINDOW_FILTER}
        GROUP BY provider
        ORDER BY provider
        "#
    ))
    .bind(window.start)
    .bind(window.end)
    .fetch_all(db)
    .await?;

    convert(rows)
}

#[instrument(skip(db), err)]
async fn get_models(db: &PgPool, window: &Window) -> Result<Vec<ModelSums>> {
    let rows = sqlx::query_as::<_, ModelRow>(&format!(
        r#"
        SELECT
            model,
            SUM(total_tokens)::bigint AS tokens,
            SUM(cost) AS cost,
            SUM(completion_tokens)::bigint AS completion_tokens,
            SUM(latency)::bigint AS latency,
            COUNT(*) AS requests
        FROM logs
        WHERE {WINDOW_FILTER}
        GROUP BY model
        ORDER BY model
        "#
    ))
    .bind(window.start)
    .bind(window.end)
    .fetch_all(db)
    .await?;

    convert(rows)
}

#[instrument(skip(db), err)]
async fn get_statuses(db: &PgPool, window: &Window) -> Result<Vec<StatusSums>> {
    let rows = sqlx::query_as::<_, StatusRow>(&format!(
        r#"
        SELECT status, COUNT(*) AS requests
        FROM logs
        WHERE {WINDOW_FILTER}
        GROUP BY status
        ORDER BY status
        "#
    ))
    .bind(window.start)
    .bind(window.end)
    .fetch_all(db)
    .await?;

    convert(rows)
}

#[instrument(skip(db), err)]
async fn get_daily_activity(db: &PgPool, since: DateTime<Utc>) -> Result<Vec<DailyActivity>> {
    let rows = sqlx::query_as::<_, DailyRow>(
        r#"
        SELECT
            (timestamp AT TIME ZONE 'UTC')::date AS day,
            COUNT(*) AS requests,
            SUM(total_tokens)::bigint AS tokens
        FROM logs
        WHERE timestamp >= $1
        GROUP BY 1
        ORDER BY 1
        "#,
    )
    .bind(since)
    .fetch_all(db)
    .await?;

    convert(rows)
}
