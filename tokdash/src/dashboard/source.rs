//! The boundary between the dashboard pipeline and the log store.
//!
//! A [`UsageSource`] answers two reads per dashboard request: the grouped sums for the query
//! window, and the per-day activity backing the heatmap. Everything it returns is keyed by *raw*
//! provider/model names and truncated timestamps; normalization and labelling happen afterwards
//! in [`aggregate`](super::aggregate), so every source goes through the same path.
//!
//! Two implementations exist: [`PgUsageSource`](crate::db::handlers::usage::PgUsageSource) issues
//! aggregate SQL against the `logs` table, and [`MemorySource`] groups a list of raw
//! [`LogRecord`]s in process.

use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::aggregate::{group_daily, group_records};
use super::buckets::{BucketFormat, Window};
use crate::db::errors::{DbError, Result};

/// One LLM API call as recorded by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub provider: String,
    pub model: String,
    pub status: String,
    #[serde(default)]
    pub prompt_tokens: i64,
    #[serde(default)]
    pub completion_tokens: i64,
    #[serde(default)]
    pub total_tokens: i64,
    #[serde(default)]
    pub cost: Decimal,
    /// Milliseconds
    #[serde(default)]
    pub latency: i64,
}

impl LogRecord {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }

    /// Token counts, cost and latency must all be non-negative.
    pub fn validate(&self) -> Result<()> {
        let counts = [
            ("prompt_tokens", self.prompt_tokens),
            ("completion_tokens", self.completion_tokens),
            ("total_tokens", self.total_tokens),
            ("latency", self.latency),
        ];
        if let Some((column, value)) = counts.into_iter().find(|(_, value)| *value < 0) {
            return Err(negative(column, value));
        }
        if self.cost.is_sign_negative() && !self.cost.is_zero() {
            return Err(negative("cost", self.cost));
        }
        Ok(())
    }
}

fn negative(column: &str, value: impl std::fmt::Display) -> DbError {
    DbError::SchemaMismatch {
        column: column.to_string(),
        message: format!("negative value {value}"),
    }
}

/// Whole-window sums.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummarySums {
    pub requests: i64,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
    pub cost: Decimal,
    /// Sum of latencies in milliseconds
    pub latency: i64,
}

/// Sums for one truncated time bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketSums {
    pub bucket: DateTime<Utc>,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub cost: Decimal,
    pub requests: i64,
}

/// Sums for one raw provider name.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSums {
    pub provider: String,
    pub tokens: i64,
    pub cost: Decimal,
}

/// Sums for one raw model name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelSums {
    pub model: String,
    pub tokens: i64,
    pub cost: Decimal,
    pub completion_tokens: i64,
    pub latency: i64,
    pub requests: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusSums {
    pub status: String,
    pub requests: i64,
}

/// Everything the pipeline needs from one window read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsageTables {
    pub summary: SummarySums,
    pub success_count: i64,
    pub buckets: Vec<BucketSums>,
    pub providers: Vec<ProviderSums>,
    pub models: Vec<ModelSums>,
    pub statuses: Vec<StatusSums>,
}

/// Request and token totals for one UTC calendar day.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyActivity {
    pub day: NaiveDate,
    pub requests: i64,
    pub tokens: i64,
}

#[async_trait]
pub trait UsageSource: Send + Sync {
    /// Grouped sums for every record inside `window`, with time buckets truncated per `format`.
    async fn usage(&self, window: &Window, format: BucketFormat) -> Result<UsageTables>;

    /// Per-day totals for every record at or after `since`, ascending by day.
    async fn daily_activity(&self, since: DateTime<Utc>) -> Result<Vec<DailyActivity>>;
}

/// In-process source over a fixed set of records.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    records: Vec<LogRecord>,
}

impl MemorySource {
    pub fn new(records: Vec<LogRecord>) -> Self {
        Self { records }
    }

    /// Load records from a JSON array file. Every record is validated.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path).with_context(|| format!("Failed to read log records from {}", path.display()))?;
        let records: Vec<LogRecord> =
            serde_json::from_str(&contents).with_context(|| format!("Failed to parse log records in {}", path.display()))?;
        for (index, record) in records.iter().enumerate() {
            record
                .validate()
                .with_context(|| format!("Invalid log record at index {index} in {}", path.display()))?;
        }
        Ok(Self::new(records))
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}

#[async_trait]
impl UsageSource for MemorySource {
    async fn usage(&self, window: &Window, format: BucketFormat) -> Result<UsageTables> {
        group_records(self.records.iter().filter(|record| window.contains(record.timestamp)), format)
    }

    async fn daily_activity(&self, since: DateTime<Utc>) -> Result<Vec<DailyActivity>> {
        group_daily(self.records.iter().filter(|record| record.timestamp >= since))
    }
}
