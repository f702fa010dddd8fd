//! Rows returned by the usage aggregate queries.
//!
//! Aggregates over an empty set come back as `NULL`, so every column is optional. The
//! conversions into the pipeline's sum types are the one place where `NULL` becomes zero; a
//! missing group key or a negative sum is a [`DbError::SchemaMismatch`].

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

use crate::dashboard::source::{BucketSums, DailyActivity, ModelSums, ProviderSums, StatusSums, SummarySums};
use crate::db::errors::{DbError, Result};

/// Whole-window totals
#[derive(Debug, FromRow)]
pub struct SummaryRow {
    pub requests: Option<i64>,
    pub prompt_tokens: Option<i64>,
    pub completion_tokens: Option<i64>,
    pub total_tokens: Option<i64>,
    pub cost: Option<Decimal>,
    pub latency: Option<i64>,
}

/// Single count, e.g. successful requests
#[derive(Debug, FromRow)]
pub struct CountRow {
    pub count: Option<i64>,
}

/// Totals for one truncated time bucket
#[derive(Debug, FromRow)]
pub struct BucketRow {
    pub bucket: Option<DateTime<Utc>>,
    pub prompt_tokens: Option<i64>,
    pub completion_tokens: Option<i64>,
    pub cost: Option<Decimal>,
    pub requests: Option<i64>,
}

/// Totals for one raw provider name
#[derive(Debug, FromRow)]
pub struct ProviderRow {
    pub provider: Option<String>,
    pub tokens: Option<i64>,
    pub cost: Option<Decimal>,
}

/// Totals for one raw model name
#[derive(Debug, FromRow)]
pub struct ModelRow {
    pub model: Option<String>,
    pub tokens: Option<i64>,
    pub cost: Option<Decimal>,
    pub completion_tokens: Option<i64>,
    pub latency: Option<i64>,
    pub requests: Option<i64>,
}

/// Request count for one status
#[derive(Debug, FromRow)]
pub struct StatusRow {
    pub status: Option<String>,
    pub requests: Option<i64>,
}

/// Totals for one UTC day
#[derive(Debug, FromRow)]
pub struct DailyRow {
    pub day: Option<NaiveDate>,
    pub requests: Option<i64>,
    pub tokens: Option<i64>,
}

/// `NULL` counts are zero; negative counts mean the rows are not what we expect.
pub fn count_or_zero(column: &str, value: Option<i64>) -> Result<i64> {
    match value {
        Some(value) if value < 0 => Err(negative(column, value)),
        Some(value) => Ok(value),
        None => Ok(0),
    }
}

/// `NULL` amounts are zero; negative amounts are rejected.
pub fn amount_or_zero(column: &str, value: Option<Decimal>) -> Result<Decimal> {
    match value {
        Some(value) if value.is_sign_negative() && !value.is_zero() => Err(negative(column, value)),
        Some(value) => Ok(value),
        None => Ok(Decimal::ZERO),
    }
}

fn required<T>(column: &str, value: Option<T>) -> Result<T> {
    value.ok_or_else(|| DbError::SchemaMismatch {
        column: column.to_string(),
        message: "group key is NULL".to_string(),
    })
}

fn negative(column: &str, value: impl std::fmt::Display) -> DbError {
    DbError::SchemaMismatch {
        column: column.to_string(),
        message: format!("negative sum {value}"),
    }
}

impl TryFrom<SummaryRow> for SummarySums {
    type Error = DbError;

    fn try_from(row: SummaryRow) -> Result<Self> {
        Ok(Self {
            requests: count_or_zero("requests", row.requests)?,
            prompt_tokens: count_or_zero("prompt_tokens", row.prompt_tokens)?,
            completion_tokens: count_or_zero("completion_tokens", row.completion_tokens)?,
            total_tokens: count_or_zero("total_tokens", row.total_tokens)?,
            cost: amount_or_zero("cost", row.cost)?,
            latency: count_or_zero("latency", row.latency)?,
        })
    }
}

impl TryFrom<BucketRow> for BucketSums {
    type Error = DbError;

    fn try_from(row: BucketRow) -> Result<Self> {
        Ok(Self {
            bucket: required("bucket", row.bucket)?,
            prompt_tokens: count_or_zero("prompt_tokens", row.prompt_tokens)?,
            completion_tokens: count_or_zero("completion_tokens", row.completion_tokens)?,
            cost: amount_or_zero("cost", row.cost)?,
            requests: count_or_zero("requests", row.requests)?,
        })
    }
}

impl TryFrom<ProviderRow> for ProviderSums {
    type Error = DbError;

    fn try_from(row: ProviderRow) -> Result<Self> {
        Ok(Self {
            provider: required("provider", row.provider)?,
            tokens: count_or_zero("tokens", row.tokens)?,
            cost: amount_or_zero("cost", row.cost)?,
        })
    }
}

impl TryFrom<ModelRow> for ModelSums {
    type Error = DbError;

    fn try_from(row: ModelRow) -> Result<Self> {
        Ok(Self {
            model: required("model", row.model)?,
            tokens: count_or_zero("tokens", row.tokens)?,
            cost: amount_or_zero("cost", row.cost)?,
            completion_tokens: count_or_zero("completion_tokens", row.completion_tokens)?,
            latency: count_or_zero("latency", row.latency)?,
            requests: count_or_zero("requests", row.requests)?,
        })
    }
}

impl TryFrom<StatusRow> for StatusSums {
    type Error = DbError;

    fn try_from(row: StatusRow) -> Result<Self> {
        Ok(Self {
            status: required("status", row.status)?,
            requests: count_or_zero("requests", row.requests)?,
        })
    }
}

impl TryFrom<DailyRow> for DailyActivity {
    type Error = DbError;

    fn try_from(row: DailyRow) -> Result<Self> {
        Ok(Self {
            day: required("day", row.day)?,
            requests: count_or_zero("requests", row.requests)?,
            tokens: count_or_zero("tokens", row.tokens)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nulls_coerce_to_zero() {
        let row = SummaryRow {
            requests: Some(0),
            prompt_tokens: None,
            completion_tokens: None,
            total_tokens: None,
            cost: None,
            latency: None,
        };
        assert_eq!(SummarySums::try_from(row).unwrap(), SummarySums::default());
    }

    #[test]
    fn test_negative_sum_rejected() {
        let row = ProviderRow {
            provider: Some("openai".to_string()),
            tokens: Some(-5),
            cost: None,
        };
        let err = ProviderSums::try_from(row).unwrap_err();
        assert!(matches!(err, DbError::SchemaMismatch { ref column, .. } if column == "tokens"));

        assert!(amount_or_zero("cost", Some(Decimal::new(-1, 2))).is_err());
        assert_eq!(amount_or_zero("cost", Some(Decimal::NEGATIVE_ONE + Decimal::ONE)).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_null_group_key_rejected() {
        let row = StatusRow {
            status: None,
            requests: Some(3),
        };
        assert!(matches!(StatusSums::try_from(row), Err(DbError::SchemaMismatch { .. })));
    }
}
