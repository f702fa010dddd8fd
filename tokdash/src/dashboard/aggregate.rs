//! Grouping and summing of usage data.
//!
//! Two stages live here. [`group_records`] and [`group_daily`] turn raw [`LogRecord`]s into the
//! same pre-grouped tables the SQL layer returns. [`aggregate`] then takes those tables,
//! rewrites provider and model keys through the [`NameNormalizer`], merges rows that collapse onto
//! the same canonical name, labels time buckets and derives the brand breakdown from the merged
//! model rows.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::buckets::{BucketFormat, bucket_key};
use super::derive::tokens_per_second;
use super::normalize::NameNormalizer;
use super::source::{BucketSums, DailyActivity, LogRecord, ModelSums, ProviderSums, StatusSums, SummarySums, UsageTables};
use crate::db::errors::{DbError, Result};

/// Accumulator that remembers the order in which keys were first seen.
#[derive(Debug)]
struct Grouped<T> {
    index: HashMap<String, usize>,
    rows: Vec<(String, T)>,
}

impl<T: Default> Grouped<T> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            rows: Vec::new(),
        }
    }

    fn entry(&mut self, key: &str) -> &mut T {
        let position = match self.index.get(key) {
            Some(&position) => position,
            None => {
                self.index.insert(key.to_string(), self.rows.len());
                self.rows.push((key.to_string(), T::default()));
                self.rows.len() - 1
            }
        };
        &mut self.rows[position].1
    }

    fn into_rows(self) -> Vec<(String, T)> {
        self.rows
    }
}

#[derive(Debug, Default)]
struct BucketAcc {
    prompt_tokens: i64,
    completion_tokens: i64,
    cost: Decimal,
    requests: i64,
}

/// Group raw records (already restricted to the window) into usage tables.
///
/// Fails on a record with a negative field or when a sum overflows.
pub fn group_records<'a>(records: impl IntoIterator<Item = &'a LogRecord>, format: BucketFormat) -> Result<UsageTables> {
    let mut summary = SummarySums::default();
    let mut success_count = 0;
    let mut buckets: BTreeMap<_, BucketAcc> = BTreeMap::new();
    let mut providers: Grouped<(i64, Decimal)> = Grouped::new();
    let mut models: Grouped<ModelSums> = Grouped::new();
    let mut statuses: Grouped<i64> = Grouped::new();

    for record in records {
        record.validate()?;

        summary.requests += 1;
        add_count(&mut summary.prompt_tokens, "prompt_tokens", record.prompt_tokens)?;
        add_count(&mut summary.completion_tokens, "completion_tokens", record.completion_tokens)?;
        add_count(&mut summary.total_tokens, "total_tokens", record.total_tokens)?;
        add_amount(&mut summary.cost, "cost", record.cost)?;
        add_count(&mut summary.latency, "latency", record.latency)?;
        if record.is_success() {
            success_count += 1;
        }

        let bucket = buckets.entry(format.truncate(record.timestamp)).or_default();
        add_count(&mut bucket.prompt_tokens, "prompt_tokens", record.prompt_tokens)?;
        add_count(&mut bucket.completion_tokens, "completion_tokens", record.completion_tokens)?;
        add_amount(&mut bucket.cost, "cost", record.cost)?;
        bucket.requests += 1;

        let provider = providers.entry(&record.provider);
        add_count(&mut provider.0, "total_tokens", record.total_tokens)?;
        add_amount(&mut provider.1, "cost", record.cost)?;

        let model = models.entry(&record.model);
        add_count(&mut model.tokens, "total_tokens", record.total_tokens)?;
        add_amount(&mut model.cost, "cost", record.cost)?;
        add_count(&mut model.completion_tokens, "completion_tokens", record.completion_tokens)?;
        add_count(&mut model.latency, "latency", record.latency)?;
        model.requests += 1;

        *statuses.entry(&record.status) += 1;
    }

    Ok(UsageTables {
        summary,
        success_count,
        buckets: buckets
            .into_iter()
            .map(|(bucket, acc)| BucketSums {
                bucket,
                prompt_tokens: acc.prompt_tokens,
                completion_tokens: acc.completion_tokens,
                cost: acc.cost,
                requests: acc.requests,
            })
            .collect(),
        providers: providers
            .into_rows()
            .into_iter()
            .map(|(provider, (tokens, cost))| ProviderSums { provider, tokens, cost })
            .collect(),
        models: models
            .into_rows()
            .into_iter()
            .map(|(model, sums)| ModelSums { model, ..sums })
            .collect(),
        statuses: statuses
            .into_rows()
            .into_iter()
            .map(|(status, requests)| StatusSums { status, requests })
            .collect(),
    })
}

/// Group raw records into per-UTC-day totals, ascending by day.
pub fn group_daily<'a>(records: impl IntoIterator<Item = &'a LogRecord>) -> Result<Vec<DailyActivity>> {
    let mut days: BTreeMap<NaiveDate, (i64, i64)> = BTreeMap::new();
    for record in records {
        record.validate()?;
        let day = days.entry(record.timestamp.date_naive()).or_default();
        day.0 += 1;
        add_count(&mut day.1, "total_tokens", record.total_tokens)?;
    }
    Ok(days
        .into_iter()
        .map(|(day, (requests, tokens))| DailyActivity { day, requests, tokens })
        .collect())
}

fn add_count(total: &mut i64, column: &str, value: i64) -> Result<()> {
    *total = total.checked_add(value).ok_or_else(|| overflow(column))?;
    Ok(())
}

fn add_amount(total: &mut Decimal, column: &str, value: Decimal) -> Result<()> {
    *total = total.checked_add(value).ok_or_else(|| overflow(column))?;
    Ok(())
}

fn overflow(column: &str) -> DbError {
    DbError::SchemaMismatch {
        column: column.to_string(),
        message: "sum overflows".to_string(),
    }
}

/// Sums for one labelled trend bucket.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrendBucket {
    pub label: String,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub cost: Decimal,
    pub requests: i64,
}

/// Tokens and cost for a canonical provider or a brand.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamedTotals {
    pub name: String,
    pub tokens: i64,
    pub cost: Decimal,
}

/// Merged sums for one canonical model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelTotals {
    pub model: String,
    pub tokens: i64,
    pub cost: Decimal,
    pub completion_tokens: i64,
    pub latency: i64,
    pub requests: i64,
}

impl ModelTotals {
    /// Tokens per second over the merged sums.
    pub fn tps(&self) -> f64 {
        tokens_per_second(self.completion_tokens, self.latency)
    }
}

/// Normalized, grouped view of one window read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregates {
    /// Ascending by label; only buckets with at least one request
    pub trend: Vec<TrendBucket>,
    /// Descending by tokens
    pub providers: Vec<NamedTotals>,
    /// First-seen order
    pub models: Vec<ModelTotals>,
    /// Descending by tokens
    pub brands: Vec<NamedTotals>,
    /// Descending by count
    pub statuses: Vec<(String, i64)>,
}

pub fn aggregate(tables: &UsageTables, format: BucketFormat, normalizer: &NameNormalizer) -> Aggregates {
    let models = merge_models(&tables.models, normalizer);
    Aggregates {
        trend: label_buckets(&tables.buckets, format),
        providers: merge_providers(&tables.providers, normalizer),
        brands: group_brands(&models, normalizer),
        models,
        statuses: merge_statuses(&tables.statuses),
    }
}

// Labels can collide (e.g. the same hour on two days of a 24h window), so merge by label.
fn label_buckets(buckets: &[BucketSums], format: BucketFormat) -> Vec<TrendBucket> {
    let mut labelled: BTreeMap<String, TrendBucket> = BTreeMap::new();
    for bucket in buckets.iter().filter(|bucket| bucket.requests > 0) {
        let label = bucket_key(bucket.bucket, format);
        let acc = labelled.entry(label.clone()).or_insert_with(|| TrendBucket {
            label,
            ..Default::default()
        });
        acc.prompt_tokens += bucket.prompt_tokens;
        acc.completion_tokens += bucket.completion_tokens;
        acc.cost += bucket.cost;
        acc.requests += bucket.requests;
    }
    labelled.into_values().collect()
}

fn merge_providers(rows: &[ProviderSums], normalizer: &NameNormalizer) -> Vec<NamedTotals> {
    let mut grouped: Grouped<(i64, Decimal)> = Grouped::new();
    for row in rows {
        let acc = grouped.entry(normalizer.normalize_provider(&row.provider));
        acc.0 += row.tokens;
        acc.1 += row.cost;
    }
    let mut providers: Vec<NamedTotals> = grouped
        .into_rows()
        .into_iter()
        .map(|(name, (tokens, cost))| NamedTotals { name, tokens, cost })
        .collect();
    providers.sort_by(|a, b| b.tokens.cmp(&a.tokens));
    providers
}

fn merge_models(rows: &[ModelSums], normalizer: &NameNormalizer) -> Vec<ModelTotals> {
    let mut grouped: Grouped<ModelTotals> = Grouped::new();
    for row in rows {
        let acc = grouped.entry(normalizer.normalize_model(&row.model));
        acc.tokens += row.tokens;
        acc.cost += row.cost;
        acc.completion_tokens += row.completion_tokens;
        acc.latency += row.latency;
        acc.requests += row.requests;
    }
    grouped
        .into_rows()
        .into_iter()
        .map(|(model, totals)| ModelTotals { model, ..totals })
        .collect()
}

// Brands are built from the merged model rows so each model is normalized exactly once.
fn group_brands(models: &[ModelTotals], normalizer: &NameNormalizer) -> Vec<NamedTotals> {
    let mut grouped: Grouped<(i64, Decimal)> = Grouped::new();
    for model in models {
        let acc = grouped.entry(normalizer.brand_of(&model.model));
        acc.0 += model.tokens;
        acc.1 += model.cost;
    }
    let mut brands: Vec<NamedTotals> = grouped
        .into_rows()
        .into_iter()
        .map(|(name, (tokens, cost))| NamedTotals { name, tokens, cost })
        .collect();
    brands.sort_by(|a, b| b.tokens.cmp(&a.tokens));
    brands
}

fn merge_statuses(rows: &[StatusSums]) -> Vec<(String, i64)> {
    let mut grouped: Grouped<i64> = Grouped::new();
    for row in rows {
        *grouped.entry(&row.status) += row.requests;
    }
    let mut statuses = grouped.into_rows();
    statuses.sort_by(|a, b| b.1.cmp(&a.1));
    statuses
}

/// Top `n` items by a metric, descending. The sort is stable, so ties keep their input order.
pub fn top_n<T, K, F>(items: impl IntoIterator<Item = T>, n: usize, metric: F) -> Vec<T>
where
    F: Fn(&T) -> K,
    K: PartialOrd,
{
    let mut items: Vec<T> = items.into_iter().collect();
    items.sort_by(|a, b| metric(b).partial_cmp(&metric(a)).unwrap_or(std::cmp::Ordering::Equal));
    items.truncate(n);
    items
}
