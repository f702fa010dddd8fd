//! Composes one [`DashboardData`] response per request.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use super::aggregate::{Aggregates, aggregate, top_n};
use super::buckets::{DashboardQuery, bucket_format, resolve_window};
use super::derive::{summarize, to_f64, trend};
use super::heatmap::{self, HeatmapGrid};
use super::normalize::NameNormalizer;
use super::source::UsageSource;
use crate::api::models::dashboard::{
    BrandUsage, CostTrendPoint, DashboardData, ModelRequests, ModelTokens, ModelTps, ProviderUsage, RequestsTrendPoint,
    StatusCount, TokensTrendPoint, Trends, WindowInfo,
};
use crate::errors::Error;

/// Default number of entries in each per-model ranking.
pub const DEFAULT_TOP_MODELS: usize = 10;

/// Reads usage from a source and turns it into the dashboard response.
#[derive(Clone)]
pub struct Dashboard {
    source: Arc<dyn UsageSource>,
    normalizer: Arc<NameNormalizer>,
    top_models: usize,
}

impl Dashboard {
    pub fn new(source: Arc<dyn UsageSource>, normalizer: Arc<NameNormalizer>, top_models: usize) -> Self {
        Self {
            source,
            normalizer,
            top_models,
        }
    }

    /// Build the dashboard for `query` as of `now`.
    ///
    /// Both source reads run concurrently; if either fails the whole request fails.
    #[instrument(skip(self), err)]
    pub async fn assemble(&self, query: &DashboardQuery, now: DateTime<Utc>) -> Result<DashboardData, Error> {
        let window = resolve_window(query, now);
        let format = bucket_format(&window, now);
        let grid = HeatmapGrid::ending(now.date_naive());

        let (tables, daily) = tokio::try_join!(
            self.source.usage(&window, format),
            self.source.daily_activity(grid.since())
        )?;

        debug!(
            requests = tables.summary.requests,
            models = tables.models.len(),
            active_days = daily.len(),
            "Read usage for dashboard"
        );

        let summary = summarize(&tables.summary, tables.success_count);
        let Aggregates {
            trend: buckets,
            providers,
            models,
            brands,
            statuses,
        } = aggregate(&tables, format, &self.normalizer);

        let trends = Trends {
            tokens: trend(
                &buckets
                    .iter()
                    .map(|bucket| (bucket.prompt_tokens + bucket.completion_tokens) as f64)
                    .collect::<Vec<_>>(),
            ),
            cost: trend(&buckets.iter().map(|bucket| to_f64(bucket.cost)).collect::<Vec<_>>()),
            requests: trend(&buckets.iter().map(|bucket| bucket.requests as f64).collect::<Vec<_>>()),
        };

        let tokens_by_model = top_n(&models, self.top_models, |model| model.tokens)
            .into_iter()
            .map(|model| ModelTokens {
                model: model.model.clone(),
                tokens: model.tokens,
            })
            .collect();
        let tps_by_model = top_n(
            models.iter().map(|model| ModelTps {
                model: model.model.clone(),
                tps: model.tps(),
            }),
            self.top_models,
            |entry| entry.tps,
        );
        let requests_by_model = top_n(&models, self.top_models, |model| model.requests)
            .into_iter()
            .map(|model| ModelRequests {
                model: model.model.clone(),
                requests: model.requests,
            })
            .collect();

        Ok(DashboardData {
            summary,
            tokens_trend: buckets
                .iter()
                .map(|bucket| TokensTrendPoint {
                    date: bucket.label.clone(),
                    prompt: bucket.prompt_tokens,
                    completion: bucket.completion_tokens,
                })
                .collect(),
            cost_trend: buckets
                .iter()
                .map(|bucket| CostTrendPoint {
                    date: bucket.label.clone(),
                    cost: to_f64(bucket.cost),
                })
                .collect(),
            requests_trend: buckets
                .iter()
                .map(|bucket| RequestsTrendPoint {
                    date: bucket.label.clone(),
                    requests: bucket.requests,
                })
                .collect(),
            by_provider: providers
                .into_iter()
                .map(|provider| ProviderUsage {
                    provider: provider.name,
                    tokens: provider.tokens,
                    cost: to_f64(provider.cost),
                })
                .collect(),
            by_brand: brands
                .into_iter()
                .map(|brand| BrandUsage {
                    brand: brand.name,
                    tokens: brand.tokens,
                    cost: to_f64(brand.cost),
                })
                .collect(),
            tokens_by_model,
            tps_by_model,
            requests_by_model,
            by_status: statuses
                .into_iter()
                .map(|(status, count)| StatusCount { status, count })
                .collect(),
            trends,
            heatmap: heatmap::build(&grid, &daily),
            window: WindowInfo {
                label: query.label(),
                start: window.start,
                end: window.end,
                granularity: format,
            },
        })
    }
}
