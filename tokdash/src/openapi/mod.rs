//! OpenAPI documentation for the dashboard API.
//!
//! The document is served as JSON at `/api-docs/openapi.json` and rendered with Scalar at
//! `/api/docs`.

use utoipa::OpenApi;

use crate::{api, dashboard, errors};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tokdash API",
        description = "Aggregated usage, cost and performance of LLM API calls recorded by a gateway."
    ),
    paths(api::handlers::dashboard::get_dashboard),
    components(
        schemas(
            api::models::dashboard::DashboardData,
            api::models::dashboard::DashboardSummary,
            api::models::dashboard::TokensTrendPoint,
            api::models::dashboard::CostTrendPoint,
            api::models::dashboard::RequestsTrendPoint,
            api::models::dashboard::ProviderUsage,
            api::models::dashboard::BrandUsage,
            api::models::dashboard::ModelTokens,
            api::models::dashboard::ModelTps,
            api::models::dashboard::ModelRequests,
            api::models::dashboard::StatusCount,
            api::models::dashboard::TrendIndicator,
            api::models::dashboard::Trends,
            api::models::dashboard::Heatmap,
            api::models::dashboard::HeatmapCell,
            api::models::dashboard::HeatmapPeak,
            api::models::dashboard::HeatmapStats,
            api::models::dashboard::WindowInfo,
            dashboard::RangePreset,
            dashboard::buckets::BucketFormat,
            errors::ErrorBody,
            errors::FieldError,
        )
    ),
    tags(
        (name = "dashboard", description = "Usage aggregation over a time window. \
Token, cost and request totals are grouped by provider, model family and status after provider and model names are canonicalized."),
    )
)]
pub struct ApiDoc;
