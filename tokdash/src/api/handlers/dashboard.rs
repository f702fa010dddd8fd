//! HTTP handler for the dashboard endpoint.

use axum::{
    Json,
    extract::{Query, State},
};
use chrono::Utc;
use tracing::debug;

use crate::{
    AppState,
    api::models::dashboard::{DashboardData, DashboardParams},
    errors::{Error, ErrorBody},
};

/// Aggregated usage for the dashboard
///
/// Returns every series the dashboard renders for one time window: summary numbers, trends,
/// provider/brand/model breakdowns and the trailing-year activity heatmap. Pass either `range`
/// or both `from` and `to`.
#[utoipa::path(
    get,
    path = "/api/dashboard",
    params(DashboardParams),
    responses(
        (status = 200, description = "Dashboard data for the requested window", body = DashboardData),
        (status = 400, description = "Invalid query parameters", body = ErrorBody),
        (status = 500, description = "Failed to read usage data", body = ErrorBody),
    ),
    tag = "dashboard",
)]
#[tracing::instrument(skip_all)]
pub async fn get_dashboard(
    Query(params): Query<DashboardParams>,
    State(state): State<AppState>,
) -> Result<Json<DashboardData>, Error> {
    let query = params
        .into_query(state.config.dashboard.default_range)
        .map_err(|details| Error::Validation { details })?;
    debug!(?query, "Assembling dashboard");

    let data = state.dashboard.assemble(&query, Utc::now()).await?;
    Ok(Json(data))
}

#[cfg(test)]
mod tests {
    use crate::test_utils::*;
    use chrono::{Duration, Utc};
    use serde_json::Value;

    #[test_log::test(tokio::test)]
    async fn test_dashboard_default_range() {
        let now = Utc::now();
        let server = create_test_server(vec![
            log_record(now - Duration::hours(2), "cloud", "zai-glm-4.6", "success", 100),
            log_record(now - Duration::days(3), "OpenRouter", "glm-4.6", "error", 50),
            // Outside the default 7d window, still on the heatmap
            log_record(now - Duration::days(20), "anthropic", "claude-3-haiku", "success", 10),
        ]);

        let response = server.get("/api/dashboard").await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["summary"]["totalRequests"], 2);
        assert_eq!(body["summary"]["totalTokens"], 150);
        assert_eq!(body["summary"]["successRate"], 50.0);
        assert_eq!(body["byProvider"][0]["provider"], "OpenRouter");
        assert_eq!(body["byBrand"][0]["brand"], "GLM");
        assert_eq!(body["window"]["label"], "Last 7 days");
        assert_eq!(body["window"]["granularity"], "daily");
        assert_eq!(body["heatmap"]["stats"]["totalRequests"], 3);
    }

    #[test_log::test(tokio::test)]
    async fn test_dashboard_range_all() {
        let now = Utc::now();
        let server = create_test_server(vec![log_record(
            now - Duration::days(400),
            "openai",
            "gpt-4o",
            "success",
            42,
        )]);

        let response = server.get("/api/dashboard").add_query_param("range", "all").await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["summary"]["totalTokens"], 42);
        assert_eq!(body["window"]["end"], Value::Null);
        // Older than the heatmap grid
        assert_eq!(body["heatmap"]["stats"]["totalRequests"], 0);
    }

    #[test_log::test(tokio::test)]
    async fn test_dashboard_explicit_range() {
        let now = Utc::now();
        let server = create_test_server(vec![log_record(now - Duration::hours(1), "openai", "gpt-4o", "success", 7)]);
        let from = (now - Duration::hours(3)).to_rfc3339();
        let to = now.to_rfc3339();

        let response = server
            .get("/api/dashboard")
            .add_query_param("from", &from)
            .add_query_param("to", &to)
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["window"]["granularity"], "hourly");
        assert_eq!(body["requestsTrend"].as_array().unwrap().len(), 1);
        assert!(body["requestsTrend"][0]["date"].as_str().unwrap().ends_with(":00"));
    }

    #[test_log::test(tokio::test)]
    async fn test_dashboard_empty_source() {
        let server = create_test_server(Vec::new());

        let response = server.get("/api/dashboard").await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["summary"]["avgTps"], 0.0);
        assert_eq!(body["tokensByModel"], Value::Array(Vec::new()));
        assert_eq!(body["trends"]["tokens"]["isUp"], true);
        let cells = body["heatmap"]["requests"].as_array().unwrap();
        assert_eq!(cells.len() % 7, 0);
    }

    #[test_log::test(tokio::test)]
    async fn test_dashboard_rejects_unknown_range() {
        let server = create_test_server(Vec::new());

        let response = server.get("/api/dashboard").add_query_param("range", "90d").await;
        response.assert_status_bad_request();

        let body: Value = response.json();
        assert_eq!(body["error"], "Invalid query parameters");
        assert_eq!(body["details"][0]["path"][0], "range");
    }

    #[test_log::test(tokio::test)]
    async fn test_dashboard_rejects_half_range() {
        let server = create_test_server(Vec::new());

        let response = server.get("/api/dashboard").add_query_param("from", "2025-01-01").await;
        response.assert_status_bad_request();

        let body: Value = response.json();
        assert_eq!(body["details"][0]["path"], serde_json::json!(["from"]));
        assert_eq!(body["details"][0]["message"], "Both 'from' and 'to' must be provided together");
    }

    #[test_log::test(tokio::test)]
    async fn test_dashboard_rejects_reversed_range() {
        let server = create_test_server(Vec::new());

        let response = server
            .get("/api/dashboard")
            .add_query_param("from", "2025-02-01")
            .add_query_param("to", "2025-01-01")
            .await;
        response.assert_status_bad_request();
    }

    #[test_log::test(tokio::test)]
    async fn test_dashboard_negative_record_is_server_error() {
        let mut record = log_record(Utc::now() - Duration::hours(1), "openai", "gpt-4o", "success", 10);
        record.latency = -100;
        let server = create_test_server(vec![record]);

        let response = server.get("/api/dashboard").await;
        response.assert_status(axum::http::StatusCode::INTERNAL_SERVER_ERROR);

        let body: Value = response.json();
        assert_eq!(body["error"], "Failed to fetch dashboard data");
    }
}
