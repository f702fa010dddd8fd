//! Dashboard query and response types
//!
//! The response is a single object holding every series the dashboard renders, so the front end
//! never has to stitch several calls together.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::dashboard::buckets::{BucketFormat, DashboardQuery, RangePreset};
use crate::errors::FieldError;

/// Query parameters for the dashboard
#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
pub struct DashboardParams {
    /// Preset range: `1d`, `7d`, `30d` or `all` (default from configuration, normally `7d`)
    pub range: Option<String>,

    /// Start of an explicit range (`YYYY-MM-DD` or RFC 3339). Requires `to`.
    pub from: Option<String>,

    /// End of an explicit range, inclusive (`YYYY-MM-DD` or RFC 3339). Requires `from`.
    pub to: Option<String>,
}

impl DashboardParams {
    /// Validate the raw parameters. Every invalid field is reported, not just the first.
    pub fn into_query(self, default_range: RangePreset) -> Result<DashboardQuery, Vec<FieldError>> {
        let mut errors = Vec::new();

        let preset = match non_empty(self.range) {
            None => Some(default_range),
            Some(raw) => {
                let preset = RangePreset::parse(&raw);
                if preset.is_none() {
                    errors.push(FieldError::new("range", "Invalid enum value. Expected '1d' | '7d' | '30d' | 'all'"));
                }
                preset
            }
        };

        let from = non_empty(self.from);
        let to = non_empty(self.to);
        let between = match (from, to) {
            (None, None) => None,
            (Some(_), None) | (None, Some(_)) => {
                errors.push(FieldError::new("from", "Both 'from' and 'to' must be provided together"));
                None
            }
            (Some(from), Some(to)) => {
                let from = parse_instant(&from).ok_or_else(|| FieldError::new("from", "Invalid date"));
                let to = parse_instant(&to).ok_or_else(|| FieldError::new("to", "Invalid date"));
                match (from, to) {
                    (Ok(from), Ok(to)) if from > to => {
                        errors.push(FieldError::new("from", "'from' must be before or equal to 'to'"));
                        None
                    }
                    (Ok(from), Ok(to)) => Some(DashboardQuery::Between { from, to }),
                    (from, to) => {
                        errors.extend(from.err());
                        errors.extend(to.err());
                        None
                    }
                }
            }
        };

        if !errors.is_empty() {
            return Err(errors);
        }
        match (between, preset) {
            (Some(between), _) => Ok(between),
            (None, Some(preset)) => Ok(DashboardQuery::Preset(preset)),
            (None, None) => Ok(DashboardQuery::Preset(default_range)),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

/// Accepts a calendar date (midnight UTC), an RFC 3339 timestamp, or a naive timestamp taken as UTC.
pub fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN).and_utc());
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Some(timestamp.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Headline numbers for the window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_requests: i64,
    pub total_tokens: i64,
    pub total_cost: f64,
    pub completion_tokens: i64,
    /// Milliseconds
    pub avg_latency: f64,
    /// Completion tokens per second over the whole window
    pub avg_tps: f64,
    pub avg_tokens_per_request: f64,
    pub avg_cost_per_request: f64,
    /// Percentage in `[0, 100]`
    pub success_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TokensTrendPoint {
    pub date: String,
    pub prompt: i64,
    pub completion: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CostTrendPoint {
    pub date: String,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RequestsTrendPoint {
    pub date: String,
    pub requests: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProviderUsage {
    pub provider: String,
    pub tokens: i64,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BrandUsage {
    pub brand: String,
    pub tokens: i64,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ModelTokens {
    pub model: String,
    pub tokens: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ModelTps {
    pub model: String,
    pub tps: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ModelRequests {
    pub model: String,
    pub requests: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

/// Direction of a series, comparing its second half against its first
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrendIndicator {
    pub percentage: f64,
    pub is_up: bool,
}

impl Default for TrendIndicator {
    fn default() -> Self {
        Self {
            percentage: 0.0,
            is_up: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Trends {
    pub tokens: TrendIndicator,
    pub cost: TrendIndicator,
    pub requests: TrendIndicator,
}

/// One day of the activity heatmap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HeatmapCell {
    /// `YYYY-MM-DD`
    pub date: String,
    pub value: i64,
    /// Intensity bucket from 0 (no activity) to 4
    pub level: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HeatmapPeak {
    pub date: String,
    pub value: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapStats {
    pub total_requests: i64,
    pub active_days: usize,
    pub most_active: Option<HeatmapPeak>,
}

/// Trailing-year daily activity, Sunday-aligned and zero-filled
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Heatmap {
    pub requests: Vec<HeatmapCell>,
    pub tokens: Vec<HeatmapCell>,
    /// Number of week columns
    pub weeks: usize,
    pub stats: HeatmapStats,
}

/// The resolved query window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WindowInfo {
    pub label: String,
    pub start: DateTime<Utc>,
    /// `null` for open-ended preset windows
    pub end: Option<DateTime<Utc>>,
    pub granularity: BucketFormat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub summary: DashboardSummary,
    pub tokens_trend: Vec<TokensTrendPoint>,
    pub cost_trend: Vec<CostTrendPoint>,
    pub requests_trend: Vec<RequestsTrendPoint>,
    pub by_provider: Vec<ProviderUsage>,
    pub by_brand: Vec<BrandUsage>,
    pub tokens_by_model: Vec<ModelTokens>,
    pub tps_by_model: Vec<ModelTps>,
    pub requests_by_model: Vec<ModelRequests>,
    pub by_status: Vec<StatusCount>,
    pub trends: Trends,
    pub heatmap: Heatmap,
    pub window: WindowInfo,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn params(range: Option<&str>, from: Option<&str>, to: Option<&str>) -> DashboardParams {
        DashboardParams {
            range: range.map(String::from),
            from: from.map(String::from),
            to: to.map(String::from),
        }
    }

    fn paths(errors: &[FieldError]) -> Vec<String> {
        errors.iter().map(|error| error.path.join(".")).collect()
    }

    #[test]
    fn test_defaults_to_configured_range() {
        let query = DashboardParams::default().into_query(RangePreset::SevenDays).unwrap();
        assert_eq!(query, DashboardQuery::Preset(RangePreset::SevenDays));

        let query = params(Some(""), None, None).into_query(RangePreset::ThirtyDays).unwrap();
        assert_eq!(query, DashboardQuery::Preset(RangePreset::ThirtyDays));
    }

    #[test]
    fn test_preset_ranges() {
        for preset in RangePreset::ALL {
            let query = params(Some(preset.as_str()), None, None).into_query(RangePreset::SevenDays).unwrap();
            assert_eq!(query, DashboardQuery::Preset(preset));
        }
    }

    #[test]
    fn test_unknown_range_rejected() {
        let errors = params(Some("90d"), None, None).into_query(RangePreset::SevenDays).unwrap_err();
        assert_eq!(paths(&errors), vec!["range"]);
    }

    #[test]
    fn test_explicit_dates_take_precedence() {
        let query = params(Some("1d"), Some("2025-01-01"), Some("2025-01-31T12:00:00Z"))
            .into_query(RangePreset::SevenDays)
            .unwrap();
        assert_eq!(
            query,
            DashboardQuery::Between {
                from: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
                to: Utc.with_ymd_and_hms(2025, 1, 31, 12, 0, 0).unwrap(),
            }
        );
    }

    #[test]
    fn test_from_without_to_rejected() {
        let errors = params(None, Some("2025-01-01"), None).into_query(RangePreset::SevenDays).unwrap_err();
        assert_eq!(paths(&errors), vec!["from"]);
        assert_eq!(errors[0].message, "Both 'from' and 'to' must be provided together");

        let errors = params(None, None, Some("2025-01-01")).into_query(RangePreset::SevenDays).unwrap_err();
        assert_eq!(paths(&errors), vec!["from"]);
    }

    #[test]
    fn test_reversed_range_rejected() {
        let errors = params(None, Some("2025-02-01"), Some("2025-01-01"))
            .into_query(RangePreset::SevenDays)
            .unwrap_err();
        assert_eq!(paths(&errors), vec!["from"]);
        assert_eq!(errors[0].message, "'from' must be before or equal to 'to'");
    }

    #[test]
    fn test_equal_bounds_allowed() {
        let query = params(None, Some("2025-02-01"), Some("2025-02-01"))
            .into_query(RangePreset::SevenDays)
            .unwrap();
        assert!(matches!(query, DashboardQuery::Between { from, to } if from == to));
    }

    #[test]
    fn test_every_invalid_field_reported() {
        let errors = params(Some("week"), Some("yesterday"), Some("2025-13-01"))
            .into_query(RangePreset::SevenDays)
            .unwrap_err();
        assert_eq!(paths(&errors), vec!["range", "from", "to"]);
        assert!(errors[1..].iter().all(|error| error.message == "Invalid date"));
    }

    #[test]
    fn test_parse_instant_formats() {
        let expected = Utc.with_ymd_and_hms(2025, 3, 1, 8, 30, 0).unwrap();
        assert_eq!(parse_instant("2025-03-01T08:30:00Z"), Some(expected));
        assert_eq!(parse_instant("2025-03-01T10:30:00+02:00"), Some(expected));
        assert_eq!(parse_instant("2025-03-01T08:30:00"), Some(expected));
        assert_eq!(
            parse_instant("2025-03-01"),
            Some(Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_instant("03/01/2025"), None);
    }

    #[test]
    fn test_response_is_camel_case() {
        let summary = serde_json::to_value(DashboardSummary::default()).unwrap();
        assert!(summary.get("avgTokensPerRequest").is_some());
        assert!(summary.get("successRate").is_some());

        let indicator = serde_json::to_value(TrendIndicator::default()).unwrap();
        assert_eq!(indicator, serde_json::json!({"percentage": 0.0, "isUp": true}));
    }
}
