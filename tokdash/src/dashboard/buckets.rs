//! Query windows and time bucket labels.

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Preset time ranges offered by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub enum RangePreset {
    #[serde(rename = "1d")]
    OneDay,
    #[default]
    #[serde(rename = "7d")]
    SevenDays,
    #[serde(rename = "30d")]
    ThirtyDays,
    #[serde(rename = "all")]
    All,
}

impl RangePreset {
    pub const ALL: [RangePreset; 4] = [RangePreset::OneDay, RangePreset::SevenDays, RangePreset::ThirtyDays, RangePreset::All];

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|preset| preset.as_str() == value)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RangePreset::OneDay => "1d",
            RangePreset::SevenDays => "7d",
            RangePreset::ThirtyDays => "30d",
            RangePreset::All => "all",
        }
    }

    /// How far back the preset reaches, or `None` for all time.
    pub fn lookback(&self) -> Option<Duration> {
        match self {
            RangePreset::OneDay => Some(Duration::hours(24)),
            RangePreset::SevenDays => Some(Duration::hours(168)),
            RangePreset::ThirtyDays => Some(Duration::hours(720)),
            RangePreset::All => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RangePreset::OneDay => "Last 24 hours",
            RangePreset::SevenDays => "Last 7 days",
            RangePreset::ThirtyDays => "Last 30 days",
            RangePreset::All => "All time",
        }
    }
}

/// A validated dashboard query: either a preset or an explicit closed range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardQuery {
    Preset(RangePreset),
    Between { from: DateTime<Utc>, to: DateTime<Utc> },
}

impl DashboardQuery {
    pub fn label(&self) -> String {
        match self {
            DashboardQuery::Preset(preset) => preset.label().to_string(),
            DashboardQuery::Between { from, to } => {
                format!("{} to {}", from.format("%Y-%m-%d"), to.format("%Y-%m-%d"))
            }
        }
    }
}

/// Resolved time window. An open window (`end == None`) has no upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

impl Window {
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.start && self.end.is_none_or(|end| timestamp <= end)
    }

    /// Span of the window, measuring open windows up to `now`.
    pub fn span(&self, now: DateTime<Utc>) -> Duration {
        self.end.unwrap_or(now) - self.start
    }
}

/// Granularity and label format of trend buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BucketFormat {
    /// `HH:00` labels
    Hourly,
    /// `MM-DD` labels
    Daily,
}

impl BucketFormat {
    /// Truncate a timestamp to the start of its bucket.
    pub fn truncate(&self, timestamp: DateTime<Utc>) -> DateTime<Utc> {
        let hour = match self {
            BucketFormat::Hourly => timestamp.hour(),
            BucketFormat::Daily => 0,
        };
        timestamp
            .date_naive()
            .and_hms_opt(hour, 0, 0)
            .map(|naive| naive.and_utc())
            .unwrap_or(timestamp)
    }

    /// SQL `date_trunc` field for this granularity.
    pub fn trunc_unit(&self) -> &'static str {
        match self {
            BucketFormat::Hourly => "hour",
            BucketFormat::Daily => "day",
        }
    }
}

pub fn resolve_window(query: &DashboardQuery, now: DateTime<Utc>) -> Window {
    match query {
        DashboardQuery::Preset(preset) => Window {
            start: preset.lookback().map(|lookback| now - lookback).unwrap_or(DateTime::UNIX_EPOCH),
            end: None,
        },
        DashboardQuery::Between { from, to } => Window {
            start: *from,
            end: Some(*to),
        },
    }
}

/// Hourly buckets for windows of at most 24 hours, daily otherwise.
pub fn bucket_format(window: &Window, now: DateTime<Utc>) -> BucketFormat {
    if window.span(now) <= Duration::hours(24) {
        BucketFormat::Hourly
    } else {
        BucketFormat::Daily
    }
}

/// Label of the bucket containing `timestamp` (UTC).
pub fn bucket_key(timestamp: DateTime<Utc>, format: BucketFormat) -> String {
    match format {
        BucketFormat::Hourly => timestamp.format("%H:00").to_string(),
        BucketFormat::Daily => timestamp.format("%m-%d").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_preset_parsing() {
        assert_eq!(RangePreset::parse("1d"), Some(RangePreset::OneDay));
        assert_eq!(RangePreset::parse("all"), Some(RangePreset::All));
        assert_eq!(RangePreset::parse("7D"), None);
        assert_eq!(RangePreset::parse("90d"), None);
        assert_eq!(RangePreset::default(), RangePreset::SevenDays);
    }

    #[test]
    fn test_resolve_preset_windows() {
        let now = at(2025, 3, 10, 12, 0);

        let window = resolve_window(&DashboardQuery::Preset(RangePreset::SevenDays), now);
        assert_eq!(window.start, at(2025, 3, 3, 12, 0));
        assert_eq!(window.end, None);

        let window = resolve_window(&DashboardQuery::Preset(RangePreset::ThirtyDays), now);
        assert_eq!(window.start, now - Duration::hours(720));

        let window = resolve_window(&DashboardQuery::Preset(RangePreset::All), now);
        assert_eq!(window.start, DateTime::UNIX_EPOCH);
        assert_eq!(window.end, None);
    }

    #[test]
    fn test_resolve_explicit_window_is_closed() {
        let from = at(2025, 1, 1, 0, 0);
        let to = at(2025, 1, 5, 0, 0);
        let window = resolve_window(&DashboardQuery::Between { from, to }, at(2025, 6, 1, 0, 0));
        assert_eq!(window, Window { start: from, end: Some(to) });
        assert!(window.contains(from));
        assert!(window.contains(to));
        assert!(!window.contains(to + Duration::seconds(1)));
        assert!(!window.contains(from - Duration::seconds(1)));
    }

    #[test]
    fn test_bucket_format_switches_at_24_hours() {
        let now = at(2025, 3, 10, 12, 0);
        let t = at(2025, 3, 1, 6, 0);

        let short = resolve_window(&DashboardQuery::Between { from: t, to: t + Duration::hours(23) }, now);
        assert_eq!(bucket_format(&short, now), BucketFormat::Hourly);

        let exact = resolve_window(&DashboardQuery::Between { from: t, to: t + Duration::hours(24) }, now);
        assert_eq!(bucket_format(&exact, now), BucketFormat::Hourly);

        let long = resolve_window(&DashboardQuery::Between { from: t, to: t + Duration::hours(25) }, now);
        assert_eq!(bucket_format(&long, now), BucketFormat::Daily);

        let empty = resolve_window(&DashboardQuery::Between { from: t, to: t }, now);
        assert_eq!(bucket_format(&empty, now), BucketFormat::Hourly);
    }

    #[test]
    fn test_bucket_format_for_presets() {
        let now = at(2025, 3, 10, 12, 0);
        let format_of = |preset| bucket_format(&resolve_window(&DashboardQuery::Preset(preset), now), now);
        assert_eq!(format_of(RangePreset::OneDay), BucketFormat::Hourly);
        assert_eq!(format_of(RangePreset::SevenDays), BucketFormat::Daily);
        assert_eq!(format_of(RangePreset::ThirtyDays), BucketFormat::Daily);
        assert_eq!(format_of(RangePreset::All), BucketFormat::Daily);
    }

    #[test]
    fn test_bucket_keys() {
        let ts = Utc.with_ymd_and_hms(2025, 2, 7, 9, 45, 31).unwrap();
        assert_eq!(bucket_key(ts, BucketFormat::Hourly), "09:00");
        assert_eq!(bucket_key(ts, BucketFormat::Daily), "02-07");
        assert_eq!(bucket_key(at(2025, 12, 31, 23, 59), BucketFormat::Hourly), "23:00");
    }

    #[test]
    fn test_truncate() {
        let ts = Utc.with_ymd_and_hms(2025, 2, 7, 9, 45, 31).unwrap();
        assert_eq!(BucketFormat::Hourly.truncate(ts), at(2025, 2, 7, 9, 0));
        assert_eq!(BucketFormat::Daily.truncate(ts), at(2025, 2, 7, 0, 0));
    }

    #[test]
    fn test_query_labels() {
        assert_eq!(DashboardQuery::Preset(RangePreset::OneDay).label(), "Last 24 hours");
        let query = DashboardQuery::Between {
            from: at(2025, 1, 1, 0, 0),
            to: at(2025, 1, 31, 0, 0),
        };
        assert_eq!(query.label(), "2025-01-01 to 2025-01-31");
    }
}
