//! Derived metrics over aggregate sums.
//!
//! An empty window is a normal state, so every ratio here returns 0 instead of dividing by zero.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use super::source::SummarySums;
use crate::api::models::dashboard::{DashboardSummary, TrendIndicator};

pub fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// `numerator / count`, or 0 when `count` is 0.
pub fn per_request(numerator: f64, count: i64) -> f64 {
    if count == 0 { 0.0 } else { numerator / count as f64 }
}

pub fn avg_latency(latency_sum: i64, requests: i64) -> f64 {
    per_request(latency_sum as f64, requests)
}

/// Completion tokens per second, with latency summed in milliseconds.
pub fn tokens_per_second(completion_tokens: i64, latency_ms: i64) -> f64 {
    if latency_ms == 0 {
        0.0
    } else {
        completion_tokens as f64 / latency_ms as f64 * 1000.0
    }
}

/// Percentage of successful requests.
pub fn success_rate(successes: i64, requests: i64) -> f64 {
    per_request(successes as f64, requests) * 100.0
}

/// Compare the sum of the second half of a series with the first. The first half is the first
/// `floor(n / 2)` points.
pub fn trend(values: &[f64]) -> TrendIndicator {
    if values.len() < 2 {
        return TrendIndicator::default();
    }

    let (first, second) = values.split_at(values.len() / 2);
    let first: f64 = first.iter().sum();
    let second: f64 = second.iter().sum();

    if first == 0.0 {
        return TrendIndicator {
            percentage: if second > 0.0 { 100.0 } else { 0.0 },
            is_up: true,
        };
    }

    TrendIndicator {
        percentage: (second - first).abs() / first * 100.0,
        is_up: second >= first,
    }
}

pub fn summarize(sums: &SummarySums, success_count: i64) -> DashboardSummary {
    let avg_cost_per_request = if sums.requests == 0 {
        0.0
    } else {
        to_f64(sums.cost / Decimal::from(sums.requests))
    };

    DashboardSummary {
        total_requests: sums.requests,
        total_tokens: sums.total_tokens,
        total_cost: to_f64(sums.cost),
        completion_tokens: sums.completion_tokens,
        avg_latency: avg_latency(sums.latency, sums.requests),
        avg_tps: tokens_per_second(sums.completion_tokens, sums.latency),
        avg_tokens_per_request: per_request(sums.total_tokens as f64, sums.requests),
        avg_cost_per_request,
        success_rate: success_rate(success_count, sums.requests),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_safety() {
        let summary = summarize(&SummarySums::default(), 0);
        assert_eq!(summary, DashboardSummary::default());
        assert_eq!(tokens_per_second(500, 0), 0.0);
        assert_eq!(success_rate(0, 0), 0.0);
        assert_eq!(avg_latency(0, 0), 0.0);
    }

    #[test]
    fn test_summary_ratios() {
        let sums = SummarySums {
            requests: 4,
            prompt_tokens: 600,
            completion_tokens: 400,
            total_tokens: 1000,
            cost: Decimal::new(2, 0),
            latency: 8000,
        };
        let summary = summarize(&sums, 3);
        assert_eq!(summary.avg_latency, 2000.0);
        assert_eq!(summary.avg_tps, 50.0);
        assert_eq!(summary.avg_tokens_per_request, 250.0);
        assert_eq!(summary.avg_cost_per_request, 0.5);
        assert_eq!(summary.success_rate, 75.0);
        assert_eq!(summary.total_cost, 2.0);
    }

    #[test]
    fn test_tokens_per_second() {
        assert!((tokens_per_second(50, 3000) - 16.666_666_666).abs() < 1e-6);
    }

    #[test]
    fn test_trend_short_series() {
        assert_eq!(trend(&[]), TrendIndicator::default());
        assert_eq!(trend(&[42.0]), TrendIndicator::default());
    }

    #[test]
    fn test_trend_from_zero() {
        assert_eq!(
            trend(&[0.0, 5.0]),
            TrendIndicator {
                percentage: 100.0,
                is_up: true
            }
        );
        assert_eq!(trend(&[0.0, 0.0, 0.0]), TrendIndicator::default());
    }

    #[test]
    fn test_trend_direction() {
        // First half is [10], second half is [5, 10]
        assert_eq!(
            trend(&[10.0, 5.0, 10.0]),
            TrendIndicator {
                percentage: 50.0,
                is_up: true
            }
        );
        assert_eq!(
            trend(&[10.0, 10.0, 5.0, 5.0]),
            TrendIndicator {
                percentage: 50.0,
                is_up: false
            }
        );
        assert_eq!(
            trend(&[3.0, 3.0]),
            TrendIndicator {
                percentage: 0.0,
                is_up: true
            }
        );
    }
}
