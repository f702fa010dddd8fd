//! Trailing-year activity heatmap.
//!
//! The grid does not depend on the query window: it always covers the 365 days ending today,
//! widened to whole Sunday-to-Saturday weeks, and every day in it gets a cell.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};

use super::source::DailyActivity;
use crate::api::models::dashboard::{Heatmap, HeatmapCell, HeatmapPeak, HeatmapStats};

const TRAILING_DAYS: i64 = 365;

/// Sunday-aligned span of whole weeks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeatmapGrid {
    /// Always a Sunday
    pub first: NaiveDate,
    /// Always a Saturday
    pub last: NaiveDate,
}

impl HeatmapGrid {
    /// The grid covering `today - 365 days ..= today`.
    pub fn ending(today: NaiveDate) -> Self {
        let start = today - Duration::days(TRAILING_DAYS);
        let first = start - Duration::days(i64::from(start.weekday().num_days_from_sunday()));
        let last = today + Duration::days(6 - i64::from(today.weekday().num_days_from_sunday()));
        Self { first, last }
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let last = self.last;
        self.first.iter_days().take_while(move |day| *day <= last)
    }

    pub fn day_count(&self) -> usize {
        ((self.last - self.first).num_days() + 1) as usize
    }

    pub fn weeks(&self) -> usize {
        self.day_count() / 7
    }

    /// First instant covered by the grid.
    pub fn since(&self) -> DateTime<Utc> {
        self.first.and_time(NaiveTime::MIN).and_utc()
    }
}

/// Thresholds at the 25th, 50th and 75th percentile of the non-zero values.
pub fn quartiles(values: &[i64]) -> Option<[i64; 3]> {
    let mut non_zero: Vec<i64> = values.iter().copied().filter(|value| *value > 0).collect();
    if non_zero.is_empty() {
        return None;
    }
    non_zero.sort_unstable();
    let at = |k: usize| non_zero[non_zero.len() * k / 4];
    Some([at(1), at(2), at(3)])
}

pub fn intensity(value: i64, thresholds: Option<[i64; 3]>) -> u8 {
    let Some([q1, q2, q3]) = thresholds else {
        return 0;
    };
    match value {
        v if v <= 0 => 0,
        v if v <= q1 => 1,
        v if v <= q2 => 2,
        v if v <= q3 => 3,
        _ => 4,
    }
}

fn cells(days: &[NaiveDate], values: &[i64]) -> Vec<HeatmapCell> {
    let thresholds = quartiles(values);
    days.iter()
        .zip(values)
        .map(|(day, value)| HeatmapCell {
            date: day.format("%Y-%m-%d").to_string(),
            value: *value,
            level: intensity(*value, thresholds),
        })
        .collect()
}

/// Lay daily activity onto the grid, filling missing days with zero. Days outside the grid are
/// ignored.
pub fn build(grid: &HeatmapGrid, activity: &[DailyActivity]) -> Heatmap {
    let by_day: HashMap<NaiveDate, &DailyActivity> = activity.iter().map(|day| (day.day, day)).collect();
    let days: Vec<NaiveDate> = grid.days().collect();

    let mut requests = Vec::with_capacity(days.len());
    let mut tokens = Vec::with_capacity(days.len());
    for day in &days {
        let found = by_day.get(day);
        requests.push(found.map_or(0, |day| day.requests));
        tokens.push(found.map_or(0, |day| day.tokens));
    }

    // Earliest day wins ties
    let mut most_active: Option<HeatmapPeak> = None;
    for (day, value) in days.iter().zip(&requests) {
        if *value > 0 && most_active.as_ref().is_none_or(|peak| *value > peak.value) {
            most_active = Some(HeatmapPeak {
                date: day.format("%Y-%m-%d").to_string(),
                value: *value,
            });
        }
    }

    let stats = HeatmapStats {
        total_requests: requests.iter().sum(),
        active_days: requests.iter().filter(|value| **value > 0).count(),
        most_active,
    };

    Heatmap {
        requests: cells(&days, &requests),
        tokens: cells(&days, &tokens),
        weeks: grid.weeks(),
        stats,
    }
}
