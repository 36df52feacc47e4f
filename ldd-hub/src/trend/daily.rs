//! Per-minute category percentages over the last 24 hours
//!
//! Buckets are UTC minute boundaries. Only minutes that have readings appear
//! in the output; the series are sparse, not zero-filled.

use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use super::percentage;
use crate::model::{Reading, SizeCategory};

/// Length of the daily window in hours
pub const DAILY_WINDOW_HOURS: i64 = 24;

/// Daily trend response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTrend {
    /// Bucket starts, ascending
    pub timestamps: Vec<DateTime<Utc>>,
    /// Per category, one percentage per entry of `timestamps`
    pub series: BTreeMap<SizeCategory, Vec<f64>>,
    pub generated_at: DateTime<Utc>,
}

/// `[now - 24h, now)`
pub fn daily_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (now - Duration::hours(DAILY_WINDOW_HOURS), now)
}

/// Truncate a timestamp to its UTC minute
pub fn minute_bucket(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    timestamp
        .duration_trunc(Duration::minutes(1))
        .unwrap_or(timestamp)
}

/// Build the minute series from readings
///
/// Readings outside the window are ignored.
pub fn daily_trend(readings: &[Reading], now: DateTime<Utc>) -> DailyTrend {
    let (start, end) = daily_window(now);

    // i128 sums cannot overflow for any realistic number of i64 counts
    let mut buckets: BTreeMap<DateTime<Utc>, BTreeMap<SizeCategory, i128>> = BTreeMap::new();
    for reading in readings
        .iter()
        .filter(|r| r.timestamp >= start && r.timestamp < end)
    {
        *buckets
            .entry(minute_bucket(reading.timestamp))
            .or_default()
            .entry(reading.size_category)
            .or_insert(0) += i128::from(reading.count);
    }

    let mut series: BTreeMap<SizeCategory, Vec<f64>> = SizeCategory::ALL
        .into_iter()
        .map(|category| (category, Vec::with_capacity(buckets.len())))
        .collect();

    for counts in buckets.values() {
        let total: i128 = counts.values().sum();
        for (category, values) in series.iter_mut() {
            let count = counts.get(category).copied().unwrap_or(0);
            values.push(percentage(count, total));
        }
    }

    DailyTrend {
        timestamps: buckets.into_keys().collect(),
        series,
        generated_at: now,
    }
}
