//! Trend Engine
//!
//! Two windowed views over the stored readings:
//! - [`daily`]: per-minute category percentages over the last 24 hours (UTC)
//! - [`weekly`]: per-day small/large percentages over the last 7 local days
//!
//! The bucketing functions are pure and take their time zone explicitly;
//! the `compute_*` wrappers only fetch the window from the store.

use chrono::{DateTime, TimeZone, Utc};

use crate::db::ReadingStore;
use crate::error::HubResult;

pub mod daily;
pub mod weekly;

pub use daily::{daily_trend, daily_window, minute_bucket, DailyTrend};
pub use weekly::{local_day, weekly_history, weekly_window, WeeklyHistory};

/// Round to two decimal places
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `part` as a percentage of `total`, 0 when the total is 0
pub(crate) fn percentage(part: i128, total: i128) -> f64 {
    if total <= 0 {
        0.0
    } else {
        round2(part as f64 / total as f64 * 100.0)
    }
}

/// Daily trend for the 24 hours before `now`
pub async fn compute_daily(store: &dyn ReadingStore, now: DateTime<Utc>) -> HubResult<DailyTrend> {
    let (start, end) = daily_window(now);
    let readings = store.readings_in_range(start, end).await?;
    Ok(daily_trend(&readings, now))
}

/// Weekly history for the 7 days ending today in `tz`
pub async fn compute_weekly<Tz>(
    store: &dyn ReadingStore,
    now: DateTime<Utc>,
    tz: &Tz,
) -> HubResult<WeeklyHistory>
where
    Tz: TimeZone + Sync,
{
    let window = weekly_window(now, tz);
    let readings = store.readings_in_range(window.start, window.end).await?;
    Ok(weekly_history(&readings, now, tz))
}
