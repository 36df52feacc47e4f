//! Per-day small/large split over the last 7 local days
//!
//! Day boundaries are midnights in the supplied zone, never UTC unless UTC
//! is the zone passed in. All 7 days are emitted, zero data or not.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use super::percentage;
use crate::model::{Reading, SizeCategory, SizeClass};

/// Number of calendar days covered, today included
pub const WEEKLY_DAYS: i64 = 7;

/// Weekly history response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyHistory {
    /// Local calendar days, ascending
    pub dates: Vec<NaiveDate>,
    pub small_percentages: Vec<f64>,
    pub large_percentages: Vec<f64>,
}

/// Days and the UTC instants bounding them
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyWindow {
    pub days: Vec<NaiveDate>,
    /// Local midnight starting the first day
    pub start: DateTime<Utc>,
    /// Local midnight after the last day
    pub end: DateTime<Utc>,
}

/// Calendar day of `timestamp` in `tz`
pub fn local_day<Tz: TimeZone>(timestamp: DateTime<Utc>, tz: &Tz) -> NaiveDate {
    timestamp.with_timezone(tz).date_naive()
}

/// Start of `date` in `tz`, as a UTC instant
///
/// Where midnight does not exist locally (a DST gap) the naive midnight is
/// read as UTC, which keeps the window monotone.
fn local_midnight<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

/// The 7 local days ending today
pub fn weekly_window<Tz: TimeZone>(now: DateTime<Utc>, tz: &Tz) -> WeeklyWindow {
    let today = local_day(now, tz);
    let days: Vec<NaiveDate> = (0..WEEKLY_DAYS)
        .rev()
        .map(|back| today - Duration::days(back))
        .collect();

    let start = local_midnight(days[0], tz);
    let end = local_midnight(today + Duration::days(1), tz);

    WeeklyWindow { days, start, end }
}

/// Build the small/large daily split from readings
///
/// Readings falling on days outside the window are ignored.
pub fn weekly_history<Tz: TimeZone>(readings: &[Reading], now: DateTime<Utc>, tz: &Tz) -> WeeklyHistory {
    let window = weekly_window(now, tz);

    // Labels are classified once per call, not once per reading
    let classes: BTreeMap<SizeCategory, SizeClass> = SizeCategory::ALL
        .into_iter()
        .map(|category| (category, category.class()))
        .collect();

    let mut per_day: BTreeMap<NaiveDate, (i128, i128)> =
        window.days.iter().map(|day| (*day, (0, 0))).collect();

    for reading in readings {
        let Some((small, large)) = per_day.get_mut(&local_day(reading.timestamp, tz)) else {
            continue;
        };
        match classes[&reading.size_category] {
            SizeClass::Small => *small += i128::from(reading.count),
            SizeClass::Large => *large += i128::from(reading.count),
        }
    }

    let mut history = WeeklyHistory {
        dates: Vec::with_capacity(per_day.len()),
        small_percentages: Vec::with_capacity(per_day.len()),
        large_percentages: Vec::with_capacity(per_day.len()),
    };
    for (day, (small, large)) in per_day {
        let total = small + large;
        history.dates.push(day);
        history.small_percentages.push(percentage(small, total));
        history.large_percentages.push(percentage(large, total));
    }
    history
}
