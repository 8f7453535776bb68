use chrono::TimeZone;
use std::fmt::Display;

use crate::model::{DailyForecast, ForecastEntry, round_half_up};

/// Number of day tiles shown in the forecast strip.
pub const MAX_DAYS: usize = 5;

/// Groups 3-hour entries into day tiles keyed by short weekday name.
///
/// Each entry is placed with the offset `tz` has at that entry's own instant.
///
/// Groups keep first-seen order and only the first [`MAX_DAYS`] are returned.
/// The key is the weekday name, not the calendar date: two dates seven days
/// apart land in the same group. The 5-day feed never spans that far.
pub fn group_by_weekday<Tz>(entries: Vec<ForecastEntry>, tz: &Tz) -> Vec<DailyForecast>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut groups: Vec<(String, Vec<ForecastEntry>)> = Vec::new();

    for entry in entries {
        let label = entry.time.with_timezone(tz).format("%a").to_string();
        match groups.iter_mut().find(|(day, _)| *day == label) {
            Some((_, bucket)) => bucket.push(entry),
            None => groups.push((label, vec![entry])),
        }
    }

    groups
        .into_iter()
        .take(MAX_DAYS)
        .map(|(label, entries)| summarize(label, entries))
        .collect()
}

fn summarize(label: String, entries: Vec<ForecastEntry>) -> DailyForecast {
    let sum: f64 = entries.iter().map(|e| e.temperature).sum();
    let average_temperature = round_half_up(sum / entries.len() as f64);
    let icon = entries[entries.len() / 2].icon.clone();

    DailyForecast {
        label,
        entries,
        average_temperature,
        icon,
    }
}
