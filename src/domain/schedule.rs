use crate::domain::models::{DayRange, WorkTiming, DAY_ABBREVIATIONS};
use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime};

pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

pub fn date_key(now: NaiveDateTime) -> String {
    now.format(DATE_KEY_FORMAT).to_string()
}

fn hhmm(now: NaiveDateTime) -> String {
    now.format("%H:%M").to_string()
}

fn weekday_index(now: NaiveDateTime) -> u32 {
    now.weekday().num_days_from_sunday()
}

pub fn is_within_work_hours(timing: &WorkTiming, now: NaiveDateTime) -> bool {
    if !timing.includes_day(weekday_index(now)) {
        return false;
    }
    let current = hhmm(now);
    current.as_str() >= timing.start_time.as_str() && current.as_str() <= timing.end_time.as_str()
}

/// Level-triggered: stays true for the rest of a work day after `end_time`
/// until `last_notification_date` is set to today.
pub fn should_show_end_of_day_notification(
    timing: &WorkTiming,
    last_notification_date: &str,
    now: NaiveDateTime,
) -> bool {
    if last_notification_date == date_key(now) {
        return false;
    }
    if !timing.includes_day(weekday_index(now)) {
        return false;
    }
    hhmm(now).as_str() >= timing.end_time.as_str()
}

// Saturday (6) and Sunday (0) are not adjacent.
pub fn compress_work_days(days: &[u8]) -> Vec<DayRange> {
    let mut sorted = days.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut iter = sorted.into_iter();
    let Some(first) = iter.next() else {
        return Vec::new();
    };

    let mut ranges = Vec::new();
    let (mut start, mut end) = (first, first);
    for day in iter {
        if day == end + 1 {
            end = day;
            continue;
        }
        ranges.push(collapse(start, end));
        start = day;
        end = day;
    }
    ranges.push(collapse(start, end));
    ranges
}

fn collapse(start: u8, end: u8) -> DayRange {
    if start == end {
        DayRange::Single(start)
    } else {
        DayRange::Range(start, end)
    }
}

pub fn next_work_day(timing: &WorkTiming, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let start = NaiveTime::parse_from_str(&timing.start_time, "%H:%M").ok()?;
    let mut candidate = now.date();
    for _ in 0..7 {
        candidate = candidate + Duration::days(1);
        if timing.includes_day(candidate.weekday().num_days_from_sunday()) {
            return Some(candidate.and_time(start));
        }
    }
    None
}

pub fn work_hours_label(timing: &WorkTiming) -> String {
    let days = compress_work_days(&timing.work_days)
        .into_iter()
        .map(|range| match range {
            DayRange::Single(day) => day_name(day).to_string(),
            DayRange::Range(start, end) => format!("{} - {}", day_name(start), day_name(end)),
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("{} - {}, {}", timing.start_time, timing.end_time, days)
}

fn day_name(day: u8) -> &'static str {
    DAY_ABBREVIATIONS.get(usize::from(day)).copied().unwrap_or("?")
}
