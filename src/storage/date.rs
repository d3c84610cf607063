//! Calendar decomposition of UTC instants.
//!
//! Range queries never compare instants directly. Both sides are exploded into
//! calendar fields and a [`Window`] decides containment by field equality.

use std::fmt;

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};

/// A UTC instant broken into calendar fields.
///
/// `week` is the ISO-8601 week number, which near a year boundary may belong
/// to the adjacent year's numbering (2021-01-01 is in week 53).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExplodedDate {
    pub year: i32,
    /// 1..=12
    pub month: u32,
    pub week: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

/// Exploded fields that do not name any instant (e.g. February 30th).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "no UTC instant for {:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
    .0.year, .0.month, .0.day, .0.hour, .0.minute, .0.second
)]
pub struct InvalidDate(pub ExplodedDate);

/// Decompose an instant. Sub-second precision is dropped.
pub fn explode(t: &DateTime<Utc>) -> ExplodedDate {
    ExplodedDate {
        year: t.year(),
        month: t.month(),
        week: t.iso_week().week(),
        day: t.day(),
        hour: t.hour(),
        minute: t.minute(),
        second: t.second(),
    }
}

/// Rebuild the instant from its fields. The ISO week is not consulted.
pub fn compose(d: &ExplodedDate) -> Result<DateTime<Utc>, InvalidDate> {
    Utc.with_ymd_and_hms(d.year, d.month, d.day, d.hour, d.minute, d.second)
        .single()
        .ok_or(InvalidDate(*d))
}

/// ISO weekday of `t`: Monday is 1, Sunday is 7.
pub fn iso_weekday(t: &DateTime<Utc>) -> u32 {
    t.weekday().number_from_monday()
}

/// Range query bucket.
///
/// Containment is nested: a day match is always a week match, and a week
/// match is always a month match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// Same year, month, ISO week and day of month.
    Day,
    /// Same year, month and ISO week. Not a rolling seven-day span.
    Week,
    /// Same year and month.
    Month,
}

impl Window {
    pub fn contains(self, query: &ExplodedDate, candidate: &ExplodedDate) -> bool {
        let same_month = query.year == candidate.year && query.month == candidate.month;
        match self {
            Window::Month => same_month,
            Window::Week => same_month && query.week == candidate.week,
            Window::Day => {
                same_month && query.week == candidate.week && query.day == candidate.day
            }
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Window::Day => "day",
            Window::Week => "week",
            Window::Month => "month",
        })
    }
}
