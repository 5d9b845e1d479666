use std::fmt;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Serialize, Serializer};

/// Monday-anchored ISO-8601 week bucket, rendered as `2026-W03`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WeekKey {
    year: i32,
    week: u32,
}

impl WeekKey {
    pub fn of(at: DateTime<Utc>) -> Self {
        Self::of_date(at.date_naive())
    }

    /// The week belongs to the year holding its Thursday, and week 1 is
    /// the week holding the year's first Thursday.
    pub fn of_date(date: NaiveDate) -> Self {
        let iso_weekday = i64::from(date.weekday().number_from_monday());
        let thursday = date + Duration::days(4 - iso_weekday);
        let week = (thursday.ordinal() + 6) / 7;

        WeekKey {
            year: thursday.year(),
            week,
        }
    }
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

impl Serialize for WeekKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Monday of the ISO week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Start of a look-back window of `days` ending at `now`. Negative spans
/// count as zero and spans past the representable range saturate.
pub fn days_before(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    Duration::try_days(days.max(0))
        .and_then(|span| now.checked_sub_signed(span))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
