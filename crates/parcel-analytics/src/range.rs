use jiff::civil::Date;
use jiff::tz::TimeZone;
use jiff::{Timestamp, ToSpan};

/// An inclusive range of UTC calendar dates, never empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: Date,
    end: Date,
}

impl DateRange {
    /// Builds a range of at most `max_days` days.
    ///
    /// Out-of-bounds input is narrowed, never rejected: a reversed range
    /// collapses to the single day `end`, and an over-long range keeps its
    /// end and moves its start forward.
    pub fn clamped(start: Date, end: Date, max_days: u32) -> Self {
        let max_days = i64::from(max_days.max(1));
        let start = start.min(end);
        let earliest = end
            .checked_sub((max_days - 1).days())
            .unwrap_or(Date::MIN);

        Self {
            start: start.max(earliest),
            end,
        }
    }

    /// The `days` days ending with `today`, with `days` clamped to
    /// `1..=max_days`.
    pub fn recent(today: Date, days: i64, max_days: u32) -> Self {
        let days = days.clamp(1, i64::from(max_days.max(1)));
        let start = today.checked_sub((days - 1).days()).unwrap_or(Date::MIN);
        Self::clamped(start, today, max_days)
    }

    pub fn start(&self) -> Date {
        self.start
    }

    pub fn end(&self) -> Date {
        self.end
    }

    /// Number of calendar days covered, including both ends.
    pub fn days(&self) -> usize {
        self.start
            .until(self.end)
            .map(|span| span.get_days())
            .ok()
            .and_then(|days| usize::try_from(days).ok())
            .map_or(1, |days| days + 1)
    }

    /// Every date in the range, ascending.
    pub fn dates(&self) -> impl Iterator<Item = Date> {
        self.start.series(1.day()).take(self.days())
    }

    /// The half-open instant window `[start 00:00, end + 1 00:00)` in UTC.
    pub fn bounds(&self) -> (Timestamp, Timestamp) {
        let from = midnight_utc(self.start);
        let until = self
            .end
            .tomorrow()
            .map(midnight_utc)
            .unwrap_or(Timestamp::MAX);
        (from, until)
    }
}

fn midnight_utc(date: Date) -> Timestamp {
    date.to_zoned(TimeZone::UTC)
        .map(|zoned| zoned.timestamp())
        .unwrap_or(if date.year() < 0 {
            Timestamp::MIN
        } else {
            Timestamp::MAX
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::civil::date;

    #[test]
    fn inclusive_day_count() {
        let range = DateRange::clamped(date(2024, 1, 1), date(2024, 1, 7), 90);
        assert_eq!(range.days(), 7);
        assert_eq!(range.dates().last(), Some(date(2024, 1, 7)));
    }

    #[test]
    fn reversed_range_collapses_to_end_day() {
        let range = DateRange::clamped(date(2024, 5, 10), date(2024, 5, 1), 90);
        assert_eq!(range.start(), date(2024, 5, 1));
        assert_eq!(range.days(), 1);
    }

    #[test]
    fn long_range_is_narrowed_from_the_start() {
        let range = DateRange::clamped(date(2023, 1, 1), date(2024, 1, 1), 90);
        assert_eq!(range.end(), date(2024, 1, 1));
        assert_eq!(range.days(), 90);
        assert_eq!(range.start(), date(2023, 10, 4));
    }

    #[test]
    fn recent_days_are_clamped() {
        let today = date(2024, 3, 1);
        assert_eq!(DateRange::recent(today, 0, 90).days(), 1);
        assert_eq!(DateRange::recent(today, -5, 90).days(), 1);
        assert_eq!(DateRange::recent(today, 7, 90).start(), date(2024, 2, 24));
        assert_eq!(DateRange::recent(today, 1_000, 365).days(), 365);
    }

    #[test]
    fn bounds_cover_whole_utc_days() {
        let range = DateRange::clamped(date(2024, 2, 28), date(2024, 2, 29), 90);
        let (from, until) = range.bounds();

        assert_eq!(from.to_string(), "2024-02-28T00:00:00Z");
        assert_eq!(until.to_string(), "2024-03-01T00:00:00Z");
    }

    #[test]
    fn leap_day_is_counted() {
        let range = DateRange::clamped(date(2024, 2, 27), date(2024, 3, 1), 90);
        assert_eq!(range.days(), 4);
    }
}
