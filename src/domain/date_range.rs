//! Inclusive day-by-day calendar range used by the link enumerator.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Inclusive range of calendar days, iterated in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a range covering `start..=end`. An inverted range is empty.
    pub const fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// A range covering a single day
    pub const fn single(day: NaiveDate) -> Self {
        Self { start: day, end: day }
    }

    /// Number of days in the range, both endpoints included
    pub fn len(&self) -> usize {
        let days = (self.end - self.start).num_days();
        usize::try_from(days + 1).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn days(&self) -> DateRangeIter {
        DateRangeIter {
            next: Some(self.start).filter(|d| *d <= self.end),
            end: self.end,
        }
    }
}

impl IntoIterator for DateRange {
    type Item = NaiveDate;
    type IntoIter = DateRangeIter;

    fn into_iter(self) -> Self::IntoIter {
        self.days()
    }
}

/// Iterator over the days of a [`DateRange`]
#[derive(Debug, Clone)]
pub struct DateRangeIter {
    next: Option<NaiveDate>,
    end: NaiveDate,
}

impl Iterator for DateRangeIter {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current
            .checked_add_days(Days::new(1))
            .filter(|d| *d <= self.end);
        Some(current)
    }
}

/// Generate every date from `start` to `end`, both included.
pub fn date_range(start: NaiveDate, end: NaiveDate) -> DateRangeIter {
    DateRange::new(start, end).days()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_week_range_is_inclusive() {
        let days: Vec<_> = date_range(ymd(2025, 11, 17), ymd(2025, 11, 23)).collect();
        assert_eq!(days.len(), 7);
        assert_eq!(days.first(), Some(&ymd(2025, 11, 17)));
        assert_eq!(days.last(), Some(&ymd(2025, 11, 23)));
    }

    #[test]
    fn test_single_day_range() {
        let range = DateRange::single(ymd(2025, 2, 28));
        assert_eq!(range.len(), 1);
        assert_eq!(range.days().collect::<Vec<_>>(), vec![ymd(2025, 2, 28)]);
    }

    #[test]
    fn test_range_crosses_month_and_year() {
        let days: Vec<_> = date_range(ymd(2024, 12, 30), ymd(2025, 1, 2)).collect();
        assert_eq!(
            days,
            vec![ymd(2024, 12, 30), ymd(2024, 12, 31), ymd(2025, 1, 1), ymd(2025, 1, 2)]
        );
    }

    #[test]
    fn test_inverted_range_is_empty() {
        let range = DateRange::new(ymd(2025, 11, 23), ymd(2025, 11, 17));
        assert!(range.is_empty());
        assert_eq!(range.days().count(), 0);
    }

    proptest! {
        #[test]
        fn range_yields_day_count_plus_one(start_offset in 0u64..20_000, span in 0u64..400) {
            let start = ymd(1990, 1, 1).checked_add_days(Days::new(start_offset)).unwrap();
            let end = start.checked_add_days(Days::new(span)).unwrap();
            let days: Vec<_> = date_range(start, end).collect();

            prop_assert_eq!(days.len() as i64, (end - start).num_days() + 1);
            prop_assert_eq!(days.first().copied(), Some(start));
            prop_assert_eq!(days.last().copied(), Some(end));
            prop_assert!(days.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
