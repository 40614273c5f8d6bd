use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;

use crate::models::DateRange;

/// One calendar month of a reporting window. `start`/`end` are the first and
/// last day of the whole month, even when the window only covers part of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthBucket {
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl MonthBucket {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Every calendar month intersecting `range`, oldest first.
pub fn month_buckets(range: DateRange) -> Vec<MonthBucket> {
    let mut buckets = Vec::new();
    if range.to < range.from {
        return buckets;
    }

    let mut cursor = first_of_month(range.from);
    let last = first_of_month(range.to);
    while cursor <= last {
        buckets.push(MonthBucket {
            label: cursor.format("%b %Y").to_string(),
            start: cursor,
            end: last_of_month(cursor),
        });
        match cursor.checked_add_months(Months::new(1)) {
            Some(next) => cursor = next,
            None => break,
        }
    }
    buckets
}

/// Whole months elapsed from `from` to `to`; a partial trailing month does not
/// count. Zero for inverted ranges.
pub fn whole_months_between(from: NaiveDate, to: NaiveDate) -> u32 {
    if to < from {
        return 0;
    }
    let mut months = (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32;
    if to.day() < from.day() {
        months -= 1;
    }
    months.max(0) as u32
}

/// The window immediately before `range`, spanning the same number of whole
/// months (at least one) and ending the day before `range.from`.
pub fn comparison_period(range: DateRange) -> DateRange {
    let length = whole_months_between(range.from, range.to).max(1);
    let from = range
        .from
        .checked_sub_months(Months::new(length))
        .unwrap_or(range.from);
    let to = range.from.pred_opt().unwrap_or(range.from);
    DateRange::new(from, to)
}

/// Billable days of a stay. Same-day or inverted stays bill as one day.
pub fn stay_days(start: NaiveDate, end: NaiveDate) -> i64 {
    let days = (end - start).num_days();
    if days <= 0 {
        1
    } else {
        days
    }
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn last_of_month(date: NaiveDate) -> NaiveDate {
    let first = first_of_month(date);
    first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(first)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{comparison_period, last_of_month, month_buckets, stay_days, whole_months_between};
    use crate::models::DateRange;

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn partial_boundary_months_are_included() {
        let buckets = month_buckets(DateRange::new(date("2024-01-15"), date("2024-03-10")));
        let labels: Vec<&str> = buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["Jan 2024", "Feb 2024", "Mar 2024"]);
        assert_eq!(buckets[1].start, date("2024-02-01"));
        assert_eq!(buckets[1].end, date("2024-02-29"));
    }

    #[test]
    fn buckets_cross_year_boundary() {
        let buckets = month_buckets(DateRange::new(date("2023-11-30"), date("2024-01-01")));
        let labels: Vec<&str> = buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["Nov 2023", "Dec 2023", "Jan 2024"]);
    }

    #[test]
    fn single_day_range_yields_one_bucket() {
        let buckets = month_buckets(DateRange::new(date("2023-06-05"), date("2023-06-05")));
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].label, "Jun 2023");
        assert!(buckets[0].contains(date("2023-06-30")));
    }

    #[test]
    fn inverted_range_yields_no_buckets() {
        assert!(month_buckets(DateRange::new(date("2024-03-01"), date("2024-01-01"))).is_empty());
    }

    #[test]
    fn counts_whole_months_only() {
        assert_eq!(whole_months_between(date("2024-01-15"), date("2024-03-10")), 1);
        assert_eq!(whole_months_between(date("2024-01-15"), date("2024-03-15")), 2);
        assert_eq!(whole_months_between(date("2024-01-01"), date("2024-01-31")), 0);
        assert_eq!(whole_months_between(date("2024-05-01"), date("2024-01-01")), 0);
    }

    #[test]
    fn comparison_period_precedes_range() {
        let previous = comparison_period(DateRange::new(date("2024-04-01"), date("2024-06-30")));
        assert_eq!(previous.from, date("2024-02-01"));
        assert_eq!(previous.to, date("2024-03-31"));

        let short = comparison_period(DateRange::new(date("2024-04-10"), date("2024-04-20")));
        assert_eq!(short.from, date("2024-03-10"));
        assert_eq!(short.to, date("2024-04-09"));
    }

    #[test]
    fn stay_days_clamps_to_one() {
        assert_eq!(stay_days(date("2024-06-10"), date("2024-06-15")), 5);
        assert_eq!(stay_days(date("2024-06-10"), date("2024-06-10")), 1);
        assert_eq!(stay_days(date("2024-06-10"), date("2024-06-01")), 1);
    }

    #[test]
    fn last_of_month_handles_leap_years() {
        assert_eq!(last_of_month(date("2023-02-11")), date("2023-02-28"));
        assert_eq!(last_of_month(date("2024-02-11")), date("2024-02-29"));
        assert_eq!(last_of_month(date("2024-12-31")), date("2024-12-31"));
    }
}
