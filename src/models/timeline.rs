//! Resume timeline ordering.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use super::{Education, WorkExperience};
use crate::store::parse_date_str;

/// A dated entry on the resume timeline.
pub trait TimelineEntry {
    fn start_date(&self) -> Option<&str>;
    fn end_date(&self) -> Option<&str>;
    fn display_order(&self) -> Option<i64>;
}

impl TimelineEntry for Education {
    fn start_date(&self) -> Option<&str> {
        self.start_date.as_deref()
    }
    fn end_date(&self) -> Option<&str> {
        self.end_date.as_deref()
    }
    fn display_order(&self) -> Option<i64> {
        self.display_order
    }
}

impl TimelineEntry for WorkExperience {
    fn start_date(&self) -> Option<&str> {
        self.start_date.as_deref()
    }
    fn end_date(&self) -> Option<&str> {
        self.end_date.as_deref()
    }
    fn display_order(&self) -> Option<i64> {
        self.display_order
    }
}

/// Pairs an entry with data that travels with it through sorting.
impl<T: TimelineEntry, U> TimelineEntry for (T, U) {
    fn start_date(&self) -> Option<&str> {
        self.0.start_date()
    }
    fn end_date(&self) -> Option<&str> {
        self.0.end_date()
    }
    fn display_order(&self) -> Option<i64> {
        self.0.display_order()
    }
}

/// Most recent first by end date; entries without a (parseable) end date go
/// last. Ties fall back to start date, then `display_order`.
pub fn sort_timeline<T: TimelineEntry>(entries: &mut [T]) {
    entries.sort_by(|a, b| {
        desc_nulls_last(parse(a.end_date()), parse(b.end_date()))
            .then_with(|| desc_nulls_last(parse(a.start_date()), parse(b.start_date())))
            .then_with(|| asc_nulls_last(a.display_order(), b.display_order()))
    });
}

fn parse(value: Option<&str>) -> Option<DateTime<Utc>> {
    value.and_then(parse_date_str)
}

fn desc_nulls_last<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn asc_nulls_last<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(company: &str, start: Option<&str>, end: Option<&str>, order: Option<i64>) -> WorkExperience {
        WorkExperience {
            company: Some(company.to_string()),
            start_date: start.map(str::to_string),
            end_date: end.map(str::to_string),
            display_order: order,
            ..Default::default()
        }
    }

    fn companies(entries: &[WorkExperience]) -> Vec<&str> {
        entries
            .iter()
            .map(|e| e.company.as_deref().unwrap_or(""))
            .collect()
    }

    #[test]
    fn test_end_date_desc_nulls_last() {
        let mut entries = vec![
            job("ongoing", Some("2023-01-01"), None, None),
            job("old", Some("2015-01-01"), Some("2017-06-30"), None),
            job("recent", Some("2018-01-01"), Some("2022-12-31"), None),
        ];
        sort_timeline(&mut entries);
        assert_eq!(companies(&entries), vec!["recent", "old", "ongoing"]);
    }

    #[test]
    fn test_unparseable_end_date_sorts_as_null() {
        let mut entries = vec![
            job("garbled", None, Some("sometime"), None),
            job("dated", None, Some("2020-01-01"), None),
        ];
        sort_timeline(&mut entries);
        assert_eq!(companies(&entries), vec!["dated", "garbled"]);
    }

    #[test]
    fn test_ties_break_on_start_then_display_order() {
        let mut entries = vec![
            job("b", Some("2019-01-01"), Some("2021-01-01"), Some(2)),
            job("a", Some("2019-01-01"), Some("2021-01-01"), Some(1)),
            job("later-start", Some("2020-01-01"), Some("2021-01-01"), Some(9)),
        ];
        sort_timeline(&mut entries);
        assert_eq!(companies(&entries), vec!["later-start", "a", "b"]);
    }

    #[test]
    fn test_mixed_date_formats() {
        let mut entries = vec![
            Education {
                institution: Some("date".to_string()),
                end_date: Some("2020-06-01".to_string()),
                ..Default::default()
            },
            Education {
                institution: Some("timestamp".to_string()),
                end_date: Some("2021-06-01T00:00:00+00:00".to_string()),
                ..Default::default()
            },
        ];
        sort_timeline(&mut entries);
        assert_eq!(entries[0].institution.as_deref(), Some("timestamp"));
    }
}
