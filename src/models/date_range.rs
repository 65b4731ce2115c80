use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// An inclusive span of calendar days. A one-day rental has
/// `start_date == end_date`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl DateRange {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> anyhow::Result<Self> {
        anyhow::ensure!(
            start_date <= end_date,
            "start date {start_date} is after end date {end_date}"
        );
        Ok(Self {
            start_date,
            end_date,
        })
    }

    /// Inclusive-boundary overlap: a rental returning on day N and one picking
    /// up on day N collide, so same-day turnover is never offered.
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start_date <= other.end_date && self.end_date >= other.start_date
    }

    /// Billable days, with same-day pickup/return charged as one full day.
    pub fn rental_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days().max(1)
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.start_date, self.end_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn range(start: &str, end: &str) -> DateRange {
        DateRange::new(d(start), d(end)).unwrap()
    }

    #[test]
    fn test_rejects_inverted_range() {
        assert!(DateRange::new(d("2024-06-10"), d("2024-06-09")).is_err());
    }

    #[test]
    fn test_same_day_range_is_valid() {
        let r = range("2024-06-10", "2024-06-10");
        assert_eq!(r.rental_days(), 1);
    }

    #[test]
    fn test_overlap_shared_boundary_day() {
        // Existing rental ends June 10, new request starts June 10: conflict.
        let existing = range("2024-06-05", "2024-06-10");
        let requested = range("2024-06-10", "2024-06-15");
        assert!(existing.overlaps(&requested));
        assert!(requested.overlaps(&existing));
    }

    #[test]
    fn test_no_overlap_next_day() {
        let existing = range("2024-06-05", "2024-06-10");
        let requested = range("2024-06-11", "2024-06-15");
        assert!(!existing.overlaps(&requested));
        assert!(!requested.overlaps(&existing));
    }

    #[test]
    fn test_overlap_contained_range() {
        let outer = range("2024-06-01", "2024-06-30");
        let inner = range("2024-06-10", "2024-06-12");
        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
    }

    #[test]
    fn test_rental_days_multi_day() {
        assert_eq!(range("2024-06-01", "2024-06-04").rental_days(), 3);
    }
}
