//! Overdue classifier: elapsed-day arithmetic over calendar dates

use chrono::{Local, NaiveDate};

use crate::models::BorrowRecord;

/// Days since `start_date` after which an unreturned loan counts as
/// overdue. Policy constant; overridable through `LedgerConfig`.
pub const DEFAULT_OVERDUE_THRESHOLD_DAYS: i64 = 14;

/// Whole calendar days between two local dates. Both endpoints are already
/// at date granularity, so this is plain date subtraction, not elapsed
/// wall-clock hours.
pub fn elapsed_days(start: NaiveDate, reference: NaiveDate) -> i64 {
    (reference - start).num_days()
}

/// Lenient parse for dates arriving as form text. Accepts ISO dates with an
/// optional time suffix; anything else is `None`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let date_part = trimmed.split(['T', ' ']).next().unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// String-boundary variant of [`elapsed_days`]: an unparseable date on
/// either side yields 0 rather than an error.
pub fn elapsed_days_str(start: &str, reference: &str) -> i64 {
    match (parse_date(start), parse_date(reference)) {
        (Some(s), Some(r)) => elapsed_days(s, r),
        _ => 0,
    }
}

/// A loan is overdue when still unreturned and out for at least
/// `threshold_days`. Flips to false the instant it is returned, regardless
/// of how long it was out.
pub fn is_overdue(record: &BorrowRecord, threshold_days: i64, today: NaiveDate) -> bool {
    record.is_active() && elapsed_days(record.start_date, today) >= threshold_days
}

/// Today at local-date granularity, the reference used by dashboard and
/// report views.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn record(start: &str, returned: bool) -> BorrowRecord {
        BorrowRecord {
            id: "b1".to_string(),
            asset_id: "A1".to_string(),
            asset_name: "Laptop".to_string(),
            peripherals: None,
            lender_name: "Stock".to_string(),
            borrower_name: "Kim".to_string(),
            borrower_dept: None,
            start_date: date(start),
            end_date: None,
            returned_at: returned.then(Utc::now),
            borrower_sign: "data:image/png;base64,AAAA".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_elapsed_days() {
        assert_eq!(elapsed_days(date("2024-01-01"), date("2024-01-02")), 1);
        assert_eq!(elapsed_days(date("2024-01-01"), date("2024-01-01")), 0);
        assert!(elapsed_days(date("2024-01-10"), date("2024-01-01")) <= 0);
    }

    #[test]
    fn test_elapsed_days_str_guards_bad_input() {
        assert_eq!(elapsed_days_str("2024-01-01", "2024-01-02"), 1);
        assert_eq!(elapsed_days_str("not-a-date", "2024-01-02"), 0);
        assert_eq!(elapsed_days_str("2024-01-01", "???"), 0);
        // Time suffixes from datetime-local inputs are tolerated
        assert_eq!(elapsed_days_str("2024-01-01T09:30", "2024-01-03 08:00"), 2);
    }

    #[test]
    fn test_is_overdue_threshold() {
        let today = date("2024-02-01");
        assert!(is_overdue(&record("2024-01-12", false), 14, today)); // 20 days out
        assert!(!is_overdue(&record("2024-01-29", false), 14, today)); // 3 days out
        // Exactly at the threshold counts as overdue
        assert!(is_overdue(&record("2024-01-18", false), 14, today));
    }

    #[test]
    fn test_returned_loan_is_never_overdue() {
        let today = date("2024-06-01");
        assert!(!is_overdue(&record("2024-01-01", true), 14, today));
    }
}
