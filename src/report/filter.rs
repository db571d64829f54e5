//! Borrow record filter for reports

use chrono::NaiveDate;
use serde::Deserialize;

use crate::models::BorrowRecord;

/// Report filter: inclusive start-date range plus optional department.
/// Absent criteria match everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub department: Option<String>,
}

/// Keep records matching every present criterion. Output order follows the
/// input collection (newest first per ledger convention); no re-sort.
pub fn filter_records(records: &[BorrowRecord], filter: &ReportFilter) -> Vec<BorrowRecord> {
    records
        .iter()
        .filter(|r| {
            filter.from.map_or(true, |from| r.start_date >= from)
                && filter.to.map_or(true, |to| r.start_date <= to)
                && filter
                    .department
                    .as_ref()
                    .map_or(true, |dept| r.borrower_dept.as_deref() == Some(dept.as_str()))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::test_support::{date, record};

    #[test]
    fn test_identity_filter_keeps_order() {
        let records = vec![
            record("b3", "A3", Some("ER"), "2024-03-01"),
            record("b2", "A2", Some("ICU"), "2024-02-01"),
            record("b1", "A1", None, "2024-01-01"),
        ];
        let out = filter_records(&records, &ReportFilter::default());
        let ids: Vec<&str> = out.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["b3", "b2", "b1"]);
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let records = vec![
            record("b1", "A1", None, "2024-01-01"),
            record("b2", "A2", None, "2024-01-15"),
            record("b3", "A3", None, "2024-02-01"),
        ];
        let out = filter_records(
            &records,
            &ReportFilter {
                from: Some(date("2024-01-15")),
                to: Some(date("2024-02-01")),
                department: None,
            },
        );
        let ids: Vec<&str> = out.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["b2", "b3"]);
    }

    #[test]
    fn test_department_filter_preserves_relative_order() {
        let records = vec![
            record("b4", "A4", Some("ICU"), "2024-04-01"),
            record("b3", "A3", Some("ER"), "2024-03-01"),
            record("b2", "A2", Some("ICU"), "2024-02-01"),
            record("b1", "A1", None, "2024-01-01"),
        ];
        let out = filter_records(
            &records,
            &ReportFilter {
                from: None,
                to: None,
                department: Some("ICU".to_string()),
            },
        );
        let ids: Vec<&str> = out.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["b4", "b2"]);
    }
}
