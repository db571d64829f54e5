//! Report engine: filtered projection of the borrow records serialized to
//! a spreadsheet workbook or a printable document
//!
//! The engine only reads the ledger's read model; it never mutates it.

pub mod filter;
pub mod printable;
pub mod spreadsheet;

use chrono::{DateTime, Local, NaiveDate, Utc};

pub use filter::{filter_records, ReportFilter};
pub use printable::render_printable;
pub use spreadsheet::{export_spreadsheet, ExportFile};

use crate::models::BorrowRecord;
use crate::overdue::elapsed_days;

/// Fixed column labels shared by both output formats. The spreadsheet
/// leaves the signature column blank; the printable document renders the
/// captured image inline.
pub const COLUMNS: [&str; 10] = [
    "Asset ID",
    "Equipment Name",
    "Borrower",
    "Department",
    "Lender",
    "Start Date",
    "Due Date",
    "Returned Date",
    "Days Out",
    "Signature",
];

/// Column widths of the spreadsheet layout, in character units.
pub(crate) const COLUMN_WIDTHS: [f64; 10] = [
    14.0, 24.0, 18.0, 16.0, 18.0, 12.0, 12.0, 14.0, 10.0, 16.0,
];

/// One data row of the report, dates already formatted for display.
#[derive(Debug, Clone)]
pub struct ReportRow {
    pub asset_id: String,
    pub asset_name: String,
    pub borrower: String,
    pub department: String,
    pub lender: String,
    pub start_date: String,
    pub due_date: String,
    pub returned_date: String,
    /// Loan duration: days from start to return for closed loans, days
    /// from start to the report reference date for active ones.
    pub days_out: i64,
    /// Opaque signature payload; `None` when empty.
    pub signature: Option<String>,
}

/// Project records into display rows. `reference` is the report's "today",
/// used for the duration of still-active loans.
pub fn build_rows(records: &[BorrowRecord], reference: NaiveDate) -> Vec<ReportRow> {
    records
        .iter()
        .map(|r| {
            let returned_date = r.returned_at.map(|t| t.with_timezone(&Local).date_naive());
            let days_out = elapsed_days(r.start_date, returned_date.unwrap_or(reference));
            ReportRow {
                asset_id: r.asset_id.clone(),
                asset_name: r.asset_name.clone(),
                borrower: r.borrower_name.clone(),
                department: r.borrower_dept.clone().unwrap_or_default(),
                lender: r.lender_name.clone(),
                start_date: r.start_date.format("%Y-%m-%d").to_string(),
                due_date: r
                    .end_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
                returned_date: returned_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
                days_out,
                signature: (!r.borrower_sign.is_empty()).then(|| r.borrower_sign.clone()),
            }
        })
        .collect()
}

/// Reference date of a report generated at `generated_at`, at local-date
/// granularity.
pub(crate) fn reference_date(generated_at: DateTime<Utc>) -> NaiveDate {
    generated_at.with_timezone(&Local).date_naive()
}

/// Human-readable generation stamp for title blocks.
pub(crate) fn generated_stamp(generated_at: DateTime<Utc>) -> String {
    generated_at
        .with_timezone(&Local)
        .format("Generated on %Y-%m-%d %H:%M")
        .to_string()
}

/// Minimal HTML escaping for text cells in the markup-based outputs.
pub(crate) fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}


#[cfg(test)]
mod tests {
    use super::test_support::{date, record};
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_build_rows_duration() {
        let mut returned = record("b1", "A1", Some("ICU"), "2024-01-01");
        returned.returned_at = Some(Utc.with_ymd_and_hms(2024, 1, 6, 12, 0, 0).unwrap());
        let active = record("b2", "A2", None, "2024-01-10");

        let rows = build_rows(&[returned, active], date("2024-01-20"));
        // Closed loan measures start -> return, not start -> today
        assert!(rows[0].days_out >= 4 && rows[0].days_out <= 6);
        assert!(!rows[0].returned_date.is_empty());
        // Active loan measures against the reference date
        assert_eq!(rows[1].days_out, 10);
        assert_eq!(rows[1].returned_date, "");
        assert_eq!(rows[1].department, "");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a<b> & \"c\""), "a&lt;b&gt; &amp; &quot;c&quot;");
    }
}
