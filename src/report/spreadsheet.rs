//! Spreadsheet serialization with a legacy fallback writer
//!
//! The primary writer produces a real workbook (one sheet named "Report",
//! merged title row, fixed column widths). When it is compiled out or fails
//! mid-serialization, the engine falls back to an HTML table typed as a
//! legacy `.xls` file carrying the same rows, so the export always yields a
//! downloadable spreadsheet.

use chrono::{DateTime, Utc};

use crate::error::{LedgerError, LedgerResult};
use crate::models::BorrowRecord;
use crate::report::{build_rows, escape_html, generated_stamp, reference_date, ReportRow, COLUMNS};

/// A finished export: bytes plus the metadata the download needs.
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub filename: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
    /// True when the legacy writer produced the file.
    pub fallback: bool,
}

/// One of the two spreadsheet serializers.
trait SpreadsheetWriter {
    fn write(&self, title: &str, subtitle: &str, rows: &[ReportRow]) -> LedgerResult<Vec<u8>>;
    fn extension(&self) -> &'static str;
    fn mime(&self) -> &'static str;
}

/// Serialize the filtered records. Zero records is an [`LedgerError::EmptyExport`]
/// notice and produces no file; the printable path has no such guard.
pub fn export_spreadsheet(
    records: &[BorrowRecord],
    org_name: &str,
    generated_at: DateTime<Utc>,
) -> LedgerResult<ExportFile> {
    if records.is_empty() {
        return Err(LedgerError::EmptyExport);
    }

    let rows = build_rows(records, reference_date(generated_at));
    let subtitle = generated_stamp(generated_at);
    let stamp = generated_at.format("%Y%m%d-%H%M%S");

    if primary_available() {
        match primary_writer().write(org_name, &subtitle, &rows) {
            Ok(bytes) => {
                let writer = primary_writer();
                return Ok(ExportFile {
                    filename: format!("lending-report-{stamp}.{}", writer.extension()),
                    mime: writer.mime(),
                    bytes,
                    fallback: false,
                });
            }
            Err(err) => {
                tracing::warn!("primary spreadsheet writer failed, using legacy format: {err}");
            }
        }
    }

    let writer = HtmlTableWriter;
    let bytes = writer.write(org_name, &subtitle, &rows)?;
    Ok(ExportFile {
        filename: format!("lending-report-{stamp}.{}", writer.extension()),
        mime: writer.mime(),
        bytes,
        fallback: true,
    })
}

/// Capability probe for the primary writer.
fn primary_available() -> bool {
    cfg!(feature = "xlsx")
}

#[cfg(feature = "xlsx")]
fn primary_writer() -> impl SpreadsheetWriter {
    XlsxWriter
}

#[cfg(not(feature = "xlsx"))]
fn primary_writer() -> impl SpreadsheetWriter {
    HtmlTableWriter
}

#[cfg(feature = "xlsx")]
struct XlsxWriter;

#[cfg(feature = "xlsx")]
impl SpreadsheetWriter for XlsxWriter {
    fn write(&self, title: &str, subtitle: &str, rows: &[ReportRow]) -> LedgerResult<Vec<u8>> {
        use rust_xlsxwriter::{Format, FormatAlign, Workbook};

        use crate::report::COLUMN_WIDTHS;

        let unavailable = |e: rust_xlsxwriter::XlsxError| LedgerError::ExportUnavailable(e.to_string());

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("Report").map_err(unavailable)?;

        let last_col = (COLUMNS.len() - 1) as u16;
        let title_format = Format::new().set_bold().set_align(FormatAlign::Center);
        let subtitle_format = Format::new().set_align(FormatAlign::Center);
        let header_format = Format::new().set_bold();

        worksheet
            .merge_range(0, 0, 0, last_col, title, &title_format)
            .map_err(unavailable)?;
        worksheet
            .merge_range(1, 0, 1, last_col, subtitle, &subtitle_format)
            .map_err(unavailable)?;

        for (col, label) in COLUMNS.iter().enumerate() {
            worksheet
                .write_string_with_format(2, col as u16, *label, &header_format)
                .map_err(unavailable)?;
        }
        for (col, width) in COLUMN_WIDTHS.iter().enumerate() {
            worksheet
                .set_column_width(col as u16, *width)
                .map_err(unavailable)?;
        }

        for (i, row) in rows.iter().enumerate() {
            let r = (i + 3) as u32;
            worksheet.write_string(r, 0, &row.asset_id).map_err(unavailable)?;
            worksheet.write_string(r, 1, &row.asset_name).map_err(unavailable)?;
            worksheet.write_string(r, 2, &row.borrower).map_err(unavailable)?;
            worksheet.write_string(r, 3, &row.department).map_err(unavailable)?;
            worksheet.write_string(r, 4, &row.lender).map_err(unavailable)?;
            worksheet.write_string(r, 5, &row.start_date).map_err(unavailable)?;
            worksheet.write_string(r, 6, &row.due_date).map_err(unavailable)?;
            worksheet.write_string(r, 7, &row.returned_date).map_err(unavailable)?;
            worksheet
                .write_number(r, 8, row.days_out as f64)
                .map_err(unavailable)?;
            // Signature is a placeholder in spreadsheet form; the workbook
            // cannot carry the captured image.
            worksheet.write_string(r, 9, "").map_err(unavailable)?;
        }

        workbook.save_to_buffer().map_err(unavailable)
    }

    fn extension(&self) -> &'static str {
        "xlsx"
    }

    fn mime(&self) -> &'static str {
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    }
}

/// Legacy writer: an HTML table served with a spreadsheet MIME type, the
/// zero-dependency path spreadsheet applications still open.
struct HtmlTableWriter;

impl SpreadsheetWriter for HtmlTableWriter {
    fn write(&self, title: &str, subtitle: &str, rows: &[ReportRow]) -> LedgerResult<Vec<u8>> {
        let span = COLUMNS.len();
        let mut out = String::new();
        out.push_str("<html><head><meta charset=\"utf-8\"></head><body><table border=\"1\">");
        out.push_str(&format!(
            "<tr><th colspan=\"{span}\">{}</th></tr>",
            escape_html(title)
        ));
        out.push_str(&format!(
            "<tr><td colspan=\"{span}\">{}</td></tr>",
            escape_html(subtitle)
        ));
        out.push_str("<tr>");
        for label in COLUMNS {
            out.push_str(&format!("<th>{}</th>", escape_html(label)));
        }
        out.push_str("</tr>");
        for row in rows {
            out.push_str("<tr>");
            for cell in [
                &row.asset_id,
                &row.asset_name,
                &row.borrower,
                &row.department,
                &row.lender,
                &row.start_date,
                &row.due_date,
                &row.returned_date,
            ] {
                out.push_str(&format!("<td>{}</td>", escape_html(cell)));
            }
            out.push_str(&format!("<td>{}</td>", row.days_out));
            out.push_str("<td></td></tr>");
        }
        out.push_str("</table></body></html>");
        Ok(out.into_bytes())
    }

    fn extension(&self) -> &'static str {
        "xls"
    }

    fn mime(&self) -> &'static str {
        "application/vnd.ms-excel"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::test_support::record;
    use chrono::TimeZone;

    fn generated_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_export_produces_no_file() {
        let err = export_spreadsheet(&[], "Clinic", generated_at()).unwrap_err();
        assert!(matches!(err, LedgerError::EmptyExport));
    }

    #[test]
    fn test_export_yields_spreadsheet_bytes() {
        let records = vec![record("b1", "A1", Some("ICU"), "2024-01-01")];
        let file = export_spreadsheet(&records, "Clinic", generated_at()).expect("export");
        assert!(!file.bytes.is_empty());
        assert!(file.filename.starts_with("lending-report-"));
        if cfg!(feature = "xlsx") {
            assert!(!file.fallback);
            assert!(file.filename.ends_with(".xlsx"));
        } else {
            assert!(file.fallback);
            assert!(file.filename.ends_with(".xls"));
        }
    }

    #[test]
    fn test_fallback_writer_carries_all_rows() {
        let records = vec![
            record("b1", "A1", Some("ICU"), "2024-01-01"),
            record("b2", "A2", None, "2024-01-10"),
        ];
        let rows = build_rows(&records, reference_date(generated_at()));
        let bytes = HtmlTableWriter
            .write("Clinic", "Generated on 2024-02-01", &rows)
            .expect("fallback write");
        let html = String::from_utf8(bytes).expect("utf-8");
        assert!(html.contains("Clinic"));
        assert!(html.contains("Equipment A1"));
        assert!(html.contains("Equipment A2"));
        assert!(html.contains("<th>Signature</th>"));
    }
}
