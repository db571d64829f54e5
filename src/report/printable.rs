//! Printable report document
//!
//! A self-contained HTML document with inline styling: same columns as the
//! spreadsheet, except the signature column renders the captured image
//! inline. The document auto-triggers printing on load; opening the viewing
//! context (and surfacing `Presentation` failures such as a blocked popup)
//! belongs to the presenting collaborator.

use chrono::{DateTime, Utc};

use crate::models::BorrowRecord;
use crate::report::{build_rows, escape_html, generated_stamp, reference_date, COLUMNS};

const STYLE: &str = "\
body{font-family:sans-serif;margin:24px;}\
header{display:flex;align-items:center;gap:16px;margin-bottom:12px;}\
header img{max-height:56px;}\
h1{font-size:20px;margin:0;}\
p.generated{color:#555;margin:4px 0 16px;}\
table{border-collapse:collapse;width:100%;}\
th,td{border:1px solid #999;padding:4px 6px;font-size:12px;text-align:left;}\
th{background:#eee;}\
td.sign img{max-height:40px;}\
td.empty{text-align:center;color:#777;}";

/// Render the printable document. Unlike the spreadsheet path, an empty
/// record set is not blocked: it renders a single "no data" row.
pub fn render_printable(
    records: &[BorrowRecord],
    org_name: &str,
    logo: Option<&str>,
    generated_at: DateTime<Utc>,
) -> String {
    let rows = build_rows(records, reference_date(generated_at));
    let span = COLUMNS.len();

    let mut out = String::new();
    out.push_str("<!DOCTYPE html><html><head><meta charset=\"utf-8\">");
    out.push_str(&format!("<title>{}</title>", escape_html(org_name)));
    out.push_str(&format!("<style>{STYLE}</style>"));
    out.push_str("</head><body onload=\"window.print()\">");

    out.push_str("<header>");
    if let Some(logo) = logo {
        out.push_str(&format!(
            "<img src=\"{}\" alt=\"logo\">",
            escape_html(logo)
        ));
    }
    out.push_str(&format!("<h1>{}</h1>", escape_html(org_name)));
    out.push_str("</header>");
    out.push_str(&format!(
        "<p class=\"generated\">{}</p>",
        escape_html(&generated_stamp(generated_at))
    ));

    out.push_str("<table><tr>");
    for label in COLUMNS {
        out.push_str(&format!("<th>{}</th>", escape_html(label)));
    }
    out.push_str("</tr>");

    if rows.is_empty() {
        out.push_str(&format!(
            "<tr><td class=\"empty\" colspan=\"{span}\">No records in the selected range</td></tr>"
        ));
    }
    for row in &rows {
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
        match &row.signature {
            Some(sign) => out.push_str(&format!(
                "<td class=\"sign\"><img src=\"{}\" alt=\"signature\"></td>",
                escape_html(&signature_uri(sign))
            )),
            None => out.push_str("<td class=\"sign\">-</td>"),
        }
        out.push_str("</tr>");
    }

    out.push_str("</table></body></html>");
    out
}

/// The signature payload is opaque: already a data URI, or bare base64
/// that gets wrapped into one. Never inspected beyond that.
fn signature_uri(sign: &str) -> String {
    if sign.starts_with("data:") {
        sign.to_string()
    } else {
        format!("data:image/png;base64,{sign}")
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
    fn test_empty_set_renders_no_data_row() {
        let html = render_printable(&[], "Clinic", None, generated_at());
        assert!(html.contains("No records in the selected range"));
        assert!(html.contains("window.print()"));
    }

    #[test]
    fn test_signature_rendered_inline() {
        let mut with_sign = record("b1", "A1", None, "2024-01-01");
        with_sign.borrower_sign = "AAAA".to_string();
        let mut without = record("b2", "A2", None, "2024-01-02");
        without.borrower_sign = String::new();

        let html = render_printable(&[with_sign, without], "Clinic", None, generated_at());
        assert!(html.contains("data:image/png;base64,AAAA"));
        assert!(html.contains("<td class=\"sign\">-</td>"));
    }

    #[test]
    fn test_logo_and_data_uri_signature_pass_through() {
        let mut rec = record("b1", "A1", None, "2024-01-01");
        rec.borrower_sign = "data:image/jpeg;base64,QQQQ".to_string();
        let html = render_printable(
            &[rec],
            "Clinic",
            Some("data:image/png;base64,LOGO"),
            generated_at(),
        );
        assert!(html.contains("data:image/jpeg;base64,QQQQ"));
        assert!(html.contains("alt=\"logo\""));
    }
}
