//! Flat tabular projection: the fixed 8-column table and its CSV rendering.
//!
//! The two sources populate different subsets of the 8 columns; the
//! projection per tag is fixed here. A degraded record renders as a
//! best-effort row rather than failing the batch, and every cell is quoted
//! on output to defend against embedded delimiters.

use tracing::warn;

use leadscout_shared::{NormalizedRecord, Provenance, ResultSet, SourceTag, UNKNOWN};

/// The fixed tabular header.
pub const TABLE_HEADER: [&str; 8] = [
    "Company Name",
    "Website",
    "Emails/Contact Info",
    "Phone",
    "Location",
    "Rating",
    "Reviews",
    "Verification",
];

/// Project a result set into 8-column rows, header excluded.
///
/// A pure function of the (immutable) result set: calling it twice yields
/// identical rows.
pub fn to_table(results: &ResultSet) -> Vec<[String; 8]> {
    results
        .iter()
        .map(|entry| match &entry.provenance {
            Provenance::Clean => project_row(entry.tag, &entry.record),
            Provenance::Degraded { reason } => {
                warn!(
                    company = %entry.record.company_name,
                    reason,
                    "rendering degraded record as best-effort row"
                );
                project_row(entry.tag, &entry.record)
            }
        })
        .collect()
}

/// Map one record into the 8 columns per its source's population pattern.
fn project_row(tag: SourceTag, record: &NormalizedRecord) -> [String; 8] {
    match tag {
        // The maps source never carries a rating or verification status.
        SourceTag::Maps => [
            record.company_name.clone(),
            record.website.to_string(),
            record.emails_joined(),
            record.phone.to_string(),
            record.location.to_string(),
            UNKNOWN.to_string(),
            record.review_count.to_string(),
            UNKNOWN.to_string(),
        ],
        SourceTag::ReviewSite => [
            record.company_name.clone(),
            record.website.to_string(),
            record.emails_joined(),
            record.phone.to_string(),
            record.location.to_string(),
            record.rating.to_string(),
            record.review_count.to_string(),
            record.verified.to_string(),
        ],
    }
}

/// Render the header plus all rows as CSV with every field quoted.
///
/// Byte-identical across calls on the same result set.
pub fn render_csv(results: &ResultSet) -> String {
    let mut out = String::new();
    write_row(&mut out, TABLE_HEADER.iter().copied());
    for row in to_table(results) {
        write_row(&mut out, row.iter().map(String::as_str));
    }
    out
}

/// Write one fully-quoted CSV row. Embedded quotes are doubled per RFC 4180.
fn write_row<'a>(out: &mut String, fields: impl Iterator<Item = &'a str>) {
    let mut first = true;
    for field in fields {
        if !first {
            out.push(',');
        }
        first = false;
        out.push('"');
        out.push_str(&field.replace('"', "\"\""));
        out.push('"');
    }
    out.push_str("\r\n");
}
