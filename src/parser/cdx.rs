//! CDX tabular response mapping
//!
//! The CDX search API (`output=json`) answers with an array of rows. The
//! first row is the header:
//!
//! ```text
//! [["urlkey","timestamp","original","mimetype","statuscode","digest","length"],
//!  ["com,cnn)/","20200101000000","http://cnn.com/","text/html","200","ABC","1234"]]
//! ```

use serde_json::Value;

use crate::models::MementoRecord;
use crate::utils::error::ParseError;

/// Column holding the 14-digit capture timestamp
pub const CDX_TIMESTAMP_COLUMN: usize = 1;

/// Column holding the original URL
pub const CDX_ORIGINAL_COLUMN: usize = 2;

/// Build the replay URI of a capture
pub fn replay_uri(archive_base: &str, timestamp: &str, original: &str) -> String {
    format!(
        "{}/web/{}/{}",
        archive_base.trim_end_matches('/'),
        timestamp,
        original
    )
}

/// Map CDX rows to records, skipping the header row
///
/// Rows that are too short or whose timestamp/original cells are not
/// non-empty strings are dropped.
pub fn cdx_rows_to_records(
    rows: &[Vec<Value>],
    archive_base: &str,
    source_label: &str,
) -> Vec<MementoRecord> {
    rows.iter()
        .skip(1)
        .filter_map(|row| {
            let timestamp = cell(row, CDX_TIMESTAMP_COLUMN)?;
            let original = cell(row, CDX_ORIGINAL_COLUMN)?;
            Some(MementoRecord::new(
                replay_uri(archive_base, timestamp, original),
                timestamp,
                source_label,
            ))
        })
        .collect()
}

/// Parse a raw CDX JSON body
///
/// An empty body means the index has no captures.
pub fn parse_cdx_body(
    body: &str,
    archive_base: &str,
    source_label: &str,
) -> Result<Vec<MementoRecord>, ParseError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    let rows: Vec<Vec<Value>> = serde_json::from_str(body)?;
    Ok(cdx_rows_to_records(&rows, archive_base, source_label))
}

fn cell(row: &[Value], index: usize) -> Option<&str> {
    row.get(index)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}
