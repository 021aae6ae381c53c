//! Link-format TimeMap parsing
//!
//! A link-format TimeMap lists one link per line:
//!
//! ```text
//! <http://web.archive.org/web/20200101000000/http://cnn.com/>; rel="memento"; datetime="Wed, 01 Jan 2020 00:00:00 GMT",
//! ```
//!
//! Only lines whose relation is exactly `memento` produce records. `original`,
//! `timegate`, `timemap` and the `first memento`/`last memento` boundary links
//! share the same syntax and are skipped.

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::MementoRecord;

lazy_static! {
    static ref URI_TOKEN: Regex = Regex::new(r"<([^>]+)>").expect("Invalid URI pattern");
    static ref REL_ATTR: Regex = Regex::new(r#"rel="([^"]*)""#).expect("Invalid rel pattern");
    static ref DATETIME_ATTR: Regex =
        Regex::new(r#"datetime="([^"]+)""#).expect("Invalid datetime pattern");
}

/// Parse link-format text into memento records
///
/// Records keep the order of their lines. Lines missing either the
/// `<uri>` token or the `datetime` attribute are dropped silently.
pub fn parse_link_format(text: &str, source_label: &str) -> Vec<MementoRecord> {
    text.lines()
        .map(str::trim)
        .filter(|line| is_memento_line(line))
        .filter_map(|line| parse_line(line, source_label))
        .collect()
}

/// Check whether a line declares exactly the `memento` relation
pub fn is_memento_line(line: &str) -> bool {
    REL_ATTR
        .captures(line)
        .and_then(|caps| caps.get(1))
        .is_some_and(|rel| rel.as_str() == "memento")
}

fn parse_line(line: &str, source_label: &str) -> Option<MementoRecord> {
    let uri = URI_TOKEN.captures(line)?.get(1)?.as_str();
    let datetime = DATETIME_ATTR.captures(line)?.get(1)?.as_str();

    Some(MementoRecord::new(uri, datetime, source_label))
}
