// Core data structures for mink

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Compact 14-digit capture timestamp used by Wayback-style archives
const COMPACT_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// One archived snapshot of an original URL
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MementoRecord {
    pub uri: String,      // Absolute URL of the archived snapshot
    pub datetime: String, // Provider-native capture timestamp
    pub source: String,   // Provider identifier (archive_id or label)
}

impl MementoRecord {
    pub fn new(
        uri: impl Into<String>,
        datetime: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            datetime: datetime.into(),
            source: source.into(),
        }
    }

    /// Parse the capture timestamp
    ///
    /// Accepts the compact `YYYYMMDDhhmmss` form, RFC 1123/2822
    /// (`Sat, 01 Jan 2000 00:00:00 GMT`) and RFC 3339. Returns `None`
    /// for anything else.
    pub fn capture_time(&self) -> Option<DateTime<Utc>> {
        parse_capture_time(&self.datetime)
    }
}

impl fmt::Display for MementoRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.datetime, self.uri, self.source)
    }
}

/// Parse a provider-native timestamp into UTC
pub fn parse_capture_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if raw.len() == 14 && raw.bytes().all(|b| b.is_ascii_digit()) {
        return NaiveDateTime::parse_from_str(raw, COMPACT_TIMESTAMP_FORMAT)
            .ok()
            .map(|naive| naive.and_utc());
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// One provider listed in a TimeMap index response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEntry {
    /// Endpoint of the provider's detailed timemap
    pub uri: String,

    /// Archive label, used as the record `source`
    pub archive_id: String,
}

/// Stages of the aggregation fallback chain, in the order they run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackStage {
    Cdx,
    TimemapIndex,
    LinkFormat,
}

impl FallbackStage {
    /// All stages in chain order
    pub const CHAIN: [FallbackStage; 3] = [Self::Cdx, Self::TimemapIndex, Self::LinkFormat];

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cdx => "cdx",
            Self::TimemapIndex => "timemap_index",
            Self::LinkFormat => "link_format",
        }
    }
}

impl fmt::Display for FallbackStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one aggregation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregationResult {
    /// Target URL the run was for
    pub target_url: String,

    /// Records in provider-processing order
    pub records: Vec<MementoRecord>,

    /// Stages that ran, in order
    pub stages_tried: Vec<FallbackStage>,

    /// Stage that produced the records, if any
    pub resolved_by: Option<FallbackStage>,
}

impl AggregationResult {
    pub fn new(target_url: impl Into<String>) -> Self {
        Self {
            target_url: target_url.into(),
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Serialize the records as the relay wire payload (a JSON array)
    pub fn to_payload(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.records)
    }

    /// Number of records contributed by each source, in first-seen order
    pub fn counts_by_source(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for record in &self.records {
            match counts.iter_mut().find(|(source, _)| *source == record.source) {
                Some((_, count)) => *count += 1,
                None => counts.push((record.source.clone(), 1)),
            }
        }
        counts
    }
}
