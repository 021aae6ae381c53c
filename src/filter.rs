//! Filtering and accumulation of received mementos
//!
//! A listener keeps every record it receives and shows a filtered,
//! newest-first view of them.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeSet;

use crate::models::{parse_capture_time, MementoRecord};

/// Source and capture-date constraints
///
/// Both date bounds are inclusive. Once any bound is set, records whose
/// datetime cannot be parsed are excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MementoFilter {
    pub source: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl MementoFilter {
    /// A filter that accepts everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept records from `source` (exact match)
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Lower bound, inclusive
    pub fn with_from(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    /// Upper bound, inclusive
    pub fn with_to(mut self, to: DateTime<Utc>) -> Self {
        self.to = Some(to);
        self
    }

    fn has_date_bound(&self) -> bool {
        self.from.is_some() || self.to.is_some()
    }

    /// Whether `record` passes the filter
    pub fn matches(&self, record: &MementoRecord) -> bool {
        if let Some(source) = &self.source {
            if &record.source != source {
                return false;
            }
        }

        if !self.has_date_bound() {
            return true;
        }

        let Some(captured) = record.capture_time() else {
            return false;
        };

        self.from.map_or(true, |from| captured >= from)
            && self.to.map_or(true, |to| captured <= to)
    }
}

/// Parse a date bound given on the command line
///
/// Accepts anything [`parse_capture_time`] accepts, plus a bare
/// `YYYY-MM-DD`. A bare date as an upper bound covers the whole day.
pub fn parse_date_bound(raw: &str, upper: bool) -> Option<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
        let time = if upper {
            date.and_hms_opt(23, 59, 59)
        } else {
            date.and_hms_opt(0, 0, 0)
        };
        return time.map(|naive| naive.and_utc());
    }

    parse_capture_time(raw)
}

/// Records received by a listener, in arrival order
#[derive(Debug, Clone, Default)]
pub struct ListenSession {
    records: Vec<MementoRecord>,
    messages: usize,
}

impl ListenSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the records of one received message
    pub fn extend(&mut self, records: Vec<MementoRecord>) {
        self.messages += 1;
        self.records.extend(records);
    }

    /// All records in arrival order
    pub fn records(&self) -> &[MementoRecord] {
        &self.records
    }

    /// Number of messages received
    pub fn message_count(&self) -> usize {
        self.messages
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct source labels seen, sorted
    pub fn sources(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| r.source.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Records passing `filter`, newest capture first
    ///
    /// Records with an unparseable datetime sort last, keeping arrival order
    /// among themselves.
    pub fn view(&self, filter: &MementoFilter) -> Vec<&MementoRecord> {
        let mut matching: Vec<&MementoRecord> =
            self.records.iter().filter(|r| filter.matches(r)).collect();

        matching.sort_by_key(|r| std::cmp::Reverse(r.capture_time()));
        matching
    }
}
