//! Response classification for TimeMap providers
//!
//! Providers answer the same request in several formats. [`classify_response`]
//! inspects a body once and produces a [`TimemapResponse`]; callers consume it
//! with an exhaustive `match`.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::models::{MementoRecord, ProviderEntry};
use crate::utils::extract_domain;

/// Shape of a provider response body
#[derive(Debug, Clone, PartialEq)]
pub enum TimemapResponse<'a> {
    /// Nothing but whitespace
    Empty,

    /// `{"timemap_index": [{"uri": ..., "archive_id": ...}, ...]}`
    Index(Vec<ProviderEntry>),

    /// `{"mementos": {"list": [{"uri": ..., "datetime": ...}, ...]}}`
    DirectList(Vec<ListedMemento>),

    /// Array of arrays (CDX-style rows with a header)
    Tabular(Vec<Vec<Value>>),

    /// Not JSON; read as link-format text
    Text(&'a str),

    /// Valid JSON with none of the known shapes
    Unrecognized { shape: String, body: &'a str },
}

impl TimemapResponse<'_> {
    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Index(_) => "index",
            Self::DirectList(_) => "direct_list",
            Self::Tabular(_) => "tabular",
            Self::Text(_) => "text",
            Self::Unrecognized { .. } => "unrecognized",
        }
    }
}

/// Entry of a `mementos.list` array
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListedMemento {
    #[serde(default)]
    pub uri: Option<String>,

    #[serde(default)]
    pub datetime: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawIndexEntry {
    #[serde(default)]
    uri: Option<String>,

    #[serde(default)]
    archive_id: Option<String>,
}

/// Classify a response body
///
/// Priority: empty body, then JSON shapes (index, direct list, tabular),
/// then link-format text for anything that is not JSON.
pub fn classify_response(body: &str) -> TimemapResponse<'_> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return TimemapResponse::Empty;
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => classify_object(map, body),
        Ok(Value::Array(items)) => classify_array(items, body),
        Ok(other) => TimemapResponse::Unrecognized {
            shape: json_type_name(&other).to_string(),
            body,
        },
        Err(_) => TimemapResponse::Text(body),
    }
}

fn classify_object(mut map: Map<String, Value>, body: &str) -> TimemapResponse<'_> {
    if let Some(Value::Array(entries)) = map.remove("timemap_index") {
        return TimemapResponse::Index(entries.into_iter().filter_map(provider_entry).collect());
    }

    let list = map
        .get_mut("mementos")
        .and_then(|mementos| mementos.get_mut("list"))
        .map(Value::take);

    if let Some(Value::Array(entries)) = list {
        let listed = entries
            .into_iter()
            .map(|entry| serde_json::from_value::<ListedMemento>(entry).unwrap_or_default())
            .collect();
        return TimemapResponse::DirectList(listed);
    }

    let mut keys: Vec<&str> = map.keys().map(String::as_str).collect();
    keys.sort_unstable();
    TimemapResponse::Unrecognized {
        shape: format!("object{{{}}}", keys.join(",")),
        body,
    }
}

fn classify_array(items: Vec<Value>, body: &str) -> TimemapResponse<'_> {
    if items.iter().all(Value::is_array) {
        let rows = items
            .into_iter()
            .filter_map(|item| match item {
                Value::Array(row) => Some(row),
                _ => None,
            })
            .collect();
        return TimemapResponse::Tabular(rows);
    }

    TimemapResponse::Unrecognized {
        shape: "array".to_string(),
        body,
    }
}

/// Convert one `timemap_index` element; entries without a URI are dropped
fn provider_entry(value: Value) -> Option<ProviderEntry> {
    let raw: RawIndexEntry = serde_json::from_value(value).ok()?;
    let uri = raw.uri.filter(|u| !u.trim().is_empty())?;

    let archive_id = raw
        .archive_id
        .filter(|id| !id.trim().is_empty())
        .or_else(|| extract_domain(&uri).ok())
        .unwrap_or_else(|| "unknown".to_string());

    Some(ProviderEntry { uri, archive_id })
}

/// Map `mementos.list` entries to records under one provider label
///
/// Entries missing a URI or datetime are dropped.
pub fn listed_to_records(listed: Vec<ListedMemento>, source_label: &str) -> Vec<MementoRecord> {
    listed
        .into_iter()
        .filter_map(|m| match (m.uri, m.datetime) {
            (Some(uri), Some(datetime)) => Some(MementoRecord::new(uri, datetime, source_label)),
            _ => None,
        })
        .collect()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
