//! Parser integration tests using TimeMap fixture files
//!
//! - Link-format timemaps
//! - CDX tabular JSON
//! - TimeMap index JSON
//! - Property tests for line-level extraction

use mink::parser::{
    classify_response, parse_cdx_body, parse_link_format, replay_uri, TimemapResponse,
};
use proptest::prelude::*;
use std::fs;

/// Test fixture paths
const FIXTURES_DIR: &str = "tests/fixtures/timemap";

fn load_fixture(filename: &str) -> String {
    let path = format!("{FIXTURES_DIR}/{filename}");
    fs::read_to_string(&path).unwrap_or_else(|_| panic!("Failed to load fixture: {path}"))
}

// ============================================================================
// Link-format
// ============================================================================

#[test]
fn test_link_fixture_memento_lines_only() {
    let records = parse_link_format(&load_fixture("cnn_link.txt"), "web.archive.org");

    // original, self, timegate and the first/last boundary links are skipped;
    // the line without a datetime is dropped
    let datetimes: Vec<&str> = records.iter().map(|r| r.datetime.as_str()).collect();
    assert_eq!(
        datetimes,
        vec!["Wed, 21 Jun 2000 01:17:32 GMT", "Wed, 21 Jun 2000 14:09:28 GMT"]
    );
    assert_eq!(
        records[0].uri,
        "http://web.archive.org/web/20000621011732/http://cnn.com/"
    );
    assert!(records.iter().all(|r| r.source == "web.archive.org"));
}

#[test]
fn test_link_fixture_classified_as_text() {
    let body = load_fixture("cnn_link.txt");
    assert!(matches!(classify_response(&body), TimemapResponse::Text(_)));
}

// ============================================================================
// CDX
// ============================================================================

#[test]
fn test_cdx_fixture_mapping() {
    let records = parse_cdx_body(
        &load_fixture("cnn_cdx.json"),
        "http://web.archive.org",
        "web.archive.org",
    )
    .unwrap();

    // Header skipped; the short row and the row with an empty timestamp dropped
    assert_eq!(records.len(), 2);
    assert_eq!(
        records[0].uri,
        "http://web.archive.org/web/20200101000000/http://cnn.com"
    );
    assert_eq!(records[0].datetime, "20200101000000");
    assert_eq!(
        records[1].uri,
        "http://web.archive.org/web/20200102000000/http://www.cnn.com/"
    );
}

#[test]
fn test_cdx_header_only() {
    let body = r#"[["urlkey","timestamp","original"]]"#;
    assert!(parse_cdx_body(body, "http://a", "a").unwrap().is_empty());
}

// ============================================================================
// Index
// ============================================================================

#[test]
fn test_index_fixture_entries() {
    let body = load_fixture("cnn_index.json");

    let TimemapResponse::Index(entries) = classify_response(&body) else {
        panic!("expected an index response");
    };

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].archive_id, "arquivo.pt");
    // Missing archive_id falls back to the provider host
    assert_eq!(entries[1].archive_id, "archive.is");
}

#[test]
fn test_classification_priority() {
    assert!(matches!(classify_response("  \n"), TimemapResponse::Empty));
    assert!(matches!(
        classify_response(r#"{"mementos":{"list":[]}}"#),
        TimemapResponse::DirectList(list) if list.is_empty()
    ));
    assert!(matches!(
        classify_response(r#"{"timemap_index":[],"mementos":{"list":[]}}"#),
        TimemapResponse::Index(_)
    ));
    assert!(matches!(
        classify_response("[]"),
        TimemapResponse::Tabular(rows) if rows.is_empty()
    ));
    assert!(matches!(
        classify_response(r#"[1, 2]"#),
        TimemapResponse::Unrecognized { .. }
    ));
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Without the memento relation nothing is emitted
    #[test]
    fn prop_non_memento_lines_emit_nothing(
        uri in "[a-z0-9:/._-]{1,40}",
        rel in "(original|timegate|timemap|self|first memento|last memento)",
        datetime in "[A-Za-z0-9 ,:]{1,30}",
    ) {
        let line = format!(r#"<{uri}>; rel="{rel}"; datetime="{datetime}""#);
        prop_assert!(parse_link_format(&line, "x").is_empty());
    }

    /// A memento line yields exactly one record with the exact substrings
    #[test]
    fn prop_memento_line_extracts_exact_values(
        uri in "[a-z0-9:/._?=&-]{1,60}",
        datetime in "[A-Za-z0-9 ,:]{1,30}",
        label in "[a-z.]{1,20}",
    ) {
        let line = format!(r#"<{uri}>; rel="memento"; datetime="{datetime}","#);
        let records = parse_link_format(&line, &label);

        prop_assert_eq!(records.len(), 1);
        prop_assert_eq!(&records[0].uri, &uri);
        prop_assert_eq!(&records[0].datetime, &datetime);
        prop_assert_eq!(&records[0].source, &label);
    }

    /// One record per memento line, in line order
    #[test]
    fn prop_record_count_matches_memento_lines(flags in prop::collection::vec(any::<bool>(), 0..20)) {
        let text: String = flags
            .iter()
            .enumerate()
            .map(|(i, is_memento)| {
                let rel = if *is_memento { "memento" } else { "original" };
                format!("<http://a/{i}>; rel=\"{rel}\"; datetime=\"d{i}\",\n")
            })
            .collect();

        let records = parse_link_format(&text, "x");
        let expected: Vec<String> = flags
            .iter()
            .enumerate()
            .filter(|(_, m)| **m)
            .map(|(i, _)| format!("http://a/{i}"))
            .collect();
        let uris: Vec<String> = records.into_iter().map(|r| r.uri).collect();

        prop_assert_eq!(uris, expected);
    }

    /// CDX rows map to replay URIs built from timestamp and original
    #[test]
    fn prop_cdx_row_replay_uri(
        timestamp in "[0-9]{14}",
        original in "http://[a-z]{1,12}\\.com/[a-z]{0,10}",
    ) {
        let body = serde_json::json!([
            ["urlkey", "timestamp", "original"],
            ["k", &timestamp, &original]
        ])
        .to_string();

        let records = parse_cdx_body(&body, "http://web.archive.org/", "ia").unwrap();

        prop_assert_eq!(records.len(), 1);
        prop_assert_eq!(
            &records[0].uri,
            &replay_uri("http://web.archive.org", &timestamp, &original)
        );
        prop_assert_eq!(&records[0].datetime, &timestamp);
    }
}
