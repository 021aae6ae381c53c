//! TimeMap fetcher with rate limiting and bounded timeouts
//!
//! This module provides the HTTP fetcher used for every archive lookup,
//! with features including:
//! - Rate limiting with governor
//! - One bounded GET per lookup; a timeout drops the in-flight request
//! - Response classification and record extraction
//! - Soft failure: every public lookup degrades to an empty result

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT},
    Client,
};
use std::future::Future;
use std::num::NonZeroU32;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{AggregatorConfig, DEFAULT_USER_AGENT};
use crate::metrics;
use crate::models::{MementoRecord, ProviderEntry};
use crate::parser::{
    cdx_rows_to_records, classify_response, listed_to_records, parse_cdx_body,
    parse_link_format, TimemapResponse,
};
use crate::utils::error::FetchError;
use crate::utils::truncate_text;

/// Accept header for endpoints that may answer in any TimeMap format
const ACCEPT_ANY: &str = "application/json, text/plain, */*";

/// Accept header for the CDX API
const ACCEPT_JSON: &str = "application/json";

/// Characters of a body kept in debug previews
const PREVIEW_CHARS: usize = 300;

type RecordsFuture<'a> = Pin<Box<dyn Future<Output = Vec<MementoRecord>> + Send + 'a>>;

/// Where a body being interpreted came from
#[derive(Debug, Clone, Copy)]
struct Lookup<'a> {
    /// URL the body is fetched from
    endpoint: &'a str,

    /// Label of the provider serving `endpoint`
    label: &'a str,

    /// Label of the outermost lookup
    top_label: &'a str,

    /// Index nesting level, 0 for the outermost lookup
    depth: u32,
}

impl<'a> Lookup<'a> {
    fn top(endpoint: &'a str, label: &'a str) -> Self {
        Self {
            endpoint,
            label,
            top_label: label,
            depth: 0,
        }
    }
}

/// Archive fetcher
///
/// Every lookup is a single GET bounded by `timeout`. Failures are logged
/// and surface to callers as an empty record list.
pub struct TimemapFetcher {
    /// HTTP client with compression enabled
    client: Client,

    /// Rate limiter to control request frequency
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,

    /// Bound applied to each request, body included
    timeout: Duration,

    /// Archive root used to build replay URIs for tabular rows
    archive_base: String,

    /// How deep nested TimeMap indexes are followed; never below 1
    max_index_depth: u32,

    /// User-Agent header value
    user_agent: HeaderValue,
}

impl TimemapFetcher {
    /// Create a fetcher from aggregator settings
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn new(config: &AggregatorConfig) -> Result<Self, FetchError> {
        let client = Client::builder().gzip(true).build()?;

        let rate = NonZeroU32::new(config.rate_limit).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(rate));

        let user_agent = HeaderValue::from_str(&config.user_agent)
            .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT));

        Ok(Self {
            client,
            rate_limiter,
            timeout: config.request_timeout(),
            archive_base: config.archive_base_url.trim_end_matches('/').to_string(),
            max_index_depth: config.max_index_depth.max(1),
            user_agent,
        })
    }

    /// Per-request time bound
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch a body with one bounded GET
    ///
    /// # Errors
    ///
    /// - `FetchError::Timeout` if the request did not finish within the bound
    /// - `FetchError::Status` for non-success status codes
    /// - `FetchError::Http` for transport failures
    pub async fn fetch_body(&self, url: &str, accept: &'static str) -> Result<String, FetchError> {
        // Wait for rate limiter
        self.rate_limiter.until_ready().await;

        match tokio::time::timeout(self.timeout, self.get_text(url, accept)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(self.timeout.as_millis() as u64)),
        }
    }

    async fn get_text(&self, url: &str, accept: &'static str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .headers(self.build_headers(accept))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        Ok(response.text().await?)
    }

    /// Fetch a provider's timemap and extract its records
    ///
    /// Never fails: timeouts, transport errors and bad status codes are
    /// logged and yield an empty list.
    pub async fn fetch_timemap(&self, endpoint: &str, provider_label: &str) -> Vec<MementoRecord> {
        self.fetch_lookup(Lookup::top(endpoint, provider_label)).await
    }

    fn fetch_lookup<'a>(&'a self, lookup: Lookup<'a>) -> RecordsFuture<'a> {
        Box::pin(async move {
            let Some(body) = self.fetch_logged(lookup.endpoint, lookup.label, ACCEPT_ANY).await
            else {
                return Vec::new();
            };

            let response = classify_response(&body);
            debug!(
                source = %lookup.label,
                kind = response.kind(),
                depth = lookup.depth,
                "Classified timemap response"
            );

            let records = self.records_from_response(response, lookup).await;
            metrics::record_mementos(lookup.label, records.len());
            records
        })
    }

    /// Turn a classified response into records
    ///
    /// Index responses are followed provider by provider. Direct lists are
    /// labelled with the outermost lookup's label. Tabular rows and text keep
    /// the label of the provider that served them.
    async fn records_from_response(
        &self,
        response: TimemapResponse<'_>,
        lookup: Lookup<'_>,
    ) -> Vec<MementoRecord> {
        match response {
            TimemapResponse::Empty => {
                info!(source = %lookup.label, "Empty response received");
                Vec::new()
            }
            TimemapResponse::Index(entries) => {
                if lookup.depth >= self.max_index_depth {
                    warn!(
                        source = %lookup.label,
                        depth = lookup.depth,
                        entries = entries.len(),
                        "Nested timemap index too deep, skipping"
                    );
                    return Vec::new();
                }
                info!(
                    source = %lookup.label,
                    providers = entries.len(),
                    "Found timemap index"
                );
                self.fetch_providers(&entries, lookup.top_label, lookup.depth + 1)
                    .await
            }
            TimemapResponse::DirectList(listed) => {
                info!(
                    source = %lookup.top_label,
                    served_by = %lookup.label,
                    entries = listed.len(),
                    "Direct memento list found"
                );
                listed_to_records(listed, lookup.top_label)
            }
            TimemapResponse::Tabular(rows) => {
                cdx_rows_to_records(&rows, &self.replay_base(&lookup), lookup.label)
            }
            TimemapResponse::Text(text) => parse_link_format(text, lookup.label),
            TimemapResponse::Unrecognized { shape, body } => {
                warn!(
                    source = %lookup.label,
                    shape = %shape,
                    "Unexpected response format, reading as link-format"
                );
                parse_link_format(body, lookup.label)
            }
        }
    }

    /// Fetch every provider's timemap, one at a time, in list order
    ///
    /// `top_label` is the label of the lookup that produced the index.
    /// A failing provider contributes nothing and does not stop the loop.
    pub async fn fetch_providers(
        &self,
        entries: &[ProviderEntry],
        top_label: &str,
        depth: u32,
    ) -> Vec<MementoRecord> {
        let mut all = Vec::new();

        for entry in entries {
            info!(source = %entry.archive_id, uri = %entry.uri, "Processing provider");
            let lookup = Lookup {
                endpoint: &entry.uri,
                label: &entry.archive_id,
                top_label,
                depth,
            };
            let records = self.fetch_lookup(lookup).await;
            info!(
                source = %entry.archive_id,
                mementos = records.len(),
                "Provider finished"
            );
            all.extend(records);
        }

        all
    }

    /// Root for replay URIs of tabular rows
    ///
    /// Rows served by an index provider replay on that provider's host.
    fn replay_base(&self, lookup: &Lookup<'_>) -> String {
        if lookup.depth == 0 {
            return self.archive_base.clone();
        }

        Url::parse(lookup.endpoint)
            .ok()
            .map(|url| url.origin())
            .filter(|origin| origin.is_tuple())
            .map(|origin| origin.ascii_serialization())
            .unwrap_or_else(|| self.archive_base.clone())
    }

    /// Query the CDX API and map its rows
    ///
    /// A body that is not CDX JSON is read as link-format text instead.
    pub async fn fetch_cdx(&self, cdx_url: &str, provider_label: &str) -> Vec<MementoRecord> {
        let Some(body) = self.fetch_logged(cdx_url, provider_label, ACCEPT_JSON).await else {
            return Vec::new();
        };

        let records = match parse_cdx_body(&body, &self.archive_base, provider_label) {
            Ok(records) => records,
            Err(e) => {
                warn!(
                    source = %provider_label,
                    error = %e,
                    "CDX response malformed, reading as link-format"
                );
                parse_link_format(&body, provider_label)
            }
        };

        info!(source = %provider_label, mementos = records.len(), "CDX API returned");
        metrics::record_mementos(provider_label, records.len());
        records
    }

    /// Fetch a body, logging and recording failures
    async fn fetch_logged(
        &self,
        url: &str,
        provider_label: &str,
        accept: &'static str,
    ) -> Option<String> {
        let started = Instant::now();
        debug!(source = %provider_label, url = %url, "Fetching");

        let result = self.fetch_body(url, accept).await;
        let elapsed = started.elapsed().as_secs_f64();

        match result {
            Ok(body) => {
                metrics::record_fetch(provider_label, "ok", elapsed);
                debug!(
                    source = %provider_label,
                    chars = body.len(),
                    preview = %truncate_text(&body, PREVIEW_CHARS),
                    "Response received"
                );
                Some(body)
            }
            Err(FetchError::Timeout(ms)) => {
                metrics::record_fetch(provider_label, "timeout", elapsed);
                warn!(source = %provider_label, timeout_ms = ms, "Fetch timed out");
                None
            }
            Err(e) => {
                metrics::record_fetch(provider_label, "error", elapsed);
                warn!(source = %provider_label, error = %e, "Fetch failed");
                None
            }
        }
    }

    /// Build HTTP headers for archive requests
    fn build_headers(&self, accept: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, self.user_agent.clone());
        headers.insert(ACCEPT, HeaderValue::from_static(accept));
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AggregatorConfig {
        AggregatorConfig {
            archive_base_url: "http://archive.test/".to_string(),
            ..AggregatorConfig::default()
        }
    }

    #[test]
    fn test_fetcher_creation() {
        let fetcher = TimemapFetcher::new(&config()).unwrap();
        assert_eq!(fetcher.timeout(), Duration::from_secs(10));
        assert_eq!(fetcher.archive_base, "http://archive.test");
    }

    #[test]
    fn test_zero_rate_limit_clamped() {
        let mut config = config();
        config.rate_limit = 0;
        assert!(TimemapFetcher::new(&config).is_ok());
    }

    #[test]
    fn test_invalid_user_agent_falls_back() {
        let mut config = config();
        config.user_agent = "bad\nagent".to_string();
        let fetcher = TimemapFetcher::new(&config).unwrap();
        assert_eq!(fetcher.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn test_build_headers() {
        let fetcher = TimemapFetcher::new(&config()).unwrap();
        let headers = fetcher.build_headers(ACCEPT_JSON);

        assert_eq!(headers.get(ACCEPT).unwrap(), "application/json");
        assert!(headers
            .get(USER_AGENT)
            .unwrap()
            .to_str()
            .unwrap()
            .contains("MinkAggregator"));
    }

    #[tokio::test]
    async fn test_records_from_tabular_response() {
        let fetcher = TimemapFetcher::new(&config()).unwrap();
        let body = r#"[["urlkey","timestamp","original"],["k","20200101000000","http://cnn.com"]]"#;

        let lookup = Lookup::top("http://archive.test/cdx", "ia");

        let records = fetcher
            .records_from_response(classify_response(body), lookup)
            .await;

        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].uri,
            "http://archive.test/web/20200101000000/http://cnn.com"
        );
    }

    #[tokio::test]
    async fn test_unrecognized_json_yields_nothing() {
        let fetcher = TimemapFetcher::new(&config()).unwrap();
        let records = fetcher
            .records_from_response(
                classify_response(r#"{"status":"ok"}"#),
                Lookup::top("http://archive.test/x", "ia"),
            )
            .await;
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_index_beyond_depth_skipped() {
        let fetcher = TimemapFetcher::new(&config()).unwrap();
        let body = r#"{"timemap_index":[{"uri":"http://unreachable.test/x","archive_id":"x"}]}"#;

        let lookup = Lookup {
            depth: 2,
            ..Lookup::top("http://archive.test/index", "ia")
        };

        let records = fetcher
            .records_from_response(classify_response(body), lookup)
            .await;
        assert!(records.is_empty());
    }

    #[test]
    fn test_zero_index_depth_clamped() {
        let mut config = config();
        config.max_index_depth = 0;
        let fetcher = TimemapFetcher::new(&config).unwrap();
        assert_eq!(fetcher.max_index_depth, 1);
    }

    #[tokio::test]
    async fn test_direct_list_under_provider_keeps_top_label() {
        let fetcher = TimemapFetcher::new(&config()).unwrap();
        let body = r#"{"mementos":{"list":[{"uri":"u1","datetime":"d1"}]}}"#;
        let lookup = Lookup {
            endpoint: "http://arquivo.test/timemap",
            label: "arquivo.pt",
            top_label: "web.archive.org",
            depth: 1,
        };

        let records = fetcher
            .records_from_response(classify_response(body), lookup)
            .await;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source, "web.archive.org");
    }

    #[tokio::test]
    async fn test_tabular_under_provider_replays_on_provider_host() {
        let fetcher = TimemapFetcher::new(&config()).unwrap();
        let body = r#"[["urlkey","timestamp","original"],["k","20200101000000","http://cnn.com"]]"#;
        let lookup = Lookup {
            endpoint: "http://arquivo.test:8080/cdx?url=cnn.com",
            label: "arquivo.pt",
            top_label: "web.archive.org",
            depth: 1,
        };

        let records = fetcher
            .records_from_response(classify_response(body), lookup)
            .await;

        assert_eq!(
            records[0].uri,
            "http://arquivo.test:8080/web/20200101000000/http://cnn.com"
        );
        assert_eq!(records[0].source, "arquivo.pt");
    }
}
