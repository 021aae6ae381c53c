//! Archive endpoint construction
//!
//! Wayback-style archives expose three lookups for an original URL:
//!
//! - CDX search: `{base}/cdx/search/cdx?url={target}&output=json&limit={n}`
//! - TimeMap index (JSON): `{base}/web/timemap/json/{target}`
//! - TimeMap link-format: `{base}/web/timemap/link/{target}`

use url::Url;

use crate::utils::error::FetchError;
use crate::utils::join_url;

/// Endpoint builder for one archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEndpoints {
    base: String,
}

impl ArchiveEndpoints {
    /// Create a builder for the archive rooted at `base`
    pub fn new(base: impl Into<String>) -> Self {
        let base: String = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    /// Archive root without trailing slash
    pub fn base(&self) -> &str {
        &self.base
    }

    /// CDX search URL for a target, tabular JSON output
    ///
    /// # Errors
    ///
    /// Returns `FetchError::InvalidUrl` if the base cannot form a URL
    pub fn cdx(&self, target_url: &str, limit: u32) -> Result<String, FetchError> {
        let endpoint = join_url(&self.base, "cdx/search/cdx");
        let limit = limit.to_string();

        Url::parse_with_params(
            &endpoint,
            &[
                ("url", target_url),
                ("output", "json"),
                ("limit", limit.as_str()),
            ],
        )
        .map(String::from)
        .map_err(|e| FetchError::InvalidUrl(format!("{endpoint}: {e}")))
    }

    /// TimeMap index URL (JSON)
    pub fn timemap_index(&self, target_url: &str) -> String {
        join_url(&self.base, &format!("web/timemap/json/{target_url}"))
    }

    /// Link-format TimeMap URL
    pub fn link_format(&self, target_url: &str) -> String {
        join_url(&self.base, &format!("web/timemap/link/{target_url}"))
    }
}
