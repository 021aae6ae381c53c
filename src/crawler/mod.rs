//! Archive crawling with format fallback
//!
//! This module implements the fetching side of mink: bounded, rate-limited
//! lookups against web archives and the fallback chain that merges them.

pub mod aggregator;
pub mod endpoints;
pub mod fetcher;

pub use aggregator::Aggregator;
pub use endpoints::ArchiveEndpoints;
pub use fetcher::TimemapFetcher;
