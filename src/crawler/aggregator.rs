//! Multi-source memento aggregation with format fallback
//!
//! The aggregator walks a fixed fallback chain for one target URL and stops
//! at the first stage that yields records:
//!
//! ```text
//! ┌──────────┐  empty  ┌────────────────┐  empty  ┌──────────────┐
//! │ CDX API  │────────▶│ TimeMap index  │────────▶│ Link-format  │
//! └──────────┘         │ (per provider) │         │ last resort  │
//!                      └────────────────┘         └──────────────┘
//! ```
//!
//! Providers listed by the index are fetched one after another. Each fetch
//! has its own timeout; the run as a whole has none, so a long provider
//! list can take up to `timeout × providers`.

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::AggregatorConfig;
use crate::crawler::endpoints::ArchiveEndpoints;
use crate::crawler::fetcher::TimemapFetcher;
use crate::metrics;
use crate::models::{AggregationResult, FallbackStage, MementoRecord};

/// Aggregation orchestrator
pub struct Aggregator {
    /// Fetcher shared by all stages
    fetcher: TimemapFetcher,

    /// Archive endpoint builder
    endpoints: ArchiveEndpoints,

    /// Source label for records served by the archive itself
    provider_label: String,

    /// Maximum CDX rows requested
    cdx_limit: u32,
}

impl Aggregator {
    /// Create a new aggregator
    pub fn new(config: &AggregatorConfig) -> Result<Self> {
        config.validate().context("Invalid aggregator configuration")?;

        let fetcher = TimemapFetcher::new(config).context("Failed to create HTTP client")?;

        Ok(Self {
            fetcher,
            endpoints: ArchiveEndpoints::new(config.archive_base_url.as_str()),
            provider_label: config.provider_label.clone(),
            cdx_limit: config.cdx_limit,
        })
    }

    /// Collect mementos for `target_url`
    ///
    /// Zero records is a normal outcome, not an error.
    pub async fn aggregate(&self, target_url: &str) -> AggregationResult {
        let mut result = AggregationResult::new(target_url);
        info!(target = %target_url, "Starting aggregation");

        for stage in FallbackStage::CHAIN {
            info!(stage = %stage, "Trying fallback stage");

            let records = self.run_stage(stage, target_url).await;
            result.stages_tried.push(stage);
            metrics::record_stage(stage.as_str(), records.len());

            if !records.is_empty() {
                info!(stage = %stage, mementos = records.len(), "Stage resolved");
                result.records = records;
                result.resolved_by = Some(stage);
                break;
            }

            info!(stage = %stage, "Stage found nothing");
        }

        if result.is_empty() {
            warn!(target = %target_url, "No mementos found from any source");
        } else {
            info!(
                target = %target_url,
                total = result.len(),
                sources = ?result.counts_by_source(),
                "Aggregation complete"
            );
        }

        result
    }

    async fn run_stage(&self, stage: FallbackStage, target_url: &str) -> Vec<MementoRecord> {
        match stage {
            FallbackStage::Cdx => match self.endpoints.cdx(target_url, self.cdx_limit) {
                Ok(url) => self.fetcher.fetch_cdx(&url, &self.provider_label).await,
                Err(e) => {
                    warn!(error = %e, "Cannot build CDX URL");
                    Vec::new()
                }
            },
            FallbackStage::TimemapIndex => {
                let url = self.endpoints.timemap_index(target_url);
                self.fetcher.fetch_timemap(&url, &self.provider_label).await
            }
            FallbackStage::LinkFormat => {
                let url = self.endpoints.link_format(target_url);
                self.fetcher.fetch_timemap(&url, &self.provider_label).await
            }
        }
    }
}
