//! End-to-end harvesting use cases
//!
//! Wires the enumerator, harvester and coordinator to a browser context and
//! the CSV sink. Per-page problems are absorbed further down; anything that
//! surfaces here (browser launch, file I/O, bad configuration) ends the run.

use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

use super::detail_harvester::DetailHarvester;
use super::harvest_coordinator::HarvestCoordinator;
use super::link_enumerator::LinkEnumerator;
use crate::domain::{DateRange, FederationId, LinkTask, MatchRecord};
use crate::infrastructure::browser::BrowserContext;
use crate::infrastructure::config::HarvestConfig;
use crate::infrastructure::network_filter::NetworkFilter;
use crate::infrastructure::parsing::{CompiledProfile, SiteProfile};
use crate::infrastructure::record_sink::{CsvRecordSink, read_link_tasks};

/// Totals reported at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub links: usize,
    pub records: usize,
    pub stubs: usize,
    pub with_referees: usize,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn from_records(links: usize, records: &[MatchRecord], elapsed: Duration) -> Self {
        Self {
            links,
            records: records.len(),
            stubs: records.iter().filter(|r| r.is_stub()).count(),
            with_referees: records.iter().filter(|r| r.has_referees()).count(),
            elapsed,
        }
    }

    pub fn log(&self) {
        info!("=== Run summary ===");
        info!("Links: {}", self.links);
        info!("Records: {} ({} stub, {} with referees)", self.records, self.stubs, self.with_referees);
        info!("Elapsed: {:.1}s", self.elapsed.as_secs_f64());
    }
}

/// Resolve the configured profile, applying any base URL override
pub fn resolve_profile(config: &HarvestConfig) -> Result<CompiledProfile> {
    let mut profile = SiteProfile::by_name(&config.profile).ok_or_else(|| {
        anyhow!(
            "Unknown profile '{}' (expected one of: {})",
            config.profile,
            SiteProfile::NAMES.join(", ")
        )
    })?;
    if let Some(base_url) = &config.base_url {
        profile = profile.with_base_url(base_url.as_str());
    }
    profile
        .compile()
        .with_context(|| format!("Invalid site profile '{}'", config.profile))
}

/// High-level harvesting use cases
pub struct HarvestUseCases {
    config: HarvestConfig,
    context: Arc<dyn BrowserContext>,
    profile: Arc<CompiledProfile>,
    filter: Arc<NetworkFilter>,
}

impl HarvestUseCases {
    pub fn new(config: HarvestConfig, context: Arc<dyn BrowserContext>) -> Result<Self> {
        let profile = Arc::new(resolve_profile(&config)?);
        Ok(Self {
            config,
            context,
            profile,
            filter: Arc::new(NetworkFilter::default()),
        })
    }

    pub fn profile(&self) -> &CompiledProfile {
        &self.profile
    }

    /// Configured federations, or the profile's defaults when none are set
    pub fn federations(&self) -> Vec<FederationId> {
        if self.config.federations.is_empty() {
            self.profile.profile.default_federations.clone()
        } else {
            self.config.federations.iter().copied().map(FederationId).collect()
        }
    }

    pub async fn enumerate_links(&self, range: DateRange) -> Vec<LinkTask> {
        let enumerator = LinkEnumerator::new(
            Arc::clone(&self.context),
            Arc::clone(&self.profile),
            Arc::clone(&self.filter),
            &self.config.timing,
        );
        enumerator.enumerate(range, &self.federations()).await
    }

    pub async fn harvest_links(&self, tasks: Vec<LinkTask>) -> Vec<MatchRecord> {
        let harvester = DetailHarvester::new(
            Arc::clone(&self.profile),
            Arc::clone(&self.filter),
            &self.config.timing,
        );
        HarvestCoordinator::new(Arc::new(harvester), self.config.timing.max_concurrent)
            .harvest_all(Arc::clone(&self.context), tasks)
            .await
    }

    /// Enumerate and write the link-only CSV
    pub async fn run_links(&self, range: DateRange, output: &Path) -> Result<Vec<LinkTask>> {
        let tasks = self.enumerate_links(range).await;
        CsvRecordSink::new(output)
            .write_links(&tasks)
            .await
            .context("Failed to write links file")?;
        Ok(tasks)
    }

    /// Harvest a links file and write the full CSV
    pub async fn run_harvest(&self, links_file: &Path, output: &Path) -> Result<RunSummary> {
        let started = Instant::now();
        let tasks = read_link_tasks(links_file)
            .await
            .with_context(|| format!("Failed to read links from {:?}", links_file))?;
        info!("📄 {} link(s) read from {:?}", tasks.len(), links_file);

        self.harvest_and_write(tasks, output, started).await
    }

    /// Both phases: enumerate, harvest, write the full CSV
    pub async fn run_full(&self, range: DateRange, output: &Path) -> Result<RunSummary> {
        let started = Instant::now();
        let tasks = self.enumerate_links(range).await;
        self.harvest_and_write(tasks, output, started).await
    }

    async fn harvest_and_write(&self, tasks: Vec<LinkTask>, output: &Path, started: Instant) -> Result<RunSummary> {
        let links = tasks.len();
        let records = self.harvest_links(tasks).await;
        CsvRecordSink::new(output)
            .write_records(&records)
            .await
            .context("Failed to write match records")?;

        let summary = RunSummary::from_records(links, &records, started.elapsed());
        summary.log();
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::browser::FixtureBrowser;

    #[test]
    fn test_resolve_profile() {
        let config = HarvestConfig {
            profile: "sweep".into(),
            base_url: Some("https://stats.example.se/".into()),
            ..HarvestConfig::default()
        };
        let profile = resolve_profile(&config).unwrap();
        assert_eq!(profile.name(), "sweep");
        assert_eq!(profile.profile.base_url, "https://stats.example.se");

        let unknown = HarvestConfig {
            profile: "handboll".into(),
            ..HarvestConfig::default()
        };
        assert!(resolve_profile(&unknown).is_err());
    }

    #[test]
    fn test_federations_default_to_profile() {
        let context: Arc<dyn BrowserContext> = Arc::new(FixtureBrowser::new());
        let use_cases = HarvestUseCases::new(HarvestConfig::default(), Arc::clone(&context)).unwrap();
        assert_eq!(use_cases.federations(), vec![FederationId(21)]);

        let config = HarvestConfig {
            federations: vec![3, 44],
            ..HarvestConfig::default()
        };
        let use_cases = HarvestUseCases::new(config, context).unwrap();
        assert_eq!(use_cases.federations(), vec![FederationId(3), FederationId(44)]);
    }

    #[test]
    fn test_summary_counts() {
        let mut full = MatchRecord::stub("https://x/1");
        full.referee1 = Some("Anna".into());
        let records = vec![full, MatchRecord::stub("https://x/2")];
        let summary = RunSummary::from_records(3, &records, Duration::from_secs(1));
        assert_eq!((summary.links, summary.records, summary.stubs, summary.with_referees), (3, 2, 1, 1));
    }
}
