//! Detail page harvesting: one link in, one record out.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, warn};

use crate::domain::{LinkTask, MatchRecord};
use crate::infrastructure::browser::{BrowserContext, BrowserPage, PageGuard};
use crate::infrastructure::config::TimingConfig;
use crate::infrastructure::harvest_error::{HarvestError, HarvestResult};
use crate::infrastructure::network_filter::NetworkFilter;
use crate::infrastructure::parsing::{CompiledProfile, FieldExtractor, normalize_date};

/// Loads a detail page and reads every record field from it.
///
/// Never fails: a page that cannot be loaded yields a stub record, a field
/// that cannot be found is left absent.
pub struct DetailHarvester {
    profile: Arc<CompiledProfile>,
    filter: Arc<NetworkFilter>,
    extractor: FieldExtractor,
    navigation_timeout: Duration,
}

impl DetailHarvester {
    pub fn new(profile: Arc<CompiledProfile>, filter: Arc<NetworkFilter>, timing: &TimingConfig) -> Self {
        Self {
            profile,
            filter,
            extractor: FieldExtractor::from_timing(timing),
            navigation_timeout: timing.navigation_timeout(),
        }
    }

    pub fn profile(&self) -> &CompiledProfile {
        &self.profile
    }

    /// Record for `task`, with the detail suffix stripped from its URL
    pub fn stub_for(&self, task: &LinkTask) -> MatchRecord {
        MatchRecord::stub(task.canonical_url(self.profile.detail_suffix())).with_federation(task.federation_id)
    }

    pub async fn harvest(&self, context: &dyn BrowserContext, task: &LinkTask) -> MatchRecord {
        let guard = match PageGuard::open(context).await {
            Ok(guard) => guard,
            Err(e) => {
                warn!(url = %task.detail_url, "⚠️ Could not open page: {}", e);
                return self.stub_for(task);
            }
        };

        let record = match self.load(guard.page(), &task.detail_url).await {
            Ok(()) => self.read_record(guard.page(), task).await,
            Err(e) => {
                warn!(url = %task.detail_url, "⚠️ Detail page not loaded, writing stub: {}", e);
                self.stub_for(task)
            }
        };

        if let Err(e) = guard.close().await {
            debug!("Detail page close failed: {}", e);
        }
        record
    }

    async fn load(&self, page: &dyn BrowserPage, url: &str) -> HarvestResult<()> {
        page.install_filter(Arc::clone(&self.filter)).await?;
        timeout(self.navigation_timeout, page.goto(url))
            .await
            .map_err(|_| HarvestError::navigation_timeout(url, self.navigation_timeout))?
    }

    async fn read_record(&self, page: &dyn BrowserPage, task: &LinkTask) -> MatchRecord {
        let extractor = &self.extractor;
        let fields = &self.profile.fields;

        // Readiness is advisory; a page without it is still read field by field
        if !extractor
            .wait_for_selector(page, &self.profile.detail_ready, extractor.selector_timeout())
            .await
        {
            debug!("Detail page never showed its data marker: {}", task.detail_url);
        }

        let raw_date = extractor.extract(page, &fields.date).await;
        let mut date = normalize_date(raw_date.as_deref());
        if raw_date.is_some() && date.is_none() {
            debug!("Unparseable date {:?} on {}", raw_date, task.detail_url);
        }
        if date.is_none() && self.profile.profile.date_from_listing {
            date = task.date;
        }

        let time = extractor.extract(page, &fields.time).await;
        let competition = extractor.extract(page, &fields.competition).await;
        let home_team = extractor.extract(page, &fields.home_team).await;
        let away_team = extractor.extract(page, &fields.away_team).await;
        let venue = extractor.extract(page, &fields.venue).await;
        let match_number = extractor.extract(page, &fields.match_number).await;
        let mut referees = extractor.extract_all(page, &fields.referees).await.into_iter();

        MatchRecord {
            source_url: task.canonical_url(self.profile.detail_suffix()),
            date,
            time,
            competition,
            home_team,
            away_team,
            venue,
            match_number,
            referee1: referees.next(),
            referee2: referees.next(),
            federation_id: task.federation_id,
        }
    }
}
