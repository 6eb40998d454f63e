//! Link enumeration over a date × federation sweep.
//!
//! Listing pages are visited one at a time in (date, federation) order. A
//! listing that fails to load, times out, or never shows a match link
//! contributes no links; the sweep always runs to the end.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use scraper::Html;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::domain::link_task::append_detail_suffix;
use crate::domain::{DateRange, FederationId, LinkTask};
use crate::infrastructure::browser::{BrowserContext, PageGuard};
use crate::infrastructure::config::TimingConfig;
use crate::infrastructure::harvest_error::{HarvestError, HarvestResult};
use crate::infrastructure::network_filter::NetworkFilter;
use crate::infrastructure::parsing::{CompiledProfile, FieldExtractor};

/// Absolute, suffixed detail URLs for every qualifying anchor on a listing page,
/// in document order, without repeats.
pub fn extract_listing_links(html: &str, profile: &CompiledProfile) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut links: Vec<String> = Vec::new();

    for anchor in document.select(&profile.anchor) {
        let Some(href) = anchor.value().attr("href").map(str::trim) else {
            continue;
        };
        if href.is_empty() || href.starts_with('#') {
            continue;
        }
        let Ok(mut resolved) = profile.base_url.join(href) else {
            debug!("Unresolvable href skipped: {}", href);
            continue;
        };
        if !matches!(resolved.scheme(), "http" | "https") || !profile.is_match_url(&resolved) {
            continue;
        }
        resolved.set_query(None);
        resolved.set_fragment(None);

        let link = append_detail_suffix(resolved.as_str(), profile.detail_suffix());
        if !links.contains(&link) {
            links.push(link);
        }
    }

    links
}

/// Global first-seen deduplication of discovered links
#[derive(Debug, Default)]
pub struct LinkCollector {
    tasks: Vec<LinkTask>,
    index: HashMap<String, usize>,
}

impl LinkCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a link; returns `false` when the URL was already collected
    pub fn push(&mut self, date: NaiveDate, federation: FederationId, url: String) -> bool {
        if let Some(&existing) = self.index.get(&url) {
            if let Some(first) = self.tasks.get(existing) {
                debug!(
                    "Duplicate link {} (date {}, federation {}) kept under {}",
                    url, date, federation, first
                );
            }
            return false;
        }
        self.index.insert(url.clone(), self.tasks.len());
        self.tasks.push(LinkTask::new(date, federation, url));
        true
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn into_tasks(self) -> Vec<LinkTask> {
        self.tasks
    }
}

/// Walks listing pages and collects detail links
pub struct LinkEnumerator {
    context: Arc<dyn BrowserContext>,
    profile: Arc<CompiledProfile>,
    filter: Arc<NetworkFilter>,
    extractor: FieldExtractor,
    navigation_timeout: Duration,
    selector_timeout: Duration,
}

impl LinkEnumerator {
    pub fn new(
        context: Arc<dyn BrowserContext>,
        profile: Arc<CompiledProfile>,
        filter: Arc<NetworkFilter>,
        timing: &TimingConfig,
    ) -> Self {
        Self {
            context,
            profile,
            filter,
            extractor: FieldExtractor::from_timing(timing),
            navigation_timeout: timing.listing_navigation_timeout(),
            selector_timeout: timing.listing_selector_timeout(),
        }
    }

    /// Every distinct detail link for `range` × `federations`, in discovery order
    pub async fn enumerate(&self, range: DateRange, federations: &[FederationId]) -> Vec<LinkTask> {
        info!(
            "🔎 Enumerating {} day(s) × {} federation(s) with profile '{}'",
            range.len(),
            federations.len(),
            self.profile.name()
        );

        let mut collector = LinkCollector::new();
        for date in range {
            for &federation in federations {
                let links = self.listing_links(federation, date).await;
                let found = links.len();
                let added = links
                    .into_iter()
                    .filter(|link| collector.push(date, federation, link.clone()))
                    .count();
                info!(
                    date = %date,
                    federation = federation.get(),
                    "📅 {} match link(s), {} new",
                    found,
                    added
                );
            }
        }

        info!("✅ Enumeration complete: {} unique link(s)", collector.len());
        collector.into_tasks()
    }

    /// Links on one listing page; empty on any failure
    pub async fn listing_links(&self, federation: FederationId, date: NaiveDate) -> Vec<String> {
        let url = self.profile.profile.listing_url(federation, date);
        let guard = match PageGuard::open(self.context.as_ref()).await {
            Ok(guard) => guard,
            Err(e) => {
                warn!(url = %url, "⚠️ Could not open page for listing: {}", e);
                return Vec::new();
            }
        };

        let links = match self.load_listing(&guard, &url).await {
            Ok(links) => links,
            Err(e) => {
                warn!(url = %url, "⚠️ Listing skipped: {}", e);
                Vec::new()
            }
        };

        if let Err(e) = guard.close().await {
            debug!("Listing page close failed: {}", e);
        }
        links
    }

    async fn load_listing(&self, guard: &PageGuard, url: &str) -> HarvestResult<Vec<String>> {
        let page = guard.page();
        page.install_filter(Arc::clone(&self.filter)).await?;
        timeout(self.navigation_timeout, page.goto(url))
            .await
            .map_err(|_| HarvestError::navigation_timeout(url, self.navigation_timeout))??;

        let anchor = &self.profile.anchor;
        if !self
            .extractor
            .wait_for_selector(page, anchor, self.selector_timeout)
            .await
        {
            debug!("No link-bearing elements on {}", url);
            return Ok(Vec::new());
        }

        let html = page.content().await?;
        Ok(extract_listing_links(&html, &self.profile))
    }
}
