//! Bounded-concurrency fan-out of detail harvests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

use super::detail_harvester::DetailHarvester;
use crate::domain::{LinkTask, MatchRecord};
use crate::infrastructure::browser::BrowserContext;

/// Runs every task under an admission gate of `max_concurrent` permits
pub struct HarvestCoordinator {
    harvester: Arc<DetailHarvester>,
    max_concurrent: usize,
}

impl HarvestCoordinator {
    pub fn new(harvester: Arc<DetailHarvester>, max_concurrent: usize) -> Self {
        Self {
            harvester,
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub const fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// One record per task, in task order.
    ///
    /// Excess tasks queue on the gate rather than being rejected. A task that
    /// panics still produces a stub for its link.
    pub async fn harvest_all(&self, context: Arc<dyn BrowserContext>, tasks: Vec<LinkTask>) -> Vec<MatchRecord> {
        let total = tasks.len();
        if total == 0 {
            return Vec::new();
        }

        info!(
            "🚀 Harvesting {} detail page(s), max {} concurrent",
            total, self.max_concurrent
        );
        let started = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let completed = Arc::new(AtomicUsize::new(0));

        let handles = tasks.iter().cloned().map(|task| {
            let semaphore = Arc::clone(&semaphore);
            let harvester = Arc::clone(&self.harvester);
            let context = Arc::clone(&context);
            let completed = Arc::clone(&completed);

            tokio::spawn(async move {
                // The gate is never closed, so acquisition only waits
                let _permit = semaphore.acquire_owned().await.ok();
                let record = harvester.harvest(context.as_ref(), &task).await;

                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                debug!("[{}/{}] {}", done, total, record.source_url);
                record
            })
        });

        let results = join_all(handles).await;

        let records: Vec<MatchRecord> = results
            .into_iter()
            .zip(&tasks)
            .map(|(result, task)| match result {
                Ok(record) => record,
                Err(e) => {
                    error!(url = %task.detail_url, "❌ Harvest task died: {}", e);
                    self.harvester.stub_for(task)
                }
            })
            .collect();

        info!(
            "✅ Harvested {} record(s) in {:.1}s",
            records.len(),
            started.elapsed().as_secs_f64()
        );
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::browser::{FixtureBrowser, FixturePage};
    use crate::infrastructure::config::TimingConfig;
    use crate::infrastructure::network_filter::NetworkFilter;
    use crate::infrastructure::parsing::SiteProfile;

    fn coordinator(max_concurrent: usize) -> HarvestCoordinator {
        let profile = Arc::new(SiteProfile::refstat().compile().unwrap());
        let harvester = DetailHarvester::new(profile, Arc::new(NetworkFilter::default()), &TimingConfig::default());
        HarvestCoordinator::new(Arc::new(harvester), max_concurrent)
    }

    #[tokio::test(start_paused = true)]
    async fn test_order_matches_input_despite_failures() {
        let urls: Vec<String> = (0..5)
            .map(|i| format!("https://stats.innebandy.se/sasong/1/serie/1/match/{}/laguppstallning", i))
            .collect();
        let browser = FixtureBrowser::with_pages(urls.iter().enumerate().map(|(i, url)| {
            let page = if i % 2 == 0 {
                FixturePage::html(format!("<span class=\"d6aBe\">Arena: <strong>Hall {}</strong></span>", i))
            } else {
                FixturePage::failing("boom")
            };
            (url.clone(), page)
        }));

        let tasks = urls.iter().map(LinkTask::from_url).collect();
        let records = coordinator(2).harvest_all(Arc::new(browser.clone()), tasks).await;

        assert_eq!(records.len(), 5);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.source_url, urls[i].trim_end_matches("/laguppstallning"));
            assert_eq!(record.is_stub(), i % 2 == 1);
        }
        assert_eq!(records[4].venue.as_deref(), Some("Hall 4"));
        assert_eq!(browser.stats().closed, 5);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let records = coordinator(6).harvest_all(Arc::new(FixtureBrowser::new()), Vec::new()).await;
        assert!(records.is_empty());
    }
}
