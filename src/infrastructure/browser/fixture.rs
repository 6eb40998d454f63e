//! Saved-page backend.
//!
//! Serves HTML from memory (tests) or from a directory of saved pages
//! (offline reruns). Pages can be given a load latency, a navigation
//! failure, or made to never finish loading.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

use super::{BrowserContext, BrowserPage};
use crate::infrastructure::harvest_error::{HarvestError, HarvestResult};
use crate::infrastructure::network_filter::{NetworkFilter, RequestInfo, ResourceKind};

/// How a saved URL behaves when navigated to
#[derive(Debug, Clone)]
pub enum FixtureResponse {
    Html(String),
    /// Navigation fails with the given reason
    Fail(String),
    /// Navigation never completes
    Hang,
}

/// One saved URL
#[derive(Debug, Clone)]
pub struct FixturePage {
    pub response: FixtureResponse,
    pub latency: Duration,
    /// Sub-resources the page would request while loading
    pub resources: Vec<RequestInfo>,
}

impl FixturePage {
    pub fn html(body: impl Into<String>) -> Self {
        Self {
            response: FixtureResponse::Html(body.into()),
            latency: Duration::ZERO,
            resources: Vec::new(),
        }
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            response: FixtureResponse::Fail(reason.into()),
            latency: Duration::ZERO,
            resources: Vec::new(),
        }
    }

    pub fn hanging() -> Self {
        Self {
            response: FixtureResponse::Hang,
            latency: Duration::ZERO,
            resources: Vec::new(),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_resource(mut self, url: impl Into<String>, kind: ResourceKind) -> Self {
        self.resources.push(RequestInfo::new(url, kind));
        self
    }
}

/// Counters observed across every page of a fixture session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixtureStats {
    pub opened: usize,
    pub closed: usize,
    pub navigations: usize,
    /// Highest number of navigations in progress at the same moment
    pub max_in_flight: usize,
}

#[derive(Debug, Default)]
struct Counters {
    opened: AtomicUsize,
    closed: AtomicUsize,
    navigations: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// In-memory browser serving pre-recorded pages
#[derive(Debug, Clone, Default)]
pub struct FixtureBrowser {
    pages: Arc<HashMap<String, FixturePage>>,
    counters: Arc<Counters>,
    blocked: Arc<Mutex<Vec<String>>>,
}

fn fixture_key(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

impl FixtureBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a browser from `(url, page)` pairs
    pub fn with_pages<I, S>(pages: I) -> Self
    where
        I: IntoIterator<Item = (S, FixturePage)>,
        S: AsRef<str>,
    {
        let pages = pages
            .into_iter()
            .map(|(url, page)| (fixture_key(url.as_ref()), page))
            .collect();
        Self {
            pages: Arc::new(pages),
            ..Self::default()
        }
    }

    /// Load every `*.html` file below `dir`, keyed as `{base_url}/{relative path without .html}`.
    ///
    /// `forbund/21/livematches/2025-11-17.html` becomes
    /// `{base_url}/forbund/21/livematches/2025-11-17`.
    pub fn from_dir(dir: &Path, base_url: &str) -> HarvestResult<Self> {
        let mut pages = Vec::new();
        collect_html_files(dir, dir, base_url.trim_end_matches('/'), &mut pages)?;
        debug!("Loaded {} fixture pages from {:?}", pages.len(), dir);
        Ok(Self::with_pages(pages))
    }

    pub fn stats(&self) -> FixtureStats {
        FixtureStats {
            opened: self.counters.opened.load(Ordering::SeqCst),
            closed: self.counters.closed.load(Ordering::SeqCst),
            navigations: self.counters.navigations.load(Ordering::SeqCst),
            max_in_flight: self.counters.max_in_flight.load(Ordering::SeqCst),
        }
    }

    /// URLs of sub-resources the installed filters aborted
    pub fn blocked_requests(&self) -> Vec<String> {
        self.blocked.lock().map(|b| b.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

fn collect_html_files(
    root: &Path,
    dir: &Path,
    base_url: &str,
    out: &mut Vec<(String, FixturePage)>,
) -> HarvestResult<()> {
    let io_error = |path: &Path, e: std::io::Error| HarvestError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    };

    for entry in std::fs::read_dir(dir).map_err(|e| io_error(dir, e))? {
        let path = entry.map_err(|e| io_error(dir, e))?.path();
        if path.is_dir() {
            collect_html_files(root, &path, base_url, out)?;
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) != Some("html") {
            continue;
        }
        let Ok(relative) = path.with_extension("").strip_prefix(root).map(Path::to_path_buf) else {
            continue;
        };
        let route = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let body = std::fs::read_to_string(&path).map_err(|e| io_error(&path, e))?;
        out.push((format!("{}/{}", base_url, route), FixturePage::html(body)));
    }
    Ok(())
}

#[async_trait]
impl BrowserContext for FixtureBrowser {
    async fn new_page(&self) -> HarvestResult<Arc<dyn BrowserPage>> {
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FixtureTab {
            browser: self.clone(),
            filter: RwLock::new(None),
            body: RwLock::new(None),
            closed: AtomicUsize::new(0),
        }))
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}

struct FixtureTab {
    browser: FixtureBrowser,
    filter: RwLock<Option<Arc<NetworkFilter>>>,
    body: RwLock<Option<String>>,
    closed: AtomicUsize,
}

/// Decrements the in-flight counter even when the navigation is cancelled
struct InFlight<'a>(&'a Counters);

impl<'a> InFlight<'a> {
    fn enter(counters: &'a Counters) -> Self {
        let now = counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        counters.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Self(counters)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl BrowserPage for FixtureTab {
    async fn install_filter(&self, filter: Arc<NetworkFilter>) -> HarvestResult<()> {
        *self.filter.write().await = Some(filter);
        Ok(())
    }

    async fn goto(&self, url: &str) -> HarvestResult<()> {
        let counters = &self.browser.counters;
        counters.navigations.fetch_add(1, Ordering::SeqCst);
        let _in_flight = InFlight::enter(counters);

        let Some(page) = self.browser.pages.get(&fixture_key(url)) else {
            return Err(HarvestError::HttpStatus {
                status: 404,
                url: url.to_string(),
            });
        };

        if let Some(filter) = self.filter.read().await.as_ref() {
            let blocked: Vec<String> = page
                .resources
                .iter()
                .filter(|r| filter.should_block(r))
                .map(|r| r.url.clone())
                .collect();
            if let Ok(mut log) = self.browser.blocked.lock() {
                log.extend(blocked);
            }
        }

        if !page.latency.is_zero() {
            tokio::time::sleep(page.latency).await;
        }

        match &page.response {
            FixtureResponse::Html(body) => {
                *self.body.write().await = Some(body.clone());
                Ok(())
            }
            FixtureResponse::Fail(reason) => Err(HarvestError::navigation(url, reason)),
            FixtureResponse::Hang => std::future::pending().await,
        }
    }

    async fn content(&self) -> HarvestResult<String> {
        self.body
            .read()
            .await
            .clone()
            .ok_or_else(|| HarvestError::PageUnavailable {
                reason: "no document loaded".to_string(),
            })
    }

    async fn close(&self) -> HarvestResult<()> {
        if self.closed.fetch_add(1, Ordering::SeqCst) == 0 {
            self.browser.counters.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_serves_saved_html_and_404s_unknown_urls() {
        let browser = FixtureBrowser::with_pages([(
            "https://stats.example.se/match/1/",
            FixturePage::html("<h1>ok</h1>"),
        )]);
        let page = browser.new_page().await.unwrap();

        assert!(page.content().await.is_err());
        page.goto("https://stats.example.se/match/1").await.unwrap();
        assert_eq!(page.content().await.unwrap(), "<h1>ok</h1>");

        let missing = page.goto("https://stats.example.se/match/2").await.unwrap_err();
        assert!(missing.is_navigation());
    }

    #[tokio::test]
    async fn test_installed_filter_records_blocked_resources() {
        let browser = FixtureBrowser::with_pages([(
            "https://stats.example.se/match/1",
            FixturePage::html("<p/>")
                .with_resource("https://www.googletagmanager.com/gtag/js", ResourceKind::Script)
                .with_resource("https://stats.example.se/app.js", ResourceKind::Script)
                .with_resource("https://stats.example.se/crest.webp", ResourceKind::Image),
        )]);
        let page = browser.new_page().await.unwrap();
        page.install_filter(Arc::new(NetworkFilter::default())).await.unwrap();
        page.goto("https://stats.example.se/match/1").await.unwrap();

        assert_eq!(
            browser.blocked_requests(),
            vec![
                "https://www.googletagmanager.com/gtag/js".to_string(),
                "https://stats.example.se/crest.webp".to_string(),
            ]
        );
    }

    #[test]
    fn test_from_dir_maps_paths_to_urls() {
        let dir = tempfile::tempdir().unwrap();
        let listing = dir.path().join("forbund/21/livematches");
        std::fs::create_dir_all(&listing).unwrap();
        std::fs::write(listing.join("2025-11-17.html"), "<a/>").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "skip").unwrap();

        let browser = FixtureBrowser::from_dir(dir.path(), "https://stats.example.se/").unwrap();
        assert_eq!(browser.len(), 1);
        assert!(browser
            .pages
            .contains_key("https://stats.example.se/forbund/21/livematches/2025-11-17"));
    }
}
