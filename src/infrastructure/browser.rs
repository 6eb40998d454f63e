//! Page loading abstraction shared by the enumeration and harvest phases.
//!
//! A [`BrowserContext`] is the run-wide session (cookies, process handle); each
//! unit of work opens its own [`BrowserPage`] through a [`PageGuard`] so the
//! page is closed on every exit path, including task cancellation.
//!
//! Backends:
//! - [`chromium::ChromiumBrowser`]: headless Chromium over CDP, for the
//!   client-rendered portal
//! - [`http::HttpBrowser`]: plain HTTP fetch, for server-rendered mirrors
//! - [`fixture::FixtureBrowser`]: in-memory or on-disk saved pages

use async_trait::async_trait;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::infrastructure::config::{BackendKind, BrowserSettings};
use crate::infrastructure::harvest_error::{HarvestError, HarvestResult};
use crate::infrastructure::network_filter::NetworkFilter;

pub mod chromium;
pub mod fixture;
pub mod http;

pub use chromium::ChromiumBrowser;
pub use fixture::{FixtureBrowser, FixturePage, FixtureStats};
pub use http::HttpBrowser;

/// Run-wide browser session
#[async_trait]
pub trait BrowserContext: Send + Sync {
    /// Open a fresh, blank page owned by the caller
    async fn new_page(&self) -> HarvestResult<Arc<dyn BrowserPage>>;

    /// Backend name for logs
    fn name(&self) -> &'static str;

    /// Tear the session down; pages opened afterwards fail
    async fn shutdown(&self) -> HarvestResult<()> {
        Ok(())
    }
}

/// One page, used by exactly one task at a time.
///
/// Operations carry no timeouts of their own; callers bound them with
/// `tokio::time::timeout` so every backend is cancelled the same way.
#[async_trait]
pub trait BrowserPage: Send + Sync {
    /// Abort sub-resource requests the filter rejects from now on
    async fn install_filter(&self, filter: Arc<NetworkFilter>) -> HarvestResult<()>;

    /// Navigate and wait for the document to load
    async fn goto(&self, url: &str) -> HarvestResult<()>;

    /// Serialized DOM as it currently stands
    async fn content(&self) -> HarvestResult<String>;

    /// Release the page. Closing twice is harmless.
    async fn close(&self) -> HarvestResult<()>;
}

/// Scoped ownership of a page.
///
/// Call [`PageGuard::close`] on the normal path. If the guard is dropped
/// without it (early return, panic, aborted task) the close is spawned onto
/// the current runtime instead.
pub struct PageGuard {
    page: Arc<dyn BrowserPage>,
    closed: bool,
}

impl PageGuard {
    /// Open a new page on `context`
    pub async fn open(context: &dyn BrowserContext) -> HarvestResult<Self> {
        let page = context.new_page().await?;
        Ok(Self { page, closed: false })
    }

    pub fn page(&self) -> &dyn BrowserPage {
        self.page.as_ref()
    }

    /// Close the page now and report the outcome
    pub async fn close(mut self) -> HarvestResult<()> {
        self.closed = true;
        self.page.close().await
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let page = Arc::clone(&self.page);
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = page.close().await {
                        debug!("Deferred page close failed: {}", e);
                    }
                });
            }
            Err(_) => warn!("Page guard dropped outside a runtime; page left open"),
        }
    }
}

/// Start the configured backend. Any failure here is systemic.
pub async fn launch_backend(
    settings: &BrowserSettings,
    base_url: &str,
) -> HarvestResult<Arc<dyn BrowserContext>> {
    let context: Arc<dyn BrowserContext> = match settings.backend {
        BackendKind::Chromium => Arc::new(ChromiumBrowser::launch(settings).await?),
        BackendKind::Http => Arc::new(HttpBrowser::new(settings)?),
        BackendKind::Fixture => {
            let dir = settings.fixture_dir.as_deref().ok_or_else(|| HarvestError::Config {
                message: "fixture backend needs a fixture directory".to_string(),
            })?;
            Arc::new(FixtureBrowser::from_dir(dir, base_url)?)
        }
    };
    debug!("Browser backend ready: {}", context.name());
    Ok(context)
}
