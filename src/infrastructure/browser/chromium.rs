//! Headless Chromium backend over the DevTools protocol.
//!
//! Request filtering uses `Fetch.enable` interception: every request pauses,
//! the filter decides, and the request is either failed with
//! `BlockedByClient` or continued untouched.

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams as FetchEnableParams, EventRequestPaused,
    FailRequestParams,
};
use chromiumoxide::cdp::browser_protocol::network::{ErrorReason, ResourceType};
use futures::StreamExt;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::{BrowserContext, BrowserPage};
use crate::infrastructure::config::BrowserSettings;
use crate::infrastructure::harvest_error::{HarvestError, HarvestResult};
use crate::infrastructure::network_filter::{NetworkFilter, RequestInfo, ResourceKind};

/// One Chromium process; all pages share its default browser context
pub struct ChromiumBrowser {
    browser: Mutex<Browser>,
    handler: StdMutex<Option<JoinHandle<()>>>,
}

impl ChromiumBrowser {
    /// Launch Chromium. Failure here is fatal for the run.
    pub async fn launch(settings: &BrowserSettings) -> HarvestResult<Self> {
        let mut builder = BrowserConfig::builder();
        if !settings.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = &settings.chrome_executable {
            builder = builder.chrome_executable(executable);
        }
        for arg in &settings.chrome_args {
            builder = builder.arg(arg.as_str());
        }
        let config = builder.build().map_err(HarvestError::browser)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| HarvestError::browser(format!("Failed to launch Chromium: {}", e)))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDP handler stopped: {}", e);
                    break;
                }
            }
        });

        info!("🌐 Chromium launched (headless: {})", settings.headless);
        Ok(Self {
            browser: Mutex::new(browser),
            handler: StdMutex::new(Some(handler_task)),
        })
    }
}

#[async_trait]
impl BrowserContext for ChromiumBrowser {
    async fn new_page(&self) -> HarvestResult<Arc<dyn BrowserPage>> {
        let page = self
            .browser
            .lock()
            .await
            .new_page("about:blank")
            .await
            .map_err(|e| HarvestError::browser(format!("Failed to open page: {}", e)))?;

        Ok(Arc::new(ChromiumPage {
            page,
            interceptor: StdMutex::new(None),
            closed: AtomicBool::new(false),
        }))
    }

    fn name(&self) -> &'static str {
        "chromium"
    }

    async fn shutdown(&self) -> HarvestResult<()> {
        let result = self.browser.lock().await.close().await;
        if let Ok(mut handler) = self.handler.lock() {
            if let Some(task) = handler.take() {
                task.abort();
            }
        }
        result
            .map(|_| ())
            .map_err(|e| HarvestError::browser(format!("Failed to close Chromium: {}", e)))
    }
}

struct ChromiumPage {
    page: Page,
    interceptor: StdMutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

fn resource_kind(resource_type: &ResourceType) -> ResourceKind {
    match resource_type {
        ResourceType::Document => ResourceKind::Document,
        ResourceType::Script => ResourceKind::Script,
        ResourceType::Stylesheet => ResourceKind::Stylesheet,
        ResourceType::Xhr | ResourceType::Fetch => ResourceKind::Xhr,
        ResourceType::Image => ResourceKind::Image,
        ResourceType::Media => ResourceKind::Media,
        ResourceType::Font => ResourceKind::Font,
        _ => ResourceKind::Other,
    }
}

#[async_trait]
impl BrowserPage for ChromiumPage {
    async fn install_filter(&self, filter: Arc<NetworkFilter>) -> HarvestResult<()> {
        let mut paused = self
            .page
            .event_listener::<EventRequestPaused>()
            .await
            .map_err(|e| HarvestError::browser(format!("Request listener failed: {}", e)))?;
        self.page
            .execute(FetchEnableParams::default())
            .await
            .map_err(|e| HarvestError::browser(format!("Fetch.enable failed: {}", e)))?;

        let page = self.page.clone();
        let task = tokio::spawn(async move {
            while let Some(event) = paused.next().await {
                let request = RequestInfo::new(
                    event.request.url.clone(),
                    resource_kind(&event.resource_type),
                );
                let outcome = if filter.should_block(&request) {
                    trace!("Blocked {}", request.url);
                    page.execute(FailRequestParams::new(
                        event.request_id.clone(),
                        ErrorReason::BlockedByClient,
                    ))
                    .await
                    .map(|_| ())
                } else {
                    page.execute(ContinueRequestParams::new(event.request_id.clone()))
                        .await
                        .map(|_| ())
                };
                if let Err(e) = outcome {
                    // The page is usually closing; nothing left to unblock
                    debug!("Request interception stopped: {}", e);
                    break;
                }
            }
        });

        if let Ok(mut slot) = self.interceptor.lock() {
            if let Some(previous) = slot.replace(task) {
                previous.abort();
            }
        }
        Ok(())
    }

    async fn goto(&self, url: &str) -> HarvestResult<()> {
        self.page
            .goto(url)
            .await
            .map(|_| ())
            .map_err(|e| HarvestError::navigation(url, e))
    }

    async fn content(&self) -> HarvestResult<String> {
        self.page
            .content()
            .await
            .map_err(|e| HarvestError::PageUnavailable {
                reason: e.to_string(),
            })
    }

    async fn close(&self) -> HarvestResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if let Ok(mut slot) = self.interceptor.lock() {
            if let Some(task) = slot.take() {
                task.abort();
            }
        }
        self.page.clone().close().await.map_err(|e| {
            warn!("Failed to close page: {}", e);
            HarvestError::browser(format!("Failed to close page: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_type_mapping() {
        assert_eq!(resource_kind(&ResourceType::Image), ResourceKind::Image);
        assert_eq!(resource_kind(&ResourceType::Font), ResourceKind::Font);
        assert_eq!(resource_kind(&ResourceType::Media), ResourceKind::Media);
        assert_eq!(resource_kind(&ResourceType::Fetch), ResourceKind::Xhr);
        assert_eq!(resource_kind(&ResourceType::Document), ResourceKind::Document);
    }
}
