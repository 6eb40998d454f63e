//! Plain HTTP page backend.
//!
//! Fetches the document only; no scripts run and no sub-resources are
//! requested, so the network filter applies to the document request itself.
//! Suitable for server-rendered mirrors or a rendering proxy in front of the
//! portal.

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::{BrowserContext, BrowserPage};
use crate::infrastructure::config::BrowserSettings;
use crate::infrastructure::harvest_error::{HarvestError, HarvestResult};
use crate::infrastructure::network_filter::{NetworkFilter, RequestInfo, ResourceKind};

/// Shared HTTP session; cookies persist across pages like a browser context
#[derive(Debug, Clone)]
pub struct HttpBrowser {
    client: Client,
}

impl HttpBrowser {
    pub fn new(settings: &BrowserSettings) -> HarvestResult<Self> {
        let client = ClientBuilder::new()
            .user_agent(&settings.user_agent)
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| HarvestError::browser(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl BrowserContext for HttpBrowser {
    async fn new_page(&self) -> HarvestResult<Arc<dyn BrowserPage>> {
        Ok(Arc::new(HttpPage {
            client: self.client.clone(),
            filter: RwLock::new(None),
            body: RwLock::new(None),
        }))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

struct HttpPage {
    client: Client,
    filter: RwLock<Option<Arc<NetworkFilter>>>,
    body: RwLock<Option<String>>,
}

#[async_trait]
impl BrowserPage for HttpPage {
    async fn install_filter(&self, filter: Arc<NetworkFilter>) -> HarvestResult<()> {
        *self.filter.write().await = Some(filter);
        Ok(())
    }

    async fn goto(&self, url: &str) -> HarvestResult<()> {
        if let Some(filter) = self.filter.read().await.as_ref() {
            if filter.should_block(&RequestInfo::new(url, ResourceKind::Document)) {
                warn!("Document request blocked by filter: {}", url);
                return Err(HarvestError::navigation(url, "blocked by request filter"));
            }
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| HarvestError::navigation(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| HarvestError::navigation(url, e))?;
        debug!("Fetched {} bytes from {}", body.len(), url);
        *self.body.write().await = Some(body);
        Ok(())
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
        self.body.write().await.take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_blocked_document_fails_without_network() {
        let browser = HttpBrowser::new(&BrowserSettings::default()).unwrap();
        let page = browser.new_page().await.unwrap();
        page.install_filter(Arc::new(NetworkFilter::default())).await.unwrap();

        let err = page
            .goto("https://www.google-analytics.com/collect")
            .await
            .unwrap_err();
        assert!(err.is_navigation());
        assert!(page.content().await.is_err());
    }
}
