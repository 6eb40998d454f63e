//! Harvesting error types
//!
//! Navigation failures, extraction misses and format misses are recovered
//! locally by the pipeline; only systemic failures (browser launch, output
//! write, configuration) are meant to reach the operator.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum HarvestError {
    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Navigation to {url} timed out after {timeout_ms} ms")]
    NavigationTimeout { url: String, timeout_ms: u64 },

    #[error("HTTP request failed: {status} - {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Page is not available: {reason}")]
    PageUnavailable { reason: String },

    #[error("Browser error: {message}")]
    Browser { message: String },

    #[error("Invalid CSS selector: {selector} - {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("URL resolution failed: {url} - {reason}")]
    UrlResolution { url: String, reason: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },
}

impl HarvestError {
    pub fn navigation(url: &str, reason: impl ToString) -> Self {
        Self::Navigation {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn navigation_timeout(url: &str, timeout: Duration) -> Self {
        Self::NavigationTimeout {
            url: url.to_string(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn browser(message: impl ToString) -> Self {
        Self::Browser {
            message: message.to_string(),
        }
    }

    pub fn invalid_selector(selector: &str, reason: impl ToString) -> Self {
        Self::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether the failure is fatal for the whole run rather than one page
    pub const fn is_systemic(&self) -> bool {
        matches!(self, Self::Browser { .. } | Self::Config { .. } | Self::Io { .. })
    }

    /// Whether the failure came from loading a page
    pub const fn is_navigation(&self) -> bool {
        matches!(
            self,
            Self::Navigation { .. } | Self::NavigationTimeout { .. } | Self::HttpStatus { .. }
        )
    }
}

pub type HarvestResult<T> = Result<T, HarvestError>;
