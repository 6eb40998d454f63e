//! Infrastructure layer
//!
//! Browser backends, request filtering, HTML field extraction, output files,
//! configuration and logging.

pub mod browser;
pub mod config;
pub mod harvest_error;
pub mod logging;
pub mod network_filter;
pub mod parsing;
pub mod record_sink;

// Re-export commonly used items
pub use browser::{BrowserContext, BrowserPage, ChromiumBrowser, FixtureBrowser, HttpBrowser, PageGuard};
pub use config::{BackendKind, ConfigManager, HarvestConfig, TimingConfig};
pub use harvest_error::{HarvestError, HarvestResult};
pub use network_filter::{NetworkFilter, RequestInfo, ResourceKind};
pub use parsing::{CompiledProfile, FieldExtractor, FieldSpec, SiteProfile};
pub use record_sink::CsvRecordSink;
