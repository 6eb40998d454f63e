//! Configuration infrastructure
//!
//! Contains configuration loading for the harvester.
//!
//! Configuration is layered:
//! 1. Built-in defaults (`defaults` constants below)
//! 2. Optional config file (explicit path, or `refstat/config.toml` in the
//!    user config directory when present)
//! 3. Command-line overrides applied by the binary

#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Complete harvester configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Site profile name: "refstat" or "sweep"
    pub profile: String,

    /// Override of the profile's portal base URL
    pub base_url: Option<String>,

    /// Federations to enumerate; empty means the profile's defaults
    pub federations: Vec<u16>,

    /// Browser backend settings
    pub browser: BrowserSettings,

    /// Concurrency and timeout settings
    pub timing: TimingConfig,

    /// Output file locations
    pub output: OutputConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Which page loading backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Headless Chromium driven over CDP
    Chromium,
    /// Plain HTTP fetch of server-rendered (or proxy-rendered) HTML
    Http,
    /// Saved HTML files on disk
    Fixture,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Chromium => "chromium",
            Self::Http => "http",
            Self::Fixture => "fixture",
        };
        f.write_str(name)
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Self::Chromium),
            "http" => Ok(Self::Http),
            "fixture" => Ok(Self::Fixture),
            other => Err(format!("unknown backend '{}'", other)),
        }
    }
}

/// Browser backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub backend: BackendKind,

    /// Run Chromium without a window
    pub headless: bool,

    /// Extra Chromium command-line switches
    pub chrome_args: Vec<String>,

    /// Explicit Chromium executable; autodetected when absent
    pub chrome_executable: Option<PathBuf>,

    /// User agent for the HTTP backend
    pub user_agent: String,

    /// Directory of saved pages for the fixture backend
    pub fixture_dir: Option<PathBuf>,
}

/// Concurrency and timeout settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Width of the admission gate for detail harvesting
    pub max_concurrent: usize,

    /// Detail page navigation timeout in milliseconds
    pub navigation_timeout_ms: u64,

    /// Listing page navigation timeout in milliseconds
    pub listing_navigation_timeout_ms: u64,

    /// Per-field wait for a selector to appear, in milliseconds
    pub selector_timeout_ms: u64,

    /// Wait for link-bearing elements on a listing page, in milliseconds
    pub listing_selector_timeout_ms: u64,

    /// DOM polling interval while waiting for a selector, in milliseconds
    pub poll_interval_ms: u64,
}

impl TimingConfig {
    pub const fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub const fn listing_navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.listing_navigation_timeout_ms)
    }

    pub const fn selector_timeout(&self) -> Duration {
        Duration::from_millis(self.selector_timeout_ms)
    }

    pub const fn listing_selector_timeout(&self) -> Duration {
        Duration::from_millis(self.listing_selector_timeout_ms)
    }

    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Output file locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Link-only CSV written by the enumeration phase
    pub links_file: PathBuf,

    /// Full match CSV written by the harvest phase
    pub records_file: PathBuf,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted file logs
    pub json_format: bool,

    /// Enable console output
    pub console_output: bool,

    /// Enable file output
    pub file_output: bool,

    /// Log directory; defaults to `logs/` next to the executable
    pub directory: Option<PathBuf>,

    /// Number of log files to keep (older files will be deleted)
    pub max_files: u32,

    /// Module-specific log level filters (e.g., "chromiumoxide": "warn")
    pub module_filters: HashMap<String, String>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            profile: defaults::PROFILE.to_string(),
            base_url: None,
            federations: Vec::new(),
            browser: BrowserSettings::default(),
            timing: TimingConfig::default(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            backend: BackendKind::Chromium,
            headless: true,
            chrome_args: defaults::CHROME_ARGS.iter().map(|s| s.to_string()).collect(),
            chrome_executable: None,
            user_agent: defaults::USER_AGENT.to_string(),
            fixture_dir: None,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            max_concurrent: defaults::MAX_CONCURRENT,
            navigation_timeout_ms: defaults::NAVIGATION_TIMEOUT_MS,
            listing_navigation_timeout_ms: defaults::LISTING_NAVIGATION_TIMEOUT_MS,
            selector_timeout_ms: defaults::SELECTOR_TIMEOUT_MS,
            listing_selector_timeout_ms: defaults::LISTING_SELECTOR_TIMEOUT_MS,
            poll_interval_ms: defaults::POLL_INTERVAL_MS,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            links_file: PathBuf::from(defaults::LINKS_FILE),
            records_file: PathBuf::from(defaults::RECORDS_FILE),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: defaults::LOG_JSON_FORMAT,
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            directory: None,
            max_files: defaults::LOG_MAX_FILES,
            module_filters: {
                let mut filters = HashMap::new();
                filters.insert("chromiumoxide".to_string(), "warn".to_string());
                filters.insert("tungstenite".to_string(), "warn".to_string());
                filters.insert("reqwest".to_string(), "warn".to_string());
                filters.insert("hyper".to_string(), "warn".to_string());
                filters.insert("html5ever".to_string(), "error".to_string());
                filters.insert("selectors".to_string(), "warn".to_string());
                filters
            },
        }
    }
}

/// Configuration manager for locating and loading settings
pub struct ConfigManager {
    pub config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Get the application configuration directory
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join("refstat");

        Ok(config_dir)
    }

    /// Use an explicit file, or the user config file when one exists
    pub fn new(explicit: Option<PathBuf>) -> Self {
        let config_path = explicit.or_else(|| {
            Self::get_config_dir()
                .ok()
                .map(|dir| dir.join("config.toml"))
                .filter(|path| path.exists())
        });

        Self { config_path }
    }

    /// Load configuration, falling back to defaults when no file is configured
    pub fn load_config(&self) -> Result<HarvestConfig> {
        let Some(path) = &self.config_path else {
            return Ok(HarvestConfig::default());
        };

        let config = Self::load_from_file(path)?;
        info!("Loaded configuration from: {:?}", path);
        Ok(config)
    }

    /// Load and deserialize a single config file (TOML, JSON or YAML by extension)
    pub fn load_from_file(path: &Path) -> Result<HarvestConfig> {
        config::Config::builder()
            .add_source(config::File::from(path).required(true))
            .build()
            .with_context(|| format!("Failed to read configuration file {:?}", path))?
            .try_deserialize::<HarvestConfig>()
            .with_context(|| format!("Invalid configuration in {:?}", path))
    }

    /// Get the configuration file path
    pub fn config_path(&self) -> Option<&PathBuf> {
        self.config_path.as_ref()
    }
}

/// Statistics portal URLs and path conventions
pub mod stats_portal {
    /// Base URL for the floorball statistics portal
    pub const BASE_URL: &str = "https://stats.innebandy.se";

    /// Listing page path; `{federation}` and `{date}` (YYYY-MM-DD) are substituted
    pub const LISTING_PATH_TEMPLATE: &str = "/forbund/{federation}/livematches/{date}";

    /// Path segment appended to a match URL to reach its lineup/officials page
    pub const DETAIL_SUFFIX: &str = "/laguppstallning";

    /// Federation scanned by the refstat profile
    pub const REFSTAT_FEDERATION: u16 = 21;

    /// Structural pattern of a match link path: season / series / match
    pub const MATCH_PATH_PATTERN: &str = r"^/sasong/\d+/serie/\d+/match/\d+$";
}

/// Default harvesting configuration values
pub mod defaults {
    /// Default site profile
    pub const PROFILE: &str = "refstat";

    /// Default width of the detail harvesting admission gate
    pub const MAX_CONCURRENT: usize = 6;

    /// Default detail page navigation timeout
    pub const NAVIGATION_TIMEOUT_MS: u64 = 12_000;

    /// Default listing page navigation timeout
    pub const LISTING_NAVIGATION_TIMEOUT_MS: u64 = 20_000;

    /// Default wait for a field's selector
    pub const SELECTOR_TIMEOUT_MS: u64 = 8_000;

    /// Default wait for link-bearing elements on a listing page
    pub const LISTING_SELECTOR_TIMEOUT_MS: u64 = 8_000;

    /// Default DOM polling interval
    pub const POLL_INTERVAL_MS: u64 = 250;

    /// Default Chromium switches
    pub const CHROME_ARGS: &[&str] = &["--disable-gpu", "--disable-dev-shm-usage"];

    /// Default user agent for the HTTP backend
    pub const USER_AGENT: &str = "Mozilla/5.0 RefStatLite/1.0";

    /// Default link-only output file
    pub const LINKS_FILE: &str = "match_links.csv";

    /// Default full record output file
    pub const RECORDS_FILE: &str = "matches.csv";

    // Log configuration defaults
    /// Default log level
    pub const LOG_LEVEL: &str = "info";

    /// Default JSON format setting
    pub const LOG_JSON_FORMAT: bool = false;

    /// Default console output setting
    pub const LOG_CONSOLE_OUTPUT: bool = true;

    /// Default file output setting
    pub const LOG_FILE_OUTPUT: bool = false;

    /// Default maximum log files to keep
    pub const LOG_MAX_FILES: u32 = 5;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = HarvestConfig::default();
        assert_eq!(config.profile, "refstat");
        assert_eq!(config.timing.max_concurrent, 6);
        assert_eq!(config.timing.navigation_timeout(), Duration::from_secs(12));
        assert_eq!(config.timing.selector_timeout(), Duration::from_secs(8));
        assert_eq!(config.browser.backend, BackendKind::Chromium);
    }

    #[test]
    fn test_partial_toml_file_keeps_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "profile = \"sweep\"\nfederations = [21, 5]\n\n[timing]\nmax_concurrent = 2\n\n[browser]\nbackend = \"http\""
        )
        .unwrap();

        let config = ConfigManager::load_from_file(file.path()).unwrap();
        assert_eq!(config.profile, "sweep");
        assert_eq!(config.federations, vec![21, 5]);
        assert_eq!(config.timing.max_concurrent, 2);
        assert_eq!(config.timing.navigation_timeout_ms, defaults::NAVIGATION_TIMEOUT_MS);
        assert_eq!(config.browser.backend, BackendKind::Http);
        assert!(config.browser.headless);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let manager = ConfigManager::new(Some(PathBuf::from("/nonexistent/refstat.toml")));
        assert!(manager.load_config().is_err());
    }

    #[test]
    fn test_backend_names() {
        assert_eq!("Chrome".parse::<BackendKind>().unwrap(), BackendKind::Chromium);
        assert_eq!("fixture".parse::<BackendKind>().unwrap(), BackendKind::Fixture);
        assert!("firefox".parse::<BackendKind>().is_err());
    }
}
