//! Logging system configuration and initialization
//!
//! This module provides the logging setup used by the binary:
//! - Console output on stderr, so CSV written to stdout stays clean
//! - Optional file logging with daily rotation
//! - Structured JSON file logging (optional)
//! - Verbose dependency targets (CDP, HTTP, HTML parser) held at warn
//!   unless TRACE is requested

#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, anyhow};
use chrono::Local;
use lazy_static::lazy_static;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

pub use crate::infrastructure::config::LoggingConfig;

const LOG_FILE_PREFIX: &str = "refstat.log";

// Global guard to keep the log file writer alive
lazy_static! {
    static ref LOG_GUARDS: Mutex<Vec<non_blocking::WorkerGuard>> = Mutex::new(Vec::new());
}

/// Local wall-clock time formatter
struct LocalTimeFormatter;

impl FormatTime for LocalTimeFormatter {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Get the log directory: configured one, or `logs/` next to the executable
pub fn get_log_directory(config: &LoggingConfig) -> PathBuf {
    if let Some(dir) = &config.directory {
        return dir.clone();
    }

    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());

    exe_dir.join("logs")
}

/// Build the event filter.
///
/// `RUST_LOG` wins when set. Otherwise the configured level applies to the
/// crate and `module_filters` quiet the chatty dependencies, except at TRACE.
pub fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    let mut filter = EnvFilter::new(&config.level);
    if config.level.to_lowercase().contains("trace") {
        return filter;
    }

    for (target, level) in &config.module_filters {
        match format!("{}={}", target, level).parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => eprintln!("Ignoring invalid log filter {}={}: {}", target, level, e),
        }
    }
    if let Ok(directive) = format!("refstat={}", config.level).parse() {
        filter = filter.add_directive(directive);
    }
    if let Ok(directive) = format!("refstat_lib={}", config.level).parse() {
        filter = filter.add_directive(directive);
    }

    filter
}

/// Initialize the logging system with default configuration
pub fn init_logging() -> Result<()> {
    init_logging_with_config(&LoggingConfig::default())
}

/// Initialize logging with custom configuration
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<()> {
    if !config.file_output && !config.console_output {
        return Err(anyhow!("No logging output configured"));
    }

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    if config.console_output {
        layers.push(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_timer(LocalTimeFormatter)
                .with_target(false)
                .boxed(),
        );
    }

    let log_dir = get_log_directory(config);
    if config.file_output {
        std::fs::create_dir_all(&log_dir)
            .map_err(|e| anyhow!("Failed to create log directory {:?}: {}", log_dir, e))?;

        cleanup_old_logs(&log_dir, config.max_files)?;

        let file_appender = rolling::daily(&log_dir, LOG_FILE_PREFIX);
        let (file_writer, file_guard) = non_blocking(file_appender);

        // Store the guard globally to prevent it from being dropped
        LOG_GUARDS
            .lock()
            .map_err(|_| anyhow!("Log guard registry poisoned"))?
            .push(file_guard);

        if config.json_format {
            layers.push(
                fmt::layer()
                    .json()
                    .with_writer(file_writer)
                    .with_timer(LocalTimeFormatter)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_ansi(false)
                    .boxed(),
            );
        } else {
            layers.push(
                fmt::layer()
                    .with_writer(file_writer)
                    .with_timer(LocalTimeFormatter)
                    .with_target(true)
                    .with_ansi(false)
                    .boxed(),
            );
        }
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(build_env_filter(config))
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))?;

    info!("Logging system initialized");
    info!("Log level: {}", config.level);
    if config.file_output {
        info!("Log directory: {:?}", log_dir);
    }

    Ok(())
}

/// Log system information for diagnostics
pub fn log_system_info() {
    info!("=== refstat {} ===", env!("CARGO_PKG_VERSION"));
    info!("Operating system: {} ({})", std::env::consts::OS, std::env::consts::ARCH);
    if let Ok(current_dir) = std::env::current_dir() {
        info!("Working directory: {:?}", current_dir);
    }
}

/// Remove the oldest log files so that at most `max_files` remain
fn cleanup_old_logs(log_dir: &Path, max_files: u32) -> Result<()> {
    if !log_dir.exists() {
        return Ok(());
    }

    let mut log_files = Vec::new();
    for entry in std::fs::read_dir(log_dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_log = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.starts_with(LOG_FILE_PREFIX));
        if !path.is_file() || !is_log {
            continue;
        }
        if let Ok(modified) = entry.metadata().and_then(|m| m.modified()) {
            log_files.push((path, modified));
        }
    }

    // Newest first
    log_files.sort_by(|a, b| b.1.cmp(&a.1));

    let keep = max_files as usize;
    if log_files.len() > keep {
        info!("Removing {} old log files (keeping {})", log_files.len() - keep, keep);
        for (path, _) in log_files.iter().skip(keep) {
            if let Err(e) = std::fs::remove_file(path) {
                warn!("Failed to remove old log file {:?}: {}", path, e);
            }
        }
    }

    Ok(())
}
