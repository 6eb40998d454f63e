//! RefStat command-line interface
//!
//! `links` enumerates match links into a link-only CSV, `harvest` turns a
//! links file into full match records, `run` does both in one go.

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};

use refstat_lib::application::{HarvestUseCases, resolve_profile};
use refstat_lib::domain::{DateRange, FederationId};
use refstat_lib::infrastructure::browser::launch_backend;
use refstat_lib::infrastructure::config::{BackendKind, ConfigManager, HarvestConfig};
use refstat_lib::infrastructure::logging;

#[derive(Parser)]
#[command(name = "refstat")]
#[command(version, about = "Harvest match schedules and referee assignments from federation statistics portals", long_about = None)]
struct Cli {
    /// Config file path (TOML, JSON or YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Site profile: refstat or sweep
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Portal base URL override
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Page loading backend: chromium, http or fixture
    #[arg(long, global = true)]
    backend: Option<BackendKind>,

    /// Saved pages directory for the fixture backend
    #[arg(long, global = true)]
    fixture_dir: Option<PathBuf>,

    /// Maximum detail pages loading at once
    #[arg(long, global = true)]
    concurrency: Option<usize>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RangeArgs {
    /// First listing date (YYYY-MM-DD), default today
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last listing date (YYYY-MM-DD), default today
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Federation id to scan; repeatable, default depends on the profile
    #[arg(long = "federation", short = 'f')]
    federations: Vec<u16>,
}

impl RangeArgs {
    fn date_range(&self, today: NaiveDate) -> Result<DateRange> {
        let from = self.from.unwrap_or(today);
        let to = self.to.unwrap_or(today);
        if from > to {
            bail!("--from {} is after --to {}", from, to);
        }
        Ok(DateRange::new(from, to))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Enumerate match links and write the link-only CSV
    Links {
        #[command(flatten)]
        range: RangeArgs,

        /// Output file, default from config
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Harvest match records from a links file (plain URLs or link-only CSV)
    Harvest {
        /// Links file, default from config
        links_file: Option<PathBuf>,

        /// Output file, default from config
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Enumerate and harvest in one run
    Run {
        #[command(flatten)]
        range: RangeArgs,

        /// Output file, default from config
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn apply_overrides(config: &mut HarvestConfig, cli: &Cli) {
    if let Some(profile) = &cli.profile {
        config.profile = profile.clone();
    }
    if let Some(base_url) = &cli.base_url {
        config.base_url = Some(base_url.clone());
    }
    if let Some(backend) = cli.backend {
        config.browser.backend = backend;
    }
    if let Some(dir) = &cli.fixture_dir {
        config.browser.fixture_dir = Some(dir.clone());
        if cli.backend.is_none() {
            config.browser.backend = BackendKind::Fixture;
        }
    }
    if let Some(concurrency) = cli.concurrency {
        config.timing.max_concurrent = concurrency;
    }
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }

    let federations = match &cli.command {
        Commands::Links { range, .. } | Commands::Run { range, .. } => range.federations.as_slice(),
        Commands::Harvest { .. } => &[],
    };
    if !federations.is_empty() {
        config.federations = federations.to_vec();
    }
}

async fn execute(
    command: &Commands,
    config: &HarvestConfig,
    use_cases: &HarvestUseCases,
    today: NaiveDate,
) -> Result<()> {
    match command {
        Commands::Links { range, output } => {
            let output = output.clone().unwrap_or_else(|| config.output.links_file.clone());
            let tasks = use_cases.run_links(range.date_range(today)?, &output).await?;
            info!("🔗 {} link(s) written to {:?}", tasks.len(), output);
        }
        Commands::Harvest { links_file, output } => {
            let links_file = links_file.clone().unwrap_or_else(|| config.output.links_file.clone());
            let output = output.clone().unwrap_or_else(|| config.output.records_file.clone());
            use_cases.run_harvest(&links_file, &output).await?;
        }
        Commands::Run { range, output } => {
            let output = output.clone().unwrap_or_else(|| config.output.records_file.clone());
            use_cases.run_full(range.date_range(today)?, &output).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ConfigManager::new(cli.config.clone())
        .load_config()
        .context("Failed to load configuration")?;
    apply_overrides(&mut config, &cli);

    logging::init_logging_with_config(&config.logging)?;
    logging::log_system_info();

    for id in &config.federations {
        if !FederationId(*id).is_known() {
            warn!("Federation {} is not in the portal's federation table", id);
        }
    }

    let today = Local::now().date_naive();
    if let Commands::Links { range, .. } | Commands::Run { range, .. } = &cli.command {
        range.date_range(today)?;
    }

    let profile = resolve_profile(&config)?;
    let context = launch_backend(&config.browser, &profile.profile.base_url)
        .await
        .context("Failed to start browser backend")?;
    let use_cases = HarvestUseCases::new(config.clone(), context.clone())?;

    let outcome = execute(&cli.command, &config, &use_cases, today).await;

    if let Err(e) = context.shutdown().await {
        warn!("Browser shutdown failed: {}", e);
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, d).unwrap()
    }

    fn range_args(args: &[&str]) -> RangeArgs {
        let cli = Cli::try_parse_from(std::iter::once("refstat").chain(args.iter().copied())).unwrap();
        match cli.command {
            Commands::Links { range, .. } | Commands::Run { range, .. } => range,
            Commands::Harvest { .. } => panic!("expected a ranged command"),
        }
    }

    #[test]
    fn test_reversed_range_is_rejected() {
        let range = range_args(&["links", "--from", "2025-11-20", "--to", "2025-11-17"]);
        let err = range.date_range(day(1)).unwrap_err();
        assert!(err.to_string().contains("after"));
    }

    #[test]
    fn test_missing_bounds_default_to_today() {
        let range = range_args(&["run", "-f", "21", "-f", "5"]);
        assert_eq!(range.date_range(day(17)).unwrap(), DateRange::single(day(17)));
        assert_eq!(range.federations, vec![21, 5]);
    }

    #[test]
    fn test_single_day_range_is_accepted() {
        let range = range_args(&["run", "--from", "2025-11-17", "--to", "2025-11-17"]);
        assert_eq!(range.date_range(day(1)).unwrap().len(), 1);
    }

    #[test]
    fn test_from_after_today_without_to_is_rejected() {
        let range = range_args(&["links", "--from", "2025-11-18"]);
        assert!(range.date_range(day(17)).is_err());
    }
}
