//! Command tree and the download command

use crate::downloader::config::{
    HarvestConfig, DEFAULT_CATALOG_URL, DEFAULT_FETCH_ATTEMPTS, DEFAULT_FILE_EXTENSION,
    DEFAULT_POPULARITY_THRESHOLD, DEFAULT_WORKERS,
};
use crate::downloader::{DownloadReport, HarvestSummary, Harvester};
use crate::fetcher::CatalogFormat;
use crate::shutdown::SharedShutdown;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::{CliError, ListArgs};

/// Maximum allowed worker count
const MAX_WORKERS: usize = 64;

/// Parse and validate the worker count
fn parse_workers(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if value == 0 {
        return Err("workers must be at least 1".to_string());
    }
    if value > MAX_WORKERS {
        return Err(format!("workers {value} exceeds maximum of {MAX_WORKERS}"));
    }
    Ok(value)
}

/// Parse a strictly positive number of milliseconds
fn parse_interval_ms(s: &str) -> Result<u64, String> {
    let value: u64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number of milliseconds"))?;
    if value == 0 {
        return Err("interval must be greater than zero".to_string());
    }
    Ok(value)
}

/// Parse a strictly positive number of seconds
fn parse_timeout_secs(s: &str) -> Result<u64, String> {
    let value: u64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number of seconds"))?;
    if value == 0 {
        return Err("timeout must be greater than zero".to_string());
    }
    Ok(value)
}

/// Parse a strictly positive queue capacity
fn parse_capacity(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if value == 0 {
        return Err("queue capacity must be at least 1".to_string());
    }
    Ok(value)
}

/// Catalog harvester CLI
#[derive(Parser, Debug)]
#[command(name = "catalog-harvester")]
#[command(about = "Harvest popular artifacts from a paginated catalog", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (json or human)
    #[arg(long, global = true, default_value = "human")]
    pub output_format: OutputFormat,

    /// Catalog URL template; `{page}` is replaced by the page index
    #[arg(long, global = true, env = "HARVEST_CATALOG_URL", default_value = DEFAULT_CATALOG_URL)]
    pub catalog_url: String,

    /// Minimum popularity for an entry to qualify
    #[arg(long, global = true, env = "HARVEST_THRESHOLD", default_value_t = DEFAULT_POPULARITY_THRESHOLD)]
    pub threshold: u64,

    /// Attempts per catalog page before giving up (1-20)
    #[arg(
        long,
        global = true,
        env = "HARVEST_RETRIES",
        default_value_t = DEFAULT_FETCH_ATTEMPTS,
        value_parser = clap::value_parser!(u32).range(1..=20)
    )]
    pub fetch_attempts: u32,

    /// Interval between admissions and between fetch retries, in milliseconds
    #[arg(
        long,
        global = true,
        env = "HARVEST_RATE_INTERVAL_MS",
        default_value = "500",
        value_parser = parse_interval_ms
    )]
    pub rate_interval_ms: u64,

    /// Per-request HTTP timeout in seconds
    #[arg(long, global = true, default_value = "300", value_parser = parse_timeout_secs)]
    pub request_timeout_secs: u64,

    /// JSON key holding the page's records
    #[arg(long, global = true, default_value = "plugins")]
    pub collection_key: String,

    /// JSON key holding each record's popularity
    #[arg(long, global = true, default_value = "active_installs")]
    pub popularity_key: String,

    /// Serve Prometheus metrics on this address (e.g. 127.0.0.1:9090)
    #[arg(long, global = true)]
    pub metrics_addr: Option<SocketAddr>,
}

impl Cli {
    /// Configuration shared by every command
    pub fn harvest_config(&self) -> HarvestConfig {
        let format = CatalogFormat {
            collection_key: self.collection_key.clone(),
            popularity_key: self.popularity_key.clone(),
            ..CatalogFormat::default()
        };

        HarvestConfig::default()
            .with_catalog_url(&self.catalog_url)
            .with_catalog_format(format)
            .with_threshold(self.threshold)
            .with_fetch_attempts(self.fetch_attempts)
            .with_rate_interval(Duration::from_millis(self.rate_interval_ms))
            .with_request_timeout(Duration::from_secs(self.request_timeout_secs))
    }
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download every qualifying artifact
    Download(DownloadArgs),

    /// Print qualifying catalog entries without downloading
    List(ListArgs),
}

/// Download command arguments
#[derive(Parser, Debug)]
pub struct DownloadArgs {
    /// Directory artifacts are written to
    #[arg(long, env = "HARVEST_OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Number of concurrent download workers (max 64)
    #[arg(long, env = "HARVEST_WORKERS", default_value_t = DEFAULT_WORKERS, value_parser = parse_workers)]
    pub workers: usize,

    /// Work queue capacity (default: twice the worker count)
    #[arg(long, env = "HARVEST_QUEUE_CAPACITY", value_parser = parse_capacity)]
    pub queue_capacity: Option<usize>,

    /// Artifact file extension
    #[arg(long, default_value = DEFAULT_FILE_EXTENSION)]
    pub extension: String,

    /// Show a progress spinner
    #[arg(long, default_value_t = false)]
    pub progress: bool,
}

impl DownloadArgs {
    /// Full configuration for this run
    pub fn config(&self, cli: &Cli) -> HarvestConfig {
        cli.harvest_config()
            .with_output_dir(&self.output_dir)
            .with_workers(self.workers)
            .with_queue_capacity(self.queue_capacity.unwrap_or(self.workers * 2))
            .with_file_extension(&self.extension)
    }

    /// Execute the download command
    pub async fn execute(&self, cli: &Cli, shutdown: SharedShutdown) -> Result<HarvestSummary, CliError> {
        let config = self.config(cli);
        config.validate()?;

        info!(
            catalog = %config.catalog_url,
            output_dir = %config.output_dir.display(),
            workers = config.workers,
            "Starting download"
        );

        let mut harvester = Harvester::from_config(config)?.with_shutdown(shutdown);

        let progress = self.progress.then(create_progress_bar);
        if let Some(bar) = &progress {
            let bar = bar.clone();
            harvester = harvester.with_observer(Arc::new(move |report: &DownloadReport| {
                bar.inc(1);
                bar.set_message(format!("{}-{}", report.slug, report.version));
            }));
        }

        let summary = harvester.run().await;

        if let Some(bar) = progress {
            bar.finish_and_clear();
        }

        match cli.output_format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
            OutputFormat::Human => print_summary(&summary),
        }

        Ok(summary)
    }
}

fn create_progress_bar() -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {pos} downloads {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

fn print_summary(summary: &HarvestSummary) {
    println!("\nHarvest finished: {}", summary.end);
    println!("Pages fetched: {}", summary.pages_fetched);
    println!("Entries seen: {}", summary.entries_seen);
    println!("Admitted: {}", summary.admitted);
    println!("Downloaded: {}", summary.succeeded);
    if summary.failed > 0 {
        println!("Failed: {}", summary.failed);
    }
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Human,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" => Ok(OutputFormat::Human),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}
