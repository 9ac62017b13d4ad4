//! Analytics importer
//!
//! Backfills repository usage statistics from web analytics:
//! - `retrieve`: daily Matomo aggregates into monthly snapshot files
//! - `ingest`: snapshot files into the InvenioRDM statistics indices

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info, warn};

use importer_core::{days_by_month, parse_day, ErrorCategory, Metric};
use matomo::{MatomoClient, MatomoConfig};
use resolver::{InvenioRecordStore, RecordStoreConfig};
use search_client::{SearchClient, SearchConfig};
use telemetry::{init_tracing_from_env, log_summary};
use worker::{IngestConfig, IngestJob, RetrieveJob};

/// Application configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default)]
    matomo: MatomoConfig,

    #[serde(default)]
    search: SearchConfig,

    #[serde(default)]
    records: RecordStoreConfig,

    /// Default directory for snapshot files
    #[serde(default = "default_data_dir")]
    data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            matomo: MatomoConfig::default(),
            search: SearchConfig::default(),
            records: RecordStoreConfig::default(),
            data_dir: default_data_dir(),
        }
    }
}

#[derive(Parser, Debug)]
#[command(about = "Backfill repository usage statistics from web analytics", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch daily aggregates and write one snapshot per metric and month
    Retrieve {
        /// First day, inclusive (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        from: NaiveDate,

        /// Last day, inclusive (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        to: NaiveDate,

        #[arg(long, value_enum, default_value_t = MetricArg::All)]
        metric: MetricArg,

        /// Snapshot directory; defaults to the configured data_dir
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Index the statistics contained in snapshot files
    Ingest {
        /// Documents per bulk request; defaults to search.batch_size
        #[arg(long)]
        batch_size: Option<usize>,

        /// Snapshot files, e.g. data/downloads_2024_08.json
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum MetricArg {
    Downloads,
    Views,
    All,
}

impl MetricArg {
    fn metrics(self) -> Vec<Metric> {
        match self {
            Self::Downloads => vec![Metric::Downloads],
            Self::Views => vec![Metric::Views],
            Self::All => Metric::ALL.to_vec(),
        }
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    parse_day(value).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing_from_env();

    let cli = Cli::parse();
    let config = load_config()?;

    info!("Starting analytics importer v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(cli.command, &config).await {
        log_failure(&e);
        return Err(e);
    }

    Ok(())
}

/// Log a failed command with the category of its importer error, if any.
fn log_failure(e: &anyhow::Error) -> Option<ErrorCategory> {
    let err = e.downcast_ref::<importer_core::Error>()?;
    error!(
        category = err.category().as_str(),
        recoverable = err.is_recoverable(),
        error = %err,
        "Command failed"
    );
    Some(err.category())
}

/// Run one subcommand to completion.
async fn run(command: Command, config: &Config) -> Result<()> {
    match command {
        Command::Retrieve {
            from,
            to,
            metric,
            output_dir,
        } => {
            let months = days_by_month(from, to)?;
            let output_dir = output_dir.unwrap_or_else(|| config.data_dir.clone());

            info!(
                from = %from,
                to = %to,
                base_url = %config.matomo.base_url,
                site_id = config.matomo.site_id,
                "Loaded Matomo config"
            );

            let provider = Arc::new(
                MatomoClient::new(config.matomo.clone()).context("Failed to create Matomo client")?,
            );
            let job = RetrieveJob::new(provider, output_dir);
            let written = job.run(&months, &metric.metrics()).await?;

            for path in &written {
                info!(path = %path.display(), "Snapshot ready");
            }
            log_summary("retrieve");
        }

        Command::Ingest { batch_size, paths } => {
            let store = Arc::new(
                InvenioRecordStore::new(config.records.clone())
                    .context("Failed to create record store")?,
            );
            let indexer = Arc::new(
                SearchClient::new(config.search.clone()).context("Failed to create search client")?,
            );
            let ingest_config = IngestConfig {
                batch_size: batch_size.unwrap_or(config.search.batch_size),
                index_prefix: config.search.index_prefix.clone(),
            };

            let report = IngestJob::new(store, indexer, ingest_config)
                .run(&paths)
                .await?;

            log_summary("ingest");
            if report.stats.failed > 0 {
                warn!(
                    failed = report.stats.failed,
                    indexed = report.stats.success,
                    "Some documents were rejected by the search backend"
                );
            }
        }
    }

    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        .add_source(config::Config::try_from(&Config::default())?)
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("IMPORTER")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // Nested keys with underscores are not picked up reliably by the
    // environment source.
    if let Ok(token) = std::env::var("IMPORTER_MATOMO_TOKEN_AUTH") {
        config.matomo.token_auth = token;
    }
    if let Ok(url) = std::env::var("IMPORTER_MATOMO_BASE_URL") {
        config.matomo.base_url = url;
    }
    if let Ok(site_id) = std::env::var("IMPORTER_MATOMO_SITE_ID") {
        config.matomo.site_id = site_id
            .trim()
            .parse()
            .context("IMPORTER_MATOMO_SITE_ID must be a number")?;
    }

    if let Ok(url) = std::env::var("IMPORTER_SEARCH_URL") {
        config.search.url = url;
    }
    if let Ok(username) = std::env::var("IMPORTER_SEARCH_USERNAME") {
        config.search.username = Some(username);
    }
    if let Ok(password) = std::env::var("IMPORTER_SEARCH_PASSWORD") {
        config.search.password = Some(password);
    }

    if let Ok(url) = std::env::var("IMPORTER_RECORDS_BASE_URL") {
        config.records.base_url = url;
    }
    if let Ok(token) = std::env::var("IMPORTER_RECORDS_TOKEN") {
        config.records.token = Some(token);
    }

    Ok(config)
}
