#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the SentinelOps traffic incident ingestor.

use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use sentinel_ops_database::{db, ensure_schema};
use sentinel_ops_ingest::notify::{AnalystNotifier, DEFAULT_ANALYST_URL};
use sentinel_ops_ingest::scheduler::{self, OverlapPolicy, Schedule};
use sentinel_ops_ingest::{IngestContext, run_cycle};
use sentinel_ops_source::lta::DEFAULT_BASE_URL;
use sentinel_ops_source::{IncidentSource, LtaClient};

#[derive(Parser)]
#[command(
    name = "sentinel_ops_ingest",
    about = "Polls LTA traffic incidents into the incident store"
)]
struct Cli {
    #[command(flatten)]
    config: IngestArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct IngestArgs {
    /// LTA `DataMall` account key. Empty or "mock" serves built-in sample
    /// incidents
    #[arg(long, env = "LTA_API_KEY", default_value = "", hide_env_values = true)]
    api_key: String,

    /// `DataMall` base URL
    #[arg(long, env = "LTA_BASE_URL", default_value = DEFAULT_BASE_URL)]
    lta_base_url: String,

    /// Incident store URL (`postgres://...` or `sqlite://path`)
    #[arg(long, env = "DB_URL", default_value = db::DEFAULT_DATABASE_URL, hide_env_values = true)]
    database_url: String,

    /// Number of pooled store connections
    #[arg(long, env = "DB_POOL_SIZE", default_value_t = 4)]
    pool_size: usize,

    /// Analysis service base URL
    #[arg(long, env = "ANALYST_URL", default_value = DEFAULT_ANALYST_URL)]
    analyst_url: String,

    /// Seconds between cycle starts
    #[arg(
        long,
        env = "POLL_INTERVAL_SECS",
        default_value_t = 120,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    poll_interval_secs: u64,

    /// Skip a tick while the previous cycle is still running instead of
    /// letting cycles overlap
    #[arg(long, env = "SKIP_OVERLAPPING_CYCLES")]
    skip_overlapping: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the source on a fixed interval until interrupted (default)
    Run,
    /// Run a single ingestion cycle and wait for its notifications
    Once,
    /// Print the incidents the source currently reports without storing them
    Fetch,
}

impl IngestArgs {
    fn source(&self) -> LtaClient {
        LtaClient::new(Some(self.api_key.as_str())).with_base_url(&self.lta_base_url)
    }

    const fn schedule(&self) -> Schedule {
        Schedule {
            period: Duration::from_secs(self.poll_interval_secs),
            overlap: if self.skip_overlapping {
                OverlapPolicy::Skip
            } else {
                OverlapPolicy::Allow
            },
        }
    }

    async fn context(&self) -> Result<IngestContext, Box<dyn std::error::Error>> {
        let source = self.source();
        if source.is_mock() {
            log::warn!("LTA_API_KEY is not set; serving mock incidents");
        }

        log::info!("Connecting to incident store...");
        let pool = db::connect(&self.database_url, self.pool_size)
            .await
            .inspect_err(|e| log::error!("Failed to connect to incident store: {e}"))?;
        ensure_schema(&pool).await?;

        Ok(IngestContext {
            source: Arc::new(source),
            pool: Arc::new(pool),
            notifier: AnalystNotifier::new(Some(self.analyst_url.as_str())),
        })
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for ctrl-c, running until killed: {e}");
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();
    let args = cli.config;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Fetch => {
            let incidents = args.source().fetch().await?;
            println!("{:<20} {:>10} {:>11}  MESSAGE", "TYPE", "LAT", "LNG");
            println!("{}", "-".repeat(72));
            for incident in &incidents {
                println!(
                    "{:<20} {:>10.6} {:>11.6}  {}",
                    incident.kind, incident.latitude, incident.longitude, incident.message
                );
            }
        }
        Commands::Once => {
            let ctx = args.context().await?;
            let report = run_cycle(&ctx).await?;
            log::info!(
                "Cycle complete: {} fetched, {} new",
                report.fetched,
                report.new_ids.len()
            );
            report.wait_for_notifications().await;
        }
        Commands::Run => {
            let ctx = args.context().await?;
            let schedule = args.schedule();
            log::info!(
                "SentinelOps ingestor started (every {}s, overlap {:?})",
                schedule.period.as_secs(),
                schedule.overlap
            );
            let stats = scheduler::run(ctx, schedule, shutdown_signal()).await;
            log::info!(
                "Ingestor stopped: {} cycle(s) dispatched, {} skipped",
                stats.dispatched,
                stats.skipped
            );
        }
    }

    Ok(())
}
