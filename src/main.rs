//! Command-line interface for bq-stream-sync
//!
//! # Usage Examples
//!
//! ```bash
//! # Stream newly appended rows from the rotated analytics table
//! bq-stream-sync sync \
//!   --gcp-project my-project \
//!   --bq-dataset analytics \
//!   --table-prefix events_intraday \
//!   --table-date 20240601 \
//!   --poll-interval 5 \
//!   --sync-start 2024-06-01T00:00:00+00:00 \
//!   --topic analytics-events
//!
//! # Consume the published events
//! bq-stream-sync subscribe \
//!   --gcp-project my-project \
//!   --subscription analytics-events-sub \
//!   --timeout 60
//!
//! # Append synthetic rows so the loop has something to pick up
//! bq-stream-sync generate \
//!   --gcp-project my-project \
//!   --bq-dataset analytics \
//!   --bq-table events_intraday_20240601 \
//!   --interval 2 --total 100
//! ```
//!
//! The sync command runs until Ctrl-C; on a fatal resolution error it
//! exits non-zero with a diagnostic naming the unmet assumption.

use std::time::Duration;

use bq_stream_sync::{generate, subscribe, sync, BigQueryOpts, PubSubOpts, SyncOpts};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "bq-stream-sync")]
#[command(about = "Streams newly appended BigQuery analytics rows to a Pub/Sub topic")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Track the rotated analytics table and republish appended rows
    Sync {
        #[command(flatten)]
        bigquery_opts: BigQueryOpts,

        #[command(flatten)]
        sync_opts: SyncOpts,

        #[command(flatten)]
        pubsub_opts: PubSubOpts,
    },

    /// Consume and log events from the companion subscription
    Subscribe {
        /// Target GCP project
        #[arg(long, env = "GCP_PROJECT")]
        gcp_project: String,

        /// Pub/Sub subscription id to listen on
        #[arg(long)]
        subscription: String,

        /// Stop after this many seconds (listens until Ctrl-C when omitted)
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Append synthetic analytics rows for driving the sync loop
    Generate {
        #[command(flatten)]
        bigquery_opts: BigQueryOpts,

        /// Table to append rows to
        #[arg(long)]
        bq_table: String,

        /// Seconds between appended rows
        #[arg(long, default_value = "1")]
        interval: u64,

        /// Total number of rows to generate
        #[arg(long, default_value = "10")]
        total: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Sync {
            bigquery_opts,
            sync_opts,
            pubsub_opts,
        } => {
            let cancel = cancel_on_ctrl_c();
            sync::run_sync(bigquery_opts, sync_opts, pubsub_opts, cancel).await?;
        }
        Commands::Subscribe {
            gcp_project,
            subscription,
            timeout,
        } => {
            let cancel = cancel_on_ctrl_c();
            if let Some(secs) = timeout {
                let trigger = cancel.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_secs(secs)).await;
                    tracing::info!(timeout_secs = secs, "listen timeout reached; shutting down");
                    trigger.cancel();
                });
            }
            subscribe::run_subscribe(&gcp_project, &subscription, cancel).await?;
        }
        Commands::Generate {
            bigquery_opts,
            bq_table,
            interval,
            total,
        } => {
            generate::run_generate(
                &bigquery_opts.gcp_project,
                &bigquery_opts.bq_dataset,
                &bq_table,
                Duration::from_secs(interval),
                total,
            )
            .await?;
        }
    }

    Ok(())
}

/// Cancellation token that fires on Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received Ctrl-C; shutting down");
            trigger.cancel();
        }
    });
    cancel
}
