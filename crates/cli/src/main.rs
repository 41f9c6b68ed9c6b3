//! P2P lab CLI
//!
//! A command-line tool for querying cluster nodes by label and for
//! creating, inspecting and managing benchmarks.

mod commands;
mod config;
mod lab;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{benchmarks, query};
use lab_lib::BenchmarkRequest;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// P2P lab CLI
#[derive(Parser)]
#[command(name = "labctl")]
#[command(author, version, about = "CLI for running p2p lab benchmarks", long_about = None)]
pub struct Cli {
    /// Path to the JSON config file (defaults to ~/.config/labctl/config.json)
    #[arg(long, env = "LABCTL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Lab state file, overrides the configured state_path
    #[arg(long)]
    pub state: Option<PathBuf>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the nodes of a cluster matching a label query
    Query {
        /// Cluster ID
        cluster: String,

        /// Label query, e.g. "(and 'region=us' (not 'seeder'))"
        query: String,
    },

    /// Create and manage benchmarks
    #[command(subcommand)]
    Benchmark(BenchmarkCommands),
}

#[derive(Subcommand)]
pub enum BenchmarkCommands {
    /// Run a scenario on a cluster
    Create {
        /// Cluster ID
        #[arg(long)]
        cluster: String,

        /// Scenario ID
        #[arg(long)]
        scenario: String,

        /// Skip updating and reconnecting the cluster nodes
        #[arg(long)]
        no_reset: bool,
    },

    /// List benchmarks
    List {
        /// Only show benchmarks whose labels match this query
        #[arg(long, short)]
        query: Option<String>,
    },

    /// Show a benchmark and its plan
    Inspect {
        /// Benchmark ID
        id: String,
    },

    /// Show the report of a benchmark
    Report {
        /// Benchmark ID
        id: String,
    },

    /// Add or remove benchmark labels
    Label {
        /// Benchmark IDs (comma separated)
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<String>,

        /// Labels to add (comma separated)
        #[arg(long, value_delimiter = ',')]
        adds: Vec<String>,

        /// Labels to remove (comma separated)
        #[arg(long, value_delimiter = ',')]
        removes: Vec<String>,
    },

    /// Delete benchmarks and their reports
    Delete {
        /// Benchmark IDs
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (json_layer, text_layer) = if json {
        (Some(fmt::layer().json().with_writer(std::io::stderr)), None)
    } else {
        (None, Some(fmt::layer().with_writer(std::io::stderr)))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let mut config = config::LabConfig::load(cli.config.as_deref())?;
    if let Some(state) = cli.state {
        config.state_path = state;
    }
    info!(state = %config.state_path.display(), "Loaded configuration");

    let lab = lab::Lab::open(&config).await?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling in-flight node calls");
            on_interrupt.cancel();
        }
    });

    let result = match cli.command {
        Commands::Query { cluster, query } => {
            query::query_nodes(&lab, &cluster, &query, cli.format).await
        }
        Commands::Benchmark(cmd) => match cmd {
            BenchmarkCommands::Create {
                cluster,
                scenario,
                no_reset,
            } => {
                let request = BenchmarkRequest {
                    cluster_id: cluster,
                    scenario_id: scenario,
                    no_reset,
                };
                benchmarks::create_benchmark(&lab, request, &cancel, cli.format).await
            }
            BenchmarkCommands::List { query } => {
                benchmarks::list_benchmarks(&lab, query.as_deref(), cli.format).await
            }
            BenchmarkCommands::Inspect { id } => {
                benchmarks::inspect_benchmark(&lab, &id, cli.format).await
            }
            BenchmarkCommands::Report { id } => {
                benchmarks::show_report(&lab, &id, cli.format).await
            }
            BenchmarkCommands::Label { ids, adds, removes } => {
                benchmarks::label_benchmarks(&lab, &ids, &adds, &removes, cli.format).await
            }
            BenchmarkCommands::Delete { ids } => {
                benchmarks::delete_benchmarks(&lab, &ids, cli.format).await
            }
        },
    };

    if let Err(err) = result {
        output::print_error(&format!("{:#}", err));
        std::process::exit(1);
    }
    Ok(())
}
