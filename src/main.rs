use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{GlobalOptions, MineOptions};
use kbminer::config::{Config, LoggingConfig};

#[derive(Parser)]
#[command(
    name = "kbminer",
    version,
    about = "Mine per-class predicate knowledge bases from NIF abstracts and DBpedia",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML); environment variables are used otherwise
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the results directory
    #[arg(long, global = true)]
    results_dir: Option<PathBuf>,

    /// Override the NIF dataset path
    #[arg(long, global = true)]
    nif: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides logging.format
    #[arg(long, global = true, value_parser = ["text", "json"])]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Mine, take the literal census and build the knowledge base
    Complete {
        /// Entity classes (e.g. Film,Person or full ontology IRIs)
        #[arg(short, long, value_delimiter = ',', required = true)]
        types: Vec<String>,

        /// Best ranked resources mined per class
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Mine resources again even when a result exists
        #[arg(long, default_value = "false")]
        reload: bool,

        /// Skip identical predicate detection
        #[arg(long, default_value = "false")]
        no_identical: bool,
    },

    /// Mine the NIF dataset for the best ranked resources
    Mine {
        #[arg(short, long, value_delimiter = ',', required = true)]
        types: Vec<String>,

        #[arg(short = 'n', long)]
        count: Option<usize>,

        #[arg(long, default_value = "false")]
        reload: bool,
    },

    /// Count literal predicates of the best ranked resources
    Census {
        #[arg(short, long, value_delimiter = ',', required = true)]
        types: Vec<String>,

        /// Resources sampled per class
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },

    /// Aggregate stored results into the knowledge base
    Build {
        #[arg(short, long, value_delimiter = ',', required = true)]
        types: Vec<String>,

        #[arg(long, default_value = "false")]
        no_identical: bool,
    },

    /// Re-enrich stored results without reading the NIF dataset
    Refresh {
        #[arg(short, long, value_delimiter = ',', required = true)]
        types: Vec<String>,

        #[arg(short = 'n', long)]
        count: Option<usize>,
    },

    /// Merge overlapping identical predicate groups
    Reduce,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let global = GlobalOptions {
        config: cli.config,
        results_dir: cli.results_dir,
        nif: cli.nif,
        log_format: cli.log_format,
    };
    let config = commands::load_config(&global)?;

    setup_tracing(&config.logging, cli.verbose)?;

    tracing::info!("kbminer starting");

    if let Err(e) = run(cli.command, config).await {
        if commands::report_failure(&e) {
            eprintln!("The SPARQL endpoint failed; rerun the same command to resume.");
        }
        return Err(e);
    }

    Ok(())
}

async fn run(command: Commands, config: Config) -> Result<()> {
    match command {
        Commands::Complete {
            types,
            count,
            reload,
            no_identical,
        } => {
            tracing::info!(types = ?types, count = ?count, reload, no_identical, "Starting complete command");
            commands::complete(
                config,
                MineOptions {
                    types,
                    count,
                    reload,
                },
                !no_identical,
            )
            .await
        }

        Commands::Mine {
            types,
            count,
            reload,
        } => {
            tracing::info!(types = ?types, count = ?count, reload, "Starting mine command");
            commands::mine(
                config,
                MineOptions {
                    types,
                    count,
                    reload,
                },
            )
            .await
        }

        Commands::Census { types, count } => {
            tracing::info!(types = ?types, count = ?count, "Starting census command");
            commands::census(config, types, count).await
        }

        Commands::Build {
            types,
            no_identical,
        } => {
            tracing::info!(types = ?types, no_identical, "Starting build command");
            commands::build(config, types, !no_identical).await
        }

        Commands::Refresh { types, count } => {
            tracing::info!(types = ?types, count = ?count, "Starting refresh command");
            commands::refresh(config, types, count).await
        }

        Commands::Reduce => {
            tracing::info!("Starting reduce command");
            commands::reduce(config)
        }
    }
}

/// `--verbose` wins over `RUST_LOG`, which wins over `logging.level`
fn setup_tracing(logging: &LoggingConfig, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new(logging.filter_directive(true))
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(logging.filter_directive(false)))
    };

    if logging.is_json() {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    Ok(())
}
