//! CLI binary entry point for care-import

use care_import::cli::commands::check::{CheckArgs, handle_check};
use care_import::cli::commands::print_report;
use care_import::cli::commands::run::{RunArgs, handle_run};
use care_import::cli::commands::schema::{SchemaArgs, handle_schema};
use care_import::cli::error::CliError;
use care_import::config::{CONFIG_FILENAME, ImporterConfig, sample_config};
use care_import::logging;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "care-import")]
#[command(about = "Load healthcare records into a document store, driven by a field catalog")]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, default_value = CONFIG_FILENAME)]
    config: PathBuf,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full import
    Run {
        /// Source CSV file (overrides paths.source)
        #[arg(short, long)]
        source: Option<PathBuf>,
        /// First row to import
        #[arg(long)]
        start: Option<usize>,
        /// Number of rows to import (0 for all)
        #[arg(long)]
        limit: Option<usize>,
        /// Transform and log only, write nothing
        #[arg(long)]
        trace_only: bool,
        /// Drop collections and roles before the import
        #[arg(long)]
        clean_db: bool,
        /// Target the production database
        #[arg(long)]
        production: bool,
    },
    /// Clean and deduplicate the source without a store, then print the report
    Check {
        /// Source CSV file (overrides paths.source)
        #[arg(short, long)]
        source: Option<PathBuf>,
        #[arg(long)]
        start: Option<usize>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print the validators and indexes derived from the catalog
    Schema {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print a sample configuration file
    SampleConfig,
}

fn execute(cli: Cli) -> Result<(), CliError> {
    if let Commands::SampleConfig = cli.command {
        print!("{}", sample_config());
        return Ok(());
    }

    let mut config = ImporterConfig::load(Some(&cli.config))?;
    config.debug |= cli.debug;
    logging::init(&config.paths.log_dir, config.debug)
        .map_err(|e| CliError::LoggingError(e.to_string()))?;

    match cli.command {
        Commands::Run {
            source,
            start,
            limit,
            trace_only,
            clean_db,
            production,
        } => {
            let args = RunArgs {
                source,
                start,
                limit,
                trace_only,
                clean_db,
                production,
            };
            let report = handle_run(config, &args)?;
            print_report(&report)
        }
        Commands::Check {
            source,
            start,
            limit,
        } => {
            let args = CheckArgs {
                source,
                start,
                limit,
            };
            let report = handle_check(config, &args)?;
            print_report(&report)
        }
        Commands::Schema { output } => handle_schema(&config, &SchemaArgs { output }),
        Commands::SampleConfig => Ok(()),
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = execute(cli) {
        tracing::error!("{}", e);
        tracing::error!("Abnormal end of execution");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
