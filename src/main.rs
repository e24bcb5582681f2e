//! collect-e2e - End-to-end test harness for the form distribution and file
//! collection service
//!
//! Generates synthetic submissions, drives the service's REST endpoints and
//! writes a Markdown report per suite run.

use clap::Parser;
use collect_e2e::common::config::FileConfig;
use collect_e2e::common::logging;
use collect_e2e::{cli, commands};
use commands::Commands;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "collect-e2e", about = "End-to-end tests for form distribution and file collection tasks")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration file (default: platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let file_config = match FileConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let log_dir = cli::log_dir(&cli.command, &file_config);
    let guard = logging::init(cli.verbose, log_dir.as_deref());

    let code = match cli::dispatch(cli.command, file_config).await {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(e) => {
            eprintln!("Error: {e}");
            1
        }
    };

    // Flush the file log before exiting
    drop(guard);
    std::process::exit(code);
}
