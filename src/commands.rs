//! CLI command definitions
//!
//! Defines the clap commands for the test harness.

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::common::config::BatchPreset;

#[derive(Subcommand)]
pub enum Commands {
    /// Run the online form suite against a distribution task
    Distribution {
        #[command(flatten)]
        suite: SuiteArgs,
    },

    /// Run the file collection suite against a collection task
    Collection {
        #[command(flatten)]
        suite: SuiteArgs,

        /// Rows per generated workbook
        #[arg(long, default_value_t = 10)]
        row_count: usize,
    },

    /// Only generate the sample attachment files
    Samples {
        /// Target directory (default: configured test files directory)
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Only these kinds, e.g. `--kind png --kind pdf` (default: all)
        #[arg(long = "kind")]
        kinds: Vec<String>,
    },

    /// Print the department list served by the service
    Departments {
        /// Base API URL, e.g. http://192.168.0.100:8080
        #[arg(long)]
        base_api: Option<String>,

        /// Request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
}

/// Flags shared by both suites
#[derive(Args, Debug, Clone)]
pub struct SuiteArgs {
    /// Base API URL, e.g. http://192.168.0.100:8080
    #[arg(long)]
    pub base_api: Option<String>,

    /// Task slug
    #[arg(long)]
    pub slug: String,

    /// Task password
    #[arg(long)]
    pub password: String,

    /// Submitter name
    #[arg(long)]
    pub name: Option<String>,

    /// Submitter contact
    #[arg(long)]
    pub contact: Option<String>,

    /// Submitter department
    #[arg(long)]
    pub department: Option<String>,

    /// Batch size preset
    #[arg(long, value_enum, default_value = "small")]
    pub batch: BatchPreset,

    /// Number of batch submissions (overrides the preset)
    #[arg(long)]
    pub count: Option<usize>,

    /// Requests in flight during batch submission (overrides the preset)
    #[arg(long)]
    pub concurrent: Option<usize>,

    /// Report output directory
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Skip generating the sample attachment files
    #[arg(long)]
    pub no_files: bool,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}
