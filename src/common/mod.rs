//! Common utilities shared by the suites, the report and the CLI

pub mod config;
pub mod error;
pub mod fsutil;
pub mod logging;
pub mod paths;

pub use error::{Error, Result};

/// Current local time in the format used by reports and records
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Compact timestamp for file names
pub fn file_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}
