//! Error types for the test harness
//!
//! These cover faults of the harness itself. A remote service that answers
//! badly is not an error here; it shows up as a failed `TestResult`.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Configuration file not found: {0}")]
    ConfigNotFound(String),

    // === HTTP Errors ===
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    // === Data Generation Errors ===
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("Template has no header row")]
    EmptyTemplate,

    #[error("Unsupported sample file type: {0}")]
    UnsupportedFileType(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Image encoding error: {0}")]
    Image(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to write file '{path}': {error}")]
    FileWrite { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a file write error for a path
    pub fn file_write(path: &std::path::Path, error: impl std::fmt::Display) -> Self {
        Self::FileWrite {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }
}

impl From<calamine::XlsxError> for Error {
    fn from(e: calamine::XlsxError) -> Self {
        Self::Spreadsheet(e.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for Error {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        Self::Spreadsheet(e.to_string())
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self {
        Self::Archive(e.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Self::Image(e.to_string())
    }
}
