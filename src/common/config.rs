//! Configuration file handling
//!
//! Settings are layered: built-in defaults, then the TOML file, then
//! command-line flags. `FileConfig` is the on-disk shape; `RunConfig` is the
//! fully resolved view a single test run works from.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths::{self, config_path};
use super::{Error, Result};

/// Main configuration file structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct FileConfig {
    /// Service connection settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Default submitter identity
    #[serde(default)]
    pub user: TestUser,

    /// Working directories
    #[serde(default)]
    pub paths: PathsConfig,

    /// Size limits
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Service connection settings
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Base URL of the service, without trailing slash
    #[serde(default = "default_base_api")]
    pub base_api: String,

    /// Per-request timeout
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Ignore proxy environment variables
    #[serde(default)]
    pub no_proxy: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_api: default_base_api(),
            timeout_secs: default_timeout(),
            no_proxy: false,
        }
    }
}

fn default_base_api() -> String {
    "http://192.168.0.100:8080".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// The identity used for single submissions
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct TestUser {
    #[serde(default = "default_user_name")]
    pub name: String,
    #[serde(default = "default_user_contact")]
    pub contact: String,
    #[serde(default = "default_user_department")]
    pub department: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            name: default_user_name(),
            contact: default_user_contact(),
            department: default_user_department(),
        }
    }
}

fn default_user_name() -> String {
    "测试用户".to_string()
}
fn default_user_contact() -> String {
    "12345678901".to_string()
}
fn default_user_department() -> String {
    "技术部".to_string()
}

/// Working directories
#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    /// Where reports and the run log are written
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Where generated sample files are written
    #[serde(default = "default_test_files_dir")]
    pub test_files_dir: PathBuf,

    /// Where downloaded attachments and templates are written
    #[serde(default = "default_downloads_dir")]
    pub downloads_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            test_files_dir: default_test_files_dir(),
            downloads_dir: default_downloads_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("test_reports")
}
fn default_test_files_dir() -> PathBuf {
    PathBuf::from("test_files")
}
fn default_downloads_dir() -> PathBuf {
    PathBuf::from("downloads")
}

/// Size limits
#[derive(Debug, Deserialize, Clone)]
pub struct LimitsConfig {
    /// Largest template or attachment download accepted as valid
    #[serde(default = "default_max_download")]
    pub max_download_bytes: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_download_bytes: default_max_download(),
        }
    }
}

fn default_max_download() -> u64 {
    50 * 1024 * 1024
}

impl FileConfig {
    /// Load configuration
    ///
    /// An explicit path must exist. Without one, the platform config file is
    /// used when present and defaults otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(Error::ConfigNotFound(path.display().to_string()));
            }
            return Self::from_file(path);
        }

        if let Some(path) = config_path() {
            if path.exists() {
                return Self::from_file(&path);
            }
        }
        Ok(Self::default())
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read '{}': {}", path.display(), e)))?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))
    }
}

/// Batch size presets: submission count and concurrency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum BatchPreset {
    Single,
    #[default]
    Small,
    Medium,
    Large,
}

impl BatchPreset {
    /// Number of submissions in a batch
    pub fn count(self) -> usize {
        match self {
            BatchPreset::Single => 1,
            BatchPreset::Small => 10,
            BatchPreset::Medium => 50,
            BatchPreset::Large => 500,
        }
    }

    /// Requests in flight at once
    pub fn concurrent(self) -> usize {
        match self {
            BatchPreset::Single | BatchPreset::Small => 1,
            BatchPreset::Medium => 5,
            BatchPreset::Large => 10,
        }
    }
}

/// Resolved settings for one test run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub base_api: String,
    pub slug: String,
    pub password: String,
    pub user: TestUser,
    pub batch_count: usize,
    pub concurrent: usize,
    /// Rows per generated workbook in file submissions
    pub row_count: usize,
    pub timeout: Duration,
    pub no_proxy: bool,
    pub output_dir: PathBuf,
    pub test_files_dir: PathBuf,
    pub downloads_dir: PathBuf,
    pub max_download_bytes: u64,
}

impl RunConfig {
    /// Build a run configuration from file settings and the task credentials
    pub fn from_file_config(file: &FileConfig, slug: &str, password: &str) -> Self {
        let preset = BatchPreset::default();
        Self {
            base_api: file.server.base_api.trim_end_matches('/').to_string(),
            slug: slug.to_string(),
            password: password.to_string(),
            user: file.user.clone(),
            batch_count: preset.count(),
            concurrent: preset.concurrent(),
            row_count: 10,
            timeout: Duration::from_secs(file.server.timeout_secs),
            no_proxy: file.server.no_proxy,
            output_dir: file.paths.output_dir.clone(),
            test_files_dir: file.paths.test_files_dir.clone(),
            downloads_dir: file.paths.downloads_dir.clone(),
            max_download_bytes: file.limits.max_download_bytes,
        }
    }

    /// Apply a batch preset with optional explicit overrides
    pub fn apply_batch(
        &mut self,
        preset: BatchPreset,
        count: Option<usize>,
        concurrent: Option<usize>,
    ) {
        self.batch_count = count.unwrap_or_else(|| preset.count());
        self.concurrent = concurrent.unwrap_or_else(|| preset.concurrent()).max(1);
    }

    /// Create the output, sample-file and download directories
    pub fn prepare_dirs(&self) -> Result<()> {
        for dir in [&self.output_dir, &self.test_files_dir, &self.downloads_dir] {
            paths::ensure_dir(dir).map_err(|e| Error::file_write(dir, e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let config = FileConfig::parse("").unwrap();
        assert_eq!(config.server.base_api, "http://192.168.0.100:8080");
        assert_eq!(config.server.timeout_secs, 30);
        assert_eq!(config.user.department, "技术部");
        assert_eq!(config.paths.output_dir, PathBuf::from("test_reports"));
    }

    #[test]
    fn test_partial_sections() {
        let config = FileConfig::parse(
            r#"
            [server]
            base_api = "http://localhost:9000/"
            no_proxy = true

            [user]
            name = "张三"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.timeout_secs, 30);
        assert!(config.server.no_proxy);
        assert_eq!(config.user.name, "张三");
        assert_eq!(config.user.contact, "12345678901");

        let run = RunConfig::from_file_config(&config, "abc", "pw");
        assert_eq!(run.base_api, "http://localhost:9000");
    }

    #[test]
    fn test_invalid_toml() {
        let err = FileConfig::parse("[server\nbase_api = 1").unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = FileConfig::load(Some(Path::new("/nonexistent/collect.toml"))).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound(_)));
    }

    #[test]
    fn test_batch_presets() {
        assert_eq!((BatchPreset::Single.count(), BatchPreset::Single.concurrent()), (1, 1));
        assert_eq!((BatchPreset::Small.count(), BatchPreset::Small.concurrent()), (10, 1));
        assert_eq!((BatchPreset::Medium.count(), BatchPreset::Medium.concurrent()), (50, 5));
        assert_eq!((BatchPreset::Large.count(), BatchPreset::Large.concurrent()), (500, 10));
    }

    #[test]
    fn test_apply_batch_overrides() {
        let mut run = RunConfig::from_file_config(&FileConfig::default(), "s", "p");
        run.apply_batch(BatchPreset::Large, Some(3), None);
        assert_eq!(run.batch_count, 3);
        assert_eq!(run.concurrent, 10);

        run.apply_batch(BatchPreset::Single, None, Some(0));
        assert_eq!(run.batch_count, 1);
        assert_eq!(run.concurrent, 1);
    }
}
