//! CLI command handling
//!
//! Resolves the run configuration for a command, runs it and prints the
//! outcome.

use std::path::PathBuf;
use std::time::Duration;

use colored::Colorize;

use crate::api::ApiClient;
use crate::commands::{Commands, SuiteArgs};
use crate::common::config::{FileConfig, RunConfig};
use crate::common::{fsutil, Result};
use crate::datagen::{SampleFiles, SampleKind};
use crate::report::{report_file_name, ReportGenerator};
use crate::testing::{self, print_summary, Collection, TestContext};

/// Which suite a command runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suite {
    Distribution,
    Collection,
}

impl Suite {
    /// Prefix of the report file name
    pub fn report_prefix(self) -> &'static str {
        match self {
            Suite::Distribution => "distribution",
            Suite::Collection => "collection",
        }
    }
}

/// Directory the run log is written to, if the command produces a report
pub fn log_dir(command: &Commands, file: &FileConfig) -> Option<PathBuf> {
    match command {
        Commands::Distribution { suite } | Commands::Collection { suite, .. } => Some(
            suite
                .output_dir
                .clone()
                .unwrap_or_else(|| file.paths.output_dir.clone()),
        ),
        Commands::Samples { .. } | Commands::Departments { .. } => None,
    }
}

/// Resolve the settings of a suite run: file values overridden by flags
pub fn run_config(args: &SuiteArgs, file: &FileConfig) -> RunConfig {
    let mut config = RunConfig::from_file_config(file, &args.slug, &args.password);
    if let Some(base_api) = &args.base_api {
        config.base_api = base_api.trim_end_matches('/').to_string();
    }
    if let Some(name) = &args.name {
        config.user.name = name.clone();
    }
    if let Some(contact) = &args.contact {
        config.user.contact = contact.clone();
    }
    if let Some(department) = &args.department {
        config.user.department = department.clone();
    }
    if let Some(timeout) = args.timeout {
        config.timeout = Duration::from_secs(timeout);
    }
    if let Some(output_dir) = &args.output_dir {
        config.output_dir = output_dir.clone();
    }
    config.apply_batch(args.batch, args.count, args.concurrent);
    config
}

/// Dispatch a CLI command
///
/// Returns whether the command succeeded; a suite with a failed case is
/// not an error but yields `false`.
pub async fn dispatch(command: Commands, file: FileConfig) -> Result<bool> {
    match command {
        Commands::Distribution { suite } => {
            let config = run_config(&suite, &file);
            run_suite(Suite::Distribution, config, suite.no_files).await
        }

        Commands::Collection { suite, row_count } => {
            let mut config = run_config(&suite, &file);
            config.row_count = row_count;
            run_suite(Suite::Collection, config, suite.no_files).await
        }

        Commands::Samples { dir, kinds } => {
            let dir = dir.unwrap_or_else(|| file.paths.test_files_dir.clone());
            let kinds = if kinds.is_empty() {
                SampleKind::ALL.to_vec()
            } else {
                kinds
                    .iter()
                    .map(|k| k.parse::<SampleKind>())
                    .collect::<Result<Vec<_>>>()?
            };
            generate_samples(&dir, &kinds)?;
            Ok(true)
        }

        Commands::Departments { base_api, timeout } => {
            let mut config = RunConfig::from_file_config(&file, "", "");
            if let Some(base_api) = base_api {
                config.base_api = base_api.trim_end_matches('/').to_string();
            }
            if let Some(timeout) = timeout {
                config.timeout = Duration::from_secs(timeout);
            }

            let client = ApiClient::new(&config)?;
            let timed = client.get_departments().await;
            match timed.outcome {
                Ok(departments) => {
                    println!("{}", "Departments:".cyan());
                    for department in &departments {
                        println!("  {}", department);
                    }
                    if departments.is_empty() {
                        println!("  {}", "(none)".dimmed());
                    }
                    Ok(true)
                }
                Err(failure) => {
                    println!("  {} Could not fetch departments: {}", "✗".red(), failure);
                    Ok(false)
                }
            }
        }
    }
}

fn generate_samples(dir: &std::path::Path, kinds: &[SampleKind]) -> Result<()> {
    println!("\n{}", "Generating sample files...".cyan());
    let written = SampleFiles::new().generate_some(dir, kinds)?;
    for (kind, path) in &written {
        let size = std::fs::metadata(path)?.len();
        println!(
            "  {} {:<5} {} {}",
            "✓".green(),
            kind.to_string(),
            path.display().to_string().dimmed(),
            fsutil::format_file_size(size).dimmed()
        );
    }
    Ok(())
}

/// Run a suite end to end and write its report
async fn run_suite(suite: Suite, config: RunConfig, no_files: bool) -> Result<bool> {
    config.prepare_dirs()?;
    if !no_files {
        generate_samples(&config.test_files_dir, &SampleKind::ALL)?;
    }

    tracing::info!(
        suite = suite.report_prefix(),
        base_api = %config.base_api,
        slug = %config.slug,
        batch = config.batch_count,
        concurrent = config.concurrent,
        "Starting suite"
    );

    let mut ctx = TestContext::new(config)?;
    let report = match suite {
        Suite::Distribution => testing::distribution::run_suite(&mut ctx).await,
        Suite::Collection => testing::collection::run_suite(&mut ctx).await,
    };
    tracing::debug!(
        submissions = ctx.store.count(Collection::Submissions),
        attachments = ctx.store.count(Collection::Attachments),
        error_scenarios = ctx.store.count(Collection::Errors),
        "Records kept"
    );

    println!("\n{}", "Writing report...".cyan());
    let generator = ReportGenerator::new(ctx.config.output_dir.clone());
    let content = generator.generate(&report.results, &ctx.config, &report.extras);
    let path = generator.save(&content, &report_file_name(suite.report_prefix()))?;
    println!("  {} Report saved to {}", "✓".green(), path.display());

    print_summary(&report.results);
    Ok(report.summary().all_passed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::BatchPreset;

    fn args() -> SuiteArgs {
        SuiteArgs {
            base_api: None,
            slug: "abc".to_string(),
            password: "pw".to_string(),
            name: None,
            contact: None,
            department: None,
            batch: BatchPreset::Small,
            count: None,
            concurrent: None,
            output_dir: None,
            no_files: false,
            timeout: None,
        }
    }

    #[test]
    fn test_run_config_defaults() {
        let config = run_config(&args(), &FileConfig::default());
        assert_eq!(config.slug, "abc");
        assert_eq!(config.batch_count, 10);
        assert_eq!(config.concurrent, 1);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_run_config_overrides() {
        let mut args = args();
        args.base_api = Some("http://localhost:9/".to_string());
        args.name = Some("李四".to_string());
        args.batch = BatchPreset::Large;
        args.concurrent = Some(3);
        args.timeout = Some(5);
        args.output_dir = Some(PathBuf::from("out"));

        let config = run_config(&args, &FileConfig::default());
        assert_eq!(config.base_api, "http://localhost:9");
        assert_eq!(config.user.name, "李四");
        assert_eq!(config.user.contact, "12345678901");
        assert_eq!(config.batch_count, 500);
        assert_eq!(config.concurrent, 3);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_generate_samples_surfaces_io_errors() {
        let tmp = tempfile::tempdir().unwrap();
        generate_samples(tmp.path(), &[SampleKind::Txt]).unwrap();
        assert!(tmp.path().join("sample.txt").exists());

        let blocker = tmp.path().join("not_a_dir");
        std::fs::write(&blocker, b"x").unwrap();
        assert!(generate_samples(&blocker, &[SampleKind::Txt]).is_err());
    }

    #[test]
    fn test_log_dir() {
        let file = FileConfig::default();
        let command = Commands::Distribution { suite: args() };
        assert_eq!(log_dir(&command, &file), Some(PathBuf::from("test_reports")));
        let samples = Commands::Samples {
            dir: None,
            kinds: Vec::new(),
        };
        assert_eq!(log_dir(&samples, &file), None);
    }
}
