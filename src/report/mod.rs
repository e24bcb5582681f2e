//! Markdown test report
//!
//! Rendered once at the end of a suite and written into the output
//! directory as `<suite>_report_<YYYYmmdd_HHMMSS>.md`.

pub mod markdown;

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::api::types::{task_kind_label, task_type_code};
use crate::common::config::RunConfig;
use crate::common::{file_timestamp, fsutil, timestamp, Result};
use crate::testing::{Summary, TestResult};
use markdown::{cell, scalar, yes_no};

/// Optional sections gathered while a suite runs
#[derive(Debug, Clone, Default)]
pub struct ReportExtras {
    /// Raw form schema (online form suite)
    pub schema: Option<Value>,
    /// Raw task info (file collection suite)
    pub task_info: Option<Value>,
    /// `{ filename, header_count, headers }` (file collection suite)
    pub template_info: Option<Value>,
}

/// File name for a report of `suite`, e.g. `distribution_report_20260110_093000.md`
pub fn report_file_name(suite: &str) -> String {
    format!("{}_report_{}.md", suite, file_timestamp())
}

pub struct ReportGenerator {
    output_dir: PathBuf,
}

impl ReportGenerator {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Render the full report
    pub fn generate(
        &self,
        results: &[TestResult],
        config: &RunConfig,
        extras: &ReportExtras,
    ) -> String {
        let summary = Summary::of(results);
        let mut lines = vec!["# Functional Test Report\n".to_string()];

        lines.push("## Summary\n".to_string());
        lines.push(format!("- **Time**: {}", timestamp()));
        lines.push(format!("- **Environment**: {}", config.base_api));
        lines.push(format!("- **Task slug**: {}", config.slug));
        lines.push(format!(
            "- **Batch**: {} submissions, {} concurrent",
            config.batch_count, config.concurrent
        ));
        lines.push(format!("- **Total cases**: {}", summary.total));
        lines.push(format!("- **Passed**: {}", summary.passed));
        lines.push(format!("- **Failed**: {}", summary.failed));
        lines.push(format!("- **Pass rate**: {:.1}%\n", summary.pass_rate()));

        lines.push("## Configuration\n".to_string());
        lines.push("| Setting | Value |".to_string());
        lines.push("|---------|-------|".to_string());
        lines.push(format!("| Base API | {} |", cell(&config.base_api)));
        lines.push(format!("| Slug | {} |", cell(&config.slug)));
        lines.push("| Password | *** |".to_string());
        lines.push(format!(
            "| Test user | {}, {}, {} |",
            cell(&config.user.name),
            cell(&config.user.contact),
            cell(&config.user.department)
        ));
        lines.push(format!("| Batch count | {} |", config.batch_count));
        lines.push(format!("| Concurrency | {} |\n", config.concurrent));

        extra_sections(&mut lines, extras);

        lines.push("## Case Details\n".to_string());
        for (i, result) in results.iter().enumerate() {
            case_section(&mut lines, i + 1, result);
        }

        if !results.is_empty() {
            let total: f64 = results.iter().map(|r| r.duration.as_secs_f64()).sum();
            let max = results
                .iter()
                .map(|r| r.duration.as_secs_f64())
                .fold(0.0, f64::max);
            let min = results
                .iter()
                .map(|r| r.duration.as_secs_f64())
                .fold(f64::INFINITY, f64::min);

            lines.push("## Performance\n".to_string());
            lines.push("| Metric | Value |".to_string());
            lines.push("|--------|-------|".to_string());
            lines.push(format!("| Average duration | {:.2}s |", total / results.len() as f64));
            lines.push(format!("| Max duration | {:.2}s |", max));
            lines.push(format!("| Min duration | {:.2}s |", min));
            lines.push(format!("| Total duration | {:.2}s |\n", total));
        }

        lines.push("## Issues\n".to_string());
        let failed: Vec<&TestResult> = results.iter().filter(|r| !r.passed).collect();
        if failed.is_empty() {
            lines.push("✅ All cases passed.\n".to_string());
        } else {
            lines.push("| Case | Error |".to_string());
            lines.push("|------|-------|".to_string());
            for result in failed {
                let error = result.error.as_deref().unwrap_or("unknown error");
                lines.push(format!("| {} | {} |", cell(&result.name), cell(error)));
            }
            lines.push(String::new());
        }

        lines.push("## Conclusion\n".to_string());
        if summary.all_passed() {
            lines.push("✅ **Passed**: all features work as expected\n".to_string());
        } else {
            lines.push(format!(
                "⚠️ **Partially passed**: {}/{} cases passed\n",
                summary.passed, summary.total
            ));
        }

        lines.join("\n")
    }

    /// Write a rendered report into the output directory
    pub fn save(&self, content: &str, filename: &str) -> Result<PathBuf> {
        let path = self.output_dir.join(filename);
        fsutil::save_file(&path, content.as_bytes())?;
        tracing::info!(path = %path.display(), "Report written");
        Ok(path)
    }
}

fn case_section(lines: &mut Vec<String>, number: usize, result: &TestResult) {
    let icon = if result.passed { "✅" } else { "❌" };
    lines.push(format!("### {}. {} {}\n", number, result.name, icon));
    lines.push(format!(
        "**Time**: {}",
        result.finished_at.format("%Y-%m-%d %H:%M:%S")
    ));
    lines.push(format!("**Duration**: {:.2}s", result.duration.as_secs_f64()));
    lines.push(format!("**Status**: {}\n", result.status()));
    lines.push(format!("**Result**: {}\n", result.message));

    if let Some(error) = &result.error {
        lines.push(format!("**Error**: {}\n", error));
    }
    if let Some(details) = &result.details {
        lines.push("**Details**:\n".to_string());
        markdown::details(lines, details, 0);
        lines.push(String::new());
    }
    if let Some(response) = &result.response {
        lines.push("**Response**:\n".to_string());
        markdown::json_block(lines, response);
    }
    lines.push("---\n".to_string());
}

fn extra_sections(lines: &mut Vec<String>, extras: &ReportExtras) {
    if let Some(schema) = &extras.schema {
        let columns = schema
            .get("columns")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        lines.push("## Schema\n".to_string());
        lines.push(format!("- **Title**: {}", field(schema, "title")));
        lines.push(format!("- **Columns**: {}", columns.len()));
        lines.push(format!(
            "- **Attachments allowed**: {}\n",
            yes_no(flag(schema, "allowAttachmentUpload"))
        ));

        if !columns.is_empty() {
            lines.push("| Field | Type | Required |".to_string());
            lines.push("|-------|------|----------|".to_string());
            for column in &columns {
                lines.push(format!(
                    "| {} | {} | {} |",
                    cell(&field(column, "name")),
                    cell(&field(column, "type")),
                    yes_no(flag(column, "required"))
                ));
            }
            lines.push(String::new());
        }
    }

    if let Some(info) = &extras.task_info {
        let extensions: Vec<String> = info
            .get("allowedExtensions")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(scalar).collect())
            .unwrap_or_default();
        let kind = info
            .get("taskType")
            .and_then(task_type_code)
            .map(task_kind_label)
            .unwrap_or("N/A");

        lines.push("## Task Info\n".to_string());
        lines.push(format!("- **Title**: {}", field(info, "title")));
        lines.push(format!("- **Type**: {}", kind));
        lines.push(format!("- **Allowed extensions**: {}", extensions.join(", ")));
        lines.push(format!(
            "- **Attachments allowed**: {}",
            yes_no(flag(info, "allowAttachmentUpload"))
        ));
        lines.push(format!(
            "- **Versioning mode**: {}\n",
            field(info, "versioningMode")
        ));
    }

    if let Some(template) = &extras.template_info {
        let headers: Vec<String> = template
            .get("headers")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(scalar).collect())
            .unwrap_or_default();
        lines.push("## Template\n".to_string());
        lines.push(format!("- **File name**: {}", field(template, "filename")));
        lines.push(format!("- **Header count**: {}", headers.len()));
        lines.push(format!("- **Headers**: {}\n", headers.join(", ")));
    }
}

fn field(value: &Value, key: &str) -> String {
    value.get(key).map(scalar).unwrap_or_else(|| "N/A".to_string())
}

fn flag(value: &Value, key: &str) -> bool {
    value.get(key).and_then(Value::as_bool).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::FileConfig;
    use serde_json::json;
    use std::time::Duration;

    fn config() -> RunConfig {
        RunConfig::from_file_config(&FileConfig::default(), "abc", "secret")
    }

    #[test]
    fn test_report_sections() {
        let results = vec![
            TestResult::pass("Schema retrieval", "schema retrieved", Duration::from_millis(120))
                .with_details(json!({"title": "报名表", "column_count": 2}))
                .with_response(json!({"title": "报名表"})),
            TestResult::fail(
                "Error handling",
                "0/8 scenarios rejected",
                Duration::from_millis(300),
                "HTTP 500: a|b",
            ),
        ];
        let extras = ReportExtras {
            schema: Some(json!({
                "title": "报名表",
                "columns": [{"name": "姓名", "type": "Text", "required": true}],
                "allowAttachmentUpload": true
            })),
            ..Default::default()
        };

        let report = ReportGenerator::new("out").generate(&results, &config(), &extras);
        assert!(report.starts_with("# Functional Test Report"));
        assert!(report.contains("- **Pass rate**: 50.0%"));
        assert!(report.contains("| Password | *** |"));
        assert!(!report.contains("secret"));
        assert!(report.contains("## Schema"));
        assert!(report.contains("| 姓名 | Text | yes |"));
        assert!(report.contains("### 1. Schema retrieval ✅"));
        assert!(report.contains("### 2. Error handling ❌"));
        assert!(report.contains("- **column_count**: 2"));
        assert!(report.contains("```json"));
        assert!(report.contains("| Max duration | 0.30s |"));
        assert!(report.contains("| Error handling | HTTP 500: a\\|b |"));
        assert!(report.contains("⚠️ **Partially passed**: 1/2 cases passed"));
        assert!(!report.contains("## Task Info"));
    }

    #[test]
    fn test_collection_sections() {
        let extras = ReportExtras {
            task_info: Some(json!({
                "title": "月报收集",
                "taskType": 0,
                "allowedExtensions": [".xlsx", ".xls"],
                "allowAttachmentUpload": false
            })),
            template_info: Some(json!({
                "filename": "template_abc.xlsx",
                "header_count": 2,
                "headers": ["姓名", "电话"]
            })),
            ..Default::default()
        };
        let results = vec![TestResult::pass("Task info", "ok", Duration::ZERO)];
        let report = ReportGenerator::new("out").generate(&results, &config(), &extras);

        assert!(report.contains("- **Type**: file collection"));
        assert!(report.contains("- **Allowed extensions**: .xlsx, .xls"));
        assert!(report.contains("- **Versioning mode**: N/A"));
        assert!(report.contains("- **Headers**: 姓名, 电话"));
        assert!(report.contains("✅ All cases passed."));
        assert!(report.contains("✅ **Passed**"));
    }

    #[test]
    fn test_empty_run() {
        let report =
            ReportGenerator::new("out").generate(&[], &config(), &ReportExtras::default());
        assert!(report.contains("- **Pass rate**: 0.0%"));
        assert!(!report.contains("## Performance"));
    }

    #[test]
    fn test_save() {
        let dir = tempfile::tempdir().unwrap();
        let generator = ReportGenerator::new(dir.path().join("reports"));
        let path = generator.save("# hi", "collection_report_x.md").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "# hi");
    }

    #[test]
    fn test_report_file_name() {
        let name = report_file_name("distribution");
        assert!(name.starts_with("distribution_report_"));
        assert!(name.ends_with(".md"));
        assert_eq!(name.len(), "distribution_report_".len() + 15 + 3);
    }
}
