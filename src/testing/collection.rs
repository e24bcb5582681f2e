//! File collection suite
//!
//! Task info and template download come first; everything after needs the
//! template and is skipped when it could not be obtained.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::batch::{self, BatchStats, SubmissionOutcome};
use super::case::{Stopwatch, TestCase, TestContext};
use super::result::TestResult;
use super::runner::Runner;
use super::store::Collection;
use super::SuiteReport;
use crate::api::types::TaskInfo;
use crate::api::{FileSubmission, Upload};
use crate::common::config::RunConfig;
use crate::common::{fsutil, Result};
use crate::datagen::sheet::read_headers;
use crate::datagen::SheetGenerator;
use crate::report::ReportExtras;

/// Rows in the workbook produced by the data generation case
pub const GENERATED_ROWS: usize = 10;

const WRONG_PASSWORD: &str = "wrong_password";

/// Allowed extensions assumed when task info is unavailable
const FALLBACK_EXTENSIONS: [&str; 2] = [".xlsx", ".xls"];

const ATTACHMENT_HEADER: &str = "内容";

/// Contact number shifted by `offset`, or unchanged when not numeric
fn shifted_contact(contact: &str, offset: usize) -> String {
    contact
        .parse::<u64>()
        .map(|c| c.saturating_add(offset as u64).to_string())
        .unwrap_or_else(|_| contact.to_string())
}

/// Generate `rows` rows from the template and serialize them with a header
fn workbook(generator: &mut SheetGenerator, rows: usize) -> Result<Vec<u8>> {
    let data = generator.rows(rows);
    generator.to_xlsx(&data, true)
}

/// Attachment number `index` in a format the task accepts
///
/// Spreadsheets are preferred; otherwise the first allowed extension gets
/// plain text content. No allowed extensions means no attachment.
pub fn attachment_for(allowed: &[String], index: usize) -> Result<Option<Upload>> {
    let has = |ext: &str| allowed.iter().any(|a| a.eq_ignore_ascii_case(ext));
    let sheet_ext = [".xlsx", ".xls"].into_iter().find(|ext| has(ext));

    if let Some(ext) = sheet_ext {
        let generator = SheetGenerator::from_headers(vec![ATTACHMENT_HEADER.to_string()]);
        let mut row = Map::new();
        row.insert(
            ATTACHMENT_HEADER.to_string(),
            Value::from(format!("测试附件内容 {}", index)),
        );
        let content = generator.to_xlsx(&[row], true)?;
        return Ok(Some(Upload::new(format!("attachment_{}{}", index, ext), content)));
    }

    Ok(allowed.first().map(|ext| {
        let content = format!("测试附件内容 {}\n", index).repeat(100);
        Upload::new(format!("attachment_{}{}", index, ext), content.into_bytes())
    }))
}

/// Submission for the configured user carrying `file_content`
fn user_submission(
    config: &RunConfig,
    file_name: String,
    file_content: Vec<u8>,
) -> FileSubmission {
    FileSubmission {
        name: config.user.name.clone(),
        contact: config.user.contact.clone(),
        department: config.user.department.clone(),
        password: Some(config.password.clone()),
        file_name,
        file_content,
        attachments: Vec::new(),
    }
}

pub struct TaskInfoCase;

#[async_trait]
impl TestCase for TaskInfoCase {
    fn name(&self) -> &str {
        "Task info"
    }

    fn description(&self) -> &str {
        "fetch the task description"
    }

    async fn execute(&mut self, ctx: &mut TestContext) -> TestResult {
        let timed = ctx.client.get_task_info().await;
        let duration = timed.duration;
        let body = match timed.outcome {
            Ok(body) => body,
            Err(failure) => {
                return TestResult::fail(
                    self.name(),
                    "task info failed",
                    duration,
                    failure.to_string(),
                )
            }
        };

        let info = match TaskInfo::from_body(&body) {
            Ok(info) => info,
            Err(e) => {
                return TestResult::fail(
                    self.name(),
                    "task info failed",
                    duration,
                    format!("response format validation failed: {}", e),
                )
                .with_response(body)
            }
        };

        ctx.store.insert(
            Collection::Submissions,
            json!({
                "task_id": info.id,
                "task_title": info.title,
                "task_type": info.task_type,
                "has_password": info.has_password,
                "is_active": info.is_active,
                "status": "task_info_test",
            }),
        );

        TestResult::pass(self.name(), "task info retrieved", duration)
            .with_details(json!({
                "task_title": info.title,
                "task_type": info.kind_label(),
                "has_password": info.has_password,
                "is_active": info.is_active,
                "allowed_extensions": info.allowed_extensions,
                "allow_attachment_upload": info.allow_attachment_upload,
            }))
            .with_response(body)
    }
}

/// Downloads the template and keeps it for the cases that follow
#[derive(Default)]
pub struct TemplateDownloadCase {
    content: Option<Vec<u8>>,
}

impl TemplateDownloadCase {
    /// Template bytes, present only after a successful download
    pub fn take_content(&mut self) -> Option<Vec<u8>> {
        self.content.take()
    }
}

#[async_trait]
impl TestCase for TemplateDownloadCase {
    fn name(&self) -> &str {
        "Template download"
    }

    fn description(&self) -> &str {
        "download the Excel template"
    }

    async fn execute(&mut self, ctx: &mut TestContext) -> TestResult {
        let timed = ctx.client.download_template().await;
        let duration = timed.duration;
        let content = match timed.outcome {
            Ok(content) => content,
            Err(failure) => {
                return TestResult::fail(
                    self.name(),
                    "template download failed",
                    duration,
                    failure.to_string(),
                )
            }
        };

        let size = content.len() as u64;
        if let Err(e) = fsutil::validate_file_size(size, ctx.config.max_download_bytes) {
            return TestResult::fail(self.name(), "template download failed", duration, e);
        }

        let filename = format!("template_{}.xlsx", ctx.config.slug);
        let path = ctx.config.downloads_dir.join(&filename);
        if let Err(e) = fsutil::save_file(&path, &content) {
            return TestResult::fail(
                self.name(),
                "template downloaded but could not be saved",
                duration,
                e.to_string(),
            );
        }

        ctx.store.insert(
            Collection::Submissions,
            json!({
                "filename": filename,
                "file_size": size,
                "status": "template_download_test",
            }),
        );
        self.content = Some(content);

        TestResult::pass(
            self.name(),
            format!("template downloaded, {}", fsutil::format_file_size(size)),
            duration,
        )
        .with_details(json!({
            "filename": filename,
            "file_size": size,
            "file_size_formatted": fsutil::format_file_size(size),
            "save_path": path.display().to_string(),
        }))
    }
}

pub struct DataGenerationCase {
    template: Arc<[u8]>,
}

impl DataGenerationCase {
    pub fn new(template: Arc<[u8]>) -> Self {
        Self { template }
    }
}

#[async_trait]
impl TestCase for DataGenerationCase {
    fn name(&self) -> &str {
        "Data generation"
    }

    fn description(&self) -> &str {
        "generate a workbook from the template headers"
    }

    async fn execute(&mut self, ctx: &mut TestContext) -> TestResult {
        let clock = Stopwatch::start();
        let generated = SheetGenerator::from_template(&self.template).and_then(|mut generator| {
            let rows = generator.rows(GENERATED_ROWS);
            let content = generator.to_xlsx(&rows, true)?;
            Ok((generator, rows, content))
        });
        let (generator, rows, content) = match generated {
            Ok(generated) => generated,
            Err(e) => {
                return TestResult::fail(
                    self.name(),
                    format!("data generation failed: {}", e),
                    clock.elapsed(),
                    e.to_string(),
                )
            }
        };

        let filename = format!("test_data_{}.xlsx", ctx.config.slug);
        let path = ctx.config.test_files_dir.join(&filename);
        if let Err(e) = fsutil::save_file(&path, &content) {
            return TestResult::fail(
                self.name(),
                "data generated but could not be saved",
                clock.elapsed(),
                e.to_string(),
            );
        }

        let headers = generator.headers();
        ctx.store.insert(
            Collection::Submissions,
            json!({
                "filename": filename,
                "row_count": rows.len(),
                "column_count": headers.len(),
                "file_size": content.len(),
                "status": "data_generation_test",
            }),
        );

        let field_types: Map<String, Value> = generator
            .field_kinds()
            .map(|(header, kind)| (header.to_string(), Value::from(kind.as_str())))
            .collect();
        TestResult::pass(
            self.name(),
            format!("generated {} rows", rows.len()),
            clock.elapsed(),
        )
        .with_details(json!({
            "headers": headers,
            "field_types": field_types,
            "row_count": rows.len(),
            "column_count": headers.len(),
            "file_size": content.len(),
            "file_size_formatted": fsutil::format_file_size(content.len() as u64),
            "sample_data": &rows[..rows.len().min(3)],
        }))
    }
}

/// Single workbook submission, optionally with attachments
pub struct FileSubmissionCase {
    name: String,
    description: String,
    template: Arc<[u8]>,
    attachment_count: usize,
}

impl FileSubmissionCase {
    pub fn new(template: Arc<[u8]>, attachment_count: usize) -> Self {
        let (name, description) = match attachment_count {
            0 => (
                "File submission (no attachments)",
                "submit a generated workbook",
            ),
            1 => (
                "File submission (single attachment)",
                "submit a workbook with one attachment",
            ),
            _ => (
                "File submission (multiple attachments)",
                "submit a workbook with several attachments",
            ),
        };
        Self {
            name: name.to_string(),
            description: description.to_string(),
            template,
            attachment_count,
        }
    }

    /// Allowed extensions from the task, or the spreadsheet defaults
    async fn allowed_extensions(ctx: &TestContext) -> Vec<String> {
        let timed = ctx.client.get_task_info().await;
        match timed.outcome {
            Ok(body) => body
                .get("allowedExtensions")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|e| e.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default(),
            Err(_) => FALLBACK_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }

    async fn prepare(&self, ctx: &TestContext) -> Result<(FileSubmission, Value)> {
        let mut generator = SheetGenerator::from_template(&self.template)?;
        let content = workbook(&mut generator, ctx.config.row_count)?;
        let user = &ctx.config.user;

        if self.attachment_count == 0 {
            let file_name = format!("{}_test.xlsx", user.name);
            return Ok((user_submission(&ctx.config, file_name, content), Value::Null));
        }

        let allowed = Self::allowed_extensions(ctx).await;
        let mut attachments = Vec::with_capacity(self.attachment_count);
        for index in 1..=self.attachment_count {
            if let Some(upload) = attachment_for(&allowed, index)? {
                attachments.push(upload);
            }
        }
        let checks: Vec<Value> = attachments
            .iter()
            .map(|a| match fsutil::validate_file_extension(&a.file_name, &allowed) {
                Ok(()) => json!({ "file_name": a.file_name, "extension": "allowed" }),
                Err(e) => json!({ "file_name": a.file_name, "extension": e }),
            })
            .collect();

        let mut submission = user_submission(
            &ctx.config,
            format!("{}_with_attachments.xlsx", user.name),
            content,
        );
        submission.attachments = attachments;
        Ok((submission, Value::Array(checks)))
    }
}

#[async_trait]
impl TestCase for FileSubmissionCase {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn execute(&mut self, ctx: &mut TestContext) -> TestResult {
        let clock = Stopwatch::start();
        let (submission, checks) = match self.prepare(ctx).await {
            Ok(prepared) => prepared,
            Err(e) => {
                return TestResult::fail(
                    &self.name,
                    format!("could not prepare submission: {}", e),
                    clock.elapsed(),
                    e.to_string(),
                )
            }
        };
        let file_size = submission.file_content.len();
        let attachment_names: Vec<String> = submission
            .attachments
            .iter()
            .map(|a| a.file_name.clone())
            .collect();

        let timed = ctx.client.submit_file(submission).await;
        let duration = timed.duration;
        let body = match timed.outcome {
            Ok(body) => body,
            Err(failure) => {
                return TestResult::fail(
                    &self.name,
                    "file submission failed",
                    duration,
                    failure.to_string(),
                )
            }
        };

        let filename = body
            .get("filename")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let user = &ctx.config.user;
        ctx.store.insert(
            Collection::Submissions,
            json!({
                "submitter": user.name,
                "contact": user.contact,
                "department": user.department,
                "filename": filename,
                "row_count": ctx.config.row_count,
                "file_size": file_size,
                "attachment_count": attachment_names.len(),
                "status": "file_submission_test",
            }),
        );

        let mut details = json!({
            "submitter": user.name,
            "contact": user.contact,
            "department": user.department,
            "filename": filename,
            "row_count": ctx.config.row_count,
            "file_size": file_size,
        });
        if self.attachment_count > 0 {
            details["attachment_count"] = Value::from(attachment_names.len());
            details["attachments"] = json!(attachment_names);
            details["extension_checks"] = checks;
        }

        let message = if self.attachment_count > 0 {
            format!(
                "file submitted with {} attachment(s): {}",
                attachment_names.len(),
                filename
            )
        } else {
            format!("file submitted: {}", filename)
        };
        TestResult::pass(&self.name, message, duration)
            .with_details(details)
            .with_response(body)
    }
}

/// Many workbook submissions, sequential or concurrent
pub struct BatchSubmissionCase {
    name: String,
    description: String,
    template: Arc<[u8]>,
    count: usize,
    concurrent: usize,
    /// Inserted between the user name and the index, e.g. `async`
    tag: Option<&'static str>,
}

impl BatchSubmissionCase {
    /// One request at a time, submitters `{name}_{i}`
    pub fn sequential(template: Arc<[u8]>, count: usize) -> Self {
        Self {
            name: "Batch submission".to_string(),
            description: format!("submit {} files one after another", count),
            template,
            count,
            concurrent: 1,
            tag: None,
        }
    }

    /// Up to `concurrent` requests in flight, submitters `{name}_async_{i}`
    pub fn concurrent(template: Arc<[u8]>, count: usize, concurrent: usize) -> Self {
        Self {
            name: "Concurrent submission".to_string(),
            description: format!("submit {} files, {} concurrent", count, concurrent),
            template,
            count,
            concurrent: concurrent.max(1),
            tag: Some("async"),
        }
    }

    fn submitter(&self, base: &str, index: usize) -> String {
        match self.tag {
            Some(tag) => format!("{}_{}_{}", base, tag, index),
            None => format!("{}_{}", base, index),
        }
    }

    fn prepare(&self, config: &RunConfig) -> Result<Vec<FileSubmission>> {
        let mut generator = SheetGenerator::from_template(&self.template)?;
        (1..=self.count)
            .map(|index| {
                let submitter = self.submitter(&config.user.name, index);
                let content = workbook(&mut generator, config.row_count)?;
                Ok(FileSubmission {
                    name: submitter.clone(),
                    contact: shifted_contact(&config.user.contact, index - 1),
                    department: config.user.department.clone(),
                    password: Some(config.password.clone()),
                    file_name: format!("{}.xlsx", submitter),
                    file_content: content,
                    attachments: Vec::new(),
                })
            })
            .collect()
    }
}

#[async_trait]
impl TestCase for BatchSubmissionCase {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn execute(&mut self, ctx: &mut TestContext) -> TestResult {
        let clock = Stopwatch::start();
        let submissions = match self.prepare(&ctx.config) {
            Ok(submissions) => submissions,
            Err(e) => {
                return TestResult::fail(
                    &self.name,
                    format!("could not prepare submissions: {}", e),
                    clock.elapsed(),
                    e.to_string(),
                )
            }
        };

        let client = &ctx.client;
        let outcomes = batch::drive("submitting", submissions, self.concurrent, |i, submission| {
            async move {
                let submitter = submission.name.clone();
                let timed = client.submit_file(submission).await;
                SubmissionOutcome::from_timed(i + 1, submitter, timed)
            }
        })
        .await;

        let stats = BatchStats::from_outcomes(&outcomes);
        ctx.store.insert(
            Collection::Submissions,
            json!({
                "total_count": stats.total,
                "concurrent": self.concurrent,
                "success_count": stats.succeeded,
                "failed_count": stats.failed,
                "total_duration": batch::format_secs(stats.sum),
                "status": if self.tag.is_some() {
                    "concurrent_submission_test"
                } else {
                    "batch_submission_test"
                },
            }),
        );
        tracing::info!(
            total = stats.total,
            succeeded = stats.succeeded,
            concurrent = self.concurrent,
            "Batch finished"
        );

        TestResult::outcome(
            &self.name,
            stats.succeeded > 0,
            format!("{}/{} submissions succeeded", stats.succeeded, self.count),
            clock.elapsed(),
        )
        .with_details(stats.details(&outcomes, self.concurrent))
    }
}

pub struct ErrorHandlingCase {
    template: Arc<[u8]>,
}

impl ErrorHandlingCase {
    pub fn new(template: Arc<[u8]>) -> Self {
        Self { template }
    }

    fn scenarios(&self, config: &RunConfig) -> Vec<(&'static str, FileSubmission)> {
        let base = user_submission(config, "test.xlsx".to_string(), self.template.to_vec());

        let mut wrong_password = base.clone();
        wrong_password.password = Some(WRONG_PASSWORD.to_string());

        let mut too_long = base.clone();
        too_long.contact = "12345678901234567890".to_string();

        let mut too_short = base.clone();
        too_short.contact = "12".to_string();

        let mut invalid_file = base;
        invalid_file.file_name = "test.txt".to_string();
        invalid_file.file_content = b"invalid content".to_vec();

        vec![
            ("wrong password", wrong_password),
            ("contact too long", too_long),
            ("contact too short", too_short),
            ("invalid file", invalid_file),
        ]
    }
}

#[async_trait]
impl TestCase for ErrorHandlingCase {
    fn name(&self) -> &str {
        "Error handling"
    }

    fn description(&self) -> &str {
        "invalid submissions must be rejected"
    }

    async fn execute(&mut self, ctx: &mut TestContext) -> TestResult {
        let clock = Stopwatch::start();
        let mut results = Vec::new();

        for (label, submission) in self.scenarios(&ctx.config) {
            let timed = ctx.client.submit_file(submission).await;
            let rejected = !timed.is_ok();
            let error = if rejected {
                Value::from(timed.error_message())
            } else {
                Value::Null
            };
            tracing::debug!(scenario = label, rejected, "Error scenario");

            ctx.store.insert(
                Collection::Errors,
                json!({
                    "scenario": label,
                    "passed": rejected,
                    "error": error,
                    "status": "error_test",
                }),
            );
            results.push(json!({
                "scenario": label,
                "passed": rejected,
                "expected": "fail",
                "actual": if rejected { "fail" } else { "success" },
                "error": error,
            }));
        }

        let passed = results.iter().filter(|r| r["passed"] == true).count();
        TestResult::outcome(
            self.name(),
            passed > 0,
            format!("{}/{} scenarios rejected", passed, results.len()),
            clock.elapsed(),
        )
        .with_details(json!({
            "total_scenarios": results.len(),
            "passed_scenarios": passed,
            "failed_scenarios": results.len() - passed,
            "results": results,
        }))
    }
}

/// Report section describing the template
fn template_info(slug: &str, template: &[u8]) -> Value {
    let headers = read_headers(template).unwrap_or_default();
    json!({
        "filename": format!("template_{}.xlsx", slug),
        "header_count": headers.len(),
        "headers": headers,
    })
}

/// Run the file collection suite in order
pub async fn run_suite(ctx: &mut TestContext) -> SuiteReport {
    Runner::print_header("file collection", &ctx.config);
    let mut runner = Runner::new();

    let task_info = {
        let result = runner.run(&mut TaskInfoCase, ctx).await;
        if result.passed {
            result.response.clone()
        } else {
            None
        }
    };

    let mut download = TemplateDownloadCase::default();
    runner.run(&mut download, ctx).await;

    let mut extras = ReportExtras {
        task_info,
        ..Default::default()
    };

    match download.take_content() {
        Some(content) => {
            let template: Arc<[u8]> = content.into();
            extras.template_info = Some(template_info(&ctx.config.slug, &template));

            runner
                .run(&mut DataGenerationCase::new(template.clone()), ctx)
                .await;
            for attachment_count in [0, 1, 3] {
                runner
                    .run(
                        &mut FileSubmissionCase::new(template.clone(), attachment_count),
                        ctx,
                    )
                    .await;
            }

            let (count, concurrent) = (ctx.config.batch_count, ctx.config.concurrent);
            runner
                .run(
                    &mut BatchSubmissionCase::sequential(template.clone(), count),
                    ctx,
                )
                .await;
            runner
                .run(
                    &mut BatchSubmissionCase::concurrent(template.clone(), count, concurrent),
                    ctx,
                )
                .await;
            runner.run(&mut ErrorHandlingCase::new(template), ctx).await;
        }
        None => {
            tracing::warn!("No template available, skipping submission cases");
        }
    }

    SuiteReport {
        results: runner.into_results(),
        extras,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::FileConfig;
    use crate::datagen::sheet::read_rows;

    fn template() -> Arc<[u8]> {
        let generator = SheetGenerator::from_headers(vec![
            "姓名".to_string(),
            "手机".to_string(),
            "部门".to_string(),
        ]);
        generator.to_xlsx(&[], true).unwrap().into()
    }

    fn config() -> RunConfig {
        let mut config = RunConfig::from_file_config(&FileConfig::default(), "t1", "pw");
        config.row_count = 4;
        config
    }

    #[test]
    fn test_shifted_contact() {
        assert_eq!(shifted_contact("12345678901", 0), "12345678901");
        assert_eq!(shifted_contact("12345678901", 9), "12345678910");
        assert_eq!(shifted_contact("n/a", 3), "n/a");
    }

    #[test]
    fn test_attachment_prefers_spreadsheets() {
        let allowed = vec![".pdf".to_string(), ".XLSX".to_string()];
        let upload = attachment_for(&allowed, 2).unwrap().unwrap();
        assert_eq!(upload.file_name, "attachment_2.xlsx");
        assert_eq!(read_rows(&upload.content).unwrap()[0][0], "测试附件内容 2");

        let allowed = vec![".xls".to_string()];
        assert_eq!(
            attachment_for(&allowed, 1).unwrap().unwrap().file_name,
            "attachment_1.xls"
        );
    }

    #[test]
    fn test_attachment_falls_back_to_text() {
        let allowed = vec![".pdf".to_string(), ".doc".to_string()];
        let upload = attachment_for(&allowed, 1).unwrap().unwrap();
        assert_eq!(upload.file_name, "attachment_1.pdf");
        assert!(String::from_utf8(upload.content)
            .unwrap()
            .starts_with("测试附件内容 1\n"));

        assert!(attachment_for(&[], 1).unwrap().is_none());
    }

    #[test]
    fn test_batch_payloads() {
        let config = config();
        let case = BatchSubmissionCase::concurrent(template(), 3, 2);
        let payloads = case.prepare(&config).unwrap();
        assert_eq!(payloads.len(), 3);
        assert_eq!(payloads[0].name, "测试用户_async_1");
        assert_eq!(payloads[2].file_name, "测试用户_async_3.xlsx");
        assert_eq!(payloads[2].contact, "12345678903");
        assert_eq!(read_rows(&payloads[0].file_content).unwrap().len(), 4);

        let sequential = BatchSubmissionCase::sequential(template(), 2);
        assert_eq!(sequential.concurrent, 1);
        assert_eq!(sequential.prepare(&config).unwrap()[1].name, "测试用户_2");
    }

    #[test]
    fn test_error_scenarios() {
        let case = ErrorHandlingCase::new(template());
        let scenarios = case.scenarios(&config());
        assert_eq!(scenarios.len(), 4);
        assert_eq!(scenarios[0].1.password.as_deref(), Some(WRONG_PASSWORD));
        assert_eq!(scenarios[1].1.contact.len(), 20);
        assert_eq!(scenarios[2].1.contact, "12");
        assert_eq!(scenarios[3].1.file_name, "test.txt");
        assert_eq!(scenarios[3].1.file_content, b"invalid content");
    }

    #[test]
    fn test_template_info() {
        let info = template_info("t1", &template());
        assert_eq!(info["filename"], "template_t1.xlsx");
        assert_eq!(info["header_count"], 3);
        assert_eq!(info["headers"][1], "手机");
    }
}
