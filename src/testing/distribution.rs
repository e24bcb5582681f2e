//! Online form suite
//!
//! Exercises schema retrieval, attachment listing and download, row
//! generation, form submission with and without attachments, batch
//! submission and server-side validation of bad submissions.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};

use super::batch::{self, BatchStats, SubmissionOutcome};
use super::case::{Stopwatch, TestCase, TestContext};
use super::result::TestResult;
use super::runner::Runner;
use super::store::Collection;
use super::SuiteReport;
use crate::api::types::{AttachmentList, FormSubmitResponse, Schema};
use crate::api::{ApiClient, FormSubmission, Timed, Upload};
use crate::common::fsutil;
use crate::datagen::field::DEPARTMENTS;
use crate::datagen::form::is_empty;
use crate::datagen::{FormDataGenerator, SampleFiles, SampleKind};
use crate::report::ReportExtras;

/// Slug used to provoke an unknown-task rejection
pub const INVALID_SLUG: &str = "INVALID_SLUG";

/// Password used to provoke an authentication rejection
pub const WRONG_PASSWORD: &str = "wrong_password";

/// Fetch and validate the schema
///
/// Returns the raw body alongside the typed view so the report can show it.
async fn fetch_schema(client: &ApiClient) -> (Timed<Value>, Result<Schema, String>) {
    let timed = client.get_schema().await;
    let schema = match &timed.outcome {
        Ok(body) => serde_json::from_value::<Schema>(body.clone())
            .map_err(|e| format!("schema format validation failed: {}", e)),
        Err(failure) => Err(failure.to_string()),
    };
    (timed, schema)
}

/// Base submission carrying the configured test user
fn user_submission(ctx: &TestContext, row: Option<Value>) -> FormSubmission {
    let user = &ctx.config.user;
    FormSubmission {
        name: Some(user.name.clone()),
        contact: Some(user.contact.clone()),
        department: Some(user.department.clone()),
        json_data: row,
        password: Some(ctx.config.password.clone()),
        ..Default::default()
    }
}

pub struct SchemaCase;

#[async_trait]
impl TestCase for SchemaCase {
    fn name(&self) -> &str {
        "Schema retrieval"
    }

    fn description(&self) -> &str {
        "fetch the column schema of the form"
    }

    async fn execute(&mut self, ctx: &mut TestContext) -> TestResult {
        let (timed, schema) = fetch_schema(&ctx.client).await;
        let duration = timed.duration;
        match (timed.outcome, schema) {
            (Ok(body), Ok(schema)) => TestResult::pass(self.name(), "schema retrieved", duration)
                .with_details(json!({
                    "title": schema.title,
                    "column_count": schema.columns.len(),
                    "allow_attachment": schema.allow_attachment_upload,
                }))
                .with_response(body),
            (Ok(body), Err(e)) => {
                TestResult::fail(self.name(), "schema retrieval failed", duration, e)
                    .with_response(body)
            }
            (Err(failure), _) => TestResult::fail(
                self.name(),
                "schema retrieval failed",
                duration,
                failure.to_string(),
            ),
        }
    }
}

pub struct AttachmentListCase;

#[async_trait]
impl TestCase for AttachmentListCase {
    fn name(&self) -> &str {
        "Attachment list"
    }

    fn description(&self) -> &str {
        "fetch the attachments published with the task"
    }

    async fn execute(&mut self, ctx: &mut TestContext) -> TestResult {
        let timed = ctx.client.get_attachments().await;
        let duration = timed.duration;
        let body = match timed.outcome {
            Ok(body) => body,
            Err(failure) => {
                return TestResult::fail(
                    self.name(),
                    "attachment list failed",
                    duration,
                    failure.to_string(),
                )
            }
        };

        match serde_json::from_value::<AttachmentList>(body.clone()) {
            Ok(list) => {
                let attachments: Vec<Value> = list
                    .attachments
                    .iter()
                    .map(|a| {
                        json!({
                            "id": a.id,
                            "file_name": a.file_name,
                            "display_name": a.display_name,
                            "file_size": a.file_size,
                        })
                    })
                    .collect();
                TestResult::pass(
                    self.name(),
                    format!("{} attachment(s) listed", attachments.len()),
                    duration,
                )
                .with_details(json!({
                    "attachment_count": attachments.len(),
                    "attachments": attachments,
                }))
                .with_response(body)
            }
            Err(e) => TestResult::fail(
                self.name(),
                "attachment list failed",
                duration,
                format!("response format validation failed: {}", e),
            )
            .with_response(body),
        }
    }
}

pub struct AttachmentDownloadCase;

#[async_trait]
impl TestCase for AttachmentDownloadCase {
    fn name(&self) -> &str {
        "Attachment download"
    }

    fn description(&self) -> &str {
        "download every published attachment"
    }

    async fn execute(&mut self, ctx: &mut TestContext) -> TestResult {
        let clock = Stopwatch::start();
        let listed = ctx.client.get_attachments().await;
        let list = match listed.outcome {
            Ok(body) => serde_json::from_value::<AttachmentList>(body)
                .map_err(|e| format!("response format validation failed: {}", e)),
            Err(failure) => Err(failure.to_string()),
        };
        let attachments = match list {
            Ok(list) => list.attachments,
            Err(e) => {
                return TestResult::fail(
                    self.name(),
                    "could not list attachments",
                    clock.elapsed(),
                    e,
                )
            }
        };

        if attachments.is_empty() {
            return TestResult::pass(
                self.name(),
                "task has no attachments, download skipped",
                clock.elapsed(),
            )
            .with_details(json!({ "attachment_count": 0 }));
        }

        let mut downloads = Vec::with_capacity(attachments.len());
        let mut total = std::time::Duration::ZERO;
        for attachment in &attachments {
            let file_name = attachment.save_name();
            let timed = ctx.client.download_attachment(&attachment.id_segment()).await;
            total += timed.duration;

            let entry = match timed.outcome {
                Ok(content) if !content.is_empty() => {
                    let path = ctx.config.downloads_dir.join(&file_name);
                    match fsutil::save_file(&path, &content) {
                        Ok(_) => json!({
                            "id": attachment.id,
                            "file_name": file_name,
                            "size": content.len(),
                            "status": "success",
                        }),
                        Err(e) => json!({
                            "id": attachment.id,
                            "file_name": file_name,
                            "size": content.len(),
                            "status": "failed",
                            "error": e.to_string(),
                        }),
                    }
                }
                Ok(_) => json!({
                    "id": attachment.id,
                    "file_name": file_name,
                    "size": 0,
                    "status": "failed",
                    "error": "empty download",
                }),
                Err(failure) => json!({
                    "id": attachment.id,
                    "file_name": file_name,
                    "size": 0,
                    "status": "failed",
                    "error": failure.error,
                }),
            };
            ctx.store.insert(Collection::Attachments, entry.clone());
            downloads.push(entry);
        }

        let succeeded = downloads.iter().filter(|d| d["status"] == "success").count();
        TestResult::outcome(
            self.name(),
            succeeded == downloads.len(),
            format!("downloaded {}/{} attachment(s)", succeeded, downloads.len()),
            total,
        )
        .with_details(json!({
            "total_attachments": attachments.len(),
            "successful_downloads": succeeded,
            "failed_downloads": downloads.len() - succeeded,
            "downloads": downloads,
        }))
    }
}

pub struct DataGenerationCase {
    schema: Schema,
    rng: StdRng,
}

impl DataGenerationCase {
    pub fn new(schema: Schema) -> Self {
        Self::with_rng(schema, StdRng::from_entropy())
    }

    pub fn with_rng(schema: Schema, rng: StdRng) -> Self {
        Self { schema, rng }
    }
}

#[async_trait]
impl TestCase for DataGenerationCase {
    fn name(&self) -> &str {
        "Data generation"
    }

    fn description(&self) -> &str {
        "generate a row for the schema and validate it"
    }

    async fn execute(&mut self, _ctx: &mut TestContext) -> TestResult {
        let clock = Stopwatch::start();
        let rng = StdRng::from_rng(&mut self.rng).unwrap_or_else(|_| StdRng::from_entropy());
        let mut generator = FormDataGenerator::with_rng(&self.schema, rng);
        let row = generator.row();

        let validation: Vec<Value> = self
            .schema
            .columns
            .iter()
            .map(|column| match row.get(&column.name) {
                None => json!({
                    "field": column.name,
                    "status": "failed",
                    "reason": "field missing",
                }),
                Some(value) if column.required && is_empty(value) => json!({
                    "field": column.name,
                    "status": "failed",
                    "reason": "required field empty",
                }),
                Some(value) => json!({
                    "field": column.name,
                    "status": "success",
                    "type": column.kind,
                    "value": value,
                }),
            })
            .collect();

        let valid = validation.iter().all(|v| v["status"] == "success");
        let message = if valid {
            "row generated"
        } else {
            "generated row failed validation"
        };
        TestResult::outcome(self.name(), valid, message, clock.elapsed()).with_details(json!({
            "generated_data": row,
            "validation": validation,
        }))
    }
}

/// Single form submission with a fixed number of image attachments
pub struct FormSubmissionCase {
    name: String,
    description: String,
    attachment_count: usize,
    files: SampleFiles,
}

impl FormSubmissionCase {
    pub fn new(attachment_count: usize) -> Self {
        let (name, description) = match attachment_count {
            0 => (
                "Form submission (no attachments)",
                "submit a form row without attachments",
            ),
            1 => (
                "Form submission (single attachment)",
                "submit a form row with one attachment",
            ),
            _ => (
                "Form submission (multiple attachments)",
                "submit a form row with several attachments",
            ),
        };
        Self {
            name: name.to_string(),
            description: description.to_string(),
            attachment_count,
            files: SampleFiles::new(),
        }
    }

    /// `test_<n>.png` / `test_<n>.jpg` images of 10 to 50 KiB
    fn attachments(&mut self) -> crate::common::Result<Vec<Upload>> {
        (1..=self.attachment_count)
            .map(|i| -> crate::common::Result<Upload> {
                let kind = if self.files.random_size(0, 1) == 0 {
                    SampleKind::Png
                } else {
                    SampleKind::Jpg
                };
                let size = self.files.random_size(10 * 1024, 50 * 1024);
                let content = self.files.generate(kind, size)?;
                Ok(Upload::new(format!("test_{}.{}", i, kind.extension()), content))
            })
            .collect()
    }
}

#[async_trait]
impl TestCase for FormSubmissionCase {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn execute(&mut self, ctx: &mut TestContext) -> TestResult {
        let clock = Stopwatch::start();
        let schema = match fetch_schema(&ctx.client).await.1 {
            Ok(schema) => schema,
            Err(e) => {
                return TestResult::fail(&self.name, "could not fetch schema", clock.elapsed(), e)
            }
        };

        let row = Value::Object(FormDataGenerator::new(&schema).row());
        let attachments = match self.attachments() {
            Ok(attachments) => attachments,
            Err(e) => {
                return TestResult::fail(
                    &self.name,
                    "could not generate attachments",
                    clock.elapsed(),
                    e.to_string(),
                )
            }
        };

        let mut submission = user_submission(ctx, Some(row.clone()));
        submission.attachments = attachments;

        let timed = ctx.client.submit_form(submission).await;
        let duration = timed.duration;
        let body = match timed.outcome {
            Ok(body) => body,
            Err(failure) => {
                return TestResult::fail(
                    &self.name,
                    "form submission failed",
                    duration,
                    failure.to_string(),
                )
            }
        };

        let accepted = match serde_json::from_value::<FormSubmitResponse>(body.clone()) {
            Ok(accepted) => accepted,
            Err(e) => {
                return TestResult::fail(
                    &self.name,
                    "form submission failed",
                    duration,
                    format!("response format validation failed: {}", e),
                )
                .with_response(body)
            }
        };

        let user = &ctx.config.user;
        ctx.store.insert(
            Collection::Submissions,
            json!({
                "name": user.name,
                "contact": user.contact,
                "department": user.department,
                "data": row,
                "attachment_count": self.attachment_count,
                "status": "success",
                "response": body,
            }),
        );

        TestResult::pass(&self.name, format!("form submitted: {}", accepted.message), duration)
            .with_details(json!({
                "submitter": accepted.submitter,
                "contact": accepted.contact,
                "department": accepted.department,
                "filename": accepted.filename,
                "attachment_count": accepted.attachment_count,
            }))
            .with_response(body)
    }
}

/// `count` submissions with `concurrent` in flight
pub struct BatchSubmissionCase {
    name: String,
    count: usize,
    concurrent: usize,
    rng: StdRng,
}

impl BatchSubmissionCase {
    pub fn new(count: usize, concurrent: usize) -> Self {
        Self {
            name: format!(
                "Batch submission ({} submissions, {} concurrent)",
                count, concurrent
            ),
            count,
            concurrent: concurrent.max(1),
            rng: StdRng::from_entropy(),
        }
    }

    fn prepare(&mut self, schema: &Schema, password: &str) -> Vec<FormSubmission> {
        let rng = StdRng::from_rng(&mut self.rng).unwrap_or_else(|_| StdRng::from_entropy());
        let mut generator = FormDataGenerator::with_rng(schema, rng);
        (1..=self.count)
            .map(|i| FormSubmission {
                name: Some(format!("测试用户{}", i)),
                contact: Some(self.rng.gen_range(10_000_000_000u64..=99_999_999_999).to_string()),
                department: DEPARTMENTS.choose(&mut self.rng).map(|d| d.to_string()),
                json_data: Some(Value::Object(generator.row())),
                password: Some(password.to_string()),
                ..Default::default()
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
        "submit many generated rows with bounded parallelism"
    }

    async fn execute(&mut self, ctx: &mut TestContext) -> TestResult {
        let clock = Stopwatch::start();
        let schema = match fetch_schema(&ctx.client).await.1 {
            Ok(schema) => schema,
            Err(e) => {
                return TestResult::fail(&self.name, "could not fetch schema", clock.elapsed(), e)
            }
        };

        let submissions = self.prepare(&schema, &ctx.config.password);
        let sent = submissions.clone();

        let client = &ctx.client;
        let outcomes = batch::drive("submitting", submissions, self.concurrent, |i, submission| {
            async move {
                let submitter = submission.name.clone().unwrap_or_default();
                let timed = client.submit_form(submission).await;
                SubmissionOutcome::from_timed(i + 1, submitter, timed)
            }
        })
        .await;

        for outcome in outcomes.iter().filter(|o| o.success) {
            let Some(submission) = sent.get(outcome.index - 1) else {
                continue;
            };
            ctx.store.insert(
                Collection::Submissions,
                json!({
                    "name": outcome.submitter,
                    "contact": submission.contact,
                    "department": submission.department,
                    "data": submission.json_data,
                    "attachment_count": 0,
                    "status": "success",
                    "response": outcome.response,
                }),
            );
        }

        let stats = BatchStats::from_outcomes(&outcomes);
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

/// One deliberately invalid submission
struct Scenario {
    label: &'static str,
    submission: FormSubmission,
}

impl Scenario {
    fn derive(base: &FormSubmission, label: &'static str, edit: fn(&mut FormSubmission)) -> Self {
        let mut submission = base.clone();
        edit(&mut submission);
        Self { label, submission }
    }
}

pub struct ErrorHandlingCase;

impl ErrorHandlingCase {
    fn scenarios(ctx: &TestContext, row: Value) -> Vec<Scenario> {
        let base = user_submission(ctx, Some(row));
        vec![
            Scenario::derive(&base, "invalid password", |s| {
                s.password = Some(WRONG_PASSWORD.to_string())
            }),
            Scenario::derive(&base, "invalid slug", |s| s.slug = Some(INVALID_SLUG.to_string())),
            Scenario::derive(&base, "missing name", |s| s.name = None),
            Scenario::derive(&base, "missing contact", |s| s.contact = None),
            Scenario::derive(&base, "contact too short", |s| s.contact = Some("12".to_string())),
            Scenario::derive(&base, "contact too long", |s| {
                s.contact = Some("123456789012345".to_string())
            }),
            Scenario::derive(&base, "missing form data", |s| s.json_data = None),
            Scenario::derive(&base, "empty form data", |s| s.json_data = Some(json!({}))),
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
        let schema = match fetch_schema(&ctx.client).await.1 {
            Ok(schema) => schema,
            Err(e) => {
                return TestResult::fail(self.name(), "could not fetch schema", clock.elapsed(), e)
            }
        };
        let row = Value::Object(FormDataGenerator::new(&schema).row());

        let mut results = Vec::new();
        for scenario in Self::scenarios(ctx, row) {
            let timed = ctx.client.submit_form(scenario.submission).await;
            let rejected = !timed.is_ok();
            let error = if rejected {
                Value::from(timed.error_message())
            } else {
                Value::Null
            };
            tracing::debug!(scenario = scenario.label, rejected, "Error scenario");

            ctx.store.insert(
                Collection::Errors,
                json!({
                    "scenario": scenario.label,
                    "passed": rejected,
                    "error": error,
                    "status": "error_test",
                }),
            );
            results.push(json!({
                "scenario": scenario.label,
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

/// Run the online form suite in order
pub async fn run_suite(ctx: &mut TestContext) -> SuiteReport {
    Runner::print_header("online form", &ctx.config);
    let mut runner = Runner::new();

    runner.run(&mut SchemaCase, ctx).await;
    runner.run(&mut AttachmentListCase, ctx).await;
    runner.run(&mut AttachmentDownloadCase, ctx).await;

    let (timed, schema) = fetch_schema(&ctx.client).await;
    if let Ok(schema) = schema.clone() {
        runner.run(&mut DataGenerationCase::new(schema), ctx).await;
    }

    for attachment_count in [0, 1, 3] {
        runner
            .run(&mut FormSubmissionCase::new(attachment_count), ctx)
            .await;
    }

    let (count, concurrent) = (ctx.config.batch_count, ctx.config.concurrent);
    runner
        .run(&mut BatchSubmissionCase::new(count, concurrent), ctx)
        .await;
    runner.run(&mut ErrorHandlingCase, ctx).await;

    SuiteReport {
        results: runner.into_results(),
        extras: ReportExtras {
            schema: schema.ok().and(timed.outcome.ok()),
            ..Default::default()
        },
    }
}
