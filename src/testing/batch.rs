//! Bounded-parallelism submission driver
//!
//! Fires one job per prepared payload with at most `concurrency` requests
//! in flight and aggregates the outcomes.

use std::future::Future;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{json, Value};

use crate::api::Timed;

/// Number of per-submission entries kept in report details
pub const DETAIL_LIMIT: usize = 10;

/// Outcome of one submission in a batch
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    /// 1-based position in the batch
    pub index: usize,
    pub submitter: String,
    pub success: bool,
    pub duration: Duration,
    /// Stored file name reported by the service
    pub filename: Option<String>,
    pub error: Option<String>,
    pub response: Option<Value>,
}

impl SubmissionOutcome {
    pub fn from_timed(index: usize, submitter: impl Into<String>, timed: Timed<Value>) -> Self {
        let duration = timed.duration;
        match timed.outcome {
            Ok(body) => Self {
                index,
                submitter: submitter.into(),
                success: true,
                duration,
                filename: body
                    .get("filename")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                error: None,
                response: Some(body),
            },
            Err(failure) => Self {
                index,
                submitter: submitter.into(),
                success: false,
                duration,
                filename: None,
                error: Some(failure.error),
                response: None,
            },
        }
    }

    pub fn to_value(&self) -> Value {
        let mut value = json!({
            "index": self.index,
            "submitter": self.submitter,
            "status": if self.success { "success" } else { "failed" },
            "duration": format_secs(self.duration),
        });
        if let Some(filename) = &self.filename {
            value["filename"] = Value::from(filename.as_str());
        }
        if let Some(error) = &self.error {
            value["error"] = Value::from(error.as_str());
        }
        value
    }
}

/// Run `job` over `items` with at most `concurrency` jobs in flight
///
/// Outcomes are returned ordered by their `index`. A progress bar is shown on
/// terminals.
pub async fn drive<T, F, Fut>(
    label: &str,
    items: Vec<T>,
    concurrency: usize,
    job: F,
) -> Vec<SubmissionOutcome>
where
    F: Fn(usize, T) -> Fut,
    Fut: Future<Output = SubmissionOutcome>,
{
    let progress = ProgressBar::new(items.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("  {msg} [{bar:40.cyan/blue}] {pos}/{len} ({elapsed})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    progress.set_message(label.to_string());

    let mut outcomes: Vec<SubmissionOutcome> = stream::iter(items.into_iter().enumerate())
        .map(|(i, item)| job(i, item))
        .buffer_unordered(concurrency.max(1))
        .inspect(|_| progress.inc(1))
        .collect()
        .await;

    progress.finish_and_clear();
    outcomes.sort_by_key(|o| o.index);
    outcomes
}

/// Aggregate statistics of a batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchStats {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub avg: Duration,
    pub max: Duration,
    pub min: Duration,
    /// Sum of per-request durations
    pub sum: Duration,
}

impl BatchStats {
    pub fn from_outcomes(outcomes: &[SubmissionOutcome]) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.success).count();
        let sum: Duration = outcomes.iter().map(|o| o.duration).sum();
        let avg = if outcomes.is_empty() {
            Duration::ZERO
        } else {
            sum / outcomes.len() as u32
        };
        Self {
            total: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
            avg,
            max: outcomes.iter().map(|o| o.duration).max().unwrap_or_default(),
            min: outcomes.iter().map(|o| o.duration).min().unwrap_or_default(),
            sum,
        }
    }

    /// Success rate in percent
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.succeeded as f64 / self.total as f64 * 100.0
        }
    }

    /// Report details including the first outcomes
    pub fn details(&self, outcomes: &[SubmissionOutcome], concurrency: usize) -> Value {
        json!({
            "total_submissions": self.total,
            "successful_submissions": self.succeeded,
            "failed_submissions": self.failed,
            "success_rate": format!("{:.1}%", self.success_rate()),
            "concurrent": concurrency,
            "average_duration": format_secs(self.avg),
            "max_duration": format_secs(self.max),
            "min_duration": format_secs(self.min),
            "results": outcomes
                .iter()
                .take(DETAIL_LIMIT)
                .map(SubmissionOutcome::to_value)
                .collect::<Vec<_>>(),
        })
    }
}

/// Seconds with two decimals, e.g. `0.37s`
pub fn format_secs(duration: Duration) -> String {
    format!("{:.2}s", duration.as_secs_f64())
}
