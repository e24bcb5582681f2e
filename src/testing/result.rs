//! Outcome of a single test case

use std::time::Duration;

use chrono::{DateTime, Local};
use serde_json::Value;

/// Result of a test case
#[derive(Debug, Clone)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub message: String,
    pub duration: Duration,
    /// Raw response body, shown as JSON in the report
    pub response: Option<Value>,
    pub error: Option<String>,
    /// Structured details, rendered as nested bullet lists
    pub details: Option<Value>,
    pub finished_at: DateTime<Local>,
}

impl TestResult {
    pub fn pass(name: impl Into<String>, message: impl Into<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            passed: true,
            message: message.into(),
            duration,
            response: None,
            error: None,
            details: None,
            finished_at: Local::now(),
        }
    }

    pub fn fail(
        name: impl Into<String>,
        message: impl Into<String>,
        duration: Duration,
        error: impl Into<String>,
    ) -> Self {
        Self {
            passed: false,
            error: Some(error.into()),
            ..Self::pass(name, message, duration)
        }
    }

    /// Pass or fail depending on `passed`, without an error text
    pub fn outcome(
        name: impl Into<String>,
        passed: bool,
        message: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            passed,
            ..Self::pass(name, message, duration)
        }
    }

    pub fn with_response(mut self, response: Value) -> Self {
        self.response = Some(response);
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Status word for console and report
    pub fn status(&self) -> &'static str {
        if self.passed {
            "passed"
        } else {
            "failed"
        }
    }
}

/// Summary counts over a set of results
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

impl Summary {
    pub fn of(results: &[TestResult]) -> Self {
        let passed = results.iter().filter(|r| r.passed).count();
        Self {
            total: results.len(),
            passed,
            failed: results.len() - passed,
        }
    }

    /// Pass rate in percent, 0 for an empty run
    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.passed as f64 / self.total as f64 * 100.0
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_keeps_error() {
        let r = TestResult::fail("case", "broken", Duration::from_millis(5), "HTTP 500");
        assert!(!r.passed);
        assert_eq!(r.error.as_deref(), Some("HTTP 500"));
        assert_eq!(r.status(), "failed");
    }

    #[test]
    fn test_summary() {
        let results = vec![
            TestResult::pass("a", "", Duration::ZERO),
            TestResult::fail("b", "", Duration::ZERO, "x"),
            TestResult::pass("c", "", Duration::ZERO),
        ];
        let summary = Summary::of(&results);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.failed, 1);
        assert!((summary.pass_rate() - 66.666).abs() < 0.01);
        assert!(!summary.all_passed());

        assert_eq!(Summary::of(&[]).pass_rate(), 0.0);
    }
}
