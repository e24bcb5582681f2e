//! End-to-end test suites
//!
//! Each suite is a fixed sequence of [`TestCase`]s run by the [`Runner`]
//! against a shared [`TestContext`]. Failures of the service under test
//! are recorded as failed [`TestResult`]s, never as errors.

pub mod batch;
mod case;
pub mod collection;
pub mod distribution;
mod result;
mod runner;
pub mod store;

pub use case::{TestCase, TestContext};
pub use result::{Summary, TestResult};
pub use runner::{print_summary, Runner};
pub use store::{Collection, RecordStore};

use crate::report::ReportExtras;

/// Results of one suite run plus the extra report sections it gathered
#[derive(Debug)]
pub struct SuiteReport {
    pub results: Vec<TestResult>,
    pub extras: ReportExtras,
}

impl SuiteReport {
    pub fn summary(&self) -> Summary {
        Summary::of(&self.results)
    }
}
