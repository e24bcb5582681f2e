//! collect-e2e - End-to-end test harness for form distribution and file
//! collection tasks
//!
//! This library generates synthetic form rows, workbooks and attachments,
//! drives the service's REST endpoints and reports the outcomes.

pub mod api;
pub mod cli;
pub mod commands;
pub mod common;
pub mod datagen;
pub mod report;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use testing::{SuiteReport, TestContext, TestResult};
