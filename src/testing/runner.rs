//! Sequential case executor with console progress

use colored::Colorize;

use super::case::{TestCase, TestContext};
use super::result::{Summary, TestResult};
use crate::common::config::RunConfig;

/// Runs cases in order and keeps their results
#[derive(Debug, Default)]
pub struct Runner {
    results: Vec<TestResult>,
}

impl Runner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Print the run banner
    pub fn print_header(title: &str, config: &RunConfig) {
        println!("\n{} {}", "Running Suite:".blue().bold(), title.white().bold());
        println!("  Base API: {}", config.base_api.dimmed());
        println!("  Slug:     {}", config.slug.dimmed());
        println!(
            "  Batch:    {} submissions, {} concurrent",
            config.batch_count, config.concurrent
        );
        println!("{}", "-".repeat(60).dimmed());
    }

    /// Execute one case and return its result
    pub async fn run(&mut self, case: &mut dyn TestCase, ctx: &mut TestContext) -> &TestResult {
        tracing::debug!(case = case.name(), "{}", case.description());
        let result = case.execute(ctx).await;
        tracing::info!(
            case = %result.name,
            passed = result.passed,
            duration_ms = result.duration.as_millis() as u64,
            "Case finished"
        );
        print_line(&result);

        let index = self.results.len();
        self.results.push(result);
        &self.results[index]
    }

    pub fn into_results(self) -> Vec<TestResult> {
        self.results
    }
}

fn print_line(result: &TestResult) {
    let duration = format!("({:.2}s)", result.duration.as_secs_f64());
    if result.passed {
        println!(
            "  {} {}: {} {}",
            "✓".green(),
            result.name,
            result.message.dimmed(),
            duration.dimmed()
        );
    } else {
        println!(
            "  {} {}: {} {}",
            "✗".red(),
            result.name.red(),
            result.message,
            duration.dimmed()
        );
        if let Some(error) = &result.error {
            println!("      {}", error.red().dimmed());
        }
    }
}

/// Print the final counts of a run
pub fn print_summary(results: &[TestResult]) {
    let summary = Summary::of(results);
    println!("\n{}", "=".repeat(60));
    println!("{}", "Summary".bold());
    println!("{}", "=".repeat(60));
    println!("  Total:     {}", summary.total);
    println!("  Passed:    {}", summary.passed.to_string().green());
    if summary.failed > 0 {
        println!("  Failed:    {}", summary.failed.to_string().red());
    } else {
        println!("  Failed:    {}", summary.failed);
    }
    println!("  Pass rate: {:.1}%", summary.pass_rate());
    println!("{}\n", "=".repeat(60));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::FileConfig;
    use crate::testing::store::Collection;
    use async_trait::async_trait;
    use std::time::Duration;

    struct Fixed {
        passed: bool,
    }

    #[async_trait]
    impl TestCase for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn description(&self) -> &str {
            "returns a fixed outcome"
        }

        async fn execute(&mut self, ctx: &mut TestContext) -> TestResult {
            ctx.store.insert(Collection::Submissions, serde_json::json!({}));
            TestResult::outcome(self.name(), self.passed, "done", Duration::from_millis(1))
        }
    }

    #[tokio::test]
    async fn test_runner_keeps_order() {
        let config = RunConfig::from_file_config(&FileConfig::default(), "s", "p");
        let mut ctx = TestContext::new(config).unwrap();
        let mut runner = Runner::new();

        assert!(runner.run(&mut Fixed { passed: true }, &mut ctx).await.passed);
        assert!(!runner.run(&mut Fixed { passed: false }, &mut ctx).await.passed);

        let results = runner.into_results();
        assert_eq!(results.len(), 2);
        assert!(results[0].passed);
        assert!(!results[1].passed);
        assert_eq!(ctx.store.count(Collection::Submissions), 2);
    }
}
