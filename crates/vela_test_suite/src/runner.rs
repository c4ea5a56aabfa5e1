//! Test runner for executing scenario suites
//!
//! Each case gets a fresh [`TestContext`]. A case fails if it returns an
//! error or panics.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use crate::harness::{TestContext, TestResult};

type CaseFn = Box<dyn FnOnce(&mut TestContext) -> anyhow::Result<()>>;

/// A single scenario
pub struct TestCase {
    pub name: String,
    pub category: String,
    pub test_fn: CaseFn,
}

impl TestCase {
    pub fn new<F>(name: &str, category: &str, test_fn: F) -> Self
    where
        F: FnOnce(&mut TestContext) -> anyhow::Result<()> + 'static,
    {
        Self {
            name: name.to_string(),
            category: category.to_string(),
            test_fn: Box::new(test_fn),
        }
    }
}

/// Result of running a scenario
pub struct TestRun {
    pub name: String,
    pub category: String,
    pub result: TestResult,
    pub duration: Duration,
}

impl TestRun {
    pub fn is_passed(&self) -> bool {
        self.result.is_passed()
    }
}

/// Named group of scenarios
pub struct TestSuite {
    pub name: String,
    pub cases: Vec<TestCase>,
}

impl TestSuite {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            cases: Vec::new(),
        }
    }

    pub fn add<F>(&mut self, name: &str, test_fn: F) -> &mut Self
    where
        F: FnOnce(&mut TestContext) -> anyhow::Result<()> + 'static,
    {
        self.cases.push(TestCase::new(name, &self.name, test_fn));
        self
    }
}

/// Runs suites and collects results
#[derive(Default)]
pub struct TestRunner {
    suites: Vec<TestSuite>,
    filter: Option<String>,
}

impl TestRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_suite(&mut self, suite: TestSuite) -> &mut Self {
        self.suites.push(suite);
        self
    }

    /// Only run cases whose name or category contains `pattern`
    pub fn filter(&mut self, pattern: &str) -> &mut Self {
        self.filter = Some(pattern.to_string());
        self
    }

    pub fn run(&mut self) -> RunResult {
        let start = Instant::now();
        let mut results = Vec::new();

        for suite in self.suites.drain(..) {
            tracing::info!("Running suite: {}", suite.name);

            for case in suite.cases {
                if let Some(ref pattern) = self.filter {
                    if !case.name.contains(pattern) && !case.category.contains(pattern) {
                        continue;
                    }
                }

                let test_start = Instant::now();
                let full_name = format!("{}::{}", case.category, case.name);
                tracing::debug!("Running test: {}", full_name);

                let result = run_case(case.test_fn);
                let duration = test_start.elapsed();

                match &result {
                    TestResult::Passed => tracing::info!("  ✓ {} ({:?})", case.name, duration),
                    TestResult::Failed { reason } => {
                        tracing::error!("  ✗ {} ({:?}): {}", case.name, duration, reason)
                    }
                }

                results.push(TestRun {
                    name: case.name,
                    category: case.category,
                    result,
                    duration,
                });
            }
        }

        RunResult::new(results, start.elapsed())
    }
}

fn run_case(test_fn: CaseFn) -> TestResult {
    let outcome = panic::catch_unwind(AssertUnwindSafe(move || {
        let mut ctx = TestContext::new();
        test_fn(&mut ctx)
    }));
    match outcome {
        Ok(Ok(())) => TestResult::Passed,
        Ok(Err(err)) => TestResult::Failed {
            reason: format!("{err:#}"),
        },
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "panicked".to_string());
            TestResult::Failed { reason }
        }
    }
}

/// Results from running suites
pub struct RunResult {
    pub results: Vec<TestRun>,
    pub duration: Duration,
}

impl RunResult {
    pub fn new(results: Vec<TestRun>, duration: Duration) -> Self {
        Self { results, duration }
    }

    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.is_passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| !r.is_passed()).count()
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.is_passed())
    }

    /// Names and reasons of failed cases
    pub fn failures(&self) -> Vec<String> {
        self.results
            .iter()
            .filter_map(|run| match &run.result {
                TestResult::Failed { reason } => {
                    Some(format!("{}::{}: {}", run.category, run.name, reason))
                }
                TestResult::Passed => None,
            })
            .collect()
    }

    pub fn by_category(&self) -> HashMap<String, Vec<&TestRun>> {
        let mut map: HashMap<String, Vec<&TestRun>> = HashMap::new();
        for result in &self.results {
            map.entry(result.category.clone()).or_default().push(result);
        }
        map
    }

    pub fn print_summary(&self) {
        println!("\n=== Scenario results ===");
        println!("  Passed:  {:>5}", self.passed());
        println!("  Failed:  {:>5}", self.failed());
        println!("  Total:   {:>5}", self.total());
        println!("  Time:    {:>8.2?}", self.duration);

        if self.failed() > 0 {
            println!("\nFailed tests:");
            for failure in self.failures() {
                println!("  ✗ {failure}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runner_reports_failures() {
        let mut suite = TestSuite::new("runner");
        suite
            .add("ok", |_| Ok(()))
            .add("err", |_| anyhow::bail!("boom"))
            .add("panics", |_| panic!("kaboom"));

        let mut runner = TestRunner::new();
        runner.add_suite(suite);
        let result = runner.run();

        assert_eq!(result.passed(), 1);
        assert_eq!(result.failed(), 2);
        let failures = result.failures();
        assert!(failures[0].contains("boom"));
        assert!(failures[1].contains("kaboom"));
    }

    #[test]
    fn test_filter() {
        let mut suite = TestSuite::new("runner");
        suite.add("alpha", |_| Ok(())).add("beta", |_| Ok(()));

        let mut runner = TestRunner::new();
        runner.add_suite(suite).filter("beta");
        assert_eq!(runner.run().total(), 1);
    }
}
