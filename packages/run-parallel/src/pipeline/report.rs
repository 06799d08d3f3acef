//! Outcome reporting
//!
//! Status words for individual tests and the end-of-run summary lines.

use serde::{Deserialize, Serialize};

use crate::config::RunParallelConfig;
use crate::features::parallel_exec::{TestResult, TestSignal};
use crate::pipeline::planner::PlannedTest;

/// Environment variable named in the summary hint
const VERBOSE_ENV: &str = "RUN_PARALLEL_VERBOSE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestOutcome {
    Passed,
    Failed,
    Skipped,
}

impl TestOutcome {
    pub fn of(result: &TestResult) -> Self {
        match result {
            Ok(()) | Err(TestSignal::Warning(_)) => TestOutcome::Passed,
            Err(TestSignal::Skip(_)) => TestOutcome::Skipped,
            Err(TestSignal::Failure(_)) | Err(TestSignal::Error(_)) => TestOutcome::Failed,
        }
    }
}

/// What the runner records about a test for reporting
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestProperties {
    /// Worker count, present only for tests run through the harness
    pub n_threads: Option<usize>,
    pub thread_unsafe_reason: Option<String>,
}

/// Report category, progress letter and verbose word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestStatus {
    pub category: &'static str,
    pub letter: &'static str,
    pub word: String,
}

impl TestStatus {
    fn new(category: &'static str, letter: &'static str, word: impl Into<String>) -> Self {
        Self {
            category,
            letter,
            word: word.into(),
        }
    }
}

/// Status override for a finished test, `None` keeps the runner's default
pub fn test_status(props: &TestProperties, outcome: TestOutcome) -> Option<TestStatus> {
    match (props.n_threads, &props.thread_unsafe_reason, outcome) {
        (Some(n), _, TestOutcome::Passed) if n > 1 => {
            Some(TestStatus::new("passed", "·", "PARALLEL PASSED"))
        }
        (Some(n), _, TestOutcome::Failed) if n > 1 => {
            Some(TestStatus::new("error", "e", "PARALLEL FAILED"))
        }
        (Some(n), _, _) if n > 1 => None,
        (_, Some(reason), TestOutcome::Passed) => Some(TestStatus::new(
            "passed",
            ".",
            format!("PASSED [thread-unsafe]: {}", reason),
        )),
        (_, Some(reason), TestOutcome::Failed) => Some(TestStatus::new(
            "failed",
            "x",
            format!("FAILED ([thread-unsafe]: {})", reason),
        )),
        _ => None,
    }
}

pub fn collection_summary(planned: &[PlannedTest]) -> String {
    let parallel = planned.iter().filter(|test| test.is_parallel()).count();
    format!("Collected {} items to run in parallel", parallel)
}

/// End-of-run accounting of tests that lost their parallel status
#[derive(Debug, Clone)]
pub struct RunSummary {
    configured_workers: usize,
    skip_thread_unsafe: bool,
    verbose: bool,
    num_serial: usize,
    num_skipped: usize,
    listing: Vec<String>,
}

impl RunSummary {
    pub fn new(config: &RunParallelConfig) -> Self {
        Self {
            configured_workers: config.parallel_threads.resolve(),
            skip_thread_unsafe: config.skip_thread_unsafe,
            verbose: config.verbose,
            num_serial: 0,
            num_skipped: 0,
            listing: Vec::new(),
        }
    }

    /// Account for one planned test once it has been run (or skipped)
    pub fn record(&mut self, test: &PlannedTest) {
        if test.skip.is_some() {
            if test.thread_unsafe_reason.is_some() {
                self.num_skipped += 1;
            }
            return;
        }
        if test.plan.worker_count() > 1 {
            return;
        }

        self.num_serial += 1;
        if self.verbose {
            match &test.thread_unsafe_reason {
                Some(reason) => self
                    .listing
                    .push(format!("{} skipped with reason: \"{}\"", test.id, reason)),
                None => self.listing.push(test.id.clone()),
            }
        }
    }

    pub fn num_serial(&self) -> usize {
        self.num_serial
    }

    pub fn num_skipped(&self) -> usize {
        self.num_skipped
    }

    pub fn lines(&self) -> Vec<String> {
        let parallel_run = self.configured_workers > 1;
        let mut lines = Vec::new();

        if parallel_run {
            lines.push(format!("{:*^72}", " run-parallel report "));
        }
        lines.extend(self.listing.iter().cloned());

        if parallel_run && !self.verbose && self.num_serial + self.num_skipped > 0 {
            let (what, num) = if self.skip_thread_unsafe {
                ("skipped", self.num_skipped)
            } else {
                ("not run in parallel", self.num_serial)
            };
            lines.push(format!(
                "{} tests were {} because of use of thread-unsafe functionality, \
                 to list the tests that were {}, re-run while setting {}=1 \
                 in your shell environment",
                num, what, what, VERBOSE_ENV
            ));
        }
        if parallel_run && self.num_serial == 0 && self.num_skipped == 0 {
            lines.push("All tests were run in parallel! 🎉".to_string());
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkerCount;
    use crate::features::parallel_exec::ExecutionPlan;
    use pretty_assertions::assert_eq;

    fn planned(id: &str, workers: usize, reason: Option<&str>, skip: bool) -> PlannedTest {
        let plan = ExecutionPlan::new(workers, 1);
        PlannedTest {
            id: id.to_string(),
            plan,
            skip: skip.then(|| format!("Thread unsafe: {}", reason.unwrap_or_default())),
            thread_unsafe_reason: reason.map(str::to_string),
            wrapped: plan.needs_wrapping(),
        }
    }

    fn config(verbose: bool, skip: bool) -> RunParallelConfig {
        RunParallelConfig {
            parallel_threads: WorkerCount::Fixed(4),
            verbose,
            skip_thread_unsafe: skip,
            ..Default::default()
        }
    }

    #[test]
    fn statuses_follow_thread_count_then_reason() {
        let parallel = planned("a", 4, None, false).properties();
        assert_eq!(
            test_status(&parallel, TestOutcome::Failed).map(|s| s.word),
            Some("PARALLEL FAILED".to_string())
        );

        let demoted = planned("b", 1, Some("uses env"), false).properties();
        assert_eq!(
            test_status(&demoted, TestOutcome::Passed).map(|s| s.word),
            Some("PASSED [thread-unsafe]: uses env".to_string())
        );
        assert_eq!(
            test_status(&demoted, TestOutcome::Failed).map(|s| s.word),
            Some("FAILED ([thread-unsafe]: uses env)".to_string())
        );
        assert_eq!(test_status(&TestProperties::default(), TestOutcome::Passed), None);
    }

    #[test]
    fn summary_counts_serial_tests() {
        let mut summary = RunSummary::new(&config(false, false));
        summary.record(&planned("a", 4, None, false));
        summary.record(&planned("b", 1, Some("uses env"), false));
        let lines = summary.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("1 tests were not run in parallel because of use of thread-unsafe functionality"));
    }

    #[test]
    fn verbose_summary_lists_tests() {
        let mut summary = RunSummary::new(&config(true, false));
        summary.record(&planned("a", 1, Some("uses env"), false));
        summary.record(&planned("b", 1, None, false));
        assert_eq!(
            summary.lines()[1..].to_vec(),
            vec!["a skipped with reason: \"uses env\"".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn skipped_tests_are_counted_separately() {
        let mut summary = RunSummary::new(&config(false, true));
        summary.record(&planned("a", 1, Some("uses env"), true));
        assert_eq!((summary.num_serial(), summary.num_skipped()), (0, 1));
        assert!(summary.lines()[1].starts_with("1 tests were skipped"));
    }

    #[test]
    fn all_parallel_run_is_celebrated() {
        let mut summary = RunSummary::new(&config(false, false));
        summary.record(&planned("a", 4, None, false));
        assert_eq!(summary.lines().last().map(String::as_str), Some("All tests were run in parallel! 🎉"));
    }

    #[test]
    fn collection_summary_counts_parallel_tests() {
        let tests = vec![planned("a", 4, None, false), planned("b", 1, None, false)];
        assert_eq!(collection_summary(&tests), "Collected 1 items to run in parallel");
    }
}
