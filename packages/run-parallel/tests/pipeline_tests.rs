//! End-to-end planning: config file → source tree → plans → runs → summary

mod common;

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};

use common::*;
use pretty_assertions::assert_eq;
use run_parallel::features::thread_safety::load_source_tree;
use run_parallel::pipeline::{
    collection_summary, test_status, Markers, RunSummary, TestOutcome, TestPlanner,
};
use run_parallel::{
    ExecutionPlan, PlannedTest, RunParallelConfig, TestItem, TestSignal, ThreadSafetyAnalyzer,
    WorkerCount,
};

fn write_suite(dir: &std::path::Path) {
    fs::create_dir_all(dir.join("src")).unwrap();
    fs::write(dir.join("src/lib.rs"), CRATE_ROOT).unwrap();
    fs::write(dir.join("src/helpers.rs"), HELPERS).unwrap();
    fs::write(dir.join("src/util.rs"), UTIL).unwrap();
    fs::write(dir.join("src/tests.rs"), TESTS).unwrap();
    fs::write(
        dir.join("run-parallel.yaml"),
        "parallel_threads: 4\niterations: 2\nthread_unsafe_functions:\n  - suite::helpers::reset_globals\n",
    )
    .unwrap();
}

fn plan_suite(config: &RunParallelConfig, analyzer: &ThreadSafetyAnalyzer) -> Vec<PlannedTest> {
    let planner = TestPlanner::new(config, analyzer).unwrap();
    analyzer
        .registry()
        .test_functions()
        .iter()
        .map(|item| planner.plan(&TestItem::from_fn_item(item)))
        .collect()
}

fn find<'a>(planned: &'a [PlannedTest], name: &str) -> &'a PlannedTest {
    let id = format!("suite::tests::{}", name);
    planned.iter().find(|p| p.id == id).unwrap()
}

#[test]
fn source_tree_plans_match_analysis() {
    let dir = tempfile::tempdir().unwrap();
    write_suite(dir.path());

    let config = RunParallelConfig::from_yaml(dir.path().join("run-parallel.yaml")).unwrap();
    let analyzer = ThreadSafetyAnalyzer::new(load_source_tree(&dir.path().join("src"), "suite").unwrap());
    let planned = plan_suite(&config, &analyzer);

    let safe = find(&planned, "calls_pure_helper");
    assert_eq!(safe.plan, ExecutionPlan::new(4, 2));
    assert!(safe.is_parallel());

    let demoted = find(&planned, "user_blocklisted");
    assert_eq!(demoted.plan, ExecutionPlan::new(1, 2));
    assert!(demoted.wrapped);
    assert_eq!(
        demoted.thread_unsafe_reason.as_deref(),
        Some("calls thread-unsafe function: suite::helpers::reset_globals")
    );

    let parallel = planned.iter().filter(|p| p.is_parallel()).count();
    assert_eq!(
        collection_summary(&planned),
        format!("Collected {} items to run in parallel", parallel)
    );
}

#[test]
fn planned_tests_run_with_their_plan() {
    let config = RunParallelConfig {
        parallel_threads: WorkerCount::Fixed(3),
        iterations: 2,
        ..Default::default()
    };
    let analyzer = analyzer();
    let planned = plan_suite(&config, &analyzer);

    for (name, expected_calls) in [("no_calls", 6), ("one_level", 2)] {
        let test = find(&planned, name);
        let calls = AtomicUsize::new(0);
        let run = test.wrap(|calls: &AtomicUsize| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        assert!(run(&calls).is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), expected_calls, "{}", name);
        assert_eq!(test.num_iterations() * test.num_parallel_threads(), expected_calls);
    }
}

#[test]
fn skip_policy_skips_instead_of_demoting() {
    let config = RunParallelConfig::default()
        .apply_env_from(|var| match var {
            "RUN_PARALLEL_THREADS" => Some("4".to_string()),
            "RUN_PARALLEL_SKIP_THREAD_UNSAFE" => Some("1".to_string()),
            _ => None,
        })
        .unwrap();
    let analyzer = analyzer();
    let planned = plan_suite(&config, &analyzer);

    let test = find(&planned, "direct_alias");
    assert_eq!(
        test.skip.as_deref(),
        Some("Thread unsafe: calls thread-unsafe function: std::env::remove_var")
    );
    let run = test.wrap(|_: &()| Err(TestSignal::fail("must not run")));
    assert!(matches!(run(&()), Err(TestSignal::Skip(_))));

    let mut summary = RunSummary::new(&config);
    for test in &planned {
        summary.record(test);
    }
    assert_eq!(summary.num_serial(), 0);
    assert!(summary.num_skipped() > 0);
    assert!(summary
        .lines()
        .iter()
        .any(|line| line.starts_with(&format!("{} tests were skipped", summary.num_skipped()))));
}

#[test]
fn reports_reflect_plans() {
    let config = RunParallelConfig {
        parallel_threads: WorkerCount::Fixed(2),
        ..Default::default()
    };
    let analyzer = analyzer();
    let planner = TestPlanner::new(&config, &analyzer).unwrap();

    let parallel = planner.plan(&TestItem::function("suite::tests::no_calls", test_fn("no_calls")));
    let marked = planner.plan(
        &TestItem::function("suite::tests::no_calls", test_fn("no_calls"))
            .with_markers(Markers::default().thread_unsafe(Some("shares a socket"))),
    );

    assert_eq!(
        test_status(&parallel.properties(), TestOutcome::Passed).map(|s| s.word),
        Some("PARALLEL PASSED".to_string())
    );
    assert_eq!(
        test_status(&marked.properties(), TestOutcome::Failed).map(|s| s.word),
        Some("FAILED ([thread-unsafe]: shares a socket)".to_string())
    );

    let mut summary = RunSummary::new(&config);
    summary.record(&parallel);
    summary.record(&marked);
    assert_eq!(
        summary.lines().last().map(String::as_str),
        Some(
            "1 tests were not run in parallel because of use of thread-unsafe functionality, \
             to list the tests that were not run in parallel, re-run while setting \
             RUN_PARALLEL_VERBOSE=1 in your shell environment"
        )
    );
}
