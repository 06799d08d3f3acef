//! Parallel Execution Harness
//!
//! Each run starts `worker_count` workers in a thread scope. Every worker
//! loops `iteration_count` times: wait at the shared barrier, then invoke
//! the test with the caller's arguments. Arguments are lent to all workers
//! for the duration of the scope, so the wrapped test sees exactly what the
//! unwrapped one would.
//!
//! Outcomes per worker:
//! - `Warning` is dropped
//! - `Skip` / `Failure` overwrite the worker's slot (returned on join)
//! - `Error` is appended to a shared list, in arrival order
//!
//! Reduction after every worker is joined: first skip by worker index, then
//! first failure by worker index, then the first appended error.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread;

use parking_lot::Mutex;

use crate::features::parallel_exec::domain::{
    BoxError, ExecutionPlan, TestResult, TestSignal, WorkerReport,
};
use crate::features::parallel_exec::infrastructure::{
    Barrier, OsThreadLauncher, ProcessSwitchInterval, SwitchIntervalGuard,
};
use crate::features::parallel_exec::ports::{SchedulingHint, WorkerLauncher};

/// Wrap `f` so that one call runs it across the plan's workers
///
/// The returned closure has the same calling convention as `f`.
pub fn make_parallel<A, F>(f: F, plan: ExecutionPlan) -> impl Fn(&A) -> TestResult + Send + Sync
where
    A: Sync + ?Sized,
    F: Fn(&A) -> TestResult + Send + Sync,
{
    ParallelHarness::new(plan).wrap(f)
}

pub struct ParallelHarness<L = OsThreadLauncher, H = ProcessSwitchInterval> {
    plan: ExecutionPlan,
    launcher: L,
    hint: H,
}

impl ParallelHarness {
    pub fn new(plan: ExecutionPlan) -> Self {
        Self {
            plan,
            launcher: OsThreadLauncher::default(),
            hint: ProcessSwitchInterval,
        }
    }
}

impl<L: WorkerLauncher, H: SchedulingHint> ParallelHarness<L, H> {
    pub fn with_launcher<L2: WorkerLauncher>(self, launcher: L2) -> ParallelHarness<L2, H> {
        ParallelHarness {
            plan: self.plan,
            launcher,
            hint: self.hint,
        }
    }

    pub fn with_hint<H2: SchedulingHint>(self, hint: H2) -> ParallelHarness<L, H2> {
        ParallelHarness {
            plan: self.plan,
            launcher: self.launcher,
            hint,
        }
    }

    pub fn plan(&self) -> ExecutionPlan {
        self.plan
    }

    pub fn wrap<A, F>(self, f: F) -> impl Fn(&A) -> TestResult + Send + Sync
    where
        A: Sync + ?Sized,
        F: Fn(&A) -> TestResult + Send + Sync,
    {
        move |args: &A| self.run(&f, args)
    }

    /// Run `f(args)` N×M times and reduce the outcomes
    pub fn run<A, F>(&self, f: &F, args: &A) -> TestResult
    where
        A: Sync + ?Sized,
        F: Fn(&A) -> TestResult + Sync,
    {
        let workers = self.plan.worker_count();
        let iterations = self.plan.iteration_count();
        let _interval = SwitchIntervalGuard::lower(&self.hint);

        let barrier = Barrier::new(workers);
        let errors: Mutex<Vec<BoxError>> = Mutex::new(Vec::new());

        let (reports, startup_error) = thread::scope(|scope| {
            let barrier = &barrier;
            let errors = &errors;
            let mut handles = Vec::with_capacity(workers);
            let mut startup_error = None;

            for index in 0..workers {
                let body = move || run_worker(index, iterations, barrier, f, args, errors);
                match self.launcher.launch(scope, index, body) {
                    Ok(handle) => handles.push(handle),
                    Err(err) => {
                        tracing::warn!("Failed to start worker {}: {}", index, err);
                        barrier.abort();
                        startup_error = Some(err);
                        break;
                    }
                }
            }

            let reports: Vec<WorkerReport> = handles
                .into_iter()
                .map(|handle| {
                    handle.join().unwrap_or_else(|payload| WorkerReport {
                        failure: Some(panic_text(TestSignal::from_panic(payload))),
                        ..Default::default()
                    })
                })
                .collect();
            (reports, startup_error)
        });

        tracing::debug!(
            "Joined {} workers ({} iterations each)",
            reports.len(),
            iterations
        );

        if let Some(err) = startup_error {
            return Err(TestSignal::Error(Box::new(err)));
        }
        reduce(reports, errors.into_inner())
    }
}

fn run_worker<A, F>(
    index: usize,
    iterations: usize,
    barrier: &Barrier,
    f: &F,
    args: &A,
    errors: &Mutex<Vec<BoxError>>,
) -> WorkerReport
where
    A: ?Sized,
    F: Fn(&A) -> TestResult,
{
    let mut report = WorkerReport::default();
    for _ in 0..iterations {
        if barrier.wait().is_err() {
            tracing::debug!("Worker {} released by aborted barrier", index);
            break;
        }
        report.iterations += 1;

        let outcome = catch_unwind(AssertUnwindSafe(|| f(args)))
            .unwrap_or_else(|payload| Err(TestSignal::from_panic(payload)));
        match outcome {
            Ok(()) => {}
            Err(TestSignal::Warning(msg)) => {
                tracing::trace!("Worker {} ignored warning: {}", index, msg);
            }
            Err(TestSignal::Skip(msg)) => report.skip = Some(msg),
            Err(TestSignal::Failure(msg)) => report.failure = Some(msg),
            Err(TestSignal::Error(err)) => errors.lock().push(err),
        }
    }
    report
}

fn reduce(reports: Vec<WorkerReport>, errors: Vec<BoxError>) -> TestResult {
    if let Some(msg) = reports.iter().find_map(|r| r.skip.clone()) {
        return Err(TestSignal::Skip(msg));
    }
    if let Some(msg) = reports.iter().find_map(|r| r.failure.clone()) {
        return Err(TestSignal::Failure(msg));
    }
    match errors.into_iter().next() {
        Some(err) => Err(TestSignal::Error(err)),
        None => Ok(()),
    }
}

fn panic_text(signal: TestSignal) -> String {
    match signal {
        TestSignal::Failure(msg) => msg,
        other => other.to_string(),
    }
}
