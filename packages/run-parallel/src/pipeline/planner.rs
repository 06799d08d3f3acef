//! Per-test planning
//!
//! Decision order for one item (first downgrade wins):
//! 1. Opaque items and doctests always run once on one worker
//! 2. Marker overrides replace the configured worker/iteration counts
//! 3. `thread_unsafe` marker
//! 4. Static analysis verdict
//! 5. Thread-unsafe fixtures (never skipped, only demoted)
//!
//! Steps 3-5 only apply while more than one worker is planned.

use std::collections::BTreeSet;
use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigResult, RunParallelConfig, WorkerCount};
use crate::features::parallel_exec::{make_parallel, ExecutionPlan, TestResult, TestSignal, ThreadComparator};
use crate::features::thread_safety::{Callable, FnItem, SkipSet, ThreadSafetyAnalyzer};
use crate::pipeline::report::TestProperties;

pub const THREAD_UNSAFE_MARKER_REASON: &str = "uses thread_unsafe marker";

/// Test attributes whose parameters are injected fixtures
const FIXTURE_ATTRIBUTES: &[&str] = &["rstest", "rstest::rstest"];

/// Attributes that serialize a test against the rest of the suite
const SERIAL_ATTRIBUTES: &[&str] = &[
    "serial",
    "serial_test::serial",
    "file_serial",
    "serial_test::file_serial",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// A test function with analyzable source
    Function,
    /// Documentation example
    Doctest,
    /// Item the runner cannot look inside
    Opaque {
        /// Suppresses the incompatibility warning
        acknowledged: bool,
    },
}

/// Per-test overrides
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Markers {
    pub parallel_threads: Option<WorkerCount>,
    pub iterations: Option<usize>,
    /// `Some(None)` marks the test thread-unsafe without a reason
    pub thread_unsafe: Option<Option<String>>,
}

impl Markers {
    pub fn parallel_threads(mut self, count: WorkerCount) -> Self {
        self.parallel_threads = Some(count);
        self
    }

    pub fn iterations(mut self, n: usize) -> Self {
        self.iterations = Some(n);
        self
    }

    pub fn thread_unsafe(mut self, reason: Option<&str>) -> Self {
        self.thread_unsafe = Some(reason.map(str::to_string));
        self
    }
}

/// A collected test
#[derive(Debug, Clone)]
pub struct TestItem {
    pub id: String,
    pub kind: ItemKind,
    pub callable: Option<Callable>,
    pub markers: Markers,
    pub fixtures: Vec<String>,
}

impl TestItem {
    pub fn function(id: impl Into<String>, callable: Callable) -> Self {
        Self {
            id: id.into(),
            kind: ItemKind::Function,
            callable: Some(callable),
            markers: Markers::default(),
            fixtures: Vec::new(),
        }
    }

    pub fn doctest(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: ItemKind::Doctest,
            callable: None,
            markers: Markers::default(),
            fixtures: Vec::new(),
        }
    }

    pub fn opaque(id: impl Into<String>, acknowledged: bool) -> Self {
        Self {
            id: id.into(),
            kind: ItemKind::Opaque { acknowledged },
            callable: None,
            markers: Markers::default(),
            fixtures: Vec::new(),
        }
    }

    /// Item for a registered test function
    ///
    /// `#[rstest]` parameters become fixtures and `#[serial]` acts as the
    /// `thread_unsafe` marker.
    pub fn from_fn_item(item: &FnItem) -> Self {
        let mut test = Self::function(item.path.to_string(), Callable::Registered(item.path.clone()));
        if FIXTURE_ATTRIBUTES.iter().any(|attr| item.has_attribute(attr)) {
            test.fixtures = item.parameters.clone();
        }
        if let Some(attr) = SERIAL_ATTRIBUTES.iter().find(|attr| item.has_attribute(attr)) {
            test.markers.thread_unsafe = Some(Some(format!("uses #[{}]", attr)));
        }
        test
    }

    pub fn with_markers(mut self, markers: Markers) -> Self {
        self.markers = markers;
        self
    }

    pub fn with_fixtures<S: Into<String>>(mut self, fixtures: impl IntoIterator<Item = S>) -> Self {
        self.fixtures = fixtures.into_iter().map(Into::into).collect();
        self
    }
}

/// Planning outcome for one test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedTest {
    pub id: String,
    pub plan: ExecutionPlan,
    /// Skip message when the test must not run at all
    pub skip: Option<String>,
    pub thread_unsafe_reason: Option<String>,
    /// Whether the test runs through the parallel harness
    pub wrapped: bool,
}

impl PlannedTest {
    fn serial(id: &str) -> Self {
        Self {
            id: id.to_string(),
            plan: ExecutionPlan::serial(),
            skip: None,
            thread_unsafe_reason: None,
            wrapped: false,
        }
    }

    pub fn num_parallel_threads(&self) -> usize {
        self.plan.worker_count()
    }

    pub fn num_iterations(&self) -> usize {
        self.plan.iteration_count()
    }

    pub fn is_parallel(&self) -> bool {
        self.skip.is_none() && self.plan.worker_count() > 1
    }

    /// Comparator sized for this test's workers
    pub fn thread_comparator<T>(&self) -> ThreadComparator<T>
    where
        T: PartialEq + Debug + Clone + Send,
    {
        ThreadComparator::new(self.num_parallel_threads())
    }

    /// Report properties (`n_threads` only for wrapped tests)
    pub fn properties(&self) -> TestProperties {
        TestProperties {
            n_threads: self.wrapped.then(|| self.plan.worker_count()),
            thread_unsafe_reason: self.thread_unsafe_reason.clone(),
        }
    }

    /// The callable to run for this test
    pub fn wrap<'f, A, F>(&self, f: F) -> Box<dyn Fn(&A) -> TestResult + Send + Sync + 'f>
    where
        A: Sync + ?Sized + 'f,
        F: Fn(&A) -> TestResult + Send + Sync + 'f,
    {
        if let Some(msg) = &self.skip {
            let msg = msg.clone();
            return Box::new(move |_: &A| -> TestResult { Err(TestSignal::Skip(msg.clone())) });
        }
        if self.wrapped {
            Box::new(make_parallel(f, self.plan))
        } else {
            Box::new(f)
        }
    }
}

pub struct TestPlanner<'a> {
    config: &'a RunParallelConfig,
    analyzer: &'a ThreadSafetyAnalyzer,
    skip_set: SkipSet,
    unsafe_fixtures: BTreeSet<String>,
}

impl<'a> TestPlanner<'a> {
    pub fn new(config: &'a RunParallelConfig, analyzer: &'a ThreadSafetyAnalyzer) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            analyzer,
            skip_set: config.skip_set()?,
            unsafe_fixtures: config.unsafe_fixtures().into_iter().collect(),
        })
    }

    pub fn plan(&self, item: &TestItem) -> PlannedTest {
        let callable = match (&item.kind, &item.callable) {
            (ItemKind::Function, Some(callable)) => callable,
            (ItemKind::Doctest, _) => return PlannedTest::serial(&item.id),
            (ItemKind::Opaque { acknowledged: true }, _) => return PlannedTest::serial(&item.id),
            _ => {
                tracing::warn!(
                    "Test item {} has no analyzable function and will not run in parallel; \
                     mark it acknowledged to silence this warning",
                    item.id
                );
                return PlannedTest::serial(&item.id);
            }
        };

        let mut workers = item
            .markers
            .parallel_threads
            .unwrap_or(self.config.parallel_threads)
            .resolve();
        let iterations = item.markers.iterations.unwrap_or(self.config.iterations).max(1);
        let mut skip = None;
        let mut reason = None;

        if workers > 1 {
            if let Some(marker_reason) = &item.markers.thread_unsafe {
                let why = marker_reason
                    .clone()
                    .unwrap_or_else(|| THREAD_UNSAFE_MARKER_REASON.to_string());
                workers = 1;
                skip = self.skip_message(&why);
                reason = Some(why);
            }
        }

        if workers > 1 {
            let verdict = self.analyzer.identify_thread_unsafe(callable, &self.skip_set);
            if verdict.is_thread_unsafe {
                let why = verdict.reason.unwrap_or_default();
                workers = 1;
                skip = self.skip_message(&why);
                reason = Some(why);
            }
        }

        if workers > 1 {
            let used: BTreeSet<&str> = item
                .fixtures
                .iter()
                .filter(|fixture| self.unsafe_fixtures.contains(*fixture))
                .map(String::as_str)
                .collect();
            if !used.is_empty() {
                workers = 1;
                let listed: Vec<&str> = used.into_iter().collect();
                reason = Some(format!("uses thread-unsafe fixture(s): {{{}}}", listed.join(", ")));
            }
        }

        if let Some(why) = &reason {
            tracing::info!("Running {} on a single thread: {}", item.id, why);
        }

        let plan = ExecutionPlan::new(workers, iterations);
        PlannedTest {
            id: item.id.clone(),
            plan,
            skip,
            thread_unsafe_reason: reason,
            wrapped: plan.needs_wrapping(),
        }
    }

    fn skip_message(&self, reason: &str) -> Option<String> {
        self.config
            .skip_thread_unsafe
            .then(|| format!("Thread unsafe: {}", reason))
    }
}
