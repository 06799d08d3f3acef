//! Orchestration glue
//!
//! Turns collected test items plus the run configuration into execution
//! plans, and turns outcomes back into report lines.
//!
//! ```text
//! TestItem ─► TestPlanner::plan ─► PlannedTest ─► wrap(f) ─► TestResult
//!                  │                    │
//!          ThreadSafetyAnalyzer     RunSummary / test_status
//! ```

pub mod planner;
pub mod report;

pub use planner::{ItemKind, Markers, PlannedTest, TestItem, TestPlanner, THREAD_UNSAFE_MARKER_REASON};
pub use report::{collection_summary, test_status, RunSummary, TestOutcome, TestProperties, TestStatus};
