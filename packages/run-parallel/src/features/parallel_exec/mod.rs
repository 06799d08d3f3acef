/// Parallel Execution Feature
///
/// Runs one test callable N×M times across N workers that rendezvous at the
/// start of every iteration, then reduces every worker's outcome to a single
/// verdict.
///
/// ## Architecture
/// - **Domain**: `TestSignal` outcomes, `ExecutionPlan`
/// - **Infrastructure**: abortable `Barrier`, process switch interval, OS thread launcher
/// - **Application**: `ParallelHarness` / `make_parallel`, `ThreadComparator`
/// - **Ports**: `WorkerLauncher`, `SchedulingHint`
///
/// ## Reduction
/// skip > failure > first error (arrival order) > success
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use application::*;
pub use domain::*;
pub use infrastructure::*;
pub use ports::*;
