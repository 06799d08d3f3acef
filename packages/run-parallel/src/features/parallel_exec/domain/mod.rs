pub mod outcome;
pub mod plan;

pub use outcome::{BoxError, TestResult, TestSignal, WorkerReport};
pub use plan::ExecutionPlan;
