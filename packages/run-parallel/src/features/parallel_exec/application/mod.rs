pub mod harness;
pub mod thread_comparator;

pub use harness::{make_parallel, ParallelHarness};
pub use thread_comparator::{ComparisonError, ThreadComparator};
