/// Property-based test detection port
use crate::features::thread_safety::infrastructure::FnItem;

/// Predicate supplied by (or modelled on) a property-testing framework
///
/// Property-based frameworks drive their own case generation and shrinking
/// state, so tests they own are never parallelized on top.
pub trait PropertyTestDetector: Send + Sync {
    /// Framework name when `item` is a property-based test
    fn detect(&self, item: &FnItem) -> Option<String>;
}
