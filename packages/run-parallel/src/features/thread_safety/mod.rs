/// Thread-Safety Analysis Feature
///
/// Decides whether a test function (transitively, up to a bounded depth)
/// calls an API known to be unsafe under concurrent execution.
///
/// ## Architecture
/// - **Domain**: Blocklist registry, skip sets, analysis results
/// - **Infrastructure**: Source registry (tree-sitter), alias resolver, syntax visitor
/// - **Application**: `ThreadSafetyAnalyzer` (memoized entry point)
/// - **Ports**: `PropertyTestDetector` trait
///
/// ## Bounds
/// - The tested function is level 0; callees are followed while the caller's
///   level is below `MAX_RECURSION_LEVEL`
/// - Unresolvable callees are assumed safe
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use application::*;
pub use domain::*;
pub use infrastructure::*;
pub use ports::*;
