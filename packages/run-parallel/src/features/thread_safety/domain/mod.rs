pub mod blocklist;
pub mod models;

pub use blocklist::{Blocklist, BlocklistEntry, SkipSet, DEFAULT_BLOCKLIST, WILDCARD};
pub use models::{AnalysisResult, Callable, UNSAFE_CALL_PREFIX};
