pub mod alias_resolver;
pub mod source_registry;
pub mod source_tree;
pub mod unsafe_visitor;

pub use alias_resolver::AliasMap;
pub use property_tests::AttributeDetector;
pub use source_registry::{absolutize, FnItem, Namespace, SourceRegistry, UseBinding};
pub use source_tree::{load_source_tree, module_path_for};
pub use unsafe_visitor::{RecurseFn, ThreadUnsafeVisitor, MAX_RECURSION_LEVEL, THREAD_SAFE_SENTINEL};
