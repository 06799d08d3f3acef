//! Feature modules - each feature follows Hexagonal Architecture
//!
//! Each feature contains:
//! - domain/     - Pure business logic
//! - ports/      - Interface definitions (traits)
//! - application/ - Use cases
//! - infrastructure/ - Implementations backed by external crates

// Static detection of tests that call thread-unsafe APIs
pub mod thread_safety;

// Barrier-synchronized fan-out of a test across worker threads
pub mod parallel_exec;
