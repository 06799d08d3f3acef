/*
 * run-parallel - Thread-parallel test execution with static safety checks
 *
 * Feature-First Hexagonal Architecture:
 * - shared/      : Path identities, tree-sitter helpers
 * - config/      : Run configuration (YAML + env)
 * - features/    : thread_safety (analysis), parallel_exec (harness)
 * - pipeline/    : Per-test planning and reporting
 *
 * A test runs on N workers × M iterations unless static analysis, a marker
 * or a fixture shows it touches process-global state.
 */

#![allow(clippy::type_complexity)] // Boxed test callables
#![allow(clippy::new_without_default)] // Default impl not always needed

// ═══════════════════════════════════════════════════════════════════════════
// Module Exports - Feature-First Architecture
// ═══════════════════════════════════════════════════════════════════════════

/// Shared models and utilities
pub mod shared;

/// Feature modules (analysis, execution)
pub mod features;

/// Per-test orchestration
pub mod pipeline;

/// Configuration system
pub mod config;

/// Error types
pub mod errors;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports for Public API
// ═══════════════════════════════════════════════════════════════════════════

pub use config::{RunParallelConfig, WorkerCount};
pub use errors::{Result, RunParallelError};
pub use features::parallel_exec::{
    make_parallel, yield_point, ExecutionPlan, ParallelHarness, TestResult, TestSignal,
    ThreadComparator,
};
pub use features::thread_safety::{
    AnalysisResult, Callable, SkipSet, SourceRegistry, ThreadSafetyAnalyzer,
};
pub use pipeline::{PlannedTest, TestItem, TestPlanner};
pub use shared::models::FnPath;
