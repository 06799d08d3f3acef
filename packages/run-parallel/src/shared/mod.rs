//! Shared module - Common types and utilities
//!
//! Types used by both the analyzer and the orchestration layer.

pub mod models;
pub mod utils;

pub use models::*;
