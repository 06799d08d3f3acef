//! Shared utilities

pub mod tree_sitter;

pub use self::tree_sitter::*;
