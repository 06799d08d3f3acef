//! Common test utilities for run-parallel
//!
//! Source fixtures and registry builders shared by the integration tests.

#![allow(dead_code)]

mod fixtures;

pub use fixtures::*;
