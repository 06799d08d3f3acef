//! Source fixtures
//!
//! A small crate `suite` with helpers at increasing distance from a
//! thread-unsafe call, and a test module that exercises them.

use run_parallel::{Callable, FnPath, SourceRegistry, ThreadSafetyAnalyzer};

pub const CRATE_ROOT: &str = r#"
pub mod helpers;
pub mod util;

pub fn version() -> u32 {
    3
}
"#;

pub const HELPERS: &str = r#"
use std::env;

pub fn set_env() {
    env::set_var("SUITE_MODE", "test");
}

pub fn configure() {
    set_env();
}

pub fn setup() {
    configure();
}

pub fn bootstrap() {
    setup();
}

pub fn pure(x: u32) -> u32 {
    x * 2
}

pub struct Fixture;

impl Fixture {
    pub fn install() {
        Self::hook();
    }

    fn hook() {
        std::panic::set_hook(Box::new(|_| {}));
    }

    pub fn value() -> u32 {
        7
    }
}

pub fn reset_globals() {}
"#;

pub const UTIL: &str = r#"
pub use std::env::set_var as export_var;
pub use crate::helpers::pure as double;
"#;

pub const TESTS: &str = r#"
use std::env as environment;
use std::panic::{self, take_hook as grab};
use crate::helpers::{self, Fixture};
use crate::util;
use libc;

#[test]
fn no_calls() {
    assert_eq!(1 + 1, 2);
}

#[test]
fn calls_pure_helper() {
    assert_eq!(helpers::pure(2), crate::version() + 1);
}

#[test]
fn direct_alias() {
    environment::remove_var("SUITE_MODE");
}

#[test]
fn module_self_import() {
    let _ = panic::take_hook();
}

#[test]
fn renamed_function() {
    let _ = grab();
}

#[test]
fn raw_memory() {
    let mut dst = [0u8; 4];
    let src = [1u8; 4];
    unsafe {
        libc::memmove(dst.as_mut_ptr().cast(), src.as_ptr().cast(), 4);
    }
}

#[test]
fn one_level() {
    helpers::set_env();
}

#[test]
fn two_levels() {
    helpers::configure();
}

#[test]
fn three_levels() {
    helpers::setup();
}

#[test]
fn four_levels() {
    helpers::bootstrap();
}

#[test]
fn through_reexport() {
    util::export_var("SUITE_MODE", "x");
}

#[test]
fn safe_reexport() {
    assert_eq!(util::double(2), 4);
}

#[test]
fn through_method() {
    Fixture::install();
}

#[test]
fn safe_method() {
    assert_eq!(Fixture::value(), 7);
}

#[test]
fn inside_macro() {
    assert!(std::env::var("HOME").is_ok() || { std::env::set_var("HOME", "/tmp"); true });
}

#[test]
fn method_call_is_not_resolved() {
    let value = String::from("x");
    assert_eq!(value.clone().len(), 1);
}

#[test]
fn explicit_override() {
    const THREAD_SAFE: bool = false;
    assert!(true);
}

#[test]
fn explicit_safe_is_ignored() {
    const THREAD_SAFE: bool = true;
    assert!(true);
}

#[test]
fn user_blocklisted() {
    helpers::reset_globals();
}
"#;

/// Registry holding the whole `suite` crate
pub fn registry() -> SourceRegistry {
    SourceRegistry::new()
        .with_module("suite", CRATE_ROOT)
        .and_then(|r| r.with_module("suite::helpers", HELPERS))
        .and_then(|r| r.with_module("suite::util", UTIL))
        .and_then(|r| r.with_module("suite::tests", TESTS))
        .expect("fixture sources parse")
}

pub fn analyzer() -> ThreadSafetyAnalyzer {
    ThreadSafetyAnalyzer::new(registry())
}

/// `suite::tests::<name>`
pub fn test_fn(name: &str) -> Callable {
    Callable::Registered(FnPath::new("suite::tests", name))
}
