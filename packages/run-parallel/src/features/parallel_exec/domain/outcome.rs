//! Test outcomes
//!
//! A test callable returns `Ok(())` or one of the signals below. Panics are
//! caught by the harness and become [`TestSignal::Failure`].

use std::any::Any;

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Non-success outcome of one test invocation
#[derive(Debug, Error)]
pub enum TestSignal {
    /// The test asked to be skipped
    #[error("skipped: {0}")]
    Skip(String),

    /// Assertion-style failure
    #[error("failed: {0}")]
    Failure(String),

    /// Advisory condition; swallowed by parallel workers
    #[error("warning: {0}")]
    Warning(String),

    /// Any other error
    #[error(transparent)]
    Error(BoxError),
}

impl TestSignal {
    pub fn skip(msg: impl Into<String>) -> Self {
        TestSignal::Skip(msg.into())
    }

    pub fn fail(msg: impl Into<String>) -> Self {
        TestSignal::Failure(msg.into())
    }

    pub fn warning(msg: impl Into<String>) -> Self {
        TestSignal::Warning(msg.into())
    }

    pub fn error(err: impl Into<BoxError>) -> Self {
        TestSignal::Error(err.into())
    }

    /// Failure carrying a caught panic's message
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        TestSignal::Failure(panic_message(payload.as_ref()))
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, TestSignal::Skip(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, TestSignal::Failure(_))
    }
}

impl From<std::io::Error> for TestSignal {
    fn from(err: std::io::Error) -> Self {
        TestSignal::Error(Box::new(err))
    }
}

pub type TestResult = Result<(), TestSignal>;

/// Skip and failure slots of one worker; the last one recorded wins
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    pub skip: Option<String>,
    pub failure: Option<String>,
    /// Iterations whose invocation began
    pub iterations: usize,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "test panicked".to_string()
    }
}
