//! Analysis domain models

use serde::{Deserialize, Serialize};

use crate::shared::models::FnPath;

/// Prefix shared by every call-based verdict
pub const UNSAFE_CALL_PREFIX: &str = "calls thread-unsafe function: ";

/// Verdict of a thread-safety analysis
///
/// `reason` holds the first cause found in traversal order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub is_thread_unsafe: bool,
    pub reason: Option<String>,
}

impl AnalysisResult {
    /// No evidence of thread-unsafe calls
    pub fn safe() -> Self {
        Self::default()
    }

    pub fn thread_unsafe(reason: impl Into<String>) -> Self {
        Self {
            is_thread_unsafe: true,
            reason: Some(reason.into()),
        }
    }

    /// Verdict for a call to a blocklisted function
    pub fn unsafe_call(module: &str, function: &str) -> Self {
        Self::thread_unsafe(format!("{}{}::{}", UNSAFE_CALL_PREFIX, module, function))
    }

    /// `(is_unsafe, reason)` pair
    pub fn into_parts(self) -> (bool, Option<String>) {
        (self.is_thread_unsafe, self.reason)
    }
}

/// Something the analyzer can be asked about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callable {
    /// A function registered in the source registry; results are cached
    Registered(FnPath),

    /// Ad-hoc source with no stable identity; never cached
    ///
    /// `namespace` is the registered module whose imports the source sees.
    Detached {
        namespace: String,
        name: String,
        source: String,
    },
}

impl Callable {
    pub fn registered(path: FnPath) -> Self {
        Callable::Registered(path)
    }

    /// Display name used in verdicts and logs
    pub fn name(&self) -> &str {
        match self {
            Callable::Registered(path) => &path.name,
            Callable::Detached { name, .. } => name,
        }
    }
}

impl From<FnPath> for Callable {
    fn from(path: FnPath) -> Self {
        Callable::Registered(path)
    }
}
