//! Worker startup port
use std::io;
use std::thread::{Scope, ScopedJoinHandle};

/// Starts worker threads inside a thread scope
///
/// Workers are started one at a time in index order. A launch error makes the
/// harness abort the current run; workers already started are still joined.
pub trait WorkerLauncher: Send + Sync {
    fn launch<'scope, 'env, F, T>(
        &self,
        scope: &'scope Scope<'scope, 'env>,
        index: usize,
        body: F,
    ) -> io::Result<ScopedJoinHandle<'scope, T>>
    where
        F: FnOnce() -> T + Send + 'scope,
        T: Send + 'scope;
}
