use std::io;
use std::thread::{self, Scope, ScopedJoinHandle};

use crate::features::parallel_exec::ports::WorkerLauncher;

pub const WORKER_THREAD_PREFIX: &str = "run-parallel-worker-";

/// Named OS threads, `run-parallel-worker-<index>`
#[derive(Debug, Clone, Copy, Default)]
pub struct OsThreadLauncher {
    stack_size: Option<usize>,
}

impl OsThreadLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }
}

impl WorkerLauncher for OsThreadLauncher {
    fn launch<'scope, 'env, F, T>(
        &self,
        scope: &'scope Scope<'scope, 'env>,
        index: usize,
        body: F,
    ) -> io::Result<ScopedJoinHandle<'scope, T>>
    where
        F: FnOnce() -> T + Send + 'scope,
        T: Send + 'scope,
    {
        let mut builder = thread::Builder::new().name(format!("{}{}", WORKER_THREAD_PREFIX, index));
        if let Some(size) = self.stack_size {
            builder = builder.stack_size(size);
        }
        builder.spawn_scoped(scope, body)
    }
}
