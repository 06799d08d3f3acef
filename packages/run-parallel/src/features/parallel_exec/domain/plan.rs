use serde::{Deserialize, Serialize};

/// Worker and iteration counts for one test, both at least 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionPlan {
    worker_count: usize,
    iteration_count: usize,
}

impl ExecutionPlan {
    /// Counts below 1 are raised to 1
    pub fn new(worker_count: usize, iteration_count: usize) -> Self {
        Self {
            worker_count: worker_count.max(1),
            iteration_count: iteration_count.max(1),
        }
    }

    pub fn serial() -> Self {
        Self::new(1, 1)
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn iteration_count(&self) -> usize {
        self.iteration_count
    }

    /// Same iterations on a single worker
    pub fn single_worker(self) -> Self {
        Self::new(1, self.iteration_count)
    }

    /// Whether running the test needs the harness at all
    pub fn needs_wrapping(&self) -> bool {
        self.worker_count > 1 || self.iteration_count > 1
    }

    pub fn total_invocations(&self) -> usize {
        self.worker_count * self.iteration_count
    }
}

impl Default for ExecutionPlan {
    fn default() -> Self {
        Self::serial()
    }
}
