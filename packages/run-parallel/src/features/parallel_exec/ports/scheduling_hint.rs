//! Scheduling hint port
//!
//! A process-wide thread switch interval. Lowering it asks workers to yield
//! more often so their invocations interleave more finely.

use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HintError {
    #[error("switch interval {0:?} rejected: {1}")]
    Rejected(Duration, String),
}

pub trait SchedulingHint: Send + Sync {
    fn interval(&self) -> Duration;

    fn set_interval(&self, interval: Duration) -> Result<(), HintError>;

    /// Bookkeeping shared by every guard holding this hint lowered
    fn lease(&self) -> &HintLease;
}

impl<H: SchedulingHint + ?Sized> SchedulingHint for &H {
    fn interval(&self) -> Duration {
        (**self).interval()
    }

    fn set_interval(&self, interval: Duration) -> Result<(), HintError> {
        (**self).set_interval(interval)
    }

    fn lease(&self) -> &HintLease {
        (**self).lease()
    }
}

#[derive(Debug, Default)]
struct LeaseState {
    active: usize,
    original: Duration,
    applied: Option<Duration>,
}

/// Reference count of overlapping lowerings of one hint
///
/// The first holder saves the original interval and lowers it; the last one
/// to release restores it. Holders may release in any order.
#[derive(Debug, Default)]
pub struct HintLease {
    state: Mutex<LeaseState>,
}

impl HintLease {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a holder, running `lower` only for the first one
    ///
    /// `lower` returns the original and the applied interval. Every holder
    /// gets the values recorded by the first.
    pub fn acquire(&self, lower: impl FnOnce() -> (Duration, Option<Duration>)) -> (Duration, Option<Duration>) {
        let mut state = self.state.lock();
        if state.active == 0 {
            let (original, applied) = lower();
            state.original = original;
            state.applied = applied;
        }
        state.active += 1;
        (state.original, state.applied)
    }

    /// Drop a holder, running `restore` with the saved original for the last one
    pub fn release(&self, restore: impl FnOnce(Duration)) {
        let mut state = self.state.lock();
        state.active = state.active.saturating_sub(1);
        if state.active == 0 {
            restore(state.original);
            state.applied = None;
        }
    }

    /// Number of guards currently holding the hint lowered
    pub fn holders(&self) -> usize {
        self.state.lock().active
    }
}
