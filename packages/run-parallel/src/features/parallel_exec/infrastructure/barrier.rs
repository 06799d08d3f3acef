//! Reusable N-way rendezvous with abort
//!
//! The barrier trips when `parties` callers have arrived, then resets for the
//! next generation. Exactly one caller per generation is the leader. After
//! [`Barrier::abort`] every current and future wait fails with
//! [`BarrierWaitError::Broken`].

use parking_lot::{Condvar, Mutex};
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BarrierWaitError {
    #[error("barrier was aborted")]
    Broken,
}

#[derive(Debug)]
struct BarrierState {
    arrived: usize,
    generation: u64,
    broken: bool,
}

#[derive(Debug)]
pub struct Barrier {
    parties: usize,
    state: Mutex<BarrierState>,
    cvar: Condvar,
}

impl Barrier {
    /// Barrier for `parties` participants (at least one)
    pub fn new(parties: usize) -> Self {
        Self {
            parties: parties.max(1),
            state: Mutex::new(BarrierState {
                arrived: 0,
                generation: 0,
                broken: false,
            }),
            cvar: Condvar::new(),
        }
    }

    pub fn parties(&self) -> usize {
        self.parties
    }

    /// Block until every party has arrived for the current generation
    pub fn wait(&self) -> Result<BarrierWaitResult, BarrierWaitError> {
        let mut state = self.state.lock();
        if state.broken {
            return Err(BarrierWaitError::Broken);
        }

        let local_gen = state.generation;
        state.arrived += 1;
        if state.arrived == self.parties {
            state.arrived = 0;
            state.generation = state.generation.wrapping_add(1);
            self.cvar.notify_all();
            return Ok(BarrierWaitResult { is_leader: true });
        }

        loop {
            self.cvar.wait(&mut state);
            // A trip that happened before the abort still releases this waiter
            if state.generation != local_gen {
                return Ok(BarrierWaitResult { is_leader: false });
            }
            if state.broken {
                return Err(BarrierWaitError::Broken);
            }
        }
    }

    /// Break the barrier, releasing every waiter with an error
    pub fn abort(&self) {
        let mut state = self.state.lock();
        state.broken = true;
        state.arrived = 0;
        self.cvar.notify_all();
    }

    pub fn is_broken(&self) -> bool {
        self.state.lock().broken
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarrierWaitResult {
    is_leader: bool,
}

impl BarrierWaitResult {
    /// True for exactly one party each generation
    pub fn is_leader(&self) -> bool {
        self.is_leader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn one_leader_per_generation() {
        let barrier = Arc::new(Barrier::new(3));
        let leaders = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let barrier = Arc::clone(&barrier);
                let leaders = Arc::clone(&leaders);
                thread::spawn(move || {
                    for _ in 0..5 {
                        if barrier.wait().unwrap().is_leader() {
                            leaders.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(leaders.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn single_party_never_blocks() {
        let barrier = Barrier::new(1);
        assert!(barrier.wait().unwrap().is_leader());
        assert!(barrier.wait().unwrap().is_leader());
    }

    #[test]
    fn abort_releases_waiters() {
        let barrier = Arc::new(Barrier::new(3));
        let waiter = {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || barrier.wait())
        };

        while barrier.state.lock().arrived == 0 {
            thread::yield_now();
        }
        barrier.abort();

        assert_eq!(waiter.join().unwrap(), Err(BarrierWaitError::Broken));
        assert!(barrier.is_broken());
        assert_eq!(barrier.wait(), Err(BarrierWaitError::Broken));
    }
}
