//! Process-wide thread switch interval
//!
//! The interval is consulted by [`yield_point`], which test bodies call in
//! hot loops to hand the CPU to other workers. The harness lowers it for the
//! duration of a parallel run through [`SwitchIntervalGuard`].

use std::cell::Cell;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::features::parallel_exec::ports::{HintError, HintLease, SchedulingHint};

pub const DEFAULT_SWITCH_INTERVAL: Duration = Duration::from_millis(5);

/// First interval tried when lowering; each rejection multiplies it by 10
const FIRST_CANDIDATE: Duration = Duration::from_micros(1);
const CANDIDATE_ATTEMPTS: usize = 3;

static SWITCH_INTERVAL: Lazy<RwLock<Duration>> = Lazy::new(|| RwLock::new(DEFAULT_SWITCH_INTERVAL));
static SWITCH_INTERVAL_LEASE: Lazy<HintLease> = Lazy::new(HintLease::new);

thread_local! {
    static LAST_YIELD: Cell<Option<Instant>> = Cell::new(None);
}

/// The process-global interval
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessSwitchInterval;

impl SchedulingHint for ProcessSwitchInterval {
    fn interval(&self) -> Duration {
        *SWITCH_INTERVAL.read()
    }

    fn set_interval(&self, interval: Duration) -> Result<(), HintError> {
        if interval.is_zero() {
            return Err(HintError::Rejected(interval, "interval must be positive".to_string()));
        }
        *SWITCH_INTERVAL.write() = interval;
        Ok(())
    }

    fn lease(&self) -> &HintLease {
        &SWITCH_INTERVAL_LEASE
    }
}

/// Yield the current thread if it has run for a full switch interval
pub fn yield_point() {
    let interval = ProcessSwitchInterval.interval();
    LAST_YIELD.with(|last| {
        let now = Instant::now();
        match last.get() {
            Some(at) if now.duration_since(at) < interval => {}
            _ => {
                last.set(Some(now));
                std::thread::yield_now();
            }
        }
    });
}

/// Lowers the interval on creation and restores the original on drop
///
/// Overlapping guards on the same hint share one lowering through the hint's
/// [`HintLease`]: only the last guard dropped restores the interval.
pub struct SwitchIntervalGuard<H: SchedulingHint> {
    hint: H,
    original: Duration,
    applied: Option<Duration>,
}

impl<H: SchedulingHint> SwitchIntervalGuard<H> {
    /// Try 1µs, 10µs, 100µs in turn; keep the original if all are rejected
    pub fn lower(hint: H) -> Self {
        let (original, applied) = hint.lease().acquire(|| lower_interval(&hint));
        Self {
            hint,
            original,
            applied,
        }
    }

    pub fn original(&self) -> Duration {
        self.original
    }

    /// Interval in effect while the guard lives, if lowering succeeded
    pub fn applied(&self) -> Option<Duration> {
        self.applied
    }
}

fn lower_interval<H: SchedulingHint>(hint: &H) -> (Duration, Option<Duration>) {
    let original = hint.interval();
    let mut candidate = FIRST_CANDIDATE;

    for _ in 0..CANDIDATE_ATTEMPTS {
        match hint.set_interval(candidate) {
            Ok(()) => return (original, Some(candidate)),
            Err(err) => {
                tracing::debug!("{}", err);
                candidate *= 10;
            }
        }
    }

    tracing::warn!("No smaller switch interval accepted, keeping {:?}", original);
    if let Err(err) = hint.set_interval(original) {
        tracing::warn!("Failed to reapply switch interval: {}", err);
    }
    (original, None)
}

impl<H: SchedulingHint> Drop for SwitchIntervalGuard<H> {
    fn drop(&mut self) {
        let hint = &self.hint;
        hint.lease().release(|original| {
            if let Err(err) = hint.set_interval(original) {
                tracing::warn!("Failed to restore switch interval: {}", err);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Hint that only accepts intervals of at least `floor`
    struct FloorHint {
        floor: Duration,
        current: Mutex<Duration>,
        history: Mutex<Vec<Duration>>,
        lease: HintLease,
    }

    impl FloorHint {
        fn new(floor: Duration) -> Self {
            Self {
                floor,
                current: Mutex::new(DEFAULT_SWITCH_INTERVAL),
                history: Mutex::new(Vec::new()),
                lease: HintLease::new(),
            }
        }
    }

    impl SchedulingHint for FloorHint {
        fn interval(&self) -> Duration {
            *self.current.lock()
        }

        fn set_interval(&self, interval: Duration) -> Result<(), HintError> {
            self.history.lock().push(interval);
            if interval < self.floor {
                return Err(HintError::Rejected(interval, "below floor".to_string()));
            }
            *self.current.lock() = interval;
            Ok(())
        }

        fn lease(&self) -> &HintLease {
            &self.lease
        }
    }

    #[test]
    fn lowers_to_first_accepted_candidate() {
        let hint = FloorHint::new(Duration::from_micros(5));
        {
            let guard = SwitchIntervalGuard::lower(&hint);
            assert_eq!(guard.applied(), Some(Duration::from_micros(10)));
            assert_eq!(hint.interval(), Duration::from_micros(10));
        }
        assert_eq!(hint.interval(), DEFAULT_SWITCH_INTERVAL);
    }

    #[test]
    fn falls_back_to_original_when_all_rejected() {
        let hint = FloorHint::new(Duration::from_millis(1));
        {
            let guard = SwitchIntervalGuard::lower(&hint);
            assert_eq!(guard.applied(), None);
            assert_eq!(hint.interval(), DEFAULT_SWITCH_INTERVAL);
        }
        assert_eq!(
            *hint.history.lock(),
            vec![
                Duration::from_micros(1),
                Duration::from_micros(10),
                Duration::from_micros(100),
                DEFAULT_SWITCH_INTERVAL,
                DEFAULT_SWITCH_INTERVAL,
            ]
        );
    }

    #[test]
    fn process_interval_rejects_zero() {
        assert!(ProcessSwitchInterval.set_interval(Duration::ZERO).is_err());
    }

    #[test]
    fn overlapping_guards_restore_once_in_any_drop_order() {
        let hint = FloorHint::new(Duration::from_micros(1));
        let first = SwitchIntervalGuard::lower(&hint);
        let second = SwitchIntervalGuard::lower(&hint);
        assert_eq!(second.original(), DEFAULT_SWITCH_INTERVAL);
        assert_eq!(second.applied(), Some(Duration::from_micros(1)));
        assert_eq!(hint.lease.holders(), 2);

        drop(first);
        assert_eq!(hint.interval(), Duration::from_micros(1));

        drop(second);
        assert_eq!(hint.interval(), DEFAULT_SWITCH_INTERVAL);
        assert_eq!(hint.lease.holders(), 0);
        assert_eq!(
            *hint.history.lock(),
            vec![Duration::from_micros(1), DEFAULT_SWITCH_INTERVAL]
        );
    }

    #[test]
    fn lease_lowers_again_after_full_release() {
        let hint = FloorHint::new(Duration::from_micros(1));
        drop(SwitchIntervalGuard::lower(&hint));
        let guard = SwitchIntervalGuard::lower(&hint);
        assert_eq!(guard.original(), DEFAULT_SWITCH_INTERVAL);
        assert_eq!(hint.interval(), Duration::from_micros(1));
    }
}
