pub mod barrier;
pub mod os_thread_launcher;
pub mod switch_interval;

pub use barrier::{Barrier, BarrierWaitError, BarrierWaitResult};
pub use os_thread_launcher::{OsThreadLauncher, WORKER_THREAD_PREFIX};
pub use switch_interval::{
    yield_point, ProcessSwitchInterval, SwitchIntervalGuard, DEFAULT_SWITCH_INTERVAL,
};
