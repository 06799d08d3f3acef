pub mod scheduling_hint;
pub mod worker_launcher;

pub use scheduling_hint::{HintError, HintLease, SchedulingHint};
pub use worker_launcher::WorkerLauncher;
