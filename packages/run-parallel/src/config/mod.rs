//! Configuration system
//!
//! Three layers, later ones win:
//! - Defaults (`RunParallelConfig::default()`)
//! - YAML file (`RunParallelConfig::from_yaml`)
//! - Environment (`RUN_PARALLEL_*`, `RunParallelConfig::apply_env`)
//!
//! # Examples
//!
//! ```rust,ignore
//! use run_parallel::config::RunParallelConfig;
//!
//! let config = RunParallelConfig::from_yaml("run-parallel.yaml")?.apply_env()?;
//! let workers = config.parallel_threads.resolve();
//! ```

pub mod error;
pub mod run_config;

pub use error::{ConfigError, ConfigResult};
pub use run_config::{RunParallelConfig, WorkerCount, DEFAULT_THREAD_UNSAFE_FIXTURES};
