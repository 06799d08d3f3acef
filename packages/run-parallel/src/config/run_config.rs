//! Run configuration
//!
//! Everything the orchestration layer feeds into the core: worker and
//! iteration counts, the skip-instead-of-demote policy, and the extra
//! thread-unsafe fixture and function names.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use super::error::{ConfigError, ConfigResult};
use crate::features::thread_safety::SkipSet;

/// Fixtures that always force a test onto a single worker
pub const DEFAULT_THREAD_UNSAFE_FIXTURES: &[&str] = &["env_guard", "current_dir", "captured_output"];

const ENV_THREADS: &str = "RUN_PARALLEL_THREADS";
const ENV_ITERATIONS: &str = "RUN_PARALLEL_ITERATIONS";
const ENV_SKIP_THREAD_UNSAFE: &str = "RUN_PARALLEL_SKIP_THREAD_UNSAFE";
const ENV_VERBOSE: &str = "RUN_PARALLEL_VERBOSE";

/// Requested number of worker threads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WorkerCountRepr", into = "WorkerCountRepr")]
pub enum WorkerCount {
    /// One worker per available CPU
    Auto,
    /// Exactly `n` workers
    Fixed(usize),
}

impl WorkerCount {
    /// Concrete worker count (never 0)
    pub fn resolve(self) -> usize {
        match self {
            WorkerCount::Auto => num_cpus::get().max(1),
            WorkerCount::Fixed(n) => n.max(1),
        }
    }
}

impl Default for WorkerCount {
    fn default() -> Self {
        WorkerCount::Fixed(1)
    }
}

impl fmt::Display for WorkerCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerCount::Auto => write!(f, "auto"),
            WorkerCount::Fixed(n) => write!(f, "{}", n),
        }
    }
}

impl FromStr for WorkerCount {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Ok(WorkerCount::Auto);
        }
        match s.parse::<usize>() {
            Ok(n) if n >= 1 => Ok(WorkerCount::Fixed(n)),
            _ => Err(ConfigError::WorkerCount(s.to_string())),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WorkerCountRepr {
    Number(usize),
    Text(String),
}

impl TryFrom<WorkerCountRepr> for WorkerCount {
    type Error = ConfigError;

    fn try_from(repr: WorkerCountRepr) -> Result<Self, Self::Error> {
        match repr {
            WorkerCountRepr::Number(0) => Err(ConfigError::WorkerCount("0".to_string())),
            WorkerCountRepr::Number(n) => Ok(WorkerCount::Fixed(n)),
            WorkerCountRepr::Text(text) => text.parse(),
        }
    }
}

impl From<WorkerCount> for WorkerCountRepr {
    fn from(count: WorkerCount) -> Self {
        match count {
            WorkerCount::Auto => WorkerCountRepr::Text("auto".to_string()),
            WorkerCount::Fixed(n) => WorkerCountRepr::Number(n),
        }
    }
}

/// Run-wide configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunParallelConfig {
    /// Default number of workers per test
    pub parallel_threads: WorkerCount,

    /// Default number of iterations per worker
    pub iterations: usize,

    /// Skip thread-unsafe tests instead of running them on one worker
    pub skip_thread_unsafe: bool,

    /// Extra fixture names that force a single worker
    pub thread_unsafe_fixtures: Vec<String>,

    /// Extra fully qualified functions treated as thread-unsafe (`a::b::f`, `a::b::*`)
    pub thread_unsafe_functions: Vec<String>,

    /// List every serial test in the run summary
    pub verbose: bool,
}

impl Default for RunParallelConfig {
    fn default() -> Self {
        Self {
            parallel_threads: WorkerCount::default(),
            iterations: 1,
            skip_thread_unsafe: false,
            thread_unsafe_fixtures: Vec::new(),
            thread_unsafe_functions: Vec::new(),
            verbose: false,
        }
    }
}

impl RunParallelConfig {
    /// Load and validate a YAML configuration file
    pub fn from_yaml(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse and validate YAML configuration text
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `RUN_PARALLEL_*` overrides from the process environment
    pub fn apply_env(self) -> ConfigResult<Self> {
        self.apply_env_from(|var| std::env::var(var).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_env_from<F>(mut self, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_THREADS) {
            self.parallel_threads = value.parse()?;
        }
        if let Some(value) = lookup(ENV_ITERATIONS) {
            self.iterations = value.trim().parse().map_err(|_| ConfigError::Env {
                var: ENV_ITERATIONS.to_string(),
                value: value.clone(),
            })?;
        }
        if let Some(value) = lookup(ENV_SKIP_THREAD_UNSAFE) {
            self.skip_thread_unsafe = parse_flag(ENV_SKIP_THREAD_UNSAFE, &value)?;
        }
        if let Some(value) = lookup(ENV_VERBOSE) {
            self.verbose = parse_flag(ENV_VERBOSE, &value)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Range and format checks
    pub fn validate(&self) -> ConfigResult<()> {
        if self.iterations == 0 {
            return Err(ConfigError::Range {
                field: "iterations".to_string(),
                value: "0".to_string(),
                hint: "Each worker must run the test at least once".to_string(),
            });
        }
        if let WorkerCount::Fixed(0) = self.parallel_threads {
            return Err(ConfigError::WorkerCount("0".to_string()));
        }
        self.skip_set().map(|_| ())
    }

    /// Configured thread-unsafe functions as analyzer exclusions
    pub fn skip_set(&self) -> ConfigResult<SkipSet> {
        SkipSet::from_qualified(&self.thread_unsafe_functions)
    }

    /// Default fixtures plus the configured ones
    pub fn unsafe_fixtures(&self) -> Vec<String> {
        let mut fixtures: Vec<String> = DEFAULT_THREAD_UNSAFE_FIXTURES
            .iter()
            .map(|s| s.to_string())
            .collect();
        for fixture in &self.thread_unsafe_fixtures {
            if !fixtures.contains(fixture) {
                fixtures.push(fixture.clone());
            }
        }
        fixtures
    }
}

fn parse_flag(var: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::Env {
            var: var.to_string(),
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn defaults_run_serially_once() {
        let config = RunParallelConfig::default();
        assert_eq!(config.parallel_threads.resolve(), 1);
        assert_eq!(config.iterations, 1);
        assert!(!config.skip_thread_unsafe);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn yaml_accepts_number_and_auto() {
        let config = RunParallelConfig::from_yaml_str(
            "parallel_threads: 4\niterations: 3\nthread_unsafe_functions:\n  - my_crate::globals::reset\n",
        )
        .unwrap();
        assert_eq!(config.parallel_threads, WorkerCount::Fixed(4));
        assert_eq!(config.iterations, 3);
        assert_eq!(config.skip_set().unwrap().len(), 1);

        let config = RunParallelConfig::from_yaml_str("parallel_threads: auto\n").unwrap();
        assert_eq!(config.parallel_threads, WorkerCount::Auto);
        assert!(config.parallel_threads.resolve() >= 1);
    }

    #[test]
    fn yaml_rejects_bad_values() {
        assert!(RunParallelConfig::from_yaml_str("parallel_threads: 0\n").is_err());
        assert!(RunParallelConfig::from_yaml_str("parallel_threads: many\n").is_err());
        assert!(RunParallelConfig::from_yaml_str("iterations: 0\n").is_err());
        assert!(RunParallelConfig::from_yaml_str("unknown_field: 1\n").is_err());
        assert!(matches!(
            RunParallelConfig::from_yaml_str("thread_unsafe_functions: [reset]\n"),
            Err(ConfigError::FunctionPath(_))
        ));
    }

    #[test]
    fn env_overrides_win() {
        let vars: HashMap<&str, &str> = [
            ("RUN_PARALLEL_THREADS", "8"),
            ("RUN_PARALLEL_ITERATIONS", "2"),
            ("RUN_PARALLEL_SKIP_THREAD_UNSAFE", "true"),
            ("RUN_PARALLEL_VERBOSE", "1"),
        ]
        .into_iter()
        .collect();
        let config = RunParallelConfig::default()
            .apply_env_from(|var| vars.get(var).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.parallel_threads, WorkerCount::Fixed(8));
        assert_eq!(config.iterations, 2);
        assert!(config.skip_thread_unsafe);
        assert!(config.verbose);
    }

    #[test]
    fn env_rejects_garbage() {
        let result = RunParallelConfig::default()
            .apply_env_from(|var| (var == "RUN_PARALLEL_VERBOSE").then(|| "maybe".to_string()));
        assert!(matches!(result, Err(ConfigError::Env { .. })));
    }

    #[test]
    fn unsafe_fixtures_merge_without_duplicates() {
        let config = RunParallelConfig {
            thread_unsafe_fixtures: vec!["db".to_string(), "env_guard".to_string()],
            ..Default::default()
        };
        assert_eq!(
            config.unsafe_fixtures(),
            vec!["env_guard", "current_dir", "captured_output", "db"]
        );
    }

    #[test]
    fn config_round_trips_through_yaml() {
        let config = RunParallelConfig {
            parallel_threads: WorkerCount::Auto,
            ..Default::default()
        };
        let text = serde_yaml::to_string(&config).unwrap();
        assert_eq!(RunParallelConfig::from_yaml_str(&text).unwrap(), config);
    }
}
