//! Thread Audit CLI
//!
//! Plans every test of a crate's source tree the way a parallel run would and
//! prints which tests keep their workers and which are demoted (and why).
//!
//! # Usage
//!
//! ```bash
//! thread-audit src --threads 8
//! thread-audit src --config run-parallel.yaml --format json
//! RUST_LOG=run_parallel=debug thread-audit tests --crate-name integration
//! ```

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use rayon::prelude::*;
use run_parallel::features::thread_safety::load_source_tree;
use run_parallel::pipeline::{collection_summary, PlannedTest, RunSummary, TestItem, TestPlanner};
use run_parallel::{RunParallelConfig, ThreadSafetyAnalyzer, WorkerCount};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "thread-audit")]
#[command(about = "Report which tests can run in parallel threads", long_about = None)]
struct Cli {
    /// Source directory of the crate (usually `src` or `tests`)
    source: PathBuf,

    /// Name used for the crate root module (defaults to the parent directory name)
    #[arg(long)]
    crate_name: Option<String>,

    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Worker threads per test (`auto` = one per CPU)
    #[arg(short, long)]
    threads: Option<WorkerCount>,

    /// Iterations per worker
    #[arg(short, long)]
    iterations: Option<usize>,

    /// Report thread-unsafe tests as skipped instead of demoted
    #[arg(long)]
    skip_thread_unsafe: bool,

    /// List every test that will not run in parallel
    #[arg(short, long)]
    verbose: bool,

    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("run_parallel=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let crate_name = cli.crate_name.clone().unwrap_or_else(|| default_crate_name(&cli.source));

    let registry = load_source_tree(&cli.source, &crate_name)?;
    let items: Vec<TestItem> = registry
        .test_functions()
        .iter()
        .map(|item| TestItem::from_fn_item(item))
        .collect();

    let analyzer = ThreadSafetyAnalyzer::new(registry);
    let planner = TestPlanner::new(&config, &analyzer)?;
    let planned: Vec<PlannedTest> = items.par_iter().map(|item| planner.plan(item)).collect();

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&planned)?),
        OutputFormat::Text => print_text(&planned),
    }

    println!("{}", collection_summary(&planned));
    let mut summary = RunSummary::new(&config);
    for test in &planned {
        summary.record(test);
    }
    for line in summary.lines() {
        println!("{}", line);
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<RunParallelConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => RunParallelConfig::from_yaml(path)?,
        None => RunParallelConfig::default(),
    }
    .apply_env()?;

    if let Some(threads) = cli.threads {
        config.parallel_threads = threads;
    }
    if let Some(iterations) = cli.iterations {
        config.iterations = iterations;
    }
    config.skip_thread_unsafe |= cli.skip_thread_unsafe;
    config.verbose |= cli.verbose;
    config.validate()?;
    Ok(config)
}

fn default_crate_name(source: &std::path::Path) -> String {
    source
        .canonicalize()
        .ok()
        .and_then(|path| path.parent().and_then(|p| p.file_name()).map(|n| n.to_string_lossy().into_owned()))
        .map(|name| name.replace('-', "_"))
        .unwrap_or_else(|| "crate".to_string())
}

fn print_text(planned: &[PlannedTest]) {
    for test in planned {
        let status = match (&test.skip, &test.thread_unsafe_reason) {
            (Some(skip), _) => format!("SKIP     {}", skip),
            (None, Some(reason)) => format!("SERIAL   {}", reason),
            (None, None) if test.is_parallel() => format!(
                "PARALLEL {} threads × {} iterations",
                test.num_parallel_threads(),
                test.num_iterations()
            ),
            (None, None) => "SERIAL".to_string(),
        };
        println!("{:<60} {}", test.id, status);
    }
}
