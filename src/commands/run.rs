use anyhow::{Context, Result};
use std::path::Path;

use crate::cli::RunArgs;
use crate::config::{load_config, SweepConfig};
use crate::discovery;
use crate::errors::SweepError;
use crate::executor::AnalysisExecutor;
use crate::orchestrator::{Orchestrator, RunSummary};
use crate::registry::Registry;
use crate::report;

/// Discover, then process every repository against the on-disk registry.
///
/// Only configuration, discovery and registry failures are errors; failed
/// repositories are part of the returned summary.
pub fn execute_sweep(config: &SweepConfig, force: bool) -> Result<RunSummary, SweepError> {
    let repos = discovery::discover(&config.source)?;
    println!("Found {} repository(ies) to analyze", repos.len());

    fs_ready(config)?;
    let registry = Registry::open(&config.paths.registry)?;
    let executor = AnalysisExecutor::system(config.tool.clone(), config.paths.clone());
    let mut orchestrator =
        Orchestrator::new(registry, executor, config.detection.clone()).force(force);

    Ok(orchestrator.run(&repos)?)
}

fn fs_ready(config: &SweepConfig) -> Result<(), SweepError> {
    for dir in [&config.paths.results_dir, &config.paths.work_dir] {
        std::fs::create_dir_all(dir).map_err(|e| SweepError::io(dir, e))?;
    }
    Ok(())
}

pub fn run_sweep(config_path: &Path, args: &RunArgs) -> Result<RunSummary> {
    let mut config = load_config(config_path)?;
    config.paths = args.paths.apply(config.paths);

    let summary = execute_sweep(&config, args.force)
        .with_context(|| format!("Sweep aborted (config: {})", config_path.display()))?;
    print!("{}", report::render_summary(&summary));
    Ok(summary)
}

pub fn discover_repos(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let repos = discovery::discover(&config.source)?;
    print!("{}", report::render_discovered(&repos));
    Ok(())
}
