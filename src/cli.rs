use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{PathsConfig, DEFAULT_CONFIG_PATH};

#[derive(Parser, Debug)]
#[command(name = "analysis-sweep")]
#[command(about = "Run a long-running analysis tool across repositories, idempotently", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub run: RunArgs,

    #[command(flatten)]
    pub global: GlobalArgs,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Increase verbosity level (can be repeated: -v, -vv)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbosity: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbosity")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub plain: bool,
}

/// Options for the default sweep run.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Re-analyze repositories already marked as analyzed
    #[arg(long, env = "ANALYSIS_SWEEP_FORCE")]
    pub force: bool,

    #[command(flatten)]
    pub paths: PathOverrides,
}

/// Command-line overrides for the `paths` section of the config.
#[derive(Args, Debug, Clone, Default)]
pub struct PathOverrides {
    /// Registry file (overrides paths.registry)
    #[arg(long)]
    pub registry: Option<PathBuf>,

    /// Results directory (overrides paths.results_dir)
    #[arg(long = "results-dir")]
    pub results_dir: Option<PathBuf>,

    /// Scratch directory for clones (overrides paths.work_dir)
    #[arg(long = "work-dir")]
    pub work_dir: Option<PathBuf>,
}

impl PathOverrides {
    pub fn apply(&self, mut paths: PathsConfig) -> PathsConfig {
        if let Some(registry) = &self.registry {
            paths.registry = registry.clone();
        }
        if let Some(results_dir) = &self.results_dir {
            paths.results_dir = results_dir.clone();
        }
        if let Some(work_dir) = &self.work_dir {
            paths.work_dir = work_dir.clone();
        }
        paths
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve and print the repositories a run would visit
    Discover,

    /// Show the run registry
    Status {
        /// Registry file (overrides paths.registry)
        #[arg(long)]
        registry: Option<PathBuf>,
    },

    /// Write a template configuration file
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}
