//! Sweep configuration.
//!
//! The YAML document names exactly one repository source (`mode: single` or
//! `mode: org_scan`) plus optional sections for the external tool, success
//! detection and filesystem layout. [`loader`] turns the loosely typed
//! document into a [`SweepConfig`] whose source is a tagged union, so the
//! rest of the pipeline never sees an invalid shape.

mod loader;

pub use loader::{load_config, parse_config, read_config_file, CONFIG_TEMPLATE};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default location of the configuration document.
pub const DEFAULT_CONFIG_PATH: &str = "config/repos.yaml";

/// Fully validated configuration for one sweep run.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepConfig {
    pub source: RepoSourceConfig,
    pub tool: ToolConfig,
    pub detection: DetectionConfig,
    pub paths: PathsConfig,
}

/// Where the repository list comes from. Exactly one mode is active.
#[derive(Debug, Clone, PartialEq)]
pub enum RepoSourceConfig {
    Single(SingleRepoConfig),
    OrgScan(OrgScanConfig),
}

impl RepoSourceConfig {
    pub fn mode_name(&self) -> &'static str {
        match self {
            Self::Single(_) => "single",
            Self::OrgScan(_) => "org_scan",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleRepoConfig {
    pub name: String,
    pub git_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgScanConfig {
    /// Organization (or user account) to enumerate.
    pub github_org: String,
    pub filters: RepoFilters,
    /// Cap on repositories selected per run; `None` means no cap.
    pub max_repos_per_run: Option<usize>,
}

/// Client-side filters applied to listed repositories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoFilters {
    /// Keep only repositories using this language (case-insensitive).
    #[serde(default)]
    pub language: Option<String>,

    #[serde(default)]
    pub exclude_archived: bool,

    #[serde(default)]
    pub exclude_forks: bool,
}

impl RepoFilters {
    /// The language filter, ignoring blank values.
    pub fn language(&self) -> Option<&str> {
        self.language
            .as_deref()
            .map(str::trim)
            .filter(|lang| !lang.is_empty())
    }
}

/// External analysis tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Executable name or path; resolved through `PATH` when bare.
    #[serde(default = "default_executable")]
    pub executable: String,

    /// Transformation definition passed to the tool.
    #[serde(default = "default_transformation")]
    pub transformation: String,

    /// Extra arguments appended after the standard ones.
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            executable: default_executable(),
            transformation: default_transformation(),
            args: Vec::new(),
        }
    }
}

impl ToolConfig {
    /// Full argument vector for one repository checkout.
    ///
    /// `custom def exec -n <transformation> -p <dir> -x -t`: non-interactive,
    /// trusting all tools.
    pub fn command_args(&self, clone_dir: &Path) -> Vec<String> {
        let mut args = vec![
            "custom".to_string(),
            "def".to_string(),
            "exec".to_string(),
            "-n".to_string(),
            self.transformation.clone(),
            "-p".to_string(),
            clone_dir.display().to_string(),
            "-x".to_string(),
            "-t".to_string(),
        ];
        args.extend(self.args.iter().cloned());
        args
    }
}

/// Signals used to decide whether a run produced usable output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Literal phrase the tool logs on successful completion.
    #[serde(default = "default_success_marker")]
    pub success_marker: String,

    /// Output directories that must all exist and be non-empty.
    #[serde(default = "default_expected_outputs")]
    pub expected_outputs: Vec<String>,

    /// Top-level entries copied from the checkout into the results directory.
    #[serde(default = "default_harvest")]
    pub harvest: Vec<String>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            success_marker: default_success_marker(),
            expected_outputs: default_expected_outputs(),
            harvest: default_harvest(),
        }
    }
}

/// Filesystem layout of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_registry_path")]
    pub registry: PathBuf,

    /// Per-repository analysis output and logs land here.
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,

    /// Scratch space for clones.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            registry: default_registry_path(),
            results_dir: default_results_dir(),
            work_dir: default_work_dir(),
        }
    }
}

impl PathsConfig {
    /// `<results_dir>/<repo>/analysis`
    pub fn output_dir(&self, repo_name: &str) -> PathBuf {
        self.results_dir.join(repo_name).join("analysis")
    }

    /// `<results_dir>/<repo>_transform.log`
    pub fn log_path(&self, repo_name: &str) -> PathBuf {
        self.results_dir.join(format!("{}_transform.log", repo_name))
    }
}

/// Whether `name` can be joined onto a directory without escaping it: no
/// path separators, no `..`, not empty.
pub fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && !name.contains("..")
        && !name.contains(['/', '\\'])
        && !Path::new(name).is_absolute()
}

pub fn default_executable() -> String {
    "atx".to_string()
}

pub fn default_transformation() -> String {
    "AWS/early-access-comprehensive-codebase-analysis".to_string()
}

pub fn default_success_marker() -> String {
    "Transformation completed successfully".to_string()
}

pub fn default_expected_outputs() -> Vec<String> {
    vec!["Documentation".to_string(), ".atx".to_string()]
}

pub fn default_harvest() -> Vec<String> {
    [
        ".aws",
        "Documentation",
        ".atx",
        "transform_output",
        "analysis_output",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

pub fn default_registry_path() -> PathBuf {
    PathBuf::from("repos/analysis_registry.yaml")
}

pub fn default_results_dir() -> PathBuf {
    PathBuf::from("repos")
}

pub fn default_work_dir() -> PathBuf {
    PathBuf::from("tmp")
}
