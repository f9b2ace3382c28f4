//! Per-repository execution of the external analysis tool.
//!
//! The executor clones a repository into a scoped [`Workspace`], runs the
//! tool against the checkout with stdout and stderr streamed to a log file,
//! and reports what happened as an [`ExecutionRecord`]. It never decides
//! success; that is [`crate::detection`]'s job.
//!
//! Cloning and process launching sit behind the [`Cloner`] and [`ToolRunner`]
//! traits so the orchestrator can be driven without git or the real tool.

mod git;
mod tool;

pub use git::GitCloner;
pub use tool::ProcessRunner;

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::config::{PathsConfig, ToolConfig};
use crate::discovery::RepoDescriptor;
use crate::errors::RepoError;

/// Clones a repository into an existing empty directory.
pub trait Cloner {
    fn clone_repo(&self, repo: &RepoDescriptor, dest: &Path) -> Result<(), RepoError>;
}

/// A fully resolved tool launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    /// Receives stdout and stderr, merged.
    pub log_path: PathBuf,
}

/// Launches the analysis tool and waits for it.
pub trait ToolRunner {
    /// Run to completion, returning the exit code (`None` if killed by a
    /// signal). Only launch failures are errors; a non-zero exit is not.
    fn run(&self, invocation: &ToolInvocation) -> Result<Option<i32>, RepoError>;
}

/// Uniquely named scratch directory holding one repository's checkout.
///
/// Removed when dropped; [`Workspace::close`] removes it eagerly and reports
/// failures.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a fresh workspace under `work_dir`, creating `work_dir` if needed.
    pub fn acquire(work_dir: &Path, repo_name: &str) -> Result<Self, RepoError> {
        fs::create_dir_all(work_dir).map_err(|e| RepoError::io(work_dir, e))?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("{}-", repo_name))
            .tempdir_in(work_dir)
            .map_err(|e| RepoError::io(work_dir, e))?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn close(self) -> std::io::Result<()> {
        self.dir.close()
    }
}

/// What one tool run left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRecord {
    pub exit_code: Option<i32>,
    pub log_path: PathBuf,
    pub clone_dir: PathBuf,
    /// Where the tool is expected to have written its output.
    pub output_dir_candidate: PathBuf,
}

pub struct AnalysisExecutor<C, T> {
    cloner: C,
    runner: T,
    tool: ToolConfig,
    paths: PathsConfig,
}

impl AnalysisExecutor<GitCloner, ProcessRunner> {
    /// Executor backed by libgit2 and a real subprocess.
    pub fn system(tool: ToolConfig, paths: PathsConfig) -> Self {
        Self::new(GitCloner::from_env(), ProcessRunner, tool, paths)
    }
}

impl<C: Cloner, T: ToolRunner> AnalysisExecutor<C, T> {
    pub fn new(cloner: C, runner: T, tool: ToolConfig, paths: PathsConfig) -> Self {
        Self {
            cloner,
            runner,
            tool,
            paths,
        }
    }

    pub fn paths(&self) -> &PathsConfig {
        &self.paths
    }

    pub fn acquire_workspace(&self, repo: &RepoDescriptor) -> Result<Workspace, RepoError> {
        Workspace::acquire(&self.paths.work_dir, &repo.name)
    }

    /// Clone `repo` into `workspace` and run the tool against it.
    pub fn execute(
        &self,
        repo: &RepoDescriptor,
        workspace: &Workspace,
    ) -> Result<ExecutionRecord, RepoError> {
        let clone_dir = workspace.path().to_path_buf();

        tracing::info!(url = %repo.clone_url, dir = %clone_dir.display(), "Cloning");
        self.cloner.clone_repo(repo, &clone_dir)?;
        tracing::info!("Repository cloned");

        let invocation = ToolInvocation {
            program: self.tool.executable.clone(),
            args: self.tool.command_args(&clone_dir),
            working_dir: clone_dir.clone(),
            log_path: self.paths.log_path(&repo.name),
        };
        tracing::info!(
            transformation = %self.tool.transformation,
            log = %invocation.log_path.display(),
            "Running analysis tool"
        );
        let exit_code = self.runner.run(&invocation)?;
        tracing::info!(?exit_code, "Analysis tool exited");

        Ok(ExecutionRecord {
            exit_code,
            log_path: invocation.log_path,
            output_dir_candidate: clone_dir.clone(),
            clone_dir,
        })
    }
}
