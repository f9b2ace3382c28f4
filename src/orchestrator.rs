//! End-to-end run over the discovered repositories.
//!
//! Repositories are processed one at a time in discovery order. Each one is
//! either skipped (already analyzed, not forced) or taken through
//! `running -> execute -> classify -> analyzed|failed`, after which its output
//! is harvested and its checkout removed. A failure in one repository is
//! recorded and the loop moves on; only registry persistence failures stop
//! the run, since progress could no longer be recorded.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::DetectionConfig;
use crate::detection::{classify, gather_evidence, Verdict};
use crate::discovery::RepoDescriptor;
use crate::errors::{RegistryError, RepoError};
use crate::executor::{AnalysisExecutor, Cloner, ToolRunner};
use crate::registry::{Outcome, Registry, RegistryStore};

/// How one repository ended up in this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoResult {
    Skipped,
    Analyzed { verdict: Verdict, harvested: usize },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoReport {
    pub name: String,
    pub result: RepoResult,
}

/// Per-repository results of a run, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub reports: Vec<RepoReport>,
}

impl RunSummary {
    pub fn skipped(&self) -> usize {
        self.count(|r| matches!(r, RepoResult::Skipped))
    }

    pub fn analyzed(&self) -> usize {
        self.count(|r| matches!(r, RepoResult::Analyzed { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|r| matches!(r, RepoResult::Failed { .. }))
    }

    pub fn total(&self) -> usize {
        self.reports.len()
    }

    pub fn get(&self, name: &str) -> Option<&RepoResult> {
        self.reports
            .iter()
            .find(|report| report.name == name)
            .map(|report| &report.result)
    }

    fn count(&self, pred: impl Fn(&RepoResult) -> bool) -> usize {
        self.reports.iter().filter(|r| pred(&r.result)).count()
    }
}

pub struct Orchestrator<S: RegistryStore, C, T> {
    registry: Registry<S>,
    executor: AnalysisExecutor<C, T>,
    detection: DetectionConfig,
    force: bool,
}

impl<S, C, T> Orchestrator<S, C, T>
where
    S: RegistryStore,
    C: Cloner,
    T: ToolRunner,
{
    pub fn new(
        registry: Registry<S>,
        executor: AnalysisExecutor<C, T>,
        detection: DetectionConfig,
    ) -> Self {
        Self {
            registry,
            executor,
            detection,
            force: false,
        }
    }

    /// Re-process repositories even when they are already analyzed.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn registry(&self) -> &Registry<S> {
        &self.registry
    }

    pub fn into_registry(self) -> Registry<S> {
        self.registry
    }

    pub fn run(&mut self, repos: &[RepoDescriptor]) -> Result<RunSummary, RegistryError> {
        let added = self.registry.register_discovered(repos)?;
        tracing::info!(
            repos = repos.len(),
            new = added,
            force = self.force,
            "Starting sweep"
        );

        let mut summary = RunSummary::default();
        for repo in repos {
            let result = self.process(repo)?;
            summary.reports.push(RepoReport {
                name: repo.name.clone(),
                result,
            });
        }

        tracing::info!(
            analyzed = summary.analyzed(),
            failed = summary.failed(),
            skipped = summary.skipped(),
            "Sweep complete"
        );
        Ok(summary)
    }

    /// Take one repository through its lifecycle.
    pub fn process(&mut self, repo: &RepoDescriptor) -> Result<RepoResult, RegistryError> {
        let _span = tracing::info_span!("repo", name = %repo.name).entered();

        if !self.registry.should_process(&repo.name, self.force) {
            tracing::info!("Already analyzed, skipping");
            return Ok(RepoResult::Skipped);
        }

        self.registry.mark_running(repo)?;

        let paths = self.executor.paths();
        let output_dir = paths.output_dir(&repo.name);
        let log_path = paths.log_path(&repo.name);

        let workspace = match self.executor.acquire_workspace(repo) {
            Ok(workspace) => workspace,
            Err(e) => return self.record_failure(repo, &output_dir, &log_path, &e),
        };

        let record = match self.executor.execute(repo, &workspace) {
            Ok(record) => record,
            Err(e) => {
                let result = self.record_failure(repo, &output_dir, &log_path, &e);
                release(workspace);
                return result;
            }
        };

        let evidence = gather_evidence(
            record.exit_code,
            &record.log_path,
            &record.output_dir_candidate,
            &self.detection,
        );
        let verdict = classify(&evidence);

        let result = if verdict.is_success() {
            if verdict.overrides_exit_code() {
                tracing::warn!(
                    exit_code = ?verdict.exit_code,
                    "Tool reported failure but produced output; treating as analyzed"
                );
            }
            self.registry.mark_outcome(
                &repo.name,
                Outcome::analyzed(&output_dir, &record.log_path),
            )?;
            match harvest_outputs(&record.clone_dir, &output_dir, &self.detection.harvest) {
                Ok(harvested) => {
                    if harvested == 0 {
                        tracing::warn!("No standard output folders found; check the log file");
                    }
                    tracing::info!(harvested, output = %output_dir.display(), "Analyzed");
                    RepoResult::Analyzed { verdict, harvested }
                }
                Err(e) => {
                    let reason = format!("failed to copy output to {}: {}", output_dir.display(), e);
                    tracing::error!(error = %e, "Output harvest failed");
                    self.registry.mark_outcome(
                        &repo.name,
                        Outcome::failed(&output_dir, &record.log_path, &reason),
                    )?;
                    RepoResult::Failed { reason }
                }
            }
        } else {
            let reason = verdict.describe();
            tracing::error!(
                log = %record.log_path.display(),
                reason = %reason,
                "Analysis failed"
            );
            self.registry.mark_outcome(
                &repo.name,
                Outcome::failed(&output_dir, &record.log_path, &reason),
            )?;
            RepoResult::Failed { reason }
        };

        release(workspace);
        Ok(result)
    }

    fn record_failure(
        &mut self,
        repo: &RepoDescriptor,
        output_dir: &Path,
        log_path: &Path,
        error: &RepoError,
    ) -> Result<RepoResult, RegistryError> {
        let reason = error.to_string();
        tracing::error!(kind = error.category(), error = %reason, "Repository failed");
        self.registry
            .mark_outcome(&repo.name, Outcome::failed(output_dir, log_path, &reason))?;
        Ok(RepoResult::Failed { reason })
    }
}

fn release(workspace: crate::executor::Workspace) {
    let path = workspace.path().to_path_buf();
    match workspace.close() {
        Ok(()) => tracing::debug!(dir = %path.display(), "Removed checkout"),
        Err(e) => tracing::warn!(dir = %path.display(), error = %e, "Failed to remove checkout"),
    }
}

/// Whether a top-level checkout entry is tool output worth keeping.
pub fn is_harvestable(name: &str, harvest: &[String]) -> bool {
    name != ".git" && (name.starts_with(".aws") || harvest.iter().any(|h| h == name))
}

/// Copy harvestable top-level entries of `checkout` into `dest`, merging
/// with whatever is already there. Returns the number of entries copied.
pub fn harvest_outputs(checkout: &Path, dest: &Path, harvest: &[String]) -> io::Result<usize> {
    fs::create_dir_all(dest)?;
    let mut copied = 0;
    for entry in fs::read_dir(checkout)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !is_harvestable(name, harvest) {
            continue;
        }
        let target = dest.join(name);
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
        tracing::debug!(entry = name, "Copied output");
        copied += 1;
    }
    Ok(copied)
}

fn copy_tree(src: &Path, dest: &Path) -> io::Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(io::Error::other)?;
        let target: PathBuf = dest.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn harvest() -> Vec<String> {
        DetectionConfig::default().harvest
    }

    #[test]
    fn harvestable_entries() {
        let h = harvest();
        assert!(is_harvestable("Documentation", &h));
        assert!(is_harvestable(".aws-transform", &h));
        assert!(!is_harvestable(".git", &h));
        assert!(!is_harvestable("src", &h));
    }

    #[test]
    fn harvest_copies_nested_output_and_merges() {
        let checkout = tempfile::TempDir::new().unwrap();
        let docs = checkout.path().join("Documentation").join("modules");
        fs::create_dir_all(&docs).unwrap();
        fs::write(docs.join("a.md"), "a").unwrap();
        fs::create_dir_all(checkout.path().join(".git")).unwrap();
        fs::write(checkout.path().join(".git").join("HEAD"), "ref").unwrap();
        fs::create_dir_all(checkout.path().join("src")).unwrap();
        fs::write(checkout.path().join(".aws_summary.json"), "{}").unwrap();

        let results = tempfile::TempDir::new().unwrap();
        let dest = results.path().join("r1").join("analysis");
        fs::create_dir_all(dest.join("Documentation")).unwrap();
        fs::write(dest.join("Documentation").join("old.md"), "old").unwrap();

        let copied = harvest_outputs(checkout.path(), &dest, &harvest()).unwrap();

        assert_eq!(copied, 2);
        assert!(dest.join("Documentation/modules/a.md").exists());
        assert!(dest.join("Documentation/old.md").exists());
        assert!(dest.join(".aws_summary.json").exists());
        assert!(!dest.join(".git").exists());
        assert!(!dest.join("src").exists());
    }

    #[test]
    fn summary_counts() {
        let summary = RunSummary {
            reports: vec![
                RepoReport {
                    name: "a".into(),
                    result: RepoResult::Skipped,
                },
                RepoReport {
                    name: "b".into(),
                    result: RepoResult::Failed {
                        reason: "x".into(),
                    },
                },
            ],
        };
        assert_eq!(summary.skipped(), 1);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.analyzed(), 0);
        assert_eq!(summary.total(), 2);
        assert_eq!(summary.get("a"), Some(&RepoResult::Skipped));
    }
}
