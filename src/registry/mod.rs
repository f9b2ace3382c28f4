//! Persisted run registry.
//!
//! The registry maps repository name to its last known [`RunStatus`] and is
//! the only thing that decides whether a repository is skipped. It is loaded
//! once per run and rewritten through its [`RegistryStore`] after every
//! mutation, so a crash loses at most the repository in flight.
//!
//! Only `analyzed` is terminal. `pending`, `running` and `failed` entries are
//! always picked up again, which is what makes an interrupted run (left in
//! `running`) safe to resume. There is no locking: one writer per registry
//! file.

mod store;

pub use store::{MemoryStore, RegistryDocument, RegistryStore, YamlFileStore};

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::discovery::RepoDescriptor;
use crate::errors::RegistryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Analyzed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Analyzed => "analyzed",
            Self::Failed => "failed",
        }
    }

    /// Whether this status short-circuits re-processing.
    pub fn is_terminal_success(&self) -> bool {
        matches!(self, Self::Analyzed)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status a finished run can be recorded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalStatus {
    Analyzed,
    Failed,
}

impl From<FinalStatus> for RunStatus {
    fn from(status: FinalStatus) -> Self {
        match status {
            FinalStatus::Analyzed => RunStatus::Analyzed,
            FinalStatus::Failed => RunStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// Map key; not repeated inside the persisted entry.
    #[serde(skip)]
    pub repo_name: String,

    #[serde(rename = "analysis_status")]
    pub status: RunStatus,

    #[serde(default)]
    pub git_url: String,

    #[serde(default)]
    pub analysis_output_path: PathBuf,

    #[serde(default)]
    pub log_path: PathBuf,

    /// Naive timestamps from older registries are read as UTC.
    #[serde(alias = "analysis_date", deserialize_with = "deserialize_timestamp")]
    pub last_updated: DateTime<Utc>,

    /// Last failure reason; cleared once the repository is analyzed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl RegistryEntry {
    fn new(repo: &RepoDescriptor, status: RunStatus) -> Self {
        Self {
            repo_name: repo.name.clone(),
            status,
            git_url: repo.clone_url.clone(),
            analysis_output_path: PathBuf::new(),
            log_path: PathBuf::new(),
            last_updated: Utc::now(),
            notes: None,
        }
    }
}

/// Parse an RFC 3339 timestamp, or a naive `YYYY-MM-DDTHH:MM:SS[.f]` one
/// taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp `{}`", raw)))
}

/// Final state of one repository run, as handed to [`Registry::mark_outcome`].
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub status: FinalStatus,
    pub output_path: PathBuf,
    pub log_path: PathBuf,
    pub notes: Option<String>,
}

impl Outcome {
    pub fn analyzed(output_path: impl Into<PathBuf>, log_path: impl Into<PathBuf>) -> Self {
        Self {
            status: FinalStatus::Analyzed,
            output_path: output_path.into(),
            log_path: log_path.into(),
            notes: None,
        }
    }

    pub fn failed(
        output_path: impl Into<PathBuf>,
        log_path: impl Into<PathBuf>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            status: FinalStatus::Failed,
            output_path: output_path.into(),
            log_path: log_path.into(),
            notes: Some(reason.into()),
        }
    }
}

/// In-memory view of the registry bound to its backing store.
pub struct Registry<S: RegistryStore> {
    store: S,
    entries: BTreeMap<String, RegistryEntry>,
}

impl Registry<YamlFileStore> {
    /// Load the registry file at `path`; a missing file is an empty registry.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        Self::load(YamlFileStore::new(path.as_ref()))
    }
}

impl<S: RegistryStore> Registry<S> {
    pub fn load(store: S) -> Result<Self, RegistryError> {
        let entries = store.load()?.into_entries();
        tracing::debug!(entries = entries.len(), "Loaded registry");
        Ok(Self { store, entries })
    }

    pub fn get(&self, repo_name: &str) -> Option<&RegistryEntry> {
        self.entries.get(repo_name)
    }

    pub fn entries(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Idempotency policy: everything except an `analyzed` entry is
    /// processed, and `force` processes everything.
    pub fn should_process(&self, repo_name: &str, force: bool) -> bool {
        should_process(self.get(repo_name).map(|e| e.status), force)
    }

    /// Record newly discovered repositories as `pending`.
    ///
    /// Existing entries keep their status. Persists once if anything was
    /// added and returns the number of new entries.
    pub fn register_discovered(&mut self, repos: &[RepoDescriptor]) -> Result<usize, RegistryError> {
        let mut added = 0;
        for repo in repos {
            if !self.entries.contains_key(&repo.name) {
                self.entries
                    .insert(repo.name.clone(), RegistryEntry::new(repo, RunStatus::Pending));
                added += 1;
            }
        }
        if added > 0 {
            self.persist()?;
        }
        Ok(added)
    }

    /// Mark a repository as in progress and persist immediately, so an
    /// interrupted run stays visible as `running`.
    pub fn mark_running(&mut self, repo: &RepoDescriptor) -> Result<(), RegistryError> {
        let entry = self
            .entries
            .entry(repo.name.clone())
            .or_insert_with(|| RegistryEntry::new(repo, RunStatus::Pending));
        entry.status = RunStatus::Running;
        entry.git_url = repo.clone_url.clone();
        entry.last_updated = Utc::now();
        self.persist()
    }

    /// Record the final state of a repository run and persist immediately.
    pub fn mark_outcome(&mut self, repo_name: &str, outcome: Outcome) -> Result<(), RegistryError> {
        let entry = self
            .entries
            .get_mut(repo_name)
            .ok_or_else(|| RegistryError::UnknownRepo(repo_name.to_string()))?;
        entry.status = outcome.status.into();
        entry.analysis_output_path = outcome.output_path;
        entry.log_path = outcome.log_path;
        entry.last_updated = Utc::now();
        entry.notes = match outcome.status {
            FinalStatus::Analyzed => None,
            FinalStatus::Failed => outcome.notes.or_else(|| entry.notes.take()),
        };
        self.persist()
    }

    fn persist(&mut self) -> Result<(), RegistryError> {
        let document = RegistryDocument::from_entries(&self.entries);
        self.store.save(&document)
    }
}

/// Pure form of the idempotency policy over an optional prior status.
pub fn should_process(status: Option<RunStatus>, force: bool) -> bool {
    force || !status.is_some_and(|s| s.is_terminal_success())
}
