// Shared fakes and fixtures for analysis-sweep integration tests
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use chrono::Utc;
use tempfile::TempDir;

use analysis_sweep::config::{DetectionConfig, PathsConfig, ToolConfig};
use analysis_sweep::errors::RepoError;
use analysis_sweep::executor::{AnalysisExecutor, Cloner, ToolInvocation, ToolRunner};
use analysis_sweep::registry::{
    MemoryStore, RegistryDocument, RegistryEntry, RegistryStore, RunStatus,
};
use analysis_sweep::{Orchestrator, Registry, RepoDescriptor};

pub const MARKER: &str = "Transformation completed successfully";

/// Names passed to a fake, in call order. Shared so tests can inspect it
/// after the fake has moved into an executor.
pub type CallLog = Rc<RefCell<Vec<String>>>;

/// Cloner that writes a README into the destination, or fails for the
/// repositories it was told to reject.
#[derive(Default)]
pub struct ScriptedCloner {
    pub unreachable: Vec<String>,
    pub calls: CallLog,
}

impl ScriptedCloner {
    pub fn failing_for(names: &[&str]) -> Self {
        Self {
            unreachable: names.iter().map(|n| n.to_string()).collect(),
            calls: CallLog::default(),
        }
    }
}

impl Cloner for ScriptedCloner {
    fn clone_repo(&self, repo: &RepoDescriptor, dest: &Path) -> Result<(), RepoError> {
        self.calls.borrow_mut().push(repo.name.clone());
        if self.unreachable.contains(&repo.name) {
            return Err(RepoError::clone_failed(&repo.clone_url, "repository not found"));
        }
        fs::write(dest.join("README.md"), "# fixture\n").map_err(|e| RepoError::io(dest, e))
    }
}

/// What the fake tool does for one repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolBehavior {
    /// Log the success marker, create no outputs.
    Marker { exit: i32 },
    /// Populate the expected output folders, log no marker.
    Outputs { exit: i32 },
    /// Log an error and produce nothing.
    Nothing { exit: i32 },
    /// Fail to launch.
    Missing,
}

/// Tool runner whose behavior is chosen per repository name.
pub struct ScriptedRunner {
    pub default: ToolBehavior,
    pub per_repo: HashMap<String, ToolBehavior>,
    pub calls: CallLog,
}

impl ScriptedRunner {
    pub fn always(behavior: ToolBehavior) -> Self {
        Self {
            default: behavior,
            per_repo: HashMap::new(),
            calls: CallLog::default(),
        }
    }

    pub fn with(mut self, name: &str, behavior: ToolBehavior) -> Self {
        self.per_repo.insert(name.to_string(), behavior);
        self
    }
}

// `<results>/<name>_transform.log` -> `<name>`
fn repo_name(invocation: &ToolInvocation) -> String {
    invocation
        .log_path
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.strip_suffix("_transform.log"))
        .unwrap_or_default()
        .to_string()
}

fn write(path: &Path, contents: &str) -> Result<(), RepoError> {
    fs::write(path, contents).map_err(|e| RepoError::io(path, e))
}

impl ToolRunner for ScriptedRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<Option<i32>, RepoError> {
        let name = repo_name(invocation);
        self.calls.borrow_mut().push(name.clone());
        let behavior = self.per_repo.get(&name).copied().unwrap_or(self.default);

        let log = &invocation.log_path;
        if let Some(parent) = log.parent() {
            fs::create_dir_all(parent).map_err(|e| RepoError::io(parent, e))?;
        }
        let dir = &invocation.working_dir;

        let exit = match behavior {
            ToolBehavior::Missing => {
                return Err(RepoError::execution(&invocation.program, "not found on PATH"));
            }
            ToolBehavior::Marker { exit } => {
                write(log, &format!("starting\n{}\n", MARKER))?;
                exit
            }
            ToolBehavior::Outputs { exit } => {
                for (folder, file) in [("Documentation", "overview.md"), (".atx", "state.json")] {
                    let folder = dir.join(folder);
                    fs::create_dir_all(&folder).map_err(|e| RepoError::io(&folder, e))?;
                    write(&folder.join(file), "content")?;
                }
                write(log, "ERROR: upload step failed\n")?;
                exit
            }
            ToolBehavior::Nothing { exit } => {
                write(log, "ERROR: analysis aborted\n")?;
                exit
            }
        };
        Ok(Some(exit))
    }
}

/// Scratch filesystem layout for one test.
pub struct Fixture {
    pub root: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            root: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn paths(&self) -> PathsConfig {
        PathsConfig {
            registry: self.root.path().join("repos").join("analysis_registry.yaml"),
            results_dir: self.root.path().join("repos"),
            work_dir: self.root.path().join("tmp"),
        }
    }

    /// Leftover checkouts under the work directory.
    pub fn leftover_checkouts(&self) -> usize {
        fs::read_dir(self.paths().work_dir)
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    pub fn orchestrator<S: RegistryStore>(
        &self,
        store: S,
        cloner: ScriptedCloner,
        runner: ScriptedRunner,
    ) -> Orchestrator<S, ScriptedCloner, ScriptedRunner> {
        let registry = Registry::load(store).expect("registry loads");
        let executor = AnalysisExecutor::new(cloner, runner, ToolConfig::default(), self.paths());
        Orchestrator::new(registry, executor, DetectionConfig::default())
    }
}

pub fn repo(name: &str) -> RepoDescriptor {
    RepoDescriptor::new(name, format!("https://github.com/acme/{}.git", name))
}

pub fn entry(name: &str, status: RunStatus) -> RegistryEntry {
    RegistryEntry {
        repo_name: name.to_string(),
        status,
        git_url: format!("https://github.com/acme/{}.git", name),
        analysis_output_path: PathBuf::from(format!("repos/{}/analysis", name)),
        log_path: PathBuf::from(format!("repos/{}_transform.log", name)),
        last_updated: Utc::now(),
        notes: None,
    }
}

/// Memory store pre-populated with the given statuses.
pub fn seeded_store(seed: &[(&str, RunStatus)]) -> MemoryStore {
    let entries: BTreeMap<String, RegistryEntry> = seed
        .iter()
        .map(|(name, status)| (name.to_string(), entry(name, *status)))
        .collect();
    MemoryStore::with_document(RegistryDocument::from_entries(&entries))
}
