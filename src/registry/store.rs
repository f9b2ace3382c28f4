use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use super::RegistryEntry;
use crate::errors::RegistryError;

/// Whole-file registry document.
///
/// Written as a `repos:` mapping keyed by repository name. Older list-shaped
/// registries (`repos: [{repo_name: ..., analysis_status: ...}]`) are still
/// accepted on read and rewritten as a mapping on the next save.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryDocument {
    #[serde(default, deserialize_with = "deserialize_repos")]
    pub repos: BTreeMap<String, RegistryEntry>,
}

impl RegistryDocument {
    pub fn from_entries(entries: &BTreeMap<String, RegistryEntry>) -> Self {
        Self {
            repos: entries.clone(),
        }
    }

    /// Entries keyed by name, with `repo_name` filled in from the key.
    pub fn into_entries(self) -> BTreeMap<String, RegistryEntry> {
        self.repos
            .into_iter()
            .map(|(name, mut entry)| {
                entry.repo_name = name.clone();
                (name, entry)
            })
            .collect()
    }
}

#[derive(Deserialize)]
struct ListedEntry {
    repo_name: String,
    #[serde(flatten)]
    entry: RegistryEntry,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RepoTable {
    Map(BTreeMap<String, RegistryEntry>),
    List(Vec<ListedEntry>),
}

fn deserialize_repos<'de, D>(deserializer: D) -> Result<BTreeMap<String, RegistryEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<RepoTable>::deserialize(deserializer)? {
        None => BTreeMap::new(),
        Some(RepoTable::Map(map)) => map,
        // Later duplicates win, matching how the list was last updated.
        Some(RepoTable::List(list)) => list
            .into_iter()
            .map(|listed| (listed.repo_name, listed.entry))
            .collect(),
    })
}

/// Backing storage for the registry.
pub trait RegistryStore {
    /// Read the whole document; a store with nothing saved yields an empty one.
    fn load(&self) -> Result<RegistryDocument, RegistryError>;

    /// Replace the whole document.
    fn save(&mut self, document: &RegistryDocument) -> Result<(), RegistryError>;
}

/// YAML file on disk, rewritten in full on every save.
#[derive(Debug, Clone)]
pub struct YamlFileStore {
    path: PathBuf,
}

impl YamlFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RegistryStore for YamlFileStore {
    fn load(&self) -> Result<RegistryDocument, RegistryError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "No registry yet, starting empty");
                return Ok(RegistryDocument::default());
            }
            Err(source) => {
                return Err(RegistryError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if contents.trim().is_empty() {
            return Ok(RegistryDocument::default());
        }

        serde_yaml::from_str(&contents).map_err(|source| RegistryError::Format {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&mut self, document: &RegistryDocument) -> Result<(), RegistryError> {
        let yaml = serde_yaml::to_string(document).map_err(|source| RegistryError::Format {
            path: self.path.clone(),
            source,
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| RegistryError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        fs::write(&self.path, yaml).map_err(|source| RegistryError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

/// In-memory store for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    document: Option<RegistryDocument>,
    saves: usize,
}

impl MemoryStore {
    pub fn with_document(document: RegistryDocument) -> Self {
        Self {
            document: Some(document),
            saves: 0,
        }
    }

    /// Last saved (or seeded) document.
    pub fn saved(&self) -> Option<&RegistryDocument> {
        self.document.as_ref()
    }

    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl RegistryStore for MemoryStore {
    fn load(&self) -> Result<RegistryDocument, RegistryError> {
        Ok(self.document.clone().unwrap_or_default())
    }

    fn save(&mut self, document: &RegistryDocument) -> Result<(), RegistryError> {
        self.document = Some(document.clone());
        self.saves += 1;
        Ok(())
    }
}
