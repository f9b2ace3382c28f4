//! Error taxonomy for sweep runs.
//!
//! Errors fall into two groups:
//!
//! - **Fatal** errors abort the whole run before (or while) touching
//!   repositories: [`ConfigError`], [`DiscoveryError`] and [`RegistryError`].
//! - **Recoverable** errors are local to one repository: [`RepoError`]. The
//!   orchestrator records them as a `failed` outcome and moves on.
//!
//! A run where neither success signal is present is not an error at all; it
//! is a [`Verdict`](crate::detection::Verdict) that classifies as `failed`.

use std::path::PathBuf;
use thiserror::Error;

/// Malformed or incomplete configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("config is missing `mode` (expected `single` or `org_scan`)")]
    MissingMode,

    #[error("unknown mode `{0}` (expected `single` or `org_scan`)")]
    UnknownMode(String),

    #[error("mode `{mode}` requires a `{section}` section")]
    MissingSection {
        mode: &'static str,
        section: &'static str,
    },

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("invalid value for `{field}`: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

impl ConfigError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }
}

/// Failure while resolving the repository list for `org_scan` mode.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("GITHUB_TOKEN is required for org_scan mode; set it in .env or the environment")]
    MissingToken,

    #[error("GitHub rejected the token (HTTP {status}): {message}")]
    Unauthorized { status: u16, message: String },

    #[error("failed to access organization or user `{owner}` (HTTP {status}): {message}")]
    Api {
        owner: String,
        status: u16,
        message: String,
    },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Failure reading or persisting the run registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read registry {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write registry {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("registry {path} is not a valid document: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("no registry entry for `{0}`")]
    UnknownRepo(String),
}

/// Failure local to a single repository. Never aborts the run.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("failed to clone {url}: {message}")]
    Clone { url: String, message: String },

    #[error("failed to launch `{tool}`: {message}")]
    Execution { tool: String, message: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RepoError {
    pub fn clone_failed(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Clone {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn execution(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Execution {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Short label used in summaries and registry notes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Clone { .. } => "clone",
            Self::Execution { .. } => "execution",
            Self::Io { .. } => "io",
        }
    }
}

/// Umbrella error for orchestration-level entry points.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SweepError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error must abort the run.
    ///
    /// Repository-local errors are recovered by the orchestrator; everything
    /// else means the run cannot continue safely.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Repo(_))
    }
}

pub type Result<T> = std::result::Result<T, SweepError>;
