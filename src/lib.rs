//! Idempotent runs of an external analysis tool across repositories.
//!
//! A run resolves a repository list from configuration ([`discovery`]),
//! consults a persisted registry ([`registry`]) to skip repositories that are
//! already analyzed, clones and analyzes the rest one at a time
//! ([`executor`]), decides success from the tool's artifacts rather than its
//! exit code ([`detection`]) and records each outcome before moving on
//! ([`orchestrator`]).

pub mod cli;
pub mod commands;
pub mod config;
pub mod detection;
pub mod discovery;
pub mod errors;
pub mod executor;
pub mod formatting;
pub mod observability;
pub mod orchestrator;
pub mod registry;
pub mod report;

pub use crate::config::{load_config, parse_config, SweepConfig};
pub use crate::detection::{classify, Evidence, Verdict};
pub use crate::discovery::{discover, RepoDescriptor};
pub use crate::errors::{ConfigError, DiscoveryError, RegistryError, RepoError, SweepError};
pub use crate::executor::{AnalysisExecutor, Cloner, ToolRunner};
pub use crate::orchestrator::{Orchestrator, RepoResult, RunSummary};
pub use crate::registry::{Registry, RegistryEntry, RunStatus};
