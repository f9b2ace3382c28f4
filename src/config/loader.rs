use std::fs;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;

use super::{
    is_plain_name, DetectionConfig, OrgScanConfig, PathsConfig, RepoFilters, RepoSourceConfig,
    SingleRepoConfig, SweepConfig, ToolConfig,
};
use crate::errors::ConfigError;

/// Commented starting point written by `analysis-sweep init`.
pub const CONFIG_TEMPLATE: &str = r#"# analysis-sweep configuration

# single: analyze one repository
# org_scan: enumerate an organization (or user) through the GitHub API
mode: single

single:
  name: my-repo
  git_url: https://github.com/my-org/my-repo.git

org_scan:
  github_org: my-org
  filters:
    language: java
    exclude_archived: true
    exclude_forks: true
  limits:
    max_repos_per_run: 5

# tool:
#   executable: atx
#   transformation: AWS/early-access-comprehensive-codebase-analysis
#   args: []

# detection:
#   success_marker: Transformation completed successfully
#   expected_outputs: [Documentation, .atx]

# paths:
#   registry: repos/analysis_registry.yaml
#   results_dir: repos
#   work_dir: tmp
"#;

/// Document shape as written on disk, before mode validation.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    single: Option<RawSingle>,
    #[serde(default)]
    org_scan: Option<RawOrgScan>,
    #[serde(default)]
    tool: Option<ToolConfig>,
    #[serde(default)]
    detection: Option<DetectionConfig>,
    #[serde(default)]
    paths: Option<PathsConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSingle {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    git_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawOrgScan {
    #[serde(default)]
    github_org: Option<String>,
    #[serde(default)]
    filters: RepoFilters,
    #[serde(default)]
    limits: RawLimits,
}

#[derive(Debug, Default, Deserialize)]
struct RawLimits {
    #[serde(default)]
    max_repos_per_run: Option<usize>,
}

pub fn read_config_file(path: &Path) -> Result<String, ConfigError> {
    let file = fs::File::open(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = BufReader::new(file);
    let mut contents = String::new();
    reader
        .read_to_string(&mut contents)
        .map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(contents)
}

/// Read and validate the configuration at `path`.
pub fn load_config(path: &Path) -> Result<SweepConfig, ConfigError> {
    let contents = read_config_file(path)?;
    let config = parse_config(&contents, path)?;
    tracing::debug!(
        path = %path.display(),
        mode = config.source.mode_name(),
        "Loaded configuration"
    );
    Ok(config)
}

/// Parse a YAML document into a validated [`SweepConfig`].
///
/// `origin` is only used for error messages.
pub fn parse_config(contents: &str, origin: &Path) -> Result<SweepConfig, ConfigError> {
    let raw: RawConfig = if contents.trim().is_empty() {
        RawConfig::default()
    } else {
        serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })?
    };

    let source = resolve_source(&raw)?;
    let detection = raw.detection.unwrap_or_default();
    if detection.success_marker.trim().is_empty() {
        return Err(ConfigError::invalid(
            "detection.success_marker",
            "must not be empty",
        ));
    }

    Ok(SweepConfig {
        source,
        tool: raw.tool.unwrap_or_default(),
        detection,
        paths: raw.paths.unwrap_or_default(),
    })
}

fn resolve_source(raw: &RawConfig) -> Result<RepoSourceConfig, ConfigError> {
    let mode = raw
        .mode
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or(ConfigError::MissingMode)?;

    match mode {
        "single" => {
            let section = raw.single.as_ref().ok_or(ConfigError::MissingSection {
                mode: "single",
                section: "single",
            })?;
            let name = required(&section.name, "single.name")?;
            if !is_plain_name(&name) {
                return Err(ConfigError::invalid(
                    "single.name",
                    format!("`{}` must be a plain directory name", name),
                ));
            }
            Ok(RepoSourceConfig::Single(SingleRepoConfig {
                name,
                git_url: required(&section.git_url, "single.git_url")?,
            }))
        }
        "org_scan" => {
            let section = raw.org_scan.as_ref().ok_or(ConfigError::MissingSection {
                mode: "org_scan",
                section: "org_scan",
            })?;
            let max_repos_per_run = section.limits.max_repos_per_run;
            if max_repos_per_run == Some(0) {
                return Err(ConfigError::invalid(
                    "org_scan.limits.max_repos_per_run",
                    "must be at least 1",
                ));
            }
            Ok(RepoSourceConfig::OrgScan(OrgScanConfig {
                github_org: required(&section.github_org, "org_scan.github_org")?,
                filters: section.filters.clone(),
                max_repos_per_run,
            }))
        }
        other => Err(ConfigError::UnknownMode(other.to_string())),
    }
}

fn required(value: &Option<String>, field: &'static str) -> Result<String, ConfigError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(ConfigError::MissingField(field))
}
