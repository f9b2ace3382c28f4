//! Repository discovery.
//!
//! Turns the configured [`RepoSourceConfig`] into the ordered, deduplicated
//! list of repositories a run will visit. Single mode needs no I/O; org-scan
//! mode walks a [`RepoListing`] (the GitHub REST API in production) and
//! applies the configured filters client-side.
//!
//! Discovery never retries. A transport or authentication failure aborts the
//! run and is left to the CI layer to retry.

pub mod github;

pub use github::GitHubClient;

use std::collections::HashSet;
use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};

use crate::config::{is_plain_name, OrgScanConfig, RepoFilters, RepoSourceConfig, SingleRepoConfig};
use crate::errors::DiscoveryError;

/// A repository selected for this run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoDescriptor {
    pub name: String,
    pub clone_url: String,
}

impl RepoDescriptor {
    pub fn new(name: impl Into<String>, clone_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            clone_url: clone_url.into(),
        }
    }
}

impl From<&SingleRepoConfig> for RepoDescriptor {
    fn from(single: &SingleRepoConfig) -> Self {
        Self::new(&single.name, &single.git_url)
    }
}

/// Repository metadata as returned by a listing API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RemoteRepo {
    pub name: String,
    pub clone_url: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub fork: bool,
    /// Primary language as reported by the host.
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub languages_url: String,
    /// Full language breakdown; only fetched when a language filter is set.
    #[serde(skip)]
    pub languages: Vec<String>,
}

/// Callback invoked for every listed repository, in listing order.
pub type RepoVisitor<'a> = dyn FnMut(RemoteRepo) -> Result<ControlFlow<()>, DiscoveryError> + 'a;

/// Source of repository metadata for an organization or user account.
pub trait RepoListing {
    /// Walk the owner's repositories in the listing's order until exhausted
    /// or until `visit` breaks.
    fn visit_repos(&self, owner: &str, visit: &mut RepoVisitor<'_>)
        -> Result<(), DiscoveryError>;

    /// Language names used by a repository.
    fn languages(&self, repo: &RemoteRepo) -> Result<Vec<String>, DiscoveryError>;
}

/// Resolve the configured source using the GitHub API for org scans.
pub fn discover(source: &RepoSourceConfig) -> Result<Vec<RepoDescriptor>, DiscoveryError> {
    discover_with(source, GitHubClient::from_env)
}

/// Resolve the configured source, connecting to a listing only when needed.
pub fn discover_with<L, F>(
    source: &RepoSourceConfig,
    connect: F,
) -> Result<Vec<RepoDescriptor>, DiscoveryError>
where
    L: RepoListing,
    F: FnOnce() -> Result<L, DiscoveryError>,
{
    match source {
        RepoSourceConfig::Single(single) => Ok(vec![RepoDescriptor::from(single)]),
        RepoSourceConfig::OrgScan(org) => {
            let listing = connect()?;
            scan_org(&listing, org)
        }
    }
}

/// Enumerate, filter, deduplicate and cap an organization's repositories.
pub fn scan_org(
    listing: &dyn RepoListing,
    org: &OrgScanConfig,
) -> Result<Vec<RepoDescriptor>, DiscoveryError> {
    let mut selected = Vec::new();
    let mut seen = HashSet::new();

    let mut visit = |mut repo: RemoteRepo| -> Result<ControlFlow<()>, DiscoveryError> {
        if !is_plain_name(&repo.name) {
            tracing::warn!(repo = %repo.name, "Skipping: name is not a plain directory name");
            return Ok(ControlFlow::Continue(()));
        }
        if !passes_metadata_filters(&repo, &org.filters) {
            return Ok(ControlFlow::Continue(()));
        }
        if let Some(wanted) = org.filters.language() {
            if repo.languages.is_empty() {
                repo.languages = listing.languages(&repo)?;
            }
            if !uses_language(&repo, wanted) {
                tracing::debug!(repo = %repo.name, language = wanted, "Skipping: language mismatch");
                return Ok(ControlFlow::Continue(()));
            }
        }
        if seen.insert(repo.name.clone()) {
            selected.push(RepoDescriptor::new(repo.name, repo.clone_url));
        }
        match org.max_repos_per_run {
            Some(max) if selected.len() >= max => Ok(ControlFlow::Break(())),
            _ => Ok(ControlFlow::Continue(())),
        }
    };

    listing.visit_repos(&org.github_org, &mut visit)?;

    tracing::info!(
        org = %org.github_org,
        selected = selected.len(),
        "Discovered repositories"
    );
    Ok(selected)
}

/// Pure predicate for the archived/fork filters.
pub fn passes_metadata_filters(repo: &RemoteRepo, filters: &RepoFilters) -> bool {
    if filters.exclude_archived && repo.archived {
        return false;
    }
    if filters.exclude_forks && repo.fork {
        return false;
    }
    true
}

/// Case-insensitive language match against the breakdown, falling back to
/// the primary language when the breakdown is empty.
pub fn uses_language(repo: &RemoteRepo, wanted: &str) -> bool {
    if repo.languages.is_empty() {
        return repo
            .language
            .as_deref()
            .is_some_and(|lang| lang.eq_ignore_ascii_case(wanted));
    }
    repo.languages
        .iter()
        .any(|lang| lang.eq_ignore_ascii_case(wanted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;
    use std::collections::HashMap;

    struct FakeListing {
        repos: Vec<RemoteRepo>,
        languages: HashMap<String, Vec<String>>,
        visited: Cell<usize>,
        language_calls: Cell<usize>,
    }

    impl FakeListing {
        fn new(repos: Vec<RemoteRepo>) -> Self {
            Self {
                repos,
                languages: HashMap::new(),
                visited: Cell::new(0),
                language_calls: Cell::new(0),
            }
        }

        fn with_languages(mut self, name: &str, langs: &[&str]) -> Self {
            self.languages.insert(
                name.to_string(),
                langs.iter().map(|l| l.to_string()).collect(),
            );
            self
        }
    }

    impl RepoListing for FakeListing {
        fn visit_repos(
            &self,
            _owner: &str,
            visit: &mut RepoVisitor<'_>,
        ) -> Result<(), DiscoveryError> {
            for repo in &self.repos {
                self.visited.set(self.visited.get() + 1);
                if visit(repo.clone())?.is_break() {
                    break;
                }
            }
            Ok(())
        }

        fn languages(&self, repo: &RemoteRepo) -> Result<Vec<String>, DiscoveryError> {
            self.language_calls.set(self.language_calls.get() + 1);
            Ok(self.languages.get(&repo.name).cloned().unwrap_or_default())
        }
    }

    fn remote(name: &str) -> RemoteRepo {
        RemoteRepo {
            name: name.to_string(),
            clone_url: format!("https://github.com/acme/{}.git", name),
            ..RemoteRepo::default()
        }
    }

    fn org(filters: RepoFilters, max: Option<usize>) -> OrgScanConfig {
        OrgScanConfig {
            github_org: "acme".into(),
            filters,
            max_repos_per_run: max,
        }
    }

    fn names(repos: &[RepoDescriptor]) -> Vec<&str> {
        repos.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn single_mode_needs_no_listing() {
        let source = RepoSourceConfig::Single(SingleRepoConfig {
            name: "r1".into(),
            git_url: "https://x/r1.git".into(),
        });
        let repos = discover_with(&source, || -> Result<FakeListing, _> {
            Err(DiscoveryError::MissingToken)
        })
        .unwrap();
        assert_eq!(repos, vec![RepoDescriptor::new("r1", "https://x/r1.git")]);
    }

    #[test]
    fn org_scan_surfaces_connect_failure() {
        let source = RepoSourceConfig::OrgScan(org(RepoFilters::default(), None));
        let err = discover_with(&source, || -> Result<FakeListing, _> {
            Err(DiscoveryError::MissingToken)
        })
        .unwrap_err();
        assert!(matches!(err, DiscoveryError::MissingToken));
    }

    #[test]
    fn excludes_archived_and_forks() {
        let mut archived = remote("old");
        archived.archived = true;
        let mut fork = remote("forked");
        fork.fork = true;
        let listing = FakeListing::new(vec![remote("a"), archived, fork, remote("b")]);

        let filters = RepoFilters {
            exclude_archived: true,
            exclude_forks: true,
            ..RepoFilters::default()
        };
        let repos = scan_org(&listing, &org(filters, None)).unwrap();
        assert_eq!(names(&repos), vec!["a", "b"]);
    }

    #[test]
    fn keeps_archived_and_forks_when_not_excluded() {
        let mut archived = remote("old");
        archived.archived = true;
        let listing = FakeListing::new(vec![archived, remote("a")]);
        let repos = scan_org(&listing, &org(RepoFilters::default(), None)).unwrap();
        assert_eq!(names(&repos), vec!["old", "a"]);
    }

    #[test]
    fn language_filter_is_case_insensitive_over_breakdown() {
        let listing = FakeListing::new(vec![remote("svc"), remote("web"), remote("tool")])
            .with_languages("svc", &["Java", "Shell"])
            .with_languages("web", &["TypeScript"])
            .with_languages("tool", &["Python", "JAVA"]);

        let filters = RepoFilters {
            language: Some("java".into()),
            ..RepoFilters::default()
        };
        let repos = scan_org(&listing, &org(filters, None)).unwrap();
        assert_eq!(names(&repos), vec!["svc", "tool"]);
    }

    #[test]
    fn language_falls_back_to_primary_language() {
        let mut repo = remote("svc");
        repo.language = Some("Java".into());
        let listing = FakeListing::new(vec![repo, remote("empty")]);

        let filters = RepoFilters {
            language: Some("java".into()),
            ..RepoFilters::default()
        };
        let repos = scan_org(&listing, &org(filters, None)).unwrap();
        assert_eq!(names(&repos), vec!["svc"]);
    }

    #[test]
    fn languages_not_fetched_without_language_filter() {
        let listing = FakeListing::new(vec![remote("a"), remote("b")]);
        scan_org(&listing, &org(RepoFilters::default(), None)).unwrap();
        assert_eq!(listing.language_calls.get(), 0);
    }

    #[test]
    fn cap_applies_after_filtering_and_stops_listing() {
        let mut fork = remote("f");
        fork.fork = true;
        let listing =
            FakeListing::new(vec![fork, remote("a"), remote("b"), remote("c"), remote("d")]);
        let filters = RepoFilters {
            exclude_forks: true,
            ..RepoFilters::default()
        };

        let repos = scan_org(&listing, &org(filters, Some(2))).unwrap();
        assert_eq!(names(&repos), vec!["a", "b"]);
        assert_eq!(listing.visited.get(), 3);
    }

    #[test]
    fn names_that_would_escape_results_dir_are_skipped() {
        let listing = FakeListing::new(vec![remote("../etc"), remote("ok"), remote("a/b")]);
        let repos = scan_org(&listing, &org(RepoFilters::default(), Some(1))).unwrap();
        assert_eq!(names(&repos), vec!["ok"]);
    }

    #[test]
    fn duplicate_names_keep_first() {
        let mut dup = remote("a");
        dup.clone_url = "https://mirror/a.git".into();
        let listing = FakeListing::new(vec![remote("a"), dup, remote("b")]);
        let repos = scan_org(&listing, &org(RepoFilters::default(), None)).unwrap();
        assert_eq!(names(&repos), vec!["a", "b"]);
        assert_eq!(repos[0].clone_url, "https://github.com/acme/a.git");
    }
}
