//! GitHub REST client for org-scan discovery.
//!
//! Lists an organization's repositories (falling back to a user account of
//! the same name when the organization does not exist), following `Link`
//! pagination. Requests ask for `sort=full_name` so that
//! `max_repos_per_run` truncation selects the same repositories across runs.

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, AUTHORIZATION, LINK};
use reqwest::StatusCode;
use serde::Deserialize;

use super::{RemoteRepo, RepoListing, RepoVisitor};
use crate::errors::DiscoveryError;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const PER_PAGE: u32 = 100;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("analysis-sweep/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    message: String,
}

/// Blocking GitHub API client authenticated with a token.
pub struct GitHubClient {
    client: Client,
    api_url: String,
    token: String,
}

impl GitHubClient {
    pub fn new(token: impl Into<String>, api_url: impl Into<String>) -> Result<Self, DiscoveryError> {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| DiscoveryError::Transport {
                url: api_url.clone(),
                source,
            })?;
        Ok(Self::with_client(client, token, api_url))
    }

    /// Reuse an existing [`Client`]; it is expected to carry its own user
    /// agent and timeouts.
    pub fn with_client(
        client: Client,
        token: impl Into<String>,
        api_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Build a client from `GITHUB_TOKEN` (and optionally `GITHUB_API_URL`).
    pub fn from_env() -> Result<Self, DiscoveryError> {
        let token = std::env::var("GITHUB_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or(DiscoveryError::MissingToken)?;
        let api_url =
            std::env::var("GITHUB_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        Self::new(token.trim(), api_url)
    }

    fn org_repos_url(&self, owner: &str) -> String {
        format!(
            "{}/orgs/{}/repos?type=all&sort=full_name&direction=asc&per_page={}",
            self.api_url, owner, PER_PAGE
        )
    }

    fn user_repos_url(&self, owner: &str) -> String {
        format!(
            "{}/users/{}/repos?type=owner&sort=full_name&direction=asc&per_page={}",
            self.api_url, owner, PER_PAGE
        )
    }

    fn get(&self, url: &str) -> Result<Response, DiscoveryError> {
        tracing::debug!(url, "GET");
        self.client
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .send()
            .map_err(|source| DiscoveryError::Transport {
                url: url.to_string(),
                source,
            })
    }

    /// First page of the owner's repositories, trying the organization
    /// endpoint before the user endpoint.
    fn first_page(&self, owner: &str) -> Result<Response, DiscoveryError> {
        let response = self.get(&self.org_repos_url(owner))?;
        if response.status() != StatusCode::NOT_FOUND {
            return Ok(response);
        }
        tracing::debug!(owner, "No organization found, trying user account");
        self.get(&self.user_repos_url(owner))
    }

    fn read_page(
        &self,
        owner: &str,
        response: Response,
    ) -> Result<(Vec<RemoteRepo>, Option<String>), DiscoveryError> {
        let response = check_status(owner, response)?;
        let url = response.url().to_string();
        let next = response
            .headers()
            .get(LINK)
            .and_then(|value| value.to_str().ok())
            .and_then(next_page_url);
        let repos = response
            .json::<Vec<RemoteRepo>>()
            .map_err(|source| DiscoveryError::Transport { url, source })?;
        Ok((repos, next))
    }
}

impl RepoListing for GitHubClient {
    fn visit_repos(
        &self,
        owner: &str,
        visit: &mut RepoVisitor<'_>,
    ) -> Result<(), DiscoveryError> {
        let mut page = self.read_page(owner, self.first_page(owner)?)?;

        loop {
            let (repos, next) = page;
            for repo in repos {
                if let ControlFlow::Break(()) = visit(repo)? {
                    return Ok(());
                }
            }
            match next {
                Some(url) => {
                    let response = self.get(&url)?;
                    page = self.read_page(owner, response)?;
                }
                None => return Ok(()),
            }
        }
    }

    fn languages(&self, repo: &RemoteRepo) -> Result<Vec<String>, DiscoveryError> {
        if repo.languages_url.is_empty() {
            return Ok(Vec::new());
        }
        let response = check_status(&repo.name, self.get(&repo.languages_url)?)?;
        let breakdown = response
            .json::<HashMap<String, u64>>()
            .map_err(|source| DiscoveryError::Transport {
                url: repo.languages_url.clone(),
                source,
            })?;
        Ok(breakdown.into_keys().collect())
    }
}

fn check_status(owner: &str, response: Response) -> Result<Response, DiscoveryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .text()
        .ok()
        .map(|body| api_message(&body))
        .unwrap_or_default();
    if status == StatusCode::UNAUTHORIZED {
        return Err(DiscoveryError::Unauthorized {
            status: status.as_u16(),
            message,
        });
    }
    Err(DiscoveryError::Api {
        owner: owner.to_string(),
        status: status.as_u16(),
        message,
    })
}

/// Extract the `message` field of a GitHub error body, or the raw body.
pub fn api_message(body: &str) -> String {
    serde_json::from_str::<ApiMessage>(body)
        .map(|m| m.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string())
}

/// Parse the `rel="next"` target out of a `Link` header.
pub fn next_page_url(link_header: &str) -> Option<String> {
    link_header.split(',').find_map(|part| {
        let mut pieces = part.split(';');
        let target = pieces.next()?.trim();
        let is_next = pieces.any(|p| p.trim() == "rel=\"next\"");
        if !is_next {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(str::to_string)
    })
}
