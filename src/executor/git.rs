//! libgit2-backed cloning.

use std::path::Path;

use git2::build::RepoBuilder;
use git2::{Cred, FetchOptions, RemoteCallbacks};

use super::Cloner;
use crate::discovery::RepoDescriptor;
use crate::errors::RepoError;

/// Clones over HTTPS (or any transport libgit2 supports).
///
/// When a token is configured it is offered as `x-access-token` basic auth,
/// which is what GitHub expects for private repositories.
#[derive(Debug, Clone, Default)]
pub struct GitCloner {
    token: Option<String>,
}

impl GitCloner {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }

    /// Uses `GITHUB_TOKEN` for authentication when set.
    pub fn from_env() -> Self {
        let token = std::env::var("GITHUB_TOKEN")
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        Self::new(token)
    }

    fn fetch_options(&self) -> FetchOptions<'_> {
        let mut callbacks = RemoteCallbacks::new();
        if let Some(token) = self.token.as_deref() {
            // libgit2 keeps asking while credentials are rejected.
            let mut offered = false;
            callbacks.credentials(move |_url, _username, _allowed| {
                if offered {
                    return Err(git2::Error::from_str("credentials rejected"));
                }
                offered = true;
                Cred::userpass_plaintext("x-access-token", token)
            });
        }
        let mut options = FetchOptions::new();
        options.remote_callbacks(callbacks);
        options
    }
}

impl Cloner for GitCloner {
    fn clone_repo(&self, repo: &RepoDescriptor, dest: &Path) -> Result<(), RepoError> {
        RepoBuilder::new()
            .fetch_options(self.fetch_options())
            .clone(&repo.clone_url, dest)
            .map(|_| ())
            .map_err(|e| RepoError::clone_failed(&repo.clone_url, e.message()))
    }
}
