//! Repository discovery abstraction layer
//!
//! This module holds the provider-agnostic [`Repository`] model and the
//! [`Discovery`] trait the sync engine lists repositories through. The GitHub
//! implementation lives here too; tests substitute their own.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::ListError;
use crate::github::{GitHubClient, ListingRequest};

/// How mirrors are laid out under the target directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DirLayout {
    /// `{target}/{name}.git`, for a single owner.
    Flat,
    /// `{target}/{owner}/{name}.git`
    Nested,
}

impl FromStr for DirLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "flat" => Ok(Self::Flat),
            "nested" => Ok(Self::Nested),
            other => Err(format!(
                "unknown layout `{other}` (expected `flat` or `nested`)"
            )),
        }
    }
}

/// A remote repository to mirror. Immutable once listed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Repository {
    /// `owner/name`
    path: String,
    clone_url: String,
    private: bool,
}

impl Repository {
    /// Validates that `path` is exactly `owner/name` with both parts usable
    /// as a single directory name.
    pub fn new(
        path: impl Into<String>,
        clone_url: impl Into<String>,
        private: bool,
    ) -> Result<Self, ListError> {
        let path = path.into();
        let invalid = |reason: &str| ListError::InvalidRepository {
            path: path.clone(),
            reason: reason.to_string(),
        };

        let Some((owner, name)) = path.split_once('/') else {
            return Err(invalid("expected owner/name"));
        };
        for part in [owner, name] {
            if part.is_empty() || part == "." || part == ".." {
                return Err(invalid("empty or relative path component"));
            }
            if part.contains(['/', '\\', '\0']) {
                return Err(invalid("path separator in name"));
            }
        }

        let clone_url = clone_url.into();
        if clone_url.is_empty() {
            return Err(invalid("empty clone URL"));
        }

        Ok(Self {
            path,
            clone_url,
            private,
        })
    }

    /// `owner/name`
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn owner(&self) -> &str {
        self.path.split_once('/').map_or("", |(owner, _)| owner)
    }

    pub fn name(&self) -> &str {
        self.path.split_once('/').map_or("", |(_, name)| name)
    }

    pub fn clone_url(&self) -> &str {
        &self.clone_url
    }

    pub fn is_private(&self) -> bool {
        self.private
    }

    /// Where the mirror of this repository lives.
    pub fn local_dir(&self, target: &Path, layout: DirLayout) -> PathBuf {
        let dir_name = format!("{}.git", self.name());
        match layout {
            DirLayout::Flat => target.join(dir_name),
            DirLayout::Nested => target.join(self.owner()).join(dir_name),
        }
    }
}

impl std::fmt::Display for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path)
    }
}

/// Source of the repository list for a run.
#[async_trait]
pub trait Discovery: Send + Sync {
    /// The complete, frozen list of repositories to sync.
    async fn discover(&self) -> Result<Vec<Repository>, ListError>;

    /// Provider name for display/logging
    fn provider_name(&self) -> &'static str;
}

/// GitHub repository discovery implementation
pub struct GitHubDiscovery {
    client: GitHubClient,
    request: ListingRequest,
}

impl GitHubDiscovery {
    pub fn new(client: GitHubClient, request: ListingRequest) -> Self {
        Self { client, request }
    }
}

#[async_trait]
impl Discovery for GitHubDiscovery {
    async fn discover(&self) -> Result<Vec<Repository>, ListError> {
        self.client.list_repositories(&self.request).await
    }

    fn provider_name(&self) -> &'static str {
        "GitHub"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn repo(path: &str) -> Repository {
        Repository::new(path, format!("https://github.com/{path}.git"), false).unwrap()
    }

    #[test]
    fn test_repository_parts() {
        let repository = repo("qvl/ghbackup");

        assert_eq!(repository.owner(), "qvl");
        assert_eq!(repository.name(), "ghbackup");
        assert_eq!(repository.to_string(), "qvl/ghbackup");
    }

    #[test]
    fn test_local_dir_layouts() {
        let repository = repo("octocat/Hello-World");
        let base = Path::new("/tmp/repos");

        assert_eq!(
            repository.local_dir(base, DirLayout::Flat),
            PathBuf::from("/tmp/repos/Hello-World.git")
        );
        assert_eq!(
            repository.local_dir(base, DirLayout::Nested),
            PathBuf::from("/tmp/repos/octocat/Hello-World.git")
        );
    }

    #[test]
    fn test_rejects_unsafe_paths() {
        for path in ["noslash", "/name", "owner/", "../x", "owner/..", "a/b/c", "a/b\\c"] {
            assert_matches!(
                Repository::new(path, "https://github.com/x.git", false),
                Err(ListError::InvalidRepository { .. }),
                "{path} should be rejected"
            );
        }
        assert_matches!(
            Repository::new("owner/name", "", false),
            Err(ListError::InvalidRepository { .. })
        );
    }

    #[test]
    fn test_layout_from_str() {
        assert_eq!("flat".parse::<DirLayout>(), Ok(DirLayout::Flat));
        assert_eq!("NESTED".parse::<DirLayout>(), Ok(DirLayout::Nested));
        assert!("deep".parse::<DirLayout>().is_err());
    }
}
