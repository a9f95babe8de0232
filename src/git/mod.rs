//! Git integration module.
//!
//! Provides the local view of the repository: refreshing remote refs,
//! enumerating remote branches and finding when paths last changed.

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use git2::{
    BranchType, Cred, CredentialType, DiffOptions, FetchOptions, FetchPrune, RemoteCallbacks,
    Repository, Sort,
};

use crate::github::{GatewayError, GatewayResult};

/// Upper bound on commits inspected when looking for a path's last change.
const MAX_HISTORY_WALK: usize = 5_000;

/// Git repository wrapper with high-level operations.
pub struct GitRepository {
    repo: Repository,
}

impl GitRepository {
    /// Open a Git repository from the given path.
    ///
    /// This will search up the directory tree to find a Git repository.
    #[must_use]
    pub fn discover(path: impl AsRef<Path>) -> Option<Self> {
        Repository::discover(path.as_ref()).ok().map(|repo| Self { repo })
    }

    /// Get the repository root path.
    #[must_use]
    pub fn root(&self) -> Option<PathBuf> {
        self.repo.workdir().map(Path::to_path_buf)
    }

    /// Get the remote URL for the given remote name.
    #[must_use]
    pub fn remote_url(&self, name: &str) -> Option<String> {
        self.repo.find_remote(name).ok().and_then(|r| r.url().map(String::from))
    }

    /// Fetch `remote` using its configured refspecs, pruning deleted branches.
    pub fn fetch(&self, remote: &str) -> Result<(), git2::Error> {
        let mut remote = self.repo.find_remote(remote)?;

        let mut attempts = 0;
        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(move |url, username, allowed| {
            attempts += 1;
            if attempts > 3 {
                return Err(git2::Error::from_str("authentication failed"));
            }

            if allowed.contains(CredentialType::SSH_KEY) {
                if let Some(user) = username {
                    return Cred::ssh_key_from_agent(user);
                }
            }

            if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
                if let Ok(token) =
                    std::env::var("GITHUB_TOKEN").or_else(|_| std::env::var("GH_TOKEN"))
                {
                    return Cred::userpass_plaintext("x-access-token", &token);
                }
                let config = git2::Config::open_default()?;
                return Cred::credential_helper(&config, url, username);
            }

            Cred::default()
        });

        let mut options = FetchOptions::new();
        options.remote_callbacks(callbacks).prune(FetchPrune::On);

        remote.fetch::<&str>(&[], Some(&mut options), None)
    }

    /// Names of branches tracked for `remote`, without the `remote/` prefix.
    ///
    /// The symbolic `HEAD` entry is returned as `HEAD` when present.
    pub fn remote_branches(&self, remote: &str) -> Result<Vec<String>, git2::Error> {
        let prefix = format!("{remote}/");
        let mut names = Vec::new();

        for entry in self.repo.branches(Some(BranchType::Remote))? {
            let (branch, _) = entry?;
            if let Some(name) = branch.name()? {
                if let Some(stripped) = name.strip_prefix(&prefix) {
                    names.push(stripped.to_string());
                }
            }
        }

        Ok(names)
    }

    /// Time of the newest commit reachable from HEAD that touches any of `paths`.
    ///
    /// Returns `None` when no such commit exists (or the repository is empty).
    pub fn last_commit_time(&self, paths: &[String]) -> Result<Option<DateTime<Utc>>, git2::Error> {
        if paths.is_empty() {
            return Ok(None);
        }

        let mut walk = self.repo.revwalk()?;
        if walk.push_head().is_err() {
            return Ok(None);
        }
        walk.set_sorting(Sort::TIME)?;

        for oid in walk.take(MAX_HISTORY_WALK) {
            let commit = self.repo.find_commit(oid?)?;
            let tree = commit.tree()?;
            let parent_tree = match commit.parents().next() {
                Some(parent) => Some(parent.tree()?),
                None => None,
            };

            let mut opts = DiffOptions::new();
            for path in paths {
                opts.pathspec(path);
            }

            let diff =
                self.repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut opts))?;
            if diff.deltas().next().is_some() {
                let seconds = commit.time().seconds();
                return Ok(Utc.timestamp_opt(seconds, 0).single());
            }
        }

        Ok(None)
    }
}

/// Async handle on a local clone.
///
/// Each call opens the repository on a blocking thread, so the handle is
/// cheap to share between concurrent collectors.
#[derive(Debug, Clone)]
pub struct LocalRepository {
    path: PathBuf,
}

impl LocalRepository {
    /// Use the clone at (or above) `path`, if there is one.
    pub fn discover(path: impl AsRef<Path>) -> Option<Self> {
        let repo = GitRepository::discover(path)?;
        repo.root().map(|path| Self { path })
    }

    /// Path to the working tree.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn with_repo<T, F>(&self, f: F) -> GatewayResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&GitRepository) -> Result<T, git2::Error> + Send + 'static,
    {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let repo = GitRepository::discover(&path).ok_or_else(|| {
                GatewayError::Unavailable(format!("repository at {}", path.display()))
            })?;
            f(&repo).map_err(GatewayError::from)
        })
        .await
        .map_err(|e| GatewayError::Unavailable(format!("git worker ({e})")))?
    }

    /// Fetch `remote`.
    pub async fn fetch(&self, remote: &str) -> GatewayResult<()> {
        let remote = remote.to_string();
        tracing::debug!(%remote, path = %self.path.display(), "refreshing remote refs");
        self.with_repo(move |repo| repo.fetch(&remote)).await
    }

    /// Remote branch names for `remote`.
    pub async fn remote_branches(&self, remote: &str) -> GatewayResult<Vec<String>> {
        let remote = remote.to_string();
        self.with_repo(move |repo| repo.remote_branches(&remote)).await
    }

    /// Last commit time touching `paths`.
    pub async fn last_commit_time(&self, paths: &[String]) -> GatewayResult<Option<DateTime<Utc>>> {
        let paths = paths.to_vec();
        self.with_repo(move |repo| repo.last_commit_time(&paths)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_missing_repo() {
        let dir = tempfile::tempdir().unwrap();
        assert!(LocalRepository::discover(dir.path()).is_none());
    }

    #[test]
    fn test_last_commit_time_empty_repo() {
        let dir = tempfile::tempdir().unwrap();
        Repository::init(dir.path()).unwrap();

        let repo = GitRepository::discover(dir.path()).unwrap();
        assert_eq!(repo.last_commit_time(&["docs".to_string()]).unwrap(), None);
        assert!(repo.remote_branches("origin").unwrap().is_empty());
    }
}
