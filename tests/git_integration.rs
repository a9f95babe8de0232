//! Git Integration Tests
//!
//! Local history and remote-tracking refs in a scratch repository.

#![cfg(feature = "git")]

use std::fs;
use std::path::Path;

use chrono::{TimeZone, Utc};
use git2::{Oid, Repository, Signature, Time};
use tempfile::TempDir;

use steward::{GitRepository, LocalRepository};

const FIRST: i64 = 1_700_000_000;
const SECOND: i64 = 1_700_100_000;

fn commit(repo: &Repository, file: &str, contents: &str, seconds: i64) -> Oid {
    let workdir = repo.workdir().unwrap();
    let path = workdir.join(file);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, contents).unwrap();

    let mut index = repo.index().unwrap();
    index.add_path(Path::new(file)).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();

    let sig = Signature::new("Test", "test@example.com", &Time::new(seconds, 0)).unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, &format!("update {file}"), &tree, &parents).unwrap()
}

fn scratch_repo() -> (TempDir, Oid) {
    let dir = tempfile::tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    commit(&repo, "README.md", "# Forum\n", FIRST);
    let head = commit(&repo, "src/main.rs", "fn main() {}\n", SECOND);

    for branch in ["HEAD", "develop", "feature/issue-12-search"] {
        repo.reference(&format!("refs/remotes/origin/{branch}"), head, true, "test").unwrap();
    }
    repo.reference("refs/remotes/upstream/other", head, true, "test").unwrap();

    (dir, head)
}

#[test]
fn test_last_commit_time_per_path() {
    let (dir, _) = scratch_repo();
    let repo = GitRepository::discover(dir.path()).unwrap();

    let readme = repo.last_commit_time(&["README.md".to_string()]).unwrap();
    assert_eq!(readme, Utc.timestamp_opt(FIRST, 0).single());

    let source = repo.last_commit_time(&["src".to_string(), "backend".to_string()]).unwrap();
    assert_eq!(source, Utc.timestamp_opt(SECOND, 0).single());

    assert_eq!(repo.last_commit_time(&["docs".to_string()]).unwrap(), None);
    assert_eq!(repo.last_commit_time(&[]).unwrap(), None);
}

#[test]
fn test_remote_branches_strip_remote_prefix() {
    let (dir, _) = scratch_repo();
    let repo = GitRepository::discover(dir.path()).unwrap();

    let mut branches = repo.remote_branches("origin").unwrap();
    branches.sort();
    assert_eq!(branches, vec!["HEAD", "develop", "feature/issue-12-search"]);

    assert_eq!(repo.remote_branches("upstream").unwrap(), vec!["other"]);
}

#[test]
fn test_fetch_unknown_remote_fails() {
    let (dir, _) = scratch_repo();
    let repo = GitRepository::discover(dir.path()).unwrap();
    assert!(repo.fetch("nowhere").is_err());
}

#[tokio::test]
async fn test_local_repository_from_subdirectory() {
    let (dir, _) = scratch_repo();
    let local = LocalRepository::discover(dir.path().join("src")).unwrap();

    let source = local.last_commit_time(&["src".to_string()]).await.unwrap();
    assert_eq!(source, Utc.timestamp_opt(SECOND, 0).single());

    let branches = local.remote_branches("origin").await.unwrap();
    assert!(branches.contains(&"feature/issue-12-search".to_string()));
}

#[test]
fn test_detect_github_repo_from_remote() {
    let (dir, _) = scratch_repo();
    let repo = Repository::open(dir.path()).unwrap();
    repo.remote("origin", "git@github.com:acme/forum.git").unwrap();
    repo.remote("mirror", "https://gitlab.com/acme/forum").unwrap();

    let detected = steward::github::detect_github_repo(&dir.path().join("src"), "origin");
    assert_eq!(detected, Some(("acme".to_string(), "forum".to_string())));

    assert_eq!(steward::github::detect_github_repo(dir.path(), "mirror"), None);
    assert_eq!(steward::github::detect_github_repo(dir.path(), "missing"), None);
}
