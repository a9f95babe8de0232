//! GitHub integration.
//!
//! The [`QueryGateway`] trait is the only thing the analysis core knows about
//! the platform; [`GitHubGateway`] implements it against the GitHub API.

mod client;
mod gateway;
mod wire;

pub use client::{GitHubClient, GitHubGateway};
pub use gateway::{
    BoardItemRecord, CheckState, GatewayError, GatewayResult, IssueQuery, IssueRecord, IssueState,
    LabelRecord, MilestoneRecord, PullRequestRecord, QueryGateway, ReviewDecision, RunRecord,
};
pub use wire::WorkflowStatus;

use crate::core::{RepositoryConfig, StewardError, StewardResult};

/// Parse `owner/repo` out of a GitHub remote URL.
///
/// Accepts the SSH (`git@github.com:owner/repo.git`) and HTTPS
/// (`https://github.com/owner/repo[.git]`) forms.
pub fn parse_github_remote(url: &str) -> Option<(String, String)> {
    let url = url.trim();
    let path = url
        .strip_prefix("git@github.com:")
        .or_else(|| url.strip_prefix("ssh://git@github.com/"))
        .or_else(|| url.strip_prefix("https://github.com/"))
        .or_else(|| url.strip_prefix("http://github.com/"))?;
    let path = path.strip_suffix(".git").unwrap_or(path).trim_end_matches('/');

    let (owner, repo) = path.split_once('/')?;
    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}

/// Parse an `owner/repo` spec such as `GITHUB_REPOSITORY`.
pub fn parse_repo_spec(spec: &str) -> Option<(String, String)> {
    let (owner, repo) = spec.trim().split_once('/')?;
    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}

/// Detect the GitHub repository from the `remote` of the clone at `path`.
#[cfg(feature = "git")]
pub fn detect_github_repo(path: &std::path::Path, remote: &str) -> Option<(String, String)> {
    let url = crate::git::GitRepository::discover(path)?.remote_url(remote)?;
    parse_github_remote(&url)
}

/// Detect the GitHub repository from the `remote` of the clone at `path`.
#[cfg(not(feature = "git"))]
pub fn detect_github_repo(path: &std::path::Path, remote: &str) -> Option<(String, String)> {
    let output = std::process::Command::new("git")
        .arg("-C")
        .arg(path)
        .args(["remote", "get-url", remote])
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    parse_github_remote(&String::from_utf8_lossy(&output.stdout))
}

/// Work out which repository to analyze.
///
/// Order: `explicit` (`--repo`), the config file, `GITHUB_REPOSITORY`, then
/// the configured remote of the local clone.
pub fn resolve_repository(
    explicit: Option<&str>,
    config: &RepositoryConfig,
) -> StewardResult<(String, String)> {
    if let Some(spec) = explicit {
        return parse_repo_spec(spec)
            .ok_or_else(|| StewardError::InvalidRepository(spec.to_string()));
    }
    if let (Some(owner), Some(name)) = (&config.owner, &config.name) {
        return Ok((owner.clone(), name.clone()));
    }
    if let Ok(spec) = std::env::var("GITHUB_REPOSITORY") {
        return parse_repo_spec(&spec).ok_or(StewardError::InvalidRepository(spec));
    }
    detect_github_repo(&config.path, &config.remote).ok_or(StewardError::RepositoryUnknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_github_remote() {
        let expected = Some(("acme".to_string(), "forum".to_string()));
        assert_eq!(parse_github_remote("git@github.com:acme/forum.git"), expected);
        assert_eq!(parse_github_remote("https://github.com/acme/forum.git"), expected);
        assert_eq!(parse_github_remote("https://github.com/acme/forum"), expected);
        assert_eq!(parse_github_remote("ssh://git@github.com/acme/forum.git\n"), expected);
        assert_eq!(parse_github_remote("https://gitlab.com/acme/forum"), None);
        assert_eq!(parse_github_remote("https://github.com/acme"), None);
    }

    #[test]
    fn test_parse_repo_spec() {
        assert_eq!(parse_repo_spec("acme/forum"), Some(("acme".into(), "forum".into())));
        assert_eq!(parse_repo_spec("acme"), None);
        assert_eq!(parse_repo_spec("/forum"), None);
        assert_eq!(parse_repo_spec("a/b/c"), None);
    }

    #[test]
    fn test_resolve_repository_explicit_and_config() {
        let config = RepositoryConfig::default();
        assert_eq!(
            resolve_repository(Some("acme/forum"), &config).unwrap(),
            ("acme".to_string(), "forum".to_string())
        );
        assert!(matches!(
            resolve_repository(Some("forum"), &config),
            Err(StewardError::InvalidRepository(_))
        ));

        let configured = RepositoryConfig {
            owner: Some("octo".into()),
            name: Some("site".into()),
            ..RepositoryConfig::default()
        };
        assert_eq!(
            resolve_repository(None, &configured).unwrap(),
            ("octo".to_string(), "site".to_string())
        );
    }

    #[test]
    #[serial_test::serial]
    fn test_resolve_repository_from_env() {
        let config = RepositoryConfig::default();

        std::env::set_var("GITHUB_REPOSITORY", "acme/ci-run");
        let resolved = resolve_repository(None, &config);
        std::env::set_var("GITHUB_REPOSITORY", "not-a-spec");
        let invalid = resolve_repository(None, &config);
        std::env::remove_var("GITHUB_REPOSITORY");

        assert_eq!(resolved.unwrap(), ("acme".to_string(), "ci-run".to_string()));
        assert!(matches!(invalid, Err(StewardError::InvalidRepository(_))));
    }
}
