//! Configuration management for Steward.
//!
//! Loads configuration from TOML files, falling back to defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Repository identity and local clone
    pub repository: RepositoryConfig,

    /// Bootstrap thresholds
    pub setup: SetupConfig,

    /// Label names the collector filters on
    pub labels: LabelConfig,

    /// Per-category caps
    pub limits: LimitsConfig,

    /// Time-based thresholds
    pub thresholds: ThresholdsConfig,

    /// Documentation freshness paths
    pub docs: DocsConfig,

    /// Project board settings
    pub board: BoardConfig,

    /// Network settings
    pub network: NetworkConfig,

    /// Directive settings
    pub directive: DirectiveConfig,
}

/// Repository settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Repository owner (falls back to GITHUB_REPOSITORY or the git remote)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Repository name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Remote whose branches are inspected
    pub remote: String,

    /// Integration branch new pull requests target
    pub base_branch: String,

    /// Path to the local clone
    pub path: PathBuf,
}

/// Thresholds deciding whether the project still needs bootstrapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SetupConfig {
    /// Minimum number of milestones (any state)
    pub required_milestones: usize,

    /// Minimum number of priority labels
    pub required_priority_labels: usize,

    /// Minimum number of project boards
    pub required_boards: usize,

    /// Prefix identifying priority labels
    pub priority_label_prefix: String,
}

/// Label names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// Label marking critical issues
    pub critical: String,

    /// Label marking bugs
    pub bug: String,
}

/// Caps applied when turning signals into actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub critical_issues: usize,
    pub bugs: usize,
    pub branches_without_pr: usize,
    pub mergeable_prs: usize,
    pub review_prs: usize,
    pub stagnant_prs: usize,
    pub merged_followups: usize,
    pub unassigned_issues: usize,
    pub old_issues: usize,
    pub ci_failures: usize,

    /// Page size for issue queries
    pub issue_fetch: usize,

    /// Number of recent CI runs inspected
    pub ci_runs: usize,
}

/// Time-based thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdsConfig {
    /// Draft PRs untouched for longer than this are stagnant
    pub stagnation_hours: i64,

    /// Issues opened longer ago than this are old
    pub old_issue_days: i64,

    /// Allowed lag of documentation behind source
    pub doc_staleness_days: i64,

    /// How far back merged PRs get a follow-up check
    pub merged_lookback_hours: i64,
}

/// Documentation freshness settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocsConfig {
    /// Paths holding documentation
    pub doc_paths: Vec<String>,

    /// Paths holding source code
    pub source_paths: Vec<String>,
}

/// Project board settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Single-select field holding the column
    pub status_field: String,

    /// Column closed work belongs in
    pub done_status: String,
}

/// Network settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Per-call timeout in seconds
    pub timeout_secs: u64,

    /// GitHub API base URL
    pub api_url: String,
}

/// Directive settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectiveConfig {
    /// Mention that opens every directive
    pub mention: String,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Looks for config in:
    /// 1. `.steward.toml` in current directory
    /// 2. `~/.config/steward/config.toml`
    /// 3. Falls back to defaults
    pub fn load() -> anyhow::Result<Self> {
        // Try local config first
        let local_config = PathBuf::from(".steward.toml");
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        // Try global config
        if let Some(global_config) = Self::global_path() {
            if global_config.exists() {
                return Self::load_from_file(&global_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Get the config directory path.
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("steward"))
    }

    /// Get the global config file path.
    pub fn global_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("config.toml"))
    }

    /// Per-call timeout as a duration.
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.network.timeout_secs)
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            owner: None,
            name: None,
            remote: "origin".to_string(),
            base_branch: "develop".to_string(),
            path: PathBuf::from("."),
        }
    }
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            required_milestones: 5,
            required_priority_labels: 4,
            required_boards: 0,
            priority_label_prefix: "priority:".to_string(),
        }
    }
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self { critical: "priority:critical".to_string(), bug: "bug".to_string() }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            critical_issues: 3,
            bugs: 2,
            branches_without_pr: 3,
            mergeable_prs: 3,
            review_prs: 2,
            stagnant_prs: 2,
            merged_followups: 2,
            unassigned_issues: 5,
            old_issues: 3,
            ci_failures: 3,
            issue_fetch: 50,
            ci_runs: 10,
        }
    }
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            stagnation_hours: 48,
            old_issue_days: 30,
            doc_staleness_days: 7,
            merged_lookback_hours: 24,
        }
    }
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            doc_paths: vec!["README.md".to_string(), "docs".to_string()],
            source_paths: vec!["src".to_string(), "backend".to_string(), "frontend".to_string()],
        }
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self { status_field: "Status".to_string(), done_status: "Done".to_string() }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self { timeout_secs: 30, api_url: "https://api.github.com".to_string() }
    }
}

impl Default for DirectiveConfig {
    fn default() -> Self {
        Self { mention: "@claude".to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.setup.required_milestones, 5);
        assert_eq!(config.setup.required_priority_labels, 4);
        assert_eq!(config.thresholds.stagnation_hours, 48);
        assert_eq!(config.limits.critical_issues, 3);
        assert_eq!(config.repository.base_branch, "develop");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("[repository]"));
        assert!(toml_str.contains("[limits]"));
        assert!(!toml_str.contains("owner"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [repository]
            owner = "acme"
            name = "forum"
            base_branch = "main"

            [limits]
            critical_issues = 5

            [thresholds]
            stagnation_hours = 72
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.repository.owner.as_deref(), Some("acme"));
        assert_eq!(config.repository.base_branch, "main");
        assert_eq!(config.repository.remote, "origin");
        assert_eq!(config.limits.critical_issues, 5);
        assert_eq!(config.limits.bugs, 2);
        assert_eq!(config.thresholds.stagnation_hours, 72);
        assert_eq!(config.thresholds.old_issue_days, 30);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("steward.toml");
        std::fs::write(&path, "[directive]\nmention = \"@bot\"\n").unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.directive.mention, "@bot");
        assert_eq!(config.network.timeout_secs, 30);
    }

    #[test]
    fn test_load_from_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[limits\n").unwrap();

        assert!(Config::load_from_file(&path).is_err());
    }
}
