//! The query gateway: the narrow interface the collector reads the platform through.
//!
//! One method per query shape. Implementations return structured records or a
//! typed [`GatewayError`]; the collector decides what a failure means.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::wire::WorkflowStatus;

/// Result type for gateway queries.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors a gateway query can fail with.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GitHub API error: {message} (status: {status})")]
    Api { status: u16, message: String },

    #[error("Authentication required")]
    Unauthorized,

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("GraphQL error: {0}")]
    GraphQl(String),

    #[cfg(feature = "git")]
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("{0} is not available")]
    Unavailable(String),
}

/// Aggregate status of a pull request's checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckState {
    Success,
    Failure,
    Pending,
    Error,
    Expected,
    #[serde(other)]
    Unknown,
}

/// Review decision on a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewDecision {
    Approved,
    ChangesRequested,
    ReviewRequired,
    #[serde(other)]
    Unknown,
}

/// Issue state filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IssueState {
    #[default]
    Open,
    Closed,
    All,
}

impl IssueState {
    /// Query-string form.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::All => "all",
        }
    }
}

/// Filter for issue queries.
#[derive(Debug, Clone, Default)]
pub struct IssueQuery {
    /// Only issues carrying this label
    pub label: Option<String>,
    /// State filter
    pub state: IssueState,
    /// Maximum number of results
    pub limit: usize,
}

impl IssueQuery {
    /// Open issues, optionally with a label.
    pub fn open(label: Option<&str>, limit: usize) -> Self {
        Self { label: label.map(String::from), state: IssueState::Open, limit }
    }
}

/// A label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelRecord {
    pub name: String,
}

/// A milestone with its issue counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneRecord {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub open_issues: u64,
    pub closed_issues: u64,
}

/// A pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRecord {
    pub number: u64,
    pub title: String,
    pub is_draft: bool,
    pub review_decision: Option<ReviewDecision>,
    pub check_state: Option<CheckState>,
    pub head_ref: String,
    pub updated_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
    pub body: String,
}

/// An issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRecord {
    pub number: u64,
    pub title: String,
    pub milestone: Option<String>,
    pub labels: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// An item on the project board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardItemRecord {
    /// Issue or PR number; `None` for draft items
    pub number: Option<u64>,
    pub title: String,
    /// Value of the status field, if set
    pub status: Option<String>,
    /// Whether the underlying issue or PR is closed or merged
    pub closed: bool,
}

/// A CI workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: u64,
    pub name: String,
    pub status: WorkflowStatus,
    pub conclusion: Option<WorkflowStatus>,
    pub head_branch: String,
    pub html_url: String,
}

impl RunRecord {
    /// Whether the run concluded in failure.
    pub fn failed(&self) -> bool {
        self.conclusion.is_some_and(|c| c.is_failure())
    }
}

/// Read access to the collaboration platform and the local view of its refs.
///
/// Every method is an idempotent read, except [`refresh_remote_branches`],
/// which updates the local view of remote refs and is itself idempotent.
///
/// [`refresh_remote_branches`]: QueryGateway::refresh_remote_branches
#[async_trait]
pub trait QueryGateway: Send + Sync {
    /// Number of milestones in any state.
    async fn count_milestones(&self) -> GatewayResult<usize>;

    /// All labels.
    async fn list_labels(&self) -> GatewayResult<Vec<LabelRecord>>;

    /// Number of project boards.
    async fn count_project_boards(&self) -> GatewayResult<usize>;

    /// Open milestones with issue counts.
    async fn list_open_milestones(&self) -> GatewayResult<Vec<MilestoneRecord>>;

    /// Open pull requests, drafts included.
    async fn list_open_pull_requests(&self) -> GatewayResult<Vec<PullRequestRecord>>;

    /// Merged pull requests, most recently updated first.
    async fn list_merged_pull_requests(&self, limit: usize)
        -> GatewayResult<Vec<PullRequestRecord>>;

    /// Update the local view of remote refs.
    async fn refresh_remote_branches(&self) -> GatewayResult<()>;

    /// Remote branch names without the remote prefix (may include `HEAD`).
    async fn list_remote_branches(&self) -> GatewayResult<Vec<String>>;

    /// Number of pull requests in any state whose head is `branch`.
    async fn count_pull_requests_for_branch(&self, branch: &str) -> GatewayResult<usize>;

    /// Issues matching `query`, in platform order. Pull requests are excluded.
    async fn list_issues(&self, query: IssueQuery) -> GatewayResult<Vec<IssueRecord>>;

    /// Items on the first project board.
    async fn list_board_items(&self) -> GatewayResult<Vec<BoardItemRecord>>;

    /// Most recent CI runs, newest first.
    async fn list_recent_runs(&self, limit: usize) -> GatewayResult<Vec<RunRecord>>;

    /// Time of the latest commit touching any of `paths`.
    async fn last_modified(&self, paths: &[String]) -> GatewayResult<Option<DateTime<Utc>>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_state_deserialization() {
        let state: CheckState = serde_json::from_str("\"SUCCESS\"").unwrap();
        assert_eq!(state, CheckState::Success);
        let other: CheckState = serde_json::from_str("\"SOMETHING_NEW\"").unwrap();
        assert_eq!(other, CheckState::Unknown);
    }

    #[test]
    fn test_review_decision_deserialization() {
        let decision: ReviewDecision = serde_json::from_str("\"CHANGES_REQUESTED\"").unwrap();
        assert_eq!(decision, ReviewDecision::ChangesRequested);
    }

    #[test]
    fn test_run_failed() {
        let mut run = RunRecord {
            id: 1,
            name: "CI".into(),
            status: WorkflowStatus::Completed,
            conclusion: Some(WorkflowStatus::Failure),
            head_branch: "main".into(),
            html_url: String::new(),
        };
        assert!(run.failed());

        run.conclusion = Some(WorkflowStatus::TimedOut);
        assert!(run.failed());

        run.conclusion = None;
        assert!(!run.failed());
    }

    #[test]
    fn test_issue_query_open() {
        let q = IssueQuery::open(Some("bug"), 20);
        assert_eq!(q.label.as_deref(), Some("bug"));
        assert_eq!(q.state.as_str(), "open");
        assert_eq!(q.limit, 20);
    }
}
