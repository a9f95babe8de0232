//! Wire types for GitHub REST and GraphQL responses.
//!
//! These mirror the JSON the API returns and are converted into the
//! gateway's records right after deserialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::gateway::{
    BoardItemRecord, CheckState, IssueRecord, LabelRecord, MilestoneRecord, PullRequestRecord,
    ReviewDecision, RunRecord,
};

/// Status or conclusion of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// Workflow is queued
    Queued,
    /// Workflow was requested
    Requested,
    /// Workflow is pending
    Pending,
    /// Workflow is in progress
    InProgress,
    /// Workflow completed
    Completed,
    /// Workflow was cancelled
    Cancelled,
    /// Workflow failed
    Failure,
    /// Workflow succeeded
    Success,
    /// Workflow was skipped
    Skipped,
    /// Workflow timed out
    TimedOut,
    /// Waiting for approval
    Waiting,
    /// Action required
    ActionRequired,
    /// Neutral (neither success nor failure)
    Neutral,
    /// Stale
    Stale,
    /// Anything GitHub adds later
    #[serde(other)]
    Unknown,
}

impl WorkflowStatus {
    /// Check if the status represents a failure state.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failure | Self::TimedOut)
    }
}

// ============================================================================
// REST
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct RestLabel {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RestMilestone {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub open_issues: u64,
    pub closed_issues: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RestMilestoneRef {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RestIssue {
    pub number: u64,
    pub title: String,
    pub milestone: Option<RestMilestoneRef>,
    #[serde(default)]
    pub labels: Vec<RestLabel>,
    pub created_at: DateTime<Utc>,
    /// Present when the "issue" is really a pull request
    pub pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RestPullRef {
    #[allow(dead_code)]
    pub number: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RestWorkflowRun {
    pub id: u64,
    pub name: Option<String>,
    pub status: WorkflowStatus,
    pub conclusion: Option<WorkflowStatus>,
    #[serde(default)]
    pub head_branch: Option<String>,
    pub html_url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WorkflowRunsResponse {
    pub workflow_runs: Vec<RestWorkflowRun>,
}

impl From<RestLabel> for LabelRecord {
    fn from(label: RestLabel) -> Self {
        Self { name: label.name }
    }
}

impl From<RestMilestone> for MilestoneRecord {
    fn from(m: RestMilestone) -> Self {
        Self {
            number: m.number,
            title: m.title,
            state: m.state,
            open_issues: m.open_issues,
            closed_issues: m.closed_issues,
        }
    }
}

impl From<RestIssue> for IssueRecord {
    fn from(issue: RestIssue) -> Self {
        Self {
            number: issue.number,
            title: issue.title,
            milestone: issue.milestone.map(|m| m.title),
            labels: issue.labels.into_iter().map(|l| l.name).collect(),
            created_at: issue.created_at,
        }
    }
}

impl From<RestWorkflowRun> for RunRecord {
    fn from(run: RestWorkflowRun) -> Self {
        Self {
            id: run.id,
            name: run.name.unwrap_or_else(|| format!("run {}", run.id)),
            status: run.status,
            conclusion: run.conclusion,
            head_branch: run.head_branch.unwrap_or_default(),
            html_url: run.html_url,
        }
    }
}

// ============================================================================
// GraphQL
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlResponse<T> {
    pub data: Option<T>,
    pub errors: Option<Vec<GraphQlMessage>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlMessage {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RepositoryData<T> {
    pub repository: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Connection<T> {
    #[serde(rename = "totalCount", default)]
    pub total_count: usize,
    #[serde(default = "Vec::new")]
    pub nodes: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PullRequestsData {
    pub pull_requests: Connection<GqlPullRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GqlPullRequest {
    pub number: u64,
    pub title: String,
    pub is_draft: bool,
    pub review_decision: Option<ReviewDecision>,
    pub head_ref_name: String,
    pub updated_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub body: String,
    pub commits: Connection<GqlCommitNode>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GqlCommitNode {
    pub commit: GqlCommit,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GqlCommit {
    pub status_check_rollup: Option<GqlRollup>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GqlRollup {
    pub state: CheckState,
}

impl From<GqlPullRequest> for PullRequestRecord {
    fn from(pr: GqlPullRequest) -> Self {
        let check_state = pr
            .commits
            .nodes
            .into_iter()
            .last()
            .and_then(|n| n.commit.status_check_rollup)
            .map(|r| r.state);

        Self {
            number: pr.number,
            title: pr.title,
            is_draft: pr.is_draft,
            review_decision: pr.review_decision,
            check_state,
            head_ref: pr.head_ref_name,
            updated_at: pr.updated_at,
            merged_at: pr.merged_at,
            body: pr.body,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProjectsData {
    pub projects_v2: Connection<GqlProject>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GqlProject {
    pub items: Connection<GqlProjectItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GqlProjectItem {
    pub field_value_by_name: Option<GqlFieldValue>,
    pub content: Option<GqlItemContent>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GqlFieldValue {
    pub name: Option<String>,
}

/// Issue, pull request or draft item; union members flatten into one shape.
#[derive(Debug, Deserialize)]
pub(crate) struct GqlItemContent {
    pub number: Option<u64>,
    pub title: Option<String>,
    pub state: Option<String>,
}

impl From<GqlProjectItem> for BoardItemRecord {
    fn from(item: GqlProjectItem) -> Self {
        let status = item.field_value_by_name.and_then(|v| v.name);
        let (number, title, state) = match item.content {
            Some(c) => (c.number, c.title.unwrap_or_default(), c.state),
            None => (None, String::new(), None),
        };
        let closed = matches!(state.as_deref(), Some("CLOSED" | "MERGED"));

        Self { number, title, status, closed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_status_unknown_value() {
        let status: WorkflowStatus = serde_json::from_str("\"brand_new_state\"").unwrap();
        assert_eq!(status, WorkflowStatus::Unknown);
        assert!(!status.is_failure());
    }

    #[test]
    fn test_rest_issue_conversion() {
        let json = r#"{
            "number": 7,
            "title": "Login fails",
            "milestone": {"title": "v1.0"},
            "labels": [{"name": "bug"}],
            "created_at": "2024-01-01T00:00:00Z",
            "pull_request": null
        }"#;
        let issue: RestIssue = serde_json::from_str(json).unwrap();
        let record = IssueRecord::from(issue);
        assert_eq!(record.number, 7);
        assert_eq!(record.milestone.as_deref(), Some("v1.0"));
        assert_eq!(record.labels, vec!["bug".to_string()]);
    }

    #[test]
    fn test_graphql_pull_request_conversion() {
        let json = r#"{
            "number": 12,
            "title": "Add search",
            "isDraft": false,
            "reviewDecision": "APPROVED",
            "headRefName": "feature/issue-3-search",
            "updatedAt": "2024-03-01T10:00:00Z",
            "mergedAt": null,
            "body": "Closes #3",
            "commits": {"nodes": [{"commit": {"statusCheckRollup": {"state": "SUCCESS"}}}]}
        }"#;
        let pr: GqlPullRequest = serde_json::from_str(json).unwrap();
        let record = PullRequestRecord::from(pr);
        assert_eq!(record.review_decision, Some(ReviewDecision::Approved));
        assert_eq!(record.check_state, Some(CheckState::Success));
        assert_eq!(record.head_ref, "feature/issue-3-search");
    }

    #[test]
    fn test_board_item_conversion() {
        let json = r#"{
            "fieldValueByName": {"name": "In Progress"},
            "content": {"number": 4, "title": "Old work", "state": "CLOSED"}
        }"#;
        let item: GqlProjectItem = serde_json::from_str(json).unwrap();
        let record = BoardItemRecord::from(item);
        assert!(record.closed);
        assert_eq!(record.status.as_deref(), Some("In Progress"));

        let draft: GqlProjectItem =
            serde_json::from_str(r#"{"fieldValueByName": null, "content": {"title": "Idea"}}"#)
                .unwrap();
        let record = BoardItemRecord::from(draft);
        assert_eq!(record.number, None);
        assert!(!record.closed);
    }
}
