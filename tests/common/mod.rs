//! In-memory gateway shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use steward::github::{
    BoardItemRecord, GatewayError, GatewayResult, IssueQuery, IssueRecord, LabelRecord,
    MilestoneRecord, PullRequestRecord, QueryGateway, RunRecord, WorkflowStatus,
};

/// Fixed analysis time.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub fn hours_ago(hours: i64) -> DateTime<Utc> {
    now() - chrono::Duration::hours(hours)
}

pub fn days_ago(days: i64) -> DateTime<Utc> {
    now() - chrono::Duration::days(days)
}

pub fn pr(number: u64, head: &str) -> PullRequestRecord {
    PullRequestRecord {
        number,
        title: format!("PR {number}"),
        is_draft: false,
        review_decision: None,
        check_state: None,
        head_ref: head.to_string(),
        updated_at: hours_ago(1),
        merged_at: None,
        body: String::new(),
    }
}

pub fn issue(number: u64, title: &str) -> IssueRecord {
    IssueRecord {
        number,
        title: title.to_string(),
        milestone: Some("v1".to_string()),
        labels: Vec::new(),
        created_at: days_ago(1),
    }
}

pub fn run(id: u64, conclusion: WorkflowStatus) -> RunRecord {
    RunRecord {
        id,
        name: format!("CI #{id}"),
        status: WorkflowStatus::Completed,
        conclusion: Some(conclusion),
        head_branch: "develop".to_string(),
        html_url: format!("https://github.com/acme/forum/actions/runs/{id}"),
    }
}

/// A gateway serving canned records, with per-query failure injection.
#[derive(Default)]
pub struct FakeGateway {
    pub milestone_count: usize,
    pub labels: Vec<LabelRecord>,
    pub boards: usize,
    pub open_milestones: Vec<MilestoneRecord>,
    pub open_prs: Vec<PullRequestRecord>,
    pub merged_prs: Vec<PullRequestRecord>,
    pub branches: Vec<String>,
    pub branch_prs: HashMap<String, usize>,
    pub issues_by_label: HashMap<String, Vec<IssueRecord>>,
    pub open_issues: Vec<IssueRecord>,
    pub board_items: Vec<BoardItemRecord>,
    pub runs: Vec<RunRecord>,
    pub doc_change: Option<DateTime<Utc>>,
    pub source_change: Option<DateTime<Utc>>,

    /// Queries that return an error
    pub failing: HashSet<&'static str>,
    /// Queries that never finish in time
    pub hanging: HashSet<&'static str>,
    /// Branches whose PR lookup fails
    pub failing_branches: HashSet<String>,

    calls: Mutex<HashMap<&'static str, usize>>,
    refreshes: AtomicUsize,
    listed_before_refresh: AtomicBool,
}

impl FakeGateway {
    /// A project that is fully set up and has nothing going on.
    pub fn healthy() -> Self {
        Self {
            milestone_count: 5,
            labels: ["priority:critical", "priority:high", "priority:medium", "priority:low", "bug"]
                .iter()
                .map(|name| LabelRecord { name: (*name).to_string() })
                .collect(),
            ..Self::default()
        }
    }

    pub fn failing(mut self, query: &'static str) -> Self {
        self.failing.insert(query);
        self
    }

    pub fn hanging(mut self, query: &'static str) -> Self {
        self.hanging.insert(query);
        self
    }

    /// How many times `query` was called.
    pub fn calls(&self, query: &'static str) -> usize {
        self.calls.lock().unwrap().get(query).copied().unwrap_or(0)
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn listed_before_refresh(&self) -> bool {
        self.listed_before_refresh.load(Ordering::SeqCst)
    }

    async fn gate(&self, query: &'static str) -> GatewayResult<()> {
        *self.calls.lock().unwrap().entry(query).or_insert(0) += 1;

        if self.hanging.contains(query) {
            tokio::time::sleep(Duration::from_secs(10)).await;
        }
        if self.failing.contains(query) {
            return Err(GatewayError::Api { status: 502, message: "Bad Gateway".to_string() });
        }
        Ok(())
    }
}

#[async_trait]
impl QueryGateway for FakeGateway {
    async fn count_milestones(&self) -> GatewayResult<usize> {
        self.gate("count_milestones").await?;
        Ok(self.milestone_count)
    }

    async fn list_labels(&self) -> GatewayResult<Vec<LabelRecord>> {
        self.gate("list_labels").await?;
        Ok(self.labels.clone())
    }

    async fn count_project_boards(&self) -> GatewayResult<usize> {
        self.gate("count_project_boards").await?;
        Ok(self.boards)
    }

    async fn list_open_milestones(&self) -> GatewayResult<Vec<MilestoneRecord>> {
        self.gate("list_open_milestones").await?;
        Ok(self.open_milestones.clone())
    }

    async fn list_open_pull_requests(&self) -> GatewayResult<Vec<PullRequestRecord>> {
        self.gate("list_open_pull_requests").await?;
        Ok(self.open_prs.clone())
    }

    async fn list_merged_pull_requests(
        &self,
        limit: usize,
    ) -> GatewayResult<Vec<PullRequestRecord>> {
        self.gate("list_merged_pull_requests").await?;
        Ok(self.merged_prs.iter().take(limit).cloned().collect())
    }

    async fn refresh_remote_branches(&self) -> GatewayResult<()> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        self.gate("refresh_remote_branches").await
    }

    async fn list_remote_branches(&self) -> GatewayResult<Vec<String>> {
        if self.refreshes() == 0 {
            self.listed_before_refresh.store(true, Ordering::SeqCst);
        }
        self.gate("list_remote_branches").await?;
        Ok(self.branches.clone())
    }

    async fn count_pull_requests_for_branch(&self, branch: &str) -> GatewayResult<usize> {
        self.gate("count_pull_requests_for_branch").await?;
        if self.failing_branches.contains(branch) {
            return Err(GatewayError::NotFound(branch.to_string()));
        }
        Ok(self.branch_prs.get(branch).copied().unwrap_or(0))
    }

    async fn list_issues(&self, query: IssueQuery) -> GatewayResult<Vec<IssueRecord>> {
        self.gate("list_issues").await?;
        let issues = match &query.label {
            Some(label) => self.issues_by_label.get(label).cloned().unwrap_or_default(),
            None => self.open_issues.clone(),
        };
        Ok(issues.into_iter().take(query.limit).collect())
    }

    async fn list_board_items(&self) -> GatewayResult<Vec<BoardItemRecord>> {
        self.gate("list_board_items").await?;
        Ok(self.board_items.clone())
    }

    async fn list_recent_runs(&self, limit: usize) -> GatewayResult<Vec<RunRecord>> {
        self.gate("list_recent_runs").await?;
        Ok(self.runs.iter().take(limit).cloned().collect())
    }

    async fn last_modified(&self, paths: &[String]) -> GatewayResult<Option<DateTime<Utc>>> {
        self.gate("last_modified").await?;
        if paths.iter().any(|p| p == "README.md") {
            Ok(self.doc_change)
        } else {
            Ok(self.source_change)
        }
    }
}
