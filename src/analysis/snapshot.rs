//! The snapshot: one fully collected view of every signal category.
//!
//! Sub-reports are built by the collector from gateway records through the
//! pure constructors below, so every derivation rule can be tested without a
//! gateway.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::{DegradedSignal, SetupConfig};
use crate::github::{
    BoardItemRecord, CheckState, IssueRecord, MilestoneRecord, PullRequestRecord, ReviewDecision,
    RunRecord,
};

/// Branches that never need a pull request of their own.
pub const EXCLUDED_BRANCHES: [&str; 4] = ["HEAD", "master", "main", "develop"];

static CLOSING_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:close[sd]?|fix(?:e[sd])?|resolve[sd]?)\s*:?\s+#(\d+)")
        .expect("closing reference pattern is valid")
});

/// Parse the issue number a branch refers to.
///
/// Takes the token after the first `issue-` up to the next `-` (or the end),
/// so `feature/issue-42-login` refers to issue 42.
pub fn issue_ref_from_branch(branch: &str) -> Option<u64> {
    let (_, rest) = branch.split_once("issue-")?;
    rest.split('-').next()?.parse().ok()
}

/// Drop the branches in [`EXCLUDED_BRANCHES`].
pub fn candidate_branches(branches: Vec<String>) -> Vec<String> {
    branches.into_iter().filter(|b| !EXCLUDED_BRANCHES.contains(&b.as_str())).collect()
}

/// Issue numbers a PR body closes (`Closes #3`, `fixes #4`, `Resolved: #5`).
pub fn closing_references(body: &str) -> Vec<u64> {
    let mut numbers = Vec::new();
    for caps in CLOSING_REFERENCE.captures_iter(body) {
        if let Ok(n) = caps[1].parse::<u64>() {
            if !numbers.contains(&n) {
                numbers.push(n);
            }
        }
    }
    numbers
}

/// Completion rate of a milestone; `None` when it has no issues at all.
pub fn completion_rate(open: u64, closed: u64) -> Option<f64> {
    let total = open + closed;
    if total == 0 {
        return None;
    }
    Some(closed as f64 / total as f64)
}

/// A pull request as the generator sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrSummary {
    pub number: u64,
    pub title: String,
    pub is_draft: bool,
    pub review_decision: Option<ReviewDecision>,
    pub check_state: Option<CheckState>,
    pub head_ref: String,
    pub updated_at: DateTime<Utc>,
}

impl From<&PullRequestRecord> for PrSummary {
    fn from(pr: &PullRequestRecord) -> Self {
        Self {
            number: pr.number,
            title: pr.title.clone(),
            is_draft: pr.is_draft,
            review_decision: pr.review_decision,
            check_state: pr.check_state,
            head_ref: pr.head_ref.clone(),
            updated_at: pr.updated_at,
        }
    }
}

/// An issue as the generator sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueSummary {
    pub number: u64,
    pub title: String,
    pub milestone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<IssueRecord> for IssueSummary {
    fn from(issue: IssueRecord) -> Self {
        Self {
            number: issue.number,
            title: issue.title,
            milestone: issue.milestone,
            created_at: issue.created_at,
        }
    }
}

/// Whether the project has been bootstrapped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupStatus {
    pub milestone_count: usize,
    pub priority_label_count: usize,
    pub board_count: usize,
    pub required_milestones: usize,
    pub required_priority_labels: usize,
    pub required_boards: usize,
    pub needs_setup: bool,
}

impl SetupStatus {
    /// Compare counts against the configured thresholds.
    pub fn evaluate(
        milestone_count: usize,
        priority_label_count: usize,
        board_count: usize,
        config: &SetupConfig,
    ) -> Self {
        let needs_setup = milestone_count < config.required_milestones
            || priority_label_count < config.required_priority_labels
            || board_count < config.required_boards;

        Self {
            milestone_count,
            priority_label_count,
            board_count,
            required_milestones: config.required_milestones,
            required_priority_labels: config.required_priority_labels,
            required_boards: config.required_boards,
            needs_setup,
        }
    }

    /// Human-readable list of what is still missing.
    pub fn missing(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.milestone_count < self.required_milestones {
            missing.push(format!(
                "Milestones: {} more (have {}, need {})",
                self.required_milestones - self.milestone_count,
                self.milestone_count,
                self.required_milestones
            ));
        }
        if self.priority_label_count < self.required_priority_labels {
            missing.push(format!(
                "Priority labels: {} more (have {}, need {})",
                self.required_priority_labels - self.priority_label_count,
                self.priority_label_count,
                self.required_priority_labels
            ));
        }
        if self.board_count < self.required_boards {
            missing.push(format!(
                "Project boards: {} more (have {}, need {})",
                self.required_boards - self.board_count,
                self.board_count,
                self.required_boards
            ));
        }
        missing
    }
}

/// Open pull requests by state, plus branches nobody opened a PR for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestSet {
    pub ready_to_merge: Vec<PrSummary>,
    pub needs_review: Vec<PrSummary>,
    pub draft: Vec<PrSummary>,
    pub branches_without_pr: Vec<String>,
    /// Issues already claimed by a draft PR's branch
    pub draft_issue_refs: BTreeSet<u64>,
}

impl PullRequestSet {
    /// Classify open PRs: drafts, approved with green checks, everything else.
    pub fn classify(prs: &[PullRequestRecord], branches_without_pr: Vec<String>) -> Self {
        let mut set = Self { branches_without_pr, ..Self::default() };

        for pr in prs {
            let summary = PrSummary::from(pr);
            if pr.is_draft {
                if let Some(issue) = issue_ref_from_branch(&pr.head_ref) {
                    set.draft_issue_refs.insert(issue);
                }
                set.draft.push(summary);
            } else if pr.review_decision == Some(ReviewDecision::Approved)
                && pr.check_state == Some(CheckState::Success)
            {
                set.ready_to_merge.push(summary);
            } else {
                set.needs_review.push(summary);
            }
        }

        set
    }
}

/// A recently merged pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedPr {
    pub number: u64,
    pub title: String,
    pub head_ref: String,
    pub merged_at: DateTime<Utc>,
    /// Issues the PR body says it closes
    pub closes: Vec<u64>,
}

/// Pull requests merged within the lookback window, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedPullRequests {
    pub recent: Vec<MergedPr>,
}

impl MergedPullRequests {
    /// Keep PRs merged at or after `now - lookback_hours`, newest first.
    pub fn within(prs: &[PullRequestRecord], now: DateTime<Utc>, lookback_hours: i64) -> Self {
        let since = now - Duration::hours(lookback_hours);
        let mut recent: Vec<MergedPr> = prs
            .iter()
            .filter_map(|pr| {
                let merged_at = pr.merged_at?;
                (merged_at >= since).then(|| MergedPr {
                    number: pr.number,
                    title: pr.title.clone(),
                    head_ref: pr.head_ref.clone(),
                    merged_at,
                    closes: closing_references(&pr.body),
                })
            })
            .collect();
        recent.sort_by(|a, b| b.merged_at.cmp(&a.merged_at));
        Self { recent }
    }
}

/// The issue backlog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueBacklog {
    pub critical_issues: Vec<IssueSummary>,
    pub bug_issues: Vec<IssueSummary>,
    pub no_milestone_issues: Vec<IssueSummary>,
    pub old_issues: Vec<IssueSummary>,
    /// Age in days past which an issue counts as old
    pub old_after_days: i64,
}

impl IssueBacklog {
    /// Build from the labeled lists and the full open list.
    ///
    /// `open` is scanned in platform order; unassigned and old issues are
    /// capped at `no_milestone_cap` and `old_cap`.
    pub fn build(
        critical: Vec<IssueRecord>,
        bugs: Vec<IssueRecord>,
        open: Vec<IssueRecord>,
        now: DateTime<Utc>,
        old_after_days: i64,
        no_milestone_cap: usize,
        old_cap: usize,
    ) -> Self {
        let old_cutoff = now - Duration::days(old_after_days);

        let no_milestone_issues = open
            .iter()
            .filter(|i| i.milestone.is_none())
            .take(no_milestone_cap)
            .cloned()
            .map(IssueSummary::from)
            .collect();
        let old_issues = open
            .iter()
            .filter(|i| i.created_at < old_cutoff)
            .take(old_cap)
            .cloned()
            .map(IssueSummary::from)
            .collect();

        Self {
            critical_issues: critical.into_iter().map(IssueSummary::from).collect(),
            bug_issues: bugs.into_iter().map(IssueSummary::from).collect(),
            no_milestone_issues,
            old_issues,
            old_after_days,
        }
    }
}

/// Progress of one open milestone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneStat {
    pub number: u64,
    pub title: String,
    pub open_issues: u64,
    pub closed_issues: u64,
    pub completion_rate: f64,
}

/// Open milestones split by completion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MilestoneProgress {
    pub completed: Vec<MilestoneStat>,
    pub active: Vec<MilestoneStat>,
}

impl MilestoneProgress {
    /// Milestones without any issue are left out of both lists.
    pub fn from_records(milestones: Vec<MilestoneRecord>) -> Self {
        let mut progress = Self::default();

        for m in milestones {
            let Some(rate) = completion_rate(m.open_issues, m.closed_issues) else {
                continue;
            };
            let stat = MilestoneStat {
                number: m.number,
                title: m.title,
                open_issues: m.open_issues,
                closed_issues: m.closed_issues,
                completion_rate: rate,
            };
            if rate >= 1.0 {
                progress.completed.push(stat);
            } else {
                progress.active.push(stat);
            }
        }

        progress
    }
}

/// A board item whose column disagrees with the state of its content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaleBoardItem {
    pub number: Option<u64>,
    pub title: String,
    pub status: Option<String>,
}

/// Project board status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardStatus {
    pub item_count: usize,
    pub stale_items: Vec<StaleBoardItem>,
}

impl BoardStatus {
    /// Items whose issue or PR is closed but which are not in `done_status`.
    pub fn evaluate(items: Vec<BoardItemRecord>, done_status: &str) -> Self {
        let item_count = items.len();
        let stale_items = items
            .into_iter()
            .filter(|i| i.closed && i.status.as_deref() != Some(done_status))
            .map(|i| StaleBoardItem { number: i.number, title: i.title, status: i.status })
            .collect();

        Self { item_count, stale_items }
    }

    /// Whether the board needs attention.
    pub fn needs_update(&self) -> bool {
        !self.stale_items.is_empty()
    }
}

/// Draft PRs nobody has touched for a while.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagnationReport {
    pub cutoff: Option<DateTime<Utc>>,
    pub stagnant_drafts: Vec<PrSummary>,
}

impl StagnationReport {
    /// Drafts last updated strictly before `now - hours`.
    ///
    /// A draft updated exactly at the cutoff is not stagnant.
    pub fn detect(prs: &[PullRequestRecord], now: DateTime<Utc>, hours: i64) -> Self {
        let cutoff = now - Duration::hours(hours);
        let stagnant_drafts = prs
            .iter()
            .filter(|pr| pr.is_draft && pr.updated_at < cutoff)
            .map(PrSummary::from)
            .collect();

        Self { cutoff: Some(cutoff), stagnant_drafts }
    }
}

/// A failed CI run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedRun {
    pub id: u64,
    pub name: String,
    pub head_branch: String,
    pub url: String,
}

/// Health of the most recent CI runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiHealth {
    pub inspected: usize,
    pub failure_count: usize,
    /// First failures, capped
    pub failed_runs: Vec<FailedRun>,
}

impl CiHealth {
    /// Count failures among `runs`, keeping the first `cap` of them.
    pub fn evaluate(runs: &[RunRecord], cap: usize) -> Self {
        let failed: Vec<&RunRecord> = runs.iter().filter(|r| r.failed()).collect();

        Self {
            inspected: runs.len(),
            failure_count: failed.len(),
            failed_runs: failed
                .into_iter()
                .take(cap)
                .map(|r| FailedRun {
                    id: r.id,
                    name: r.name.clone(),
                    head_branch: r.head_branch.clone(),
                    url: r.html_url.clone(),
                })
                .collect(),
        }
    }

    /// Whether any inspected run failed.
    pub fn has_failures(&self) -> bool {
        self.failure_count > 0
    }
}

/// Documentation freshness.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocStatus {
    pub needs_doc_update: bool,
    pub readme_age_days: i64,
    pub last_doc_change: Option<DateTime<Utc>>,
    pub last_source_change: Option<DateTime<Utc>>,
}

impl DocStatus {
    /// Docs are stale when source changed more than `staleness_days` after them.
    ///
    /// Docs never committed count as infinitely old; no source change never
    /// makes them stale.
    pub fn evaluate(
        last_doc_change: Option<DateTime<Utc>>,
        last_source_change: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        staleness_days: i64,
    ) -> Self {
        let allowed = Duration::days(staleness_days);
        let needs_doc_update = match (last_source_change, last_doc_change) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(source), Some(doc)) => source - doc > allowed,
        };
        let readme_age_days = last_doc_change.map_or(0, |doc| (now - doc).num_days().max(0));

        Self { needs_doc_update, readme_age_days, last_doc_change, last_source_change }
    }
}

/// One consistent, fully collected view of all signal categories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub collected_at: DateTime<Utc>,
    pub setup: SetupStatus,
    pub pull_requests: PullRequestSet,
    pub merged_pull_requests: MergedPullRequests,
    pub issues: IssueBacklog,
    pub milestones: MilestoneProgress,
    pub board: BoardStatus,
    pub stagnation: StagnationReport,
    pub ci: CiHealth,
    pub documentation: DocStatus,
    /// Categories that fell back to defaults
    pub degradations: Vec<DegradedSignal>,
}

impl Snapshot {
    /// An all-empty snapshot taken at `collected_at`.
    pub fn empty(collected_at: DateTime<Utc>) -> Self {
        Self { collected_at, ..Self::default() }
    }
}
