//! Signal collection.
//!
//! Every gateway call runs under the per-call timeout. A call that fails or
//! times out resolves to the default value for its result and the category
//! is recorded as degraded; collection itself never fails.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;

use super::snapshot::{
    candidate_branches, BoardStatus, CiHealth, DocStatus, IssueBacklog, MergedPullRequests,
    MilestoneProgress, PullRequestSet, SetupStatus, Snapshot, StagnationReport,
};
use crate::core::{Config, Degradable, DegradationManager, DegradationReason, SignalCategory};
use crate::github::{GatewayError, GatewayResult, IssueQuery, QueryGateway};

/// Collects a [`Snapshot`] through a [`QueryGateway`].
pub struct SignalCollector<G> {
    gateway: G,
    config: Config,
    timeout: Duration,
}

impl<G: QueryGateway> SignalCollector<G> {
    /// Collector using the timeout from `config`.
    pub fn new(gateway: G, config: Config) -> Self {
        let timeout = config.timeout();
        Self { gateway, config, timeout }
    }

    /// Override the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Collect every category concurrently.
    pub async fn collect(&self, now: DateTime<Utc>) -> Snapshot {
        tracing::debug!(timeout = ?self.timeout, "collecting signals");

        let (
            setup,
            (pull_requests, stagnation),
            merged,
            issues,
            milestones,
            board,
            ci,
            documentation,
        ) = tokio::join!(
            self.collect_setup(),
            self.collect_pull_requests(now),
            self.collect_merged(now),
            self.collect_issues(now),
            self.collect_milestones(),
            self.collect_board(),
            self.collect_ci(),
            self.collect_documentation(now),
        );

        let mut degradations = DegradationManager::new();
        let mut snapshot = Snapshot {
            collected_at: now,
            setup: setup.record(SignalCategory::Setup, &mut degradations),
            pull_requests: pull_requests.record(SignalCategory::PullRequests, &mut degradations),
            merged_pull_requests: merged
                .record(SignalCategory::MergedPullRequests, &mut degradations),
            issues: issues.record(SignalCategory::Issues, &mut degradations),
            milestones: milestones.record(SignalCategory::Milestones, &mut degradations),
            board: board.record(SignalCategory::Board, &mut degradations),
            stagnation: stagnation.record(SignalCategory::Stagnation, &mut degradations),
            ci: ci.record(SignalCategory::Ci, &mut degradations),
            documentation: documentation.record(SignalCategory::Documentation, &mut degradations),
            degradations: Vec::new(),
        };

        if degradations.has_degradations() {
            tracing::info!("{}", degradations.summary());
        }
        snapshot.degradations = degradations.into_signals();
        snapshot
    }

    /// Run one gateway call under the timeout.
    async fn query<T, F>(&self, what: &str, call: F) -> Degradable<T>
    where
        T: Default,
        F: Future<Output = GatewayResult<T>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Degradable::Ok(value),
            Ok(Err(GatewayError::Unavailable(service))) => {
                tracing::debug!(query = what, %service, "backing service unavailable");
                Degradable::degraded(T::default(), DegradationReason::Unavailable(service))
            }
            Ok(Err(e)) => {
                tracing::debug!(query = what, error = %e, "query failed");
                let reason = DegradationReason::QueryFailed(format!("{what}: {e}"));
                Degradable::degraded(T::default(), reason)
            }
            Err(_) => {
                tracing::debug!(query = what, "query timed out");
                Degradable::degraded(T::default(), DegradationReason::Timeout(self.timeout))
            }
        }
    }

    async fn collect_setup(&self) -> Degradable<SetupStatus> {
        let (milestones, labels, boards) = tokio::join!(
            self.query("milestone count", self.gateway.count_milestones()),
            self.query("labels", self.gateway.list_labels()),
            self.query("project boards", self.gateway.count_project_boards()),
        );
        let (milestones, m_reason) = milestones.split();
        let (labels, l_reason) = labels.split();
        let (boards, b_reason) = boards.split();

        // Zero counts from failed queries must not read as "needs setup".
        if m_reason.is_some() || l_reason.is_some() || b_reason.is_some() {
            return Degradable::from_parts(SetupStatus::default(), [m_reason, l_reason, b_reason]);
        }

        let prefix = &self.config.setup.priority_label_prefix;
        let priority_labels = labels.iter().filter(|l| l.name.starts_with(prefix.as_str())).count();
        Degradable::Ok(SetupStatus::evaluate(
            milestones,
            priority_labels,
            boards,
            &self.config.setup,
        ))
    }

    async fn collect_pull_requests(
        &self,
        now: DateTime<Utc>,
    ) -> (Degradable<PullRequestSet>, Degradable<StagnationReport>) {
        let (open, branches) = tokio::join!(
            self.query("open pull requests", self.gateway.list_open_pull_requests()),
            self.collect_branches_without_pr(),
        );
        let (open, open_reason) = open.split();
        let (branches, branch_reason) = branches.split();

        let set = PullRequestSet::classify(&open, branches);
        let stagnation =
            StagnationReport::detect(&open, now, self.config.thresholds.stagnation_hours);

        (
            Degradable::from_parts(set, [open_reason.clone(), branch_reason]),
            Degradable::from_parts(stagnation, [open_reason]),
        )
    }

    /// Remote branches with no pull request in any state.
    ///
    /// Refs are refreshed before listing. A branch whose lookup fails is
    /// left out rather than reported.
    async fn collect_branches_without_pr(&self) -> Degradable<Vec<String>> {
        let refreshed =
            self.query("refresh remote branches", self.gateway.refresh_remote_branches()).await;
        let (branches, list_reason) =
            self.query("remote branches", self.gateway.list_remote_branches()).await.split();

        let candidates = candidate_branches(branches);
        let lookups = join_all(candidates.iter().map(|branch| {
            let count = self.gateway.count_pull_requests_for_branch(branch);
            self.query("pull requests for branch", count)
        }))
        .await;

        let mut without_pr = Vec::new();
        let mut failed = 0usize;
        for (branch, lookup) in candidates.into_iter().zip(lookups) {
            match lookup {
                Degradable::Ok(0) => without_pr.push(branch),
                Degradable::Ok(_) => {}
                Degradable::Degraded { reason, .. } => {
                    tracing::debug!(%branch, %reason, "branch lookup failed, skipping");
                    failed += 1;
                }
            }
        }

        let lookup_reason = (failed > 0)
            .then(|| DegradationReason::QueryFailed(format!("{failed} branch lookup(s) failed")));
        let refresh_reason = refreshed.reason().cloned();
        Degradable::from_parts(without_pr, [refresh_reason, list_reason, lookup_reason])
    }

    async fn collect_merged(&self, now: DateTime<Utc>) -> Degradable<MergedPullRequests> {
        let limit = self.config.limits.issue_fetch;
        let lookback_hours = self.config.thresholds.merged_lookback_hours;
        self.query("merged pull requests", self.gateway.list_merged_pull_requests(limit))
            .await
            .map(|prs| MergedPullRequests::within(&prs, now, lookback_hours))
    }

    async fn collect_issues(&self, now: DateTime<Utc>) -> Degradable<IssueBacklog> {
        let labels = &self.config.labels;
        let limit = self.config.limits.issue_fetch;
        let critical_query = IssueQuery::open(Some(labels.critical.as_str()), limit);
        let bug_query = IssueQuery::open(Some(labels.bug.as_str()), limit);
        let (critical, bugs, open) = tokio::join!(
            self.query("critical issues", self.gateway.list_issues(critical_query)),
            self.query("bug issues", self.gateway.list_issues(bug_query)),
            self.query("open issues", self.gateway.list_issues(IssueQuery::open(None, limit))),
        );
        let (critical, c_reason) = critical.split();
        let (bugs, b_reason) = bugs.split();
        let (open, o_reason) = open.split();

        let limits = &self.config.limits;
        let backlog = IssueBacklog::build(
            critical,
            bugs,
            open,
            now,
            self.config.thresholds.old_issue_days,
            limits.unassigned_issues,
            limits.old_issues,
        );
        Degradable::from_parts(backlog, [c_reason, b_reason, o_reason])
    }

    async fn collect_milestones(&self) -> Degradable<MilestoneProgress> {
        self.query("open milestones", self.gateway.list_open_milestones())
            .await
            .map(MilestoneProgress::from_records)
    }

    async fn collect_board(&self) -> Degradable<BoardStatus> {
        let done = &self.config.board.done_status;
        self.query("project board items", self.gateway.list_board_items())
            .await
            .map(|items| BoardStatus::evaluate(items, done))
    }

    async fn collect_ci(&self) -> Degradable<CiHealth> {
        let limits = &self.config.limits;
        self.query("workflow runs", self.gateway.list_recent_runs(limits.ci_runs))
            .await
            .map(|runs| CiHealth::evaluate(&runs, limits.ci_failures))
    }

    async fn collect_documentation(&self, now: DateTime<Utc>) -> Degradable<DocStatus> {
        let docs = &self.config.docs;
        let (doc_change, source_change) = tokio::join!(
            self.query("documentation history", self.gateway.last_modified(&docs.doc_paths)),
            self.query("source history", self.gateway.last_modified(&docs.source_paths)),
        );
        let (doc_change, d_reason) = doc_change.split();
        let (source_change, s_reason) = source_change.split();

        if d_reason.is_some() || s_reason.is_some() {
            return Degradable::from_parts(DocStatus::default(), [d_reason, s_reason]);
        }
        Degradable::Ok(DocStatus::evaluate(
            doc_change,
            source_change,
            now,
            self.config.thresholds.doc_staleness_days,
        ))
    }
}
