//! Project-state analysis.
//!
//! The pipeline is collect, generate, render:
//!
//! - [`SignalCollector`] reads the platform through a
//!   [`QueryGateway`](crate::github::QueryGateway) into an immutable [`Snapshot`]
//! - [`ActionGenerator`] turns the snapshot into ordered [`Action`]s
//! - [`render_report`] formats actions for a terminal or a comment

mod action;
mod collector;
mod generator;
mod render;
mod snapshot;

pub use action::{sort_by_priority, Action, ActionItem, ActionKind, Priority};
pub use collector::SignalCollector;
pub use generator::ActionGenerator;
pub use render::{render_report, slugify, InstructionRenderer, MISSING_VALUE};
pub use snapshot::{
    candidate_branches, closing_references, completion_rate, issue_ref_from_branch, BoardStatus,
    CiHealth, DocStatus, FailedRun, IssueBacklog, IssueSummary, MergedPr, MergedPullRequests,
    MilestoneProgress, MilestoneStat, PrSummary, PullRequestSet, SetupStatus, Snapshot,
    StagnationReport, StaleBoardItem, EXCLUDED_BRANCHES,
};

use chrono::{DateTime, Utc};

use crate::core::Config;
use crate::github::QueryGateway;

/// Result of one analysis run.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub snapshot: Snapshot,
    pub actions: Vec<Action>,
}

/// Collect a snapshot through `gateway` and generate its actions.
pub async fn analyze<G: QueryGateway>(gateway: G, config: &Config, now: DateTime<Utc>) -> Analysis {
    let collector = SignalCollector::new(gateway, config.clone());
    let snapshot = collector.collect(now).await;
    let actions = ActionGenerator::from_config(config).generate(&snapshot);
    tracing::debug!(
        actions = actions.len(),
        degraded = snapshot.degradations.len(),
        "analysis complete"
    );

    Analysis { snapshot, actions }
}
