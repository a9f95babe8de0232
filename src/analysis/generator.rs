//! The rule engine: snapshot in, ordered actions out.
//!
//! Rules run in a fixed order and each appends zero or more actions. The
//! setup rule is a gate: when the project still needs setup it is the only
//! action emitted. Output order is rule order, not priority order.

use super::action::{Action, ActionItem, ActionKind, Priority};
use super::render::InstructionRenderer;
use super::snapshot::{issue_ref_from_branch, Snapshot};
use crate::core::{Config, LimitsConfig};

type Rule = fn(&Snapshot, &LimitsConfig, &mut Vec<Action>);

/// Rules after the setup gate, in emission order.
const RULES: [(&str, Rule); 13] = [
    ("completed milestones", close_milestones),
    ("merged follow-ups", post_merge_checks),
    ("critical issues", critical_issues),
    ("bugs", bugs),
    ("branches without PR", branches_without_pr),
    ("mergeable PRs", mergeable_prs),
    ("PRs awaiting review", review_prs),
    ("stagnant drafts", stagnant_drafts),
    ("project board", board),
    ("unassigned issues", unassigned_issues),
    ("documentation", documentation),
    ("old issues", old_issues),
    ("CI failures", ci_failures),
];

/// Generates actions from a snapshot.
#[derive(Debug, Clone)]
pub struct ActionGenerator {
    limits: LimitsConfig,
    renderer: InstructionRenderer,
}

impl ActionGenerator {
    pub fn new(limits: LimitsConfig, renderer: InstructionRenderer) -> Self {
        Self { limits, renderer }
    }

    /// Generator with limits and templates taken from `config`.
    pub fn from_config(config: &Config) -> Self {
        let renderer = InstructionRenderer::new(
            config.repository.base_branch.clone(),
            config.directive.mention.clone(),
            config.thresholds.stagnation_hours,
        );
        Self::new(config.limits.clone(), renderer)
    }

    /// Apply every rule to `snapshot`. Pure: the same snapshot always yields
    /// the same actions.
    pub fn generate(&self, snapshot: &Snapshot) -> Vec<Action> {
        let mut actions = Vec::new();

        if snapshot.setup.needs_setup {
            tracing::debug!("project needs setup, skipping all other rules");
            actions.push(setup_action(snapshot));
        } else {
            for (name, rule) in RULES {
                let before = actions.len();
                rule(snapshot, &self.limits, &mut actions);
                tracing::trace!(rule = name, emitted = actions.len() - before, "rule applied");
            }
        }

        for action in &mut actions {
            action.instructions = self.renderer.render(action);
        }
        actions
    }
}

fn setup_action(snapshot: &Snapshot) -> Action {
    let setup = &snapshot.setup;
    let mut description = format!(
        "Run initial project setup (milestones: {}/{}, priority labels: {}/{}",
        setup.milestone_count,
        setup.required_milestones,
        setup.priority_label_count,
        setup.required_priority_labels
    );
    if setup.required_boards > 0 {
        description.push_str(&format!(", boards: {}/{}", setup.board_count, setup.required_boards));
    }
    description.push(')');

    Action::new(ActionKind::InitialSetup, Priority::Critical, description)
        .with_items(setup.missing().into_iter().map(ActionItem::text).collect())
}

fn close_milestones(snapshot: &Snapshot, _: &LimitsConfig, out: &mut Vec<Action>) {
    for m in &snapshot.milestones.completed {
        let total = m.open_issues + m.closed_issues;
        out.push(
            Action::new(
                ActionKind::CloseMilestone,
                Priority::Critical,
                format!(
                    "Close completed milestone '{}' ({}/{} issues closed)",
                    m.title, m.closed_issues, total
                ),
            )
            .with_milestone(m.number)
            .with_subject(m.title.clone()),
        );
    }
}

fn post_merge_checks(snapshot: &Snapshot, limits: &LimitsConfig, out: &mut Vec<Action>) {
    for pr in snapshot.merged_pull_requests.recent.iter().take(limits.merged_followups) {
        let items =
            pr.closes.iter().map(|&n| ActionItem::numbered(n, format!("Issue #{n}"))).collect();
        out.push(
            Action::new(
                ActionKind::PostMergeCheck,
                Priority::High,
                format!("Follow up on merged PR #{}: {}", pr.number, pr.title),
            )
            .with_pr(pr.number)
            .with_branch(pr.head_ref.clone())
            .with_subject(pr.title.clone())
            .with_items(items),
        );
    }
}

fn critical_issues(snapshot: &Snapshot, limits: &LimitsConfig, out: &mut Vec<Action>) {
    let claimed = &snapshot.pull_requests.draft_issue_refs;
    let open = snapshot.issues.critical_issues.iter().filter(|i| !claimed.contains(&i.number));
    for issue in open.take(limits.critical_issues) {
        out.push(
            Action::new(
                ActionKind::ImplementCriticalIssue,
                Priority::Critical,
                format!("Implement critical issue #{}: {}", issue.number, issue.title),
            )
            .with_issue(issue.number)
            .with_subject(issue.title.clone()),
        );
    }
}

fn bugs(snapshot: &Snapshot, limits: &LimitsConfig, out: &mut Vec<Action>) {
    let claimed = &snapshot.pull_requests.draft_issue_refs;
    let open = snapshot.issues.bug_issues.iter().filter(|i| !claimed.contains(&i.number));
    for issue in open.take(limits.bugs) {
        out.push(
            Action::new(
                ActionKind::FixBug,
                Priority::Critical,
                format!("Fix bug #{}: {}", issue.number, issue.title),
            )
            .with_issue(issue.number)
            .with_subject(issue.title.clone()),
        );
    }
}

fn branches_without_pr(snapshot: &Snapshot, limits: &LimitsConfig, out: &mut Vec<Action>) {
    let branches = &snapshot.pull_requests.branches_without_pr;
    for branch in branches.iter().take(limits.branches_without_pr) {
        let mut action = Action::new(
            ActionKind::CreatePrForBranch,
            Priority::High,
            format!("Open a PR for branch {branch}"),
        )
        .with_branch(branch.clone());
        if let Some(issue) = issue_ref_from_branch(branch) {
            action = action.with_issue(issue);
        }
        out.push(action);
    }
}

fn mergeable_prs(snapshot: &Snapshot, limits: &LimitsConfig, out: &mut Vec<Action>) {
    for pr in snapshot.pull_requests.ready_to_merge.iter().take(limits.mergeable_prs) {
        out.push(
            Action::new(
                ActionKind::MergePr,
                Priority::High,
                format!("Merge PR #{}: {}", pr.number, pr.title),
            )
            .with_pr(pr.number)
            .with_branch(pr.head_ref.clone())
            .with_subject(pr.title.clone()),
        );
    }
}

fn review_prs(snapshot: &Snapshot, limits: &LimitsConfig, out: &mut Vec<Action>) {
    for pr in snapshot.pull_requests.needs_review.iter().take(limits.review_prs) {
        out.push(
            Action::new(
                ActionKind::ReviewPr,
                Priority::High,
                format!("Review PR #{}: {}", pr.number, pr.title),
            )
            .with_pr(pr.number)
            .with_branch(pr.head_ref.clone())
            .with_subject(pr.title.clone()),
        );
    }
}

fn stagnant_drafts(snapshot: &Snapshot, limits: &LimitsConfig, out: &mut Vec<Action>) {
    for pr in snapshot.stagnation.stagnant_drafts.iter().take(limits.stagnant_prs) {
        out.push(
            Action::new(
                ActionKind::ReviveStagnantPr,
                Priority::High,
                format!("Resume stagnant draft PR #{}: {}", pr.number, pr.title),
            )
            .with_pr(pr.number)
            .with_branch(pr.head_ref.clone())
            .with_subject(pr.title.clone()),
        );
    }
}

fn board(snapshot: &Snapshot, _: &LimitsConfig, out: &mut Vec<Action>) {
    let board = &snapshot.board;
    if !board.needs_update() {
        return;
    }

    let items = board
        .stale_items
        .iter()
        .map(|item| {
            let status = item.status.as_deref().unwrap_or("no status");
            let label = match item.number {
                Some(n) => format!("#{n} {} (currently: {status})", item.title),
                None => format!("{} (currently: {status})", item.title),
            };
            ActionItem { number: item.number, label }
        })
        .collect();

    out.push(
        Action::new(
            ActionKind::UpdateBoard,
            Priority::Medium,
            format!(
                "Update the project board ({} closed item(s) not marked done)",
                board.stale_items.len()
            ),
        )
        .with_items(items),
    );
}

fn unassigned_issues(snapshot: &Snapshot, limits: &LimitsConfig, out: &mut Vec<Action>) {
    let issues: Vec<_> =
        snapshot.issues.no_milestone_issues.iter().take(limits.unassigned_issues).collect();
    if issues.is_empty() {
        return;
    }

    let items = issues.iter().map(|i| ActionItem::numbered(i.number, i.title.clone())).collect();
    out.push(
        Action::new(
            ActionKind::AssignMilestones,
            Priority::Medium,
            format!("Assign milestones to {} issue(s)", issues.len()),
        )
        .with_items(items),
    );
}

fn documentation(snapshot: &Snapshot, _: &LimitsConfig, out: &mut Vec<Action>) {
    let docs = &snapshot.documentation;
    if !docs.needs_doc_update {
        return;
    }

    let description = if docs.last_doc_change.is_some() {
        format!(
            "Update documentation (last updated {} day(s) ago, source has changed since)",
            docs.readme_age_days
        )
    } else {
        "Write documentation (none committed yet, source has changed)".to_string()
    };
    out.push(Action::new(ActionKind::UpdateDocumentation, Priority::Medium, description));
}

fn old_issues(snapshot: &Snapshot, limits: &LimitsConfig, out: &mut Vec<Action>) {
    let issues: Vec<_> = snapshot.issues.old_issues.iter().take(limits.old_issues).collect();
    if issues.is_empty() {
        return;
    }

    let items = issues.iter().map(|i| ActionItem::numbered(i.number, i.title.clone())).collect();
    out.push(
        Action::new(
            ActionKind::ReviewOldIssues,
            Priority::Low,
            format!(
                "Review {} issue(s) open for more than {} days",
                issues.len(),
                snapshot.issues.old_after_days
            ),
        )
        .with_items(items),
    );
}

fn ci_failures(snapshot: &Snapshot, limits: &LimitsConfig, out: &mut Vec<Action>) {
    let ci = &snapshot.ci;
    if !ci.has_failures() {
        return;
    }

    let items = ci
        .failed_runs
        .iter()
        .take(limits.ci_failures)
        .map(|r| ActionItem::numbered(r.id, format!("{} on {}", r.name, r.head_branch)))
        .collect();
    out.push(
        Action::new(
            ActionKind::FixCi,
            Priority::Medium,
            format!("Fix CI ({} of the last {} run(s) failed)", ci.failure_count, ci.inspected),
        )
        .with_items(items),
    );
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::analysis::snapshot::{
        DocStatus, IssueSummary, MergedPr, MilestoneStat, PrSummary, SetupStatus, StaleBoardItem,
    };
    use crate::core::SetupConfig;

    fn generator() -> ActionGenerator {
        ActionGenerator::from_config(&Config::default())
    }

    fn snapshot() -> Snapshot {
        Snapshot::empty(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap())
    }

    fn issue(number: u64) -> IssueSummary {
        IssueSummary {
            number,
            title: format!("Issue {number}"),
            milestone: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn pr(number: u64, head: &str) -> PrSummary {
        PrSummary {
            number,
            title: format!("PR {number}"),
            is_draft: false,
            review_decision: None,
            check_state: None,
            head_ref: head.to_string(),
            updated_at: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
        }
    }

    fn merged(number: u64, closes: Vec<u64>) -> MergedPr {
        MergedPr {
            number,
            title: format!("Merged {number}"),
            head_ref: format!("feature/issue-{number}-done"),
            merged_at: Utc.with_ymd_and_hms(2024, 5, 31, 0, 0, 0).unwrap(),
            closes,
        }
    }

    fn kinds(actions: &[Action]) -> Vec<ActionKind> {
        actions.iter().map(|a| a.kind).collect()
    }

    fn prs(actions: &[Action]) -> Vec<u64> {
        actions.iter().filter_map(|a| a.pr_number).collect()
    }

    #[test]
    fn test_empty_snapshot_yields_nothing() {
        assert!(generator().generate(&snapshot()).is_empty());
    }

    #[test]
    fn test_setup_gate_suppresses_everything_else() {
        let mut snap = snapshot();
        snap.setup = SetupStatus::evaluate(1, 4, 0, &SetupConfig::default());
        snap.issues.critical_issues = vec![issue(1), issue(2)];
        snap.ci.failure_count = 2;

        let actions = generator().generate(&snap);
        assert_eq!(kinds(&actions), vec![ActionKind::InitialSetup]);
        assert_eq!(actions[0].priority, Priority::Critical);
        assert!(actions[0].description.contains("milestones: 1/5"));
        assert!(actions[0].instructions.iter().any(|l| l.contains("Milestones: 4 more")));
    }

    #[test]
    fn test_critical_issues_capped_and_draft_claimed_skipped() {
        let mut snap = snapshot();
        snap.issues.critical_issues = (1..=5).map(issue).collect();
        snap.pull_requests.draft_issue_refs.insert(2);

        let actions = generator().generate(&snap);
        let numbers: Vec<u64> = actions.iter().filter_map(|a| a.issue_number).collect();
        assert_eq!(numbers, vec![1, 3, 4]);
        assert!(actions.iter().all(|a| a.kind == ActionKind::ImplementCriticalIssue));
    }

    #[test]
    fn test_bug_cap() {
        let mut snap = snapshot();
        snap.issues.bug_issues = (10..=14).map(issue).collect();

        let actions = generator().generate(&snap);
        assert_eq!(actions.len(), 2);
        assert!(actions
            .iter()
            .all(|a| a.kind == ActionKind::FixBug && a.priority == Priority::Critical));
    }

    #[test]
    fn test_bugs_claimed_by_draft_skipped() {
        let mut snap = snapshot();
        snap.issues.bug_issues = (10..=13).map(issue).collect();
        snap.pull_requests.draft_issue_refs.extend([10, 12]);

        let actions = generator().generate(&snap);
        let numbers: Vec<u64> = actions.iter().filter_map(|a| a.issue_number).collect();
        assert_eq!(numbers, vec![11, 13]);
    }

    #[test]
    fn test_merged_followups_capped() {
        let mut snap = snapshot();
        snap.merged_pull_requests.recent =
            vec![merged(21, vec![3, 4]), merged(20, vec![]), merged(19, vec![2])];

        let actions = generator().generate(&snap);
        assert_eq!(kinds(&actions), vec![ActionKind::PostMergeCheck; 2]);
        assert_eq!(prs(&actions), vec![21, 20]);
        assert_eq!(actions[0].priority, Priority::High);
        let closes: Vec<u64> = actions[0].items.iter().filter_map(|i| i.number).collect();
        assert_eq!(closes, vec![3, 4]);
    }

    #[test]
    fn test_branches_without_pr_capped() {
        let mut snap = snapshot();
        snap.pull_requests.branches_without_pr =
            (1..=5).map(|n| format!("feature/issue-{n}-work")).collect();

        let actions = generator().generate(&snap);
        assert_eq!(kinds(&actions), vec![ActionKind::CreatePrForBranch; 3]);
        let issues: Vec<u64> = actions.iter().filter_map(|a| a.issue_number).collect();
        assert_eq!(issues, vec![1, 2, 3]);
    }

    #[test]
    fn test_mergeable_prs_capped() {
        let mut snap = snapshot();
        snap.pull_requests.ready_to_merge = (30..=34).map(|n| pr(n, "feature/ready")).collect();

        let actions = generator().generate(&snap);
        assert_eq!(kinds(&actions), vec![ActionKind::MergePr; 3]);
        assert_eq!(prs(&actions), vec![30, 31, 32]);
    }

    #[test]
    fn test_stagnant_drafts_capped() {
        let mut snap = snapshot();
        snap.stagnation.stagnant_drafts = (40..=43).map(|n| pr(n, "feature/slow")).collect();

        let actions = generator().generate(&snap);
        assert_eq!(kinds(&actions), vec![ActionKind::ReviveStagnantPr; 2]);
        assert_eq!(prs(&actions), vec![40, 41]);
    }

    #[test]
    fn test_branch_action_carries_issue_ref() {
        let mut snap = snapshot();
        snap.pull_requests.branches_without_pr =
            vec!["feature/issue-42-login".to_string(), "spike/cache".to_string()];

        let actions = generator().generate(&snap);
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].issue_number, Some(42));
        assert!(actions[0].instructions.iter().any(|l| l.contains("Closes #42")));
        assert_eq!(actions[1].issue_number, None);
        assert!(actions[1].instructions.iter().any(|l| l.contains("Closes #TBD")));
    }

    #[test]
    fn test_emission_follows_rule_order() {
        let mut snap = snapshot();
        snap.ci.failure_count = 1;
        snap.ci.inspected = 10;
        snap.issues.old_issues = vec![issue(7)];
        snap.issues.old_after_days = 30;
        snap.documentation =
            DocStatus { needs_doc_update: true, readme_age_days: 12, ..DocStatus::default() };
        snap.issues.no_milestone_issues = vec![issue(8)];
        snap.board.stale_items = vec![StaleBoardItem {
            number: Some(4),
            title: "Old".into(),
            status: Some("Todo".into()),
        }];
        snap.stagnation.stagnant_drafts = vec![pr(11, "feature/slow")];
        snap.pull_requests.needs_review = vec![pr(12, "feature/b")];
        snap.pull_requests.ready_to_merge = vec![pr(13, "feature/a")];
        snap.pull_requests.branches_without_pr = vec!["feature/x".into()];
        snap.issues.bug_issues = vec![issue(5)];
        snap.issues.critical_issues = vec![issue(6)];
        snap.milestones.completed = vec![MilestoneStat {
            number: 1,
            title: "v1".into(),
            open_issues: 0,
            closed_issues: 3,
            completion_rate: 1.0,
        }];

        let actions = generator().generate(&snap);
        assert_eq!(
            kinds(&actions),
            vec![
                ActionKind::CloseMilestone,
                ActionKind::ImplementCriticalIssue,
                ActionKind::FixBug,
                ActionKind::CreatePrForBranch,
                ActionKind::MergePr,
                ActionKind::ReviewPr,
                ActionKind::ReviveStagnantPr,
                ActionKind::UpdateBoard,
                ActionKind::AssignMilestones,
                ActionKind::UpdateDocumentation,
                ActionKind::ReviewOldIssues,
                ActionKind::FixCi,
            ]
        );
        assert_eq!(actions[0].priority, Priority::Critical);
        assert_eq!(actions[5].priority, Priority::High);
        assert_eq!(actions[10].priority, Priority::Low);
        assert_eq!(actions[11].priority, Priority::Medium);
    }

    #[test]
    fn test_generation_is_deterministic() {
        let mut snap = snapshot();
        snap.issues.critical_issues = vec![issue(1)];
        snap.pull_requests.needs_review =
            vec![pr(2, "feature/b"), pr(3, "feature/c"), pr(4, "feature/d")];

        let generator = generator();
        let first = generator.generate(&snap);
        assert_eq!(first, generator.generate(&snap));
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn test_every_action_has_instructions() {
        let mut snap = snapshot();
        snap.pull_requests.ready_to_merge = vec![pr(1, "a")];
        snap.ci.failure_count = 1;

        for action in generator().generate(&snap) {
            assert!(!action.instructions.is_empty());
        }
    }
}
