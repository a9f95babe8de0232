//! Instruction templates and the text report.
//!
//! Each [`ActionKind`] maps to a list of template lines. Placeholders in
//! braces are filled from the action; a line mentioning `{item}` or
//! `{item_number}` is repeated once per action item and dropped when the
//! action has none. Values an action does not carry render as `TBD`.

use std::collections::HashMap;

use super::action::{Action, ActionItem, ActionKind};
use crate::core::DegradedSignal;

/// Placeholder substituted for values an action does not carry.
pub const MISSING_VALUE: &str = "TBD";

const RULE_WIDTH: usize = 80;
const SLUG_MAX: usize = 40;

type Template = &'static [&'static str];

const INITIAL_SETUP: Template = &[
    "⚠️ The project has not been set up yet. Do this before anything else:",
    "",
    "1. Read the project requirements (README, docs/) and decide on the first milestones",
    "",
    "2. Create what is missing:",
    "   - {item}",
    "",
    "3. Create the priority labels:",
    "   gh label create priority:critical --color B60205",
    "   gh label create priority:high --color D93F0B",
    "   gh label create priority:medium --color FBCA04",
    "   gh label create priority:low --color 0E8A16",
    "",
    "4. Open an initial issue for each milestone",
    "",
    "5. Report what was created in a comment",
];

const CLOSE_MILESTONE: Template = &[
    "1. Confirm nothing is left open:",
    "   gh issue list --milestone '{title}' --state open",
    "",
    "2. Close the milestone:",
    "   gh api -X PATCH repos/:owner/:repo/milestones/{milestone} -f state=closed",
    "",
    "3. Summarize what shipped in the release notes",
];

const POST_MERGE_CHECK: Template = &[
    "1. Update the integration branch:",
    "   git checkout {base}",
    "   git pull origin {base}",
    "",
    "2. Confirm the linked issues were closed:",
    "   gh issue view {item_number}",
    "",
    "3. Run the test suite on {base} and confirm it still passes",
    "",
    "4. Delete the merged branch if it is still around:",
    "   git push origin --delete {branch}",
];

const IMPLEMENT_CRITICAL_ISSUE: Template = &[
    "⚠️ Work in this order:",
    "",
    "1. Create a branch:",
    "   git checkout -b feature/{topic}",
    "",
    "2. Open a draft PR first, from an empty commit:",
    "   git commit --allow-empty -m 'WIP: start work on #{issue}'",
    "   git push origin feature/{topic}",
    concat!(
        "   gh pr create --draft --title 'WIP: #{issue} {title}'",
        " --body 'Closes #{issue}' --base {base}",
    ),
    "",
    "3. Implement:",
    "   - Write the code",
    "   - Add tests",
    "   - Commit and push as you go",
    "",
    "4. Mark the PR ready when done:",
    "   gh pr ready",
    "",
    "5. Ask for a review in a PR comment",
];

const FIX_BUG: Template = &[
    "⚠️ Work in this order:",
    "",
    "1. Create a branch:",
    "   git checkout -b fix/{topic}",
    "",
    "2. Open a draft PR first, from an empty commit:",
    "   git commit --allow-empty -m 'WIP: fix #{issue}'",
    "   git push origin fix/{topic}",
    "   gh pr create --draft --title 'Fix: #{issue} {title}' --body 'Fixes #{issue}' --base {base}",
    "",
    "3. Fix:",
    "   - Reproduce the bug with a failing test",
    "   - Fix it",
    "   - Commit and push",
    "",
    "4. Mark the PR ready when done:",
    "   gh pr ready",
];

const CREATE_PR_FOR_BRANCH: Template = &[
    "1. Check out the branch:",
    "   git fetch origin",
    "   git checkout {branch}",
    "",
    "2. Review what it contains:",
    "   git log origin/{base}..HEAD --oneline",
    "   git diff origin/{base}...HEAD --stat",
    "",
    "3. Open the PR:",
    "   gh pr create --head {branch} --base {base} --title '{branch}' --body 'Closes #{issue}'",
    "",
    "4. If the work is unfinished, turn it into a draft:",
    "   gh pr ready {branch} --undo",
];

const MERGE_PR: Template = &[
    "1. Check the PR one last time:",
    "   gh pr view {pr}",
    "   gh pr checks {pr}",
    "",
    "2. Merge it:",
    "   gh pr merge {pr} --squash --delete-branch",
    "",
    "3. Confirm the linked issues were closed",
];

const REVIEW_PR: Template = &[
    "1. Read the change:",
    "   gh pr view {pr}",
    "   gh pr diff {pr}",
    "",
    "2. Check CI:",
    "   gh pr checks {pr}",
    "",
    "3. Leave a review:",
    "   gh pr review {pr} --approve",
    "   gh pr review {pr} --request-changes --body '<what needs to change>'",
];

const REVIVE_STAGNANT_PR: Template = &[
    "1. Ask for a status update:",
    concat!(
        "   gh pr comment {pr} --body '{mention} This draft has not been updated",
        " for more than {stagnation_hours} hours. Please continue the implementation",
        " or comment with what is blocking it.'",
    ),
    "",
    "2. If you pick it up yourself:",
    "   git fetch origin",
    "   git checkout {branch}",
    "   git rebase origin/{base}",
    "",
    "3. If the work is abandoned, close it:",
    "   gh pr close {pr} --comment 'Closing stale draft'",
];

const UPDATE_BOARD: Template = &[
    "1. Open the project board:",
    "   gh project list --owner :owner",
    "",
    "2. Move each closed item to the done column:",
    "   - {item}",
];

const ASSIGN_MILESTONES: Template = &[
    "1. List the open milestones:",
    "   gh api repos/:owner/:repo/milestones --jq '.[].title'",
    "",
    "2. Assign one to each issue:",
    "   gh issue edit {item_number} --milestone '<milestone>'  # {item}",
];

const UPDATE_DOCUMENTATION: Template = &[
    "1. Review source changes made since the documentation was last touched",
    "",
    "2. Bring the README and docs/ in line with current behavior",
    "",
    "3. Open a PR:",
    "   git checkout -b docs/refresh",
    concat!(
        "   gh pr create --title 'docs: bring documentation up to date'",
        " --label documentation --base {base}",
    ),
];

const REVIEW_OLD_ISSUES: Template = &[
    "1. Re-read each issue and decide whether it still matters:",
    "   gh issue view {item_number}  # {item}",
    "",
    "2. Close what no longer applies:",
    "   gh issue close <number> --comment 'Closing as no longer relevant'",
    "",
    "3. Re-prioritize the rest with priority:* labels",
];

const FIX_CI: Template = &[
    "1. Look at the failed runs:",
    "   gh run view {item_number} --log-failed  # {item}",
    "",
    "2. Reproduce the failure locally and fix it",
    "",
    "3. Push the fix and watch the next run:",
    "   gh run watch",
];

fn default_template(kind: ActionKind) -> Template {
    match kind {
        ActionKind::InitialSetup => INITIAL_SETUP,
        ActionKind::CloseMilestone => CLOSE_MILESTONE,
        ActionKind::PostMergeCheck => POST_MERGE_CHECK,
        ActionKind::ImplementCriticalIssue => IMPLEMENT_CRITICAL_ISSUE,
        ActionKind::FixBug => FIX_BUG,
        ActionKind::CreatePrForBranch => CREATE_PR_FOR_BRANCH,
        ActionKind::MergePr => MERGE_PR,
        ActionKind::ReviewPr => REVIEW_PR,
        ActionKind::ReviveStagnantPr => REVIVE_STAGNANT_PR,
        ActionKind::UpdateBoard => UPDATE_BOARD,
        ActionKind::AssignMilestones => ASSIGN_MILESTONES,
        ActionKind::UpdateDocumentation => UPDATE_DOCUMENTATION,
        ActionKind::ReviewOldIssues => REVIEW_OLD_ISSUES,
        ActionKind::FixCi => FIX_CI,
    }
}

/// Turn a title into a branch-name fragment.
///
/// Keeps ASCII alphanumerics, folds everything else into single dashes and
/// caps the length. Titles with no ASCII content yield an empty slug.
pub fn slugify(title: &str) -> String {
    let mut slug = String::new();
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
        if slug.len() >= SLUG_MAX {
            break;
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// Fills instruction templates for actions.
#[derive(Debug, Clone)]
pub struct InstructionRenderer {
    templates: HashMap<ActionKind, Template>,
    base_branch: String,
    mention: String,
    stagnation_hours: i64,
}

impl InstructionRenderer {
    /// Renderer with the built-in template for every kind.
    pub fn new(
        base_branch: impl Into<String>,
        mention: impl Into<String>,
        stagnation_hours: i64,
    ) -> Self {
        let templates = ActionKind::ALL.iter().map(|&k| (k, default_template(k))).collect();
        Self {
            templates,
            base_branch: base_branch.into(),
            mention: mention.into(),
            stagnation_hours,
        }
    }

    /// Replace the template for one kind.
    pub fn with_template(mut self, kind: ActionKind, lines: Template) -> Self {
        self.templates.insert(kind, lines);
        self
    }

    /// Instruction lines for `action`.
    pub fn render(&self, action: &Action) -> Vec<String> {
        let Some(template) = self.templates.get(&action.kind) else {
            return Vec::new();
        };
        let vars = self.variables(action);

        let mut lines = Vec::with_capacity(template.len());
        for line in template.iter() {
            if line.contains("{item}") || line.contains("{item_number}") {
                for item in &action.items {
                    lines.push(fill(line, &item_variables(&vars, item)));
                }
            } else {
                lines.push(fill(line, &vars));
            }
        }
        lines
    }

    fn variables(&self, action: &Action) -> Vec<(&'static str, String)> {
        let or_missing =
            |n: Option<u64>| n.map_or_else(|| MISSING_VALUE.to_string(), |n| n.to_string());
        let title = action.subject.clone().unwrap_or_default();
        let slug = slugify(&title);
        let issue = or_missing(action.issue_number);
        let topic = if slug.is_empty() {
            format!("issue-{issue}")
        } else {
            format!("issue-{issue}-{slug}")
        };

        vec![
            ("issue", issue),
            ("pr", or_missing(action.pr_number)),
            ("milestone", or_missing(action.milestone_number)),
            ("branch", action.branch.clone().unwrap_or_else(|| MISSING_VALUE.to_string())),
            ("title", title),
            ("slug", slug),
            ("topic", topic),
            ("base", self.base_branch.clone()),
            ("mention", self.mention.clone()),
            ("stagnation_hours", self.stagnation_hours.to_string()),
        ]
    }
}

/// Replace every known `{name}` in one left-to-right pass. Substituted text
/// is never rescanned, so titles and labels containing braces stay literal.
fn fill(line: &str, vars: &[(&'static str, String)]) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let known = tail.find('}').and_then(|close| {
            let key = &tail[1..close];
            vars.iter().find(|(name, _)| *name == key).map(|(_, value)| (value, close))
        });
        match known {
            Some((value, close)) => {
                out.push_str(value);
                rest = &tail[close + 1..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn item_variables(
    vars: &[(&'static str, String)],
    item: &ActionItem,
) -> Vec<(&'static str, String)> {
    let number = item.number.map_or_else(|| MISSING_VALUE.to_string(), |n| n.to_string());
    let mut vars = vars.to_vec();
    vars.push(("item_number", number));
    vars.push(("item", item.label.clone()));
    vars
}

/// Render the human-readable report.
pub fn render_report(actions: &[Action], degradations: &[DegradedSignal]) -> String {
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);
    let mut out = String::new();

    if actions.is_empty() {
        out.push_str("✅ No action needed. The project is in good shape.\n");
    } else {
        out.push_str(&format!("📋 Actions to take: {}\n", actions.len()));
        out.push_str(&heavy);
        out.push('\n');

        for (i, action) in actions.iter().enumerate() {
            out.push_str(&format!(
                "\n[Action {}] [{}] {}\n",
                i + 1,
                action.priority.label(),
                action.description
            ));
            out.push_str(&light);
            out.push('\n');
            for line in &action.instructions {
                out.push_str(line);
                out.push('\n');
            }
        }

        out.push('\n');
        out.push_str(&heavy);
        out.push_str("\n\n⚠️  Notes:\n");
        out.push_str("- Open a draft PR before starting on an issue\n");
        out.push_str("- Skip issues that already have a draft PR\n");
        out.push_str("- Work in priority order (CRITICAL > HIGH > MEDIUM > LOW)\n");
        out.push_str("- Finish at least one action before running again\n");
    }

    if !degradations.is_empty() {
        out.push_str("\n⚠️  Partial data, these signals fell back to defaults:\n");
        for signal in degradations {
            out.push_str(&format!("- {}: {}\n", signal.category, signal.reason));
        }
    }

    out
}
