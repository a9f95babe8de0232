//! Actions: what the generator emits and the renderer fills in.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Action priority. Orders `Critical < High < Medium < Low`, so an ascending
/// sort puts the most urgent work first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    /// Lowercase name, as used in JSON output.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Uppercase tag used in the text report.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }

    /// Marker emoji for rendered directives.
    pub const fn marker(&self) -> &'static str {
        match self {
            Self::Critical => "🔴",
            Self::High => "🟠",
            Self::Medium => "🟡",
            Self::Low => "🟢",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Every kind of action the generator can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    InitialSetup,
    CloseMilestone,
    PostMergeCheck,
    ImplementCriticalIssue,
    FixBug,
    CreatePrForBranch,
    MergePr,
    ReviewPr,
    ReviveStagnantPr,
    UpdateBoard,
    AssignMilestones,
    UpdateDocumentation,
    ReviewOldIssues,
    FixCi,
}

impl ActionKind {
    /// All kinds, in rule order.
    pub const ALL: [Self; 14] = [
        Self::InitialSetup,
        Self::CloseMilestone,
        Self::PostMergeCheck,
        Self::ImplementCriticalIssue,
        Self::FixBug,
        Self::CreatePrForBranch,
        Self::MergePr,
        Self::ReviewPr,
        Self::ReviveStagnantPr,
        Self::UpdateBoard,
        Self::AssignMilestones,
        Self::UpdateDocumentation,
        Self::ReviewOldIssues,
        Self::FixCi,
    ];

    /// Kebab-case identifier.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InitialSetup => "initial-setup",
            Self::CloseMilestone => "close-milestone",
            Self::PostMergeCheck => "post-merge-check",
            Self::ImplementCriticalIssue => "implement-critical-issue",
            Self::FixBug => "fix-bug",
            Self::CreatePrForBranch => "create-pr-for-branch",
            Self::MergePr => "merge-pr",
            Self::ReviewPr => "review-pr",
            Self::ReviveStagnantPr => "revive-stagnant-pr",
            Self::UpdateBoard => "update-board",
            Self::AssignMilestones => "assign-milestones",
            Self::UpdateDocumentation => "update-documentation",
            Self::ReviewOldIssues => "review-old-issues",
            Self::FixCi => "fix-ci",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry of an aggregate action (an issue, a run, a board item).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionItem {
    pub number: Option<u64>,
    pub label: String,
}

impl ActionItem {
    /// An item referring to a numbered issue, PR or run.
    pub fn numbered(number: u64, label: impl Into<String>) -> Self {
        Self { number: Some(number), label: label.into() }
    }

    /// An item without a number.
    pub fn text(label: impl Into<String>) -> Self {
        Self { number: None, label: label.into() }
    }
}

/// A recommended next step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub priority: Priority,
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Title of the issue, PR or milestone the action is about
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<ActionItem>,
    #[serde(default)]
    pub instructions: Vec<String>,
}

impl Action {
    pub fn new(kind: ActionKind, priority: Priority, description: impl Into<String>) -> Self {
        Self {
            priority,
            kind,
            description: description.into(),
            issue_number: None,
            pr_number: None,
            milestone_number: None,
            branch: None,
            subject: None,
            items: Vec::new(),
            instructions: Vec::new(),
        }
    }

    pub fn with_issue(mut self, number: u64) -> Self {
        self.issue_number = Some(number);
        self
    }

    pub fn with_pr(mut self, number: u64) -> Self {
        self.pr_number = Some(number);
        self
    }

    pub fn with_milestone(mut self, number: u64) -> Self {
        self.milestone_number = Some(number);
        self
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_items(mut self, items: Vec<ActionItem>) -> Self {
        self.items = items;
        self
    }
}

/// Stable sort by priority; equal priorities keep their emission order.
pub fn sort_by_priority(actions: &mut [Action]) {
    actions.sort_by_key(|a| a.priority);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_order() {
        assert!(Priority::Critical < Priority::High);
        assert!(Priority::High < Priority::Medium);
        assert!(Priority::Medium < Priority::Low);
        assert_eq!(Priority::Critical.label(), "CRITICAL");
        assert_eq!(Priority::Low.to_string(), "low");
    }

    #[test]
    fn test_kind_identifiers_round_trip_through_serde() {
        for kind in ActionKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_sort_is_stable() {
        let mut actions = vec![
            Action::new(ActionKind::UpdateBoard, Priority::Medium, "a"),
            Action::new(ActionKind::ReviewOldIssues, Priority::Low, "b"),
            Action::new(ActionKind::FixCi, Priority::Medium, "c"),
            Action::new(ActionKind::FixBug, Priority::Critical, "d"),
        ];
        sort_by_priority(&mut actions);

        let order: Vec<&str> = actions.iter().map(|a| a.description.as_str()).collect();
        assert_eq!(order, vec!["d", "a", "c", "b"]);
    }

    #[test]
    fn test_action_json_shape() {
        let action = Action::new(ActionKind::MergePr, Priority::High, "Merge PR #5").with_pr(5);
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "merge-pr");
        assert_eq!(json["priority"], "high");
        assert_eq!(json["pr_number"], 5);
        assert!(json.get("issue_number").is_none());
    }
}
