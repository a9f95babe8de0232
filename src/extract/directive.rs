//! The directive composer.

use std::fmt::Write as _;

use super::ExtractedAction;

/// Compose the directive for an automated worker.
///
/// Actions are stable-sorted by priority. `context_id` names the issue the
/// actions came from. An empty list composes to an empty string.
pub fn compose(actions: &[ExtractedAction], context_id: &str, mention: &str) -> String {
    if actions.is_empty() {
        return String::new();
    }

    let mut sorted: Vec<&ExtractedAction> = actions.iter().collect();
    sorted.sort_by_key(|a| a.priority);

    let mut out = String::new();
    let _ = write!(
        out,
        "{mention}\n\nBased on the analysis in #{context_id}, carry out the following actions:\n\n"
    );

    for (i, action) in sorted.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. {} **{}**: {}",
            i + 1,
            action.priority.marker(),
            action.kind.label(),
            action.description
        );
        for detail in &action.details {
            let _ = writeln!(out, "   - {detail}");
        }
        out.push('\n');
    }

    out.push_str("\n---\n\n**Operating rules:**\n");
    out.push_str("- Check the current state before carrying out each action\n");
    out.push_str("- Use the issue and PR numbers given where present\n");
    let _ = writeln!(out, "- If something fails, report it in a comment on #{context_id}");
    let _ = writeln!(out, "- When finished, post a summary on #{context_id}");

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Priority;
    use crate::extract::ExtractedKind;

    fn action(kind: ExtractedKind, priority: Priority, description: &str) -> ExtractedAction {
        ExtractedAction {
            kind,
            description: description.to_string(),
            identifiers: Vec::new(),
            priority,
            details: Vec::new(),
        }
    }

    #[test]
    fn test_empty_compose() {
        assert_eq!(compose(&[], "12", "@claude"), "");
    }

    #[test]
    fn test_sorted_by_priority_stably() {
        let actions = vec![
            action(ExtractedKind::ReviewPr, Priority::Low, "first low"),
            action(ExtractedKind::MergePr, Priority::Medium, "first medium"),
            action(ExtractedKind::CloseIssue, Priority::Critical, "the critical one"),
            action(ExtractedKind::CreatePr, Priority::Medium, "second medium"),
        ];
        let directive = compose(&actions, "12", "@claude");

        let critical = directive.find("the critical one").unwrap();
        let first = directive.find("first medium").unwrap();
        let second = directive.find("second medium").unwrap();
        let low = directive.find("first low").unwrap();
        assert!(critical < first && first < second && second < low);
        assert!(directive.contains("1. 🔴 **Close issue**: the critical one"));
    }

    #[test]
    fn test_mentions_context_and_details() {
        let mut merge = action(ExtractedKind::MergePr, Priority::High, "Merge PR #4");
        merge.details = vec!["after CI passes".to_string()];
        let directive = compose(&[merge], "77", "@bot");

        assert!(directive.starts_with("@bot\n\nBased on the analysis in #77"));
        assert!(directive.contains("   - after CI passes\n"));
        assert!(directive.contains("post a summary on #77"));
    }
}
