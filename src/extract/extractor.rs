//! The action extractor.

use once_cell::sync::Lazy;
use regex::Regex;

use super::patterns::PatternTable;
use super::ExtractedAction;

static HEADING_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#{1,6}(?:\s|$)").expect("heading pattern is valid"));

static LIST_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?P<bullet>[-*+•])(?P<gap>\s*)|\d{1,3}[.)]\s+)(?:\[[ xX]\]\s+)?")
        .expect("list marker pattern is valid")
});

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#(\d+)").expect("identifier pattern is valid"));

fn is_heading(line: &str) -> bool {
    HEADING_LINE.is_match(line)
}

/// A thematic break such as `---`, `***` or `- - -`.
fn is_rule(line: &str) -> bool {
    line.chars().all(|c| matches!(c, '-' | '*' | '_' | '+' | '•') || c.is_whitespace())
}

/// Strip a list marker, returning the item text, or `None` for non-list lines.
///
/// Bullets may be glued to their text (`-PRをマージ`); numbered markers need
/// whitespace. Rules such as `---` and `***` and emphasis such as `**bold**`
/// are not items.
pub fn strip_marker(line: &str) -> Option<&str> {
    if is_rule(line) {
        return None;
    }

    let caps = LIST_MARKER.captures(line)?;
    let rest = &line[caps.get(0)?.end()..];
    if let (Some(bullet), Some(gap)) = (caps.name("bullet"), caps.name("gap")) {
        if gap.as_str().is_empty() && rest.starts_with(bullet.as_str()) {
            return None;
        }
    }
    Some(rest.trim())
}

/// Every `#<digits>` in `text`, in order, without duplicates.
pub fn identifiers(text: &str) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for caps in IDENTIFIER.captures_iter(text) {
        let id = &caps[1];
        if !ids.iter().any(|existing| existing == id) {
            ids.push(id.to_string());
        }
    }
    ids
}

/// Recovers structured actions from free text.
#[derive(Debug, Clone, Copy)]
pub struct ActionExtractor<'t> {
    table: &'t PatternTable,
}

impl Default for ActionExtractor<'static> {
    fn default() -> Self {
        Self { table: PatternTable::builtin() }
    }
}

impl<'t> ActionExtractor<'t> {
    pub fn new(table: &'t PatternTable) -> Self {
        Self { table }
    }

    /// The lines of the first accepted section, by heading precedence, up to
    /// the next heading. Falls back to the whole text when there is no such
    /// heading or its section is blank.
    pub fn section<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let lines: Vec<&str> = text.lines().collect();

        let start = lines
            .iter()
            .enumerate()
            .filter_map(|(i, line)| self.table.heading_rank(line).map(|rank| (rank, i)))
            .min();

        let Some((_, i)) = start else {
            return lines;
        };
        let section: Vec<&str> =
            lines[i + 1..].iter().take_while(|line| !is_heading(line.trim())).copied().collect();

        if section.iter().all(|line| line.trim().is_empty()) {
            tracing::trace!("action section is blank, using the whole text");
            return lines;
        }
        section
    }

    /// Extract every recognized action from `text`.
    ///
    /// Only list items matching a pattern are emitted. Non-list lines become
    /// details of the most recently emitted item; unmatched list items leave
    /// it in place. Lines before the first emitted item are dropped.
    pub fn extract(&self, text: &str) -> Vec<ExtractedAction> {
        let mut actions: Vec<ExtractedAction> = Vec::new();
        // Whether an item has been emitted to collect details
        let mut open = false;

        for line in self.section(text) {
            let line = line.trim();
            if line.is_empty() || is_heading(line) || is_rule(line) {
                continue;
            }

            match strip_marker(line) {
                Some(content) => {
                    let Some(kind) = self.table.classify(content) else {
                        tracing::trace!(item = content, "no action pattern matched");
                        continue;
                    };
                    actions.push(ExtractedAction {
                        kind,
                        description: content.to_string(),
                        identifiers: identifiers(content),
                        priority: self.table.priority(content),
                        details: Vec::new(),
                    });
                    open = true;
                }
                None if open => {
                    if let Some(action) = actions.last_mut() {
                        action.details.push(line.to_string());
                    }
                }
                None => {}
            }
        }

        tracing::debug!(count = actions.len(), "extracted actions");
        actions
    }
}
