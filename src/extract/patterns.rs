//! Pattern tables for the action extractor.
//!
//! All classification is data: section headings, the ordered
//! (kind, patterns) table and the priority keywords. The first matching
//! entry wins in every table.

use once_cell::sync::Lazy;
use regex::Regex;

use super::ExtractedKind;
use crate::analysis::Priority;

/// Matches `PR`/`PRs` as a standalone token. Plain `\b` would not work next
/// to Japanese text, where `PRを` has no word boundary.
const PR: &str = r"(?:^|[^a-z])prs?(?:[^a-z]|$)";
const PULL_REQUEST: &str = r"(?:pull\s+requests?|プルリクエスト)";
const ISSUE: &str = r"(?:issues?|イシュー)";
const MILESTONE: &str = r"(?:milestones?|マイルストーン)";

/// Accepted section headings, in precedence order.
const HEADINGS: &[&str] = &[
    r"(?:実行可能な)?アクション(?:項目)?",
    r"(?:actionable\s+items?|action\s+items?|actions)",
    r"(?:推奨|提案)アクション",
    r"(?:recommended|suggested)\s+actions?",
    r"(?:次のステップ|next\s+steps?)",
    r"(?:todo|to-do)",
];

/// A compiled (kind, patterns) table entry.
#[derive(Debug, Clone)]
pub struct KindPatterns {
    pub kind: ExtractedKind,
    pub patterns: Vec<Regex>,
}

/// A priority keyword.
#[derive(Debug, Clone)]
pub enum Keyword {
    /// Lowercase keyword, matched as a case-insensitive substring
    Substring(&'static str),
    /// ASCII word, matched on ASCII word boundaries
    Word(Regex),
}

impl Keyword {
    fn word(word: &str) -> Self {
        let pattern = format!(r"(?i)(?:^|[^a-z0-9]){}(?:[^a-z0-9]|$)", regex::escape(word));
        Self::Word(Regex::new(&pattern).expect("keyword pattern is valid"))
    }

    pub fn matches(&self, text: &str) -> bool {
        match self {
            Self::Substring(s) => text.to_lowercase().contains(s),
            Self::Word(re) => re.is_match(text),
        }
    }
}

/// Every table the extractor consults.
#[derive(Debug, Clone)]
pub struct PatternTable {
    pub headings: Vec<Regex>,
    pub kinds: Vec<KindPatterns>,
    pub priorities: Vec<(Priority, Vec<Keyword>)>,
}

static BUILTIN: Lazy<PatternTable> = Lazy::new(PatternTable::build);

impl PatternTable {
    /// The built-in English and Japanese tables.
    pub fn builtin() -> &'static Self {
        &BUILTIN
    }

    /// Compile a custom table. Patterns are matched case-insensitively.
    pub fn new(
        headings: &[&str],
        kinds: &[(ExtractedKind, &[&str])],
        priorities: Vec<(Priority, Vec<Keyword>)>,
    ) -> Result<Self, regex::Error> {
        let headings = headings
            .iter()
            .map(|h| Regex::new(&format!(r"(?i)^#{{1,6}}\s*{h}\s*[:：]?\s*$")))
            .collect::<Result<_, _>>()?;
        let kinds = kinds
            .iter()
            .map(|(kind, patterns)| {
                let patterns = patterns
                    .iter()
                    .map(|p| Regex::new(&format!("(?i){p}")))
                    .collect::<Result<_, _>>()?;
                Ok(KindPatterns { kind: *kind, patterns })
            })
            .collect::<Result<_, regex::Error>>()?;

        Ok(Self { headings, kinds, priorities })
    }

    fn build() -> Self {
        let create_issue = [
            format!(r"{ISSUE}.*(?:作成|発行)"),
            format!(r"(?:作成|発行).*{ISSUE}"),
            format!(r"新規.*{ISSUE}"),
            r"\b(?:create|open|file|raise)\s+(?:(?:an?|new|follow-up|separate)\s+)*issues?\b"
                .to_string(),
            r"\bnew\s+issues?\b".to_string(),
        ];
        let update_labels = [
            r"(?:ラベル|labels?).*(?:更新|変更|追加|削除)".to_string(),
            r"(?:更新|変更|追加|削除).*(?:ラベル|labels?)".to_string(),
            r"\b(?:update|change|add|remove|apply)\b.*\blabels?\b".to_string(),
            r"\b(?:re-?label)\b".to_string(),
        ];
        let update_priority = [
            r"(?:優先度|priority).*(?:更新|変更|見直し)".to_string(),
            r"(?:更新|変更|見直し).*(?:優先度|priority)".to_string(),
            r"\b(?:update|change|raise|lower|bump|revisit)\b.*\bpriority\b".to_string(),
            r"\bre-?prioriti[sz]e\b".to_string(),
        ];
        let merge_pr = [
            format!(r"{PR}.*(?:マージ|merge)"),
            format!(r"(?:マージ|merge).*{PR}"),
            format!(r"{PULL_REQUEST}.*(?:マージ|merge)"),
            format!(r"(?:マージ|merge).*{PULL_REQUEST}"),
        ];
        let create_pr = [
            format!(r"{PR}.*(?:作成|create)"),
            format!(r"(?:作成|create).*{PR}"),
            format!(r"{PULL_REQUEST}.*(?:作成|オープン|create)"),
            format!(r"\b(?:create|open)\s+(?:(?:an?|the|new|draft)\s+)*{PULL_REQUEST}"),
            r"\bopen\s+(?:(?:an?|the|new|draft)\s+)*prs?\b".to_string(),
        ];
        let close_issue = [
            format!(r"{ISSUE}.*(?:クローズ|閉じる|close)"),
            format!(r"(?:クローズ|閉じる|close).*{ISSUE}"),
        ];
        let review_pr = [
            format!(r"{PR}.*(?:レビュー|review)"),
            format!(r"(?:レビュー|review).*{PR}"),
            format!(r"{PULL_REQUEST}.*(?:レビュー|review)"),
            format!(r"(?:レビュー|review).*{PULL_REQUEST}"),
        ];
        let update_milestone = [
            format!(r"{MILESTONE}.*(?:更新|変更|update|change|assign|move)"),
            format!(r"(?:更新|変更|update|change|assign|move|set).*{MILESTONE}"),
        ];
        let close_milestone = [
            format!(r"{MILESTONE}.*(?:クローズ|完了|close|complete)"),
            format!(r"(?:クローズ|完了|close|complete).*{MILESTONE}"),
        ];

        let table: [(ExtractedKind, &[String]); 9] = [
            (ExtractedKind::CreateIssue, &create_issue),
            (ExtractedKind::UpdateLabels, &update_labels),
            (ExtractedKind::UpdatePriority, &update_priority),
            (ExtractedKind::MergePr, &merge_pr),
            (ExtractedKind::CreatePr, &create_pr),
            (ExtractedKind::CloseIssue, &close_issue),
            (ExtractedKind::ReviewPr, &review_pr),
            (ExtractedKind::UpdateMilestone, &update_milestone),
            (ExtractedKind::CloseMilestone, &close_milestone),
        ];
        let borrowed: Vec<(ExtractedKind, Vec<&str>)> = table
            .iter()
            .map(|(kind, patterns)| (*kind, patterns.iter().map(String::as_str).collect()))
            .collect();
        let kinds: Vec<(ExtractedKind, &[&str])> =
            borrowed.iter().map(|(kind, patterns)| (*kind, patterns.as_slice())).collect();

        Self::new(HEADINGS, &kinds, builtin_priorities()).expect("built-in patterns are valid")
    }

    /// The section heading regexes matching `line`, by table position.
    pub fn heading_rank(&self, line: &str) -> Option<usize> {
        self.headings.iter().position(|re| re.is_match(line.trim()))
    }

    /// First kind whose patterns match `text`.
    pub fn classify(&self, text: &str) -> Option<ExtractedKind> {
        self.kinds
            .iter()
            .find(|entry| entry.patterns.iter().any(|re| re.is_match(text)))
            .map(|entry| entry.kind)
    }

    /// First priority with a matching keyword, else medium.
    pub fn priority(&self, text: &str) -> Priority {
        self.priorities
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| k.matches(text)))
            .map_or(Priority::Medium, |(priority, _)| *priority)
    }
}

fn builtin_priorities() -> Vec<(Priority, Vec<Keyword>)> {
    use Keyword::Substring;

    vec![
        (
            Priority::Critical,
            vec![
                Substring("critical"),
                Substring("urgent"),
                Substring("クリティカル"),
                Substring("緊急"),
                Substring("最優先"),
            ],
        ),
        (
            Priority::High,
            vec![Substring("high"), Substring("important"), Substring("高"), Substring("重要")],
        ),
        (
            Priority::Medium,
            vec![Substring("medium"), Substring("normal"), Substring("中"), Substring("通常")],
        ),
        // `low` alone keeps word boundaries; it hides inside follow, allow and below.
        (Priority::Low, vec![Keyword::word("low"), Substring("低")]),
    ]
}
