//! Free-text action extraction.
//!
//! [`ActionExtractor`] recovers [`ExtractedAction`]s from a comment body and
//! [`compose`] turns them into a directive for an automated worker.

mod directive;
mod extractor;
mod patterns;

pub use directive::compose;
pub use extractor::{identifiers, strip_marker, ActionExtractor};
pub use patterns::{KindPatterns, Keyword, PatternTable};

use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::analysis::Priority;
use crate::core::{StewardError, StewardResult};

/// Kind of an extracted action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractedKind {
    CreateIssue,
    UpdateLabels,
    UpdatePriority,
    MergePr,
    CreatePr,
    CloseIssue,
    ReviewPr,
    UpdateMilestone,
    CloseMilestone,
}

impl ExtractedKind {
    /// Short label used in directives.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::CreateIssue => "Create issue",
            Self::UpdateLabels => "Update labels",
            Self::UpdatePriority => "Change priority",
            Self::MergePr => "Merge PR",
            Self::CreatePr => "Create PR",
            Self::CloseIssue => "Close issue",
            Self::ReviewPr => "Review PR",
            Self::UpdateMilestone => "Update milestone",
            Self::CloseMilestone => "Close milestone",
        }
    }
}

impl fmt::Display for ExtractedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// An action recovered from free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedAction {
    #[serde(rename = "type")]
    pub kind: ExtractedKind,
    pub description: String,
    /// Referenced `#<n>` numbers, without the `#`
    pub identifiers: Vec<String>,
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

/// Output of `steward parse --format json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseOutput {
    pub actions: Vec<ExtractedAction>,
    pub instructions: String,
    pub has_actions: bool,
}

impl ParseOutput {
    /// Extract from `text` and compose the directive in one go.
    pub fn from_text(text: &str, context_id: &str, mention: &str) -> Self {
        let actions = ActionExtractor::default().extract(text);
        let instructions = compose(&actions, context_id, mention);
        let has_actions = !actions.is_empty();
        Self { actions, instructions, has_actions }
    }
}

/// Resolve the text to parse.
///
/// An explicit argument wins, then `file`. A value of `-` in either place
/// reads stdin. Having neither is the one fatal input error.
pub fn read_input(text: Option<&str>, file: Option<&Path>) -> StewardResult<String> {
    match (text, file) {
        (Some("-"), _) => read_stdin(),
        (Some(text), _) => Ok(text.to_string()),
        (None, Some(path)) if path == Path::new("-") => read_stdin(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .map_err(|source| StewardError::InputRead { path: path.to_path_buf(), source }),
        (None, None) => Err(StewardError::MissingInput),
    }
}

fn read_stdin() -> StewardResult<String> {
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .map_err(|source| StewardError::InputRead { path: PathBuf::from("<stdin>"), source })?;
    Ok(buf)
}
