//! Error types for caller-facing failures.

use std::path::PathBuf;

/// Result type for Steward operations.
pub type StewardResult<T> = Result<T, StewardError>;

/// Errors surfaced to the caller.
///
/// Query failures are not represented here: they degrade to defaults inside
/// the collector and never stop a run.
#[derive(Debug, thiserror::Error)]
pub enum StewardError {
    /// No text was given to the extractor.
    #[error("Usage: steward parse <comment_body> | --file <path> | - (read stdin)")]
    MissingInput,

    /// The input file or stdin could not be read.
    #[error("Failed to read input from {path}: {source}")]
    InputRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A repository was given in the wrong shape.
    #[error("Invalid repository '{0}': expected owner/name")]
    InvalidRepository(String),

    /// No repository could be determined.
    #[error(
        "Could not determine GitHub repository.\n\
         Set GITHUB_REPOSITORY=owner/repo, pass --repo, or run from a clone with a GitHub remote."
    )]
    RepositoryUnknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_input_is_usage_message() {
        assert!(StewardError::MissingInput.to_string().starts_with("Usage:"));
    }

    #[test]
    fn test_invalid_repository_message() {
        let err = StewardError::InvalidRepository("nope".into());
        assert_eq!(err.to_string(), "Invalid repository 'nope': expected owner/name");
    }
}
