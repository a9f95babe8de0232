#![allow(clippy::format_push_string)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap)]

//! # Steward
//!
//! Project steward: reads the state of a GitHub repository and turns it into
//! a prioritized list of next steps.
//!
//! Steward collects signals (setup completeness, pull requests, recently
//! merged work, the issue backlog, milestones, the project board, stagnant
//! drafts, CI health and documentation freshness) into a snapshot, runs a
//! fixed set of rules over it and renders each resulting action as concrete
//! instructions. Independently, it extracts action items from free-text
//! review comments and composes them into a directive for an automated
//! worker.
//!
//! ## Features
//!
//! - **Best-effort collection**: a failed or slow query degrades its signal
//!   to a default instead of failing the run
//! - **Deterministic rules**: the same snapshot always yields the same actions
//! - **Comment parsing**: English and Japanese action items, headings and
//!   priority keywords
//!
//! ## Quick Start
//!
//! ```bash
//! # Analyze the repository in the current directory
//! GITHUB_TOKEN=... steward analyze
//!
//! # Turn a review comment into a directive
//! steward parse --file comment.md --context 42
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::map_unwrap_or)]

pub mod analysis;
pub mod core;
pub mod extract;
pub mod github;

#[cfg(feature = "git")]
pub mod git;

#[cfg(feature = "git")]
pub use git::{GitRepository, LocalRepository};

pub use analysis::{Action, ActionGenerator, ActionKind, Priority, SignalCollector, Snapshot};
pub use core::{Config, StewardError, StewardResult};
pub use extract::{compose, ActionExtractor, ExtractedAction, ExtractedKind, ParseOutput};
pub use github::{GitHubClient, GitHubGateway, QueryGateway};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "steward";
