//! Graceful degradation for signal collection.
//!
//! A failed or timed-out query never aborts an analysis run. It resolves to a
//! default value wrapped in [`Degradable::Degraded`], and the affected signal
//! category is recorded so the report can say which parts of the picture are
//! incomplete.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Signal categories collected for a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalCategory {
    /// Milestones, labels and boards
    Setup,
    /// Open pull requests and branches
    PullRequests,
    /// Recently merged pull requests
    MergedPullRequests,
    /// Issue backlog
    Issues,
    /// Milestone progress
    Milestones,
    /// Project board
    Board,
    /// Stagnant drafts
    Stagnation,
    /// CI runs
    Ci,
    /// Documentation freshness
    Documentation,
}

impl SignalCategory {
    /// All categories in collection order.
    pub const ALL: [Self; 9] = [
        Self::Setup,
        Self::PullRequests,
        Self::MergedPullRequests,
        Self::Issues,
        Self::Milestones,
        Self::Board,
        Self::Stagnation,
        Self::Ci,
        Self::Documentation,
    ];
}

impl fmt::Display for SignalCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Setup => write!(f, "Project setup"),
            Self::PullRequests => write!(f, "Pull requests"),
            Self::MergedPullRequests => write!(f, "Merged pull requests"),
            Self::Issues => write!(f, "Issues"),
            Self::Milestones => write!(f, "Milestones"),
            Self::Board => write!(f, "Project board"),
            Self::Stagnation => write!(f, "Stagnant drafts"),
            Self::Ci => write!(f, "CI health"),
            Self::Documentation => write!(f, "Documentation"),
        }
    }
}

/// Reason a query fell back to its default value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DegradationReason {
    /// The call did not finish within the per-call timeout
    Timeout(Duration),
    /// The call returned an error
    QueryFailed(String),
    /// The backing service or repository is not available
    Unavailable(String),
    /// Several queries of one category degraded
    Several(Vec<DegradationReason>),
}

impl fmt::Display for DegradationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout(d) => write!(f, "timed out after {}s", d.as_secs()),
            Self::QueryFailed(s) => write!(f, "query failed: {}", s),
            Self::Unavailable(s) => write!(f, "{} is unavailable", s),
            Self::Several(reasons) => {
                let parts: Vec<String> = reasons.iter().map(ToString::to_string).collect();
                write!(f, "{}", parts.join("; "))
            }
        }
    }
}

/// Outcome of a best-effort query.
#[derive(Debug, Clone, PartialEq)]
pub enum Degradable<T> {
    /// The query succeeded
    Ok(T),
    /// The query failed; `value` is the fallback
    Degraded { value: T, reason: DegradationReason },
}

impl<T> Degradable<T> {
    /// Create a degraded result.
    pub fn degraded(value: T, reason: DegradationReason) -> Self {
        Self::Degraded { value, reason }
    }

    /// Build from a value and the reasons collected while producing it.
    pub fn from_parts(
        value: T,
        reasons: impl IntoIterator<Item = Option<DegradationReason>>,
    ) -> Self {
        let mut reasons: Vec<DegradationReason> = reasons.into_iter().flatten().collect();
        match reasons.len() {
            0 => Self::Ok(value),
            1 => Self::degraded(value, reasons.remove(0)),
            _ => Self::degraded(value, DegradationReason::Several(reasons)),
        }
    }

    /// Whether the fallback was used.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    /// Borrow the value, fallback or not.
    pub fn value(&self) -> &T {
        match self {
            Self::Ok(value) | Self::Degraded { value, .. } => value,
        }
    }

    /// Get the degradation reason, if any.
    pub fn reason(&self) -> Option<&DegradationReason> {
        match self {
            Self::Ok(_) => None,
            Self::Degraded { reason, .. } => Some(reason),
        }
    }

    /// Split into the value and the optional reason.
    pub fn split(self) -> (T, Option<DegradationReason>) {
        match self {
            Self::Ok(value) => (value, None),
            Self::Degraded { value, reason } => (value, Some(reason)),
        }
    }

    /// Transform the value, keeping the degradation state.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Degradable<U> {
        match self {
            Self::Ok(value) => Degradable::Ok(f(value)),
            Self::Degraded { value, reason } => Degradable::Degraded { value: f(value), reason },
        }
    }

    /// Record the outcome against `category` and return the value.
    pub fn record(self, category: SignalCategory, manager: &mut DegradationManager) -> T {
        let (value, reason) = self.split();
        if let Some(reason) = reason {
            manager.degrade(category, reason);
        }
        value
    }
}

/// A degraded category as reported to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegradedSignal {
    /// The category that is incomplete
    pub category: SignalCategory,
    /// Why it is incomplete
    pub reason: String,
}

/// Tracks which signal categories fell back to defaults during a run.
#[derive(Debug, Default)]
pub struct DegradationManager {
    degraded: HashSet<SignalCategory>,
    details: Vec<DegradedSignal>,
}

impl DegradationManager {
    /// Create a new degradation manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a category as degraded. Only the first reason per category is kept.
    pub fn degrade(&mut self, category: SignalCategory, reason: DegradationReason) {
        tracing::warn!(%category, %reason, "signal degraded to default");
        if self.degraded.insert(category) {
            self.details.push(DegradedSignal { category, reason: reason.to_string() });
        }
    }

    /// Check if a category is degraded.
    pub fn is_degraded(&self, category: SignalCategory) -> bool {
        self.degraded.contains(&category)
    }

    /// Check if any category is degraded.
    pub fn has_degradations(&self) -> bool {
        !self.degraded.is_empty()
    }

    /// Get all degraded categories in the order they were recorded.
    pub fn degraded_signals(&self) -> &[DegradedSignal] {
        &self.details
    }

    /// Get a summary of degraded categories for display.
    pub fn summary(&self) -> String {
        if self.details.is_empty() {
            return String::new();
        }

        let categories: Vec<_> = self.details.iter().map(|d| d.category.to_string()).collect();
        format!("Degraded: {}", categories.join(", "))
    }

    /// Consume the manager, returning the recorded categories.
    pub fn into_signals(self) -> Vec<DegradedSignal> {
        self.details
    }
}
