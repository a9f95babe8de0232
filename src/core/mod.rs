//! Core types shared across Steward.
//!
//! Configuration, caller-facing errors and the degradation bookkeeping used
//! while collecting signals.

mod config;
mod degradation;
mod error;

pub use config::{
    BoardConfig, Config, DirectiveConfig, DocsConfig, LabelConfig, LimitsConfig, NetworkConfig,
    RepositoryConfig, SetupConfig, ThresholdsConfig,
};
pub use degradation::{
    Degradable, DegradationManager, DegradationReason, DegradedSignal, SignalCategory,
};
pub use error::{StewardError, StewardResult};
