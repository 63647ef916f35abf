//! Error taxonomy for the Fusion engine.
//!
//! Every fallible engine operation returns `Result<T, FusionError>`; no
//! control-flow exceptions cross component boundaries. Soft risk signals
//! (low scores, SLO breaches, dependency bottlenecks) are data in
//! `reasons`/`breaches`/`risks` lists, never errors.

use crate::types::FusionWaveId;

/// Errors produced by the scheduling and evaluation pipeline.
///
/// Validation errors surface before any bundle is built. Structural errors
/// block one operation but leave retry-with-corrected-input to the caller;
/// nothing here is retried automatically.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FusionError {
    #[error("planId required")]
    PlanIdRequired,

    #[error("runId required")]
    RunIdRequired,

    #[error("invalid budget values: {0}")]
    InvalidBudget(String),

    #[error("empty bundle")]
    EmptyBundle,

    #[error("no commands in wave {0}")]
    NoCommands(FusionWaveId),

    #[error("bundle-not-schedulable")]
    BundleNotSchedulable,

    #[error("window-not-found: {0}")]
    WindowNotFound(FusionWaveId),

    #[error("stored bundle decode failed: {0}")]
    DecodeFailed(String),
}

impl FusionError {
    /// Whether the caller may retry with corrected input.
    ///
    /// Validation errors need a different request; structural errors need a
    /// different bundle shape.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::EmptyBundle
                | Self::NoCommands(_)
                | Self::BundleNotSchedulable
                | Self::WindowNotFound(_)
        )
    }
}
