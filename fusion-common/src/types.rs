//! Core types shared across Fusion components.
//!
//! The engine treats identifiers as opaque branded strings: a wave id never
//! compares against a signal id, and equality is always string equality.
//! Everything here is plain data — derived structures (priority entries,
//! coordination windows, schedules) live next to the code that computes them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Declares an opaque string identifier with the usual plumbing.
macro_rules! opaque_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

opaque_id!(
    /// Unique identifier for an evaluation bundle.
    FusionBundleId
);
opaque_id!(
    /// Identifier of the recovery plan a bundle executes.
    FusionPlanId
);
opaque_id!(
    /// Identifier of one drill run.
    FusionRunId
);
opaque_id!(
    /// Unique identifier for a wave within a plan.
    FusionWaveId
);
opaque_id!(
    /// Unique identifier for an observed signal.
    FusionSignalId
);
opaque_id!(
    /// Unique identifier for a remediation command.
    FusionCommandId
);

/// Operational state of a wave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaveState {
    /// Not yet started.
    Idle,
    /// Preparing to execute.
    Warming,
    /// Commands executing.
    Running,
    /// Waiting on an upstream wave or operator.
    Blocked,
    /// Executing with elevated failure signals.
    Degraded,
    /// Completed and verified healthy.
    Stable,
    /// Execution failed.
    Failed,
}

impl WaveState {
    /// Scheduling pressure exerted by this state (0.0-1.0).
    ///
    /// Distressed states push harder: a failed wave outranks everything.
    pub fn pressure(self) -> f64 {
        match self {
            Self::Failed => 1.0,
            Self::Blocked => 0.9,
            Self::Degraded => 0.75,
            Self::Running => 0.6,
            Self::Warming => 0.5,
            Self::Stable => 0.3,
            Self::Idle => 0.2,
        }
    }

    /// Whether this state counts as distressed for transition stability.
    pub fn is_distressed(self) -> bool {
        matches!(self, Self::Failed | Self::Blocked | Self::Degraded)
    }
}

impl Default for WaveState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Coarse risk classification for a wave or bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskBand {
    Green,
    Amber,
    Red,
    Critical,
}

impl Default for RiskBand {
    fn default() -> Self {
        Self::Green
    }
}

impl std::fmt::Display for RiskBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Green => write!(f, "green"),
            Self::Amber => write!(f, "amber"),
            Self::Red => write!(f, "red"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Action a remediation command performs against a workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandAction {
    Start,
    Pause,
    Resume,
    Abort,
    Verify,
}

impl std::fmt::Display for CommandAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Pause => write!(f, "pause"),
            Self::Resume => write!(f, "resume"),
            Self::Abort => write!(f, "abort"),
            Self::Verify => write!(f, "verify"),
        }
    }
}

/// An observed telemetry/incident data point.
///
/// Signals are immutable once created: ingestion produces them, everything
/// downstream consumes them read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusionSignal {
    pub id: FusionSignalId,
    pub run_id: FusionRunId,
    /// Originating system (e.g. "probe", "synthetic", "operator").
    pub source: String,
    /// Severity in [0.0, 1.0].
    pub severity: f64,
    /// Confidence in [0.0, 1.0].
    pub confidence: f64,
    pub detected_at: DateTime<Utc>,
    pub observed_at: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Free-form numeric/structured attributes (e.g. a "stability" reading).
    #[serde(default)]
    pub payload: BTreeMap<String, serde_json::Value>,
    /// Free-form string annotations for operators.
    #[serde(default)]
    pub details: BTreeMap<String, String>,
}

impl FusionSignal {
    /// Severity mapped onto the 0-5 tier scale used by scoring.
    pub fn severity_tier(&self) -> f64 {
        (self.severity.clamp(0.0, 1.0)) * 5.0
    }
}

/// A single remediation command owned by exactly one wave.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusionCommand {
    pub id: FusionCommandId,
    pub wave_id: FusionWaveId,
    /// Runbook step this command implements.
    pub step_key: String,
    pub action: CommandAction,
    /// Operator or automation principal requesting the command.
    pub actor: String,
    pub requested_at: DateTime<Utc>,
    pub rationale: String,
}

/// Execution budget attached to a wave or plan request.
///
/// Descriptive only: the engine passes these through and never enforces
/// them as deadlines.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusionBudget {
    pub max_parallelism: u32,
    pub max_retries: u32,
    pub timeout_minutes: u32,
    pub operator_approval_required: bool,
}

impl Default for FusionBudget {
    fn default() -> Self {
        Self {
            max_parallelism: 4,
            max_retries: 2,
            timeout_minutes: 60,
            operator_approval_required: false,
        }
    }
}

/// A time-boxed batch of recovery commands executed together.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusionWave {
    pub id: FusionWaveId,
    pub plan_id: FusionPlanId,
    pub run_id: FusionRunId,
    pub state: WaveState,
    /// Window start. `window_end` should exceed this; degenerate windows
    /// are padded by the schedule engine rather than rejected.
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    #[serde(default)]
    pub commands: Vec<FusionCommand>,
    #[serde(default)]
    pub readiness_signals: Vec<FusionSignal>,
    #[serde(default)]
    pub budget: FusionBudget,
    #[serde(default)]
    pub risk_band: RiskBand,
    /// Upstream-assigned priority score in [0.0, 1.0].
    pub score: f64,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl FusionWave {
    /// Whether the window is degenerate (end at or before start).
    pub fn has_degenerate_window(&self) -> bool {
        self.window_end <= self.window_start
    }

    pub fn has_commands(&self) -> bool {
        !self.commands.is_empty()
    }
}

/// Aggregate root tying a plan, its waves, and its signals together for
/// one evaluation pass.
///
/// A bundle is never mutated in place: each evaluation constructs a fresh
/// bundle, which is why concurrent evaluations need no locking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusionBundle {
    pub id: FusionBundleId,
    pub tenant: String,
    pub run_id: FusionRunId,
    pub session: String,
    pub plan_id: FusionPlanId,
    #[serde(default)]
    pub waves: Vec<FusionWave>,
    #[serde(default)]
    pub signals: Vec<FusionSignal>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl FusionBundle {
    /// Total readiness signals attached to waves.
    pub fn wave_signal_count(&self) -> usize {
        self.waves.iter().map(|w| w.readiness_signals.len()).sum()
    }
}

/// One node in a derived workload topology.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologyNode {
    pub id: String,
    pub label: String,
    /// Relative workload weight in [0.0, 1.0].
    pub weight: f64,
    #[serde(default)]
    pub parents: Vec<String>,
    #[serde(default)]
    pub children: Vec<String>,
}

/// One directed edge in a derived workload topology.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologyEdge {
    pub from: String,
    pub to: String,
    /// Propagation latency, clamped to at least 1ms by normalization.
    pub latency_ms: u64,
    /// Non-negative penalty applied when risk flows along this edge.
    pub risk_penalty: f64,
}

/// Directed workload graph derived per evaluation from the command catalog.
///
/// Never persisted; recomputed for every pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusionTopology {
    #[serde(default)]
    pub nodes: Vec<TopologyNode>,
    #[serde(default)]
    pub edges: Vec<TopologyEdge>,
}

/// Raw plan intake from the drill/topology layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusionPlanRequest {
    pub plan_id: String,
    pub run_id: String,
    #[serde(default)]
    pub tenant: String,
    #[serde(default)]
    pub session: String,
    #[serde(default)]
    pub waves: Vec<FusionWave>,
    #[serde(default)]
    pub signals: Vec<FusionSignal>,
    #[serde(default)]
    pub budget: FusionBudget,
}

/// The canonical decision artifact produced for consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusionPlanResult {
    pub accepted: bool,
    pub bundle_id: FusionBundleId,
    pub wave_count: usize,
    /// Total scheduled window minutes.
    pub estimated_minutes: i64,
    pub risk_band: RiskBand,
    pub reasons: Vec<String>,
}

/// Lifecycle of one coordination run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionRunState {
    /// Accepted, not yet dispatched.
    Queued,
    /// Catalog/dispatch build in progress.
    Warming,
    /// Scheduled with no critical bottleneck.
    Running,
    /// Decision produced, awaiting consumers.
    Review,
    /// A hard failure ended the run.
    Failed,
}

impl FusionRunState {
    /// Check if this run can transition to the given state.
    pub fn can_transition_to(self, next: FusionRunState) -> bool {
        use FusionRunState::*;
        matches!(
            (self, next),
            (Queued, Warming)
                | (Warming, Running)
                | (Warming, Review)
                | (Running, Review)
                | (_, Failed)
        )
    }
}

/// Clamp a score to the canonical [0.0, 1.0] range.
pub fn clamp_unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}
