//! Engine configuration.
//!
//! Every knob carries a serde default so partial configuration files work;
//! an absent section falls back to the tuned defaults below. Band and
//! weight constants that are part of the scoring contract (not tuning
//! knobs) live next to the code that applies them.

use serde::{Deserialize, Serialize};

/// Top-level configuration for one engine instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub priority: PriorityConfig,
    #[serde(default)]
    pub coordination: CoordinationConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub slo: SloTargets,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
}

/// Tuning for the wave priority matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityConfig {
    /// Signals below this confidence are excluded before ranking.
    #[serde(default = "default_min_signal_confidence")]
    pub min_signal_confidence: f64,
    /// How many top signals feed a wave's score.
    #[serde(default = "default_max_selected")]
    pub max_selected: usize,
    /// Floor applied to every wave score.
    #[serde(default = "default_min_wave_score")]
    pub min_wave_score: f64,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            min_signal_confidence: default_min_signal_confidence(),
            max_selected: default_max_selected(),
            min_wave_score: default_min_wave_score(),
        }
    }
}

/// Tuning for dependency/window coordination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinationConfig {
    /// Total window overlap at or above this many minutes blocks readiness.
    #[serde(default = "default_max_overlap_minutes")]
    pub max_overlap_minutes: i64,
    /// Dependencies at or below this criticality block readiness.
    #[serde(default = "default_min_criticality")]
    pub min_criticality: f64,
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            max_overlap_minutes: default_max_overlap_minutes(),
            min_criticality: default_min_criticality(),
        }
    }
}

/// Tuning for the schedule engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Waves carrying more readiness signals than this are unhealthy.
    #[serde(default = "default_max_signals_per_wave")]
    pub max_signals_per_wave: usize,
    /// Pad applied to degenerate windows instead of rejecting them.
    #[serde(default = "default_degenerate_pad_minutes")]
    pub degenerate_pad_minutes: i64,
    /// Fixed shift applied to a rescheduled window start.
    #[serde(default = "default_reschedule_shift_minutes")]
    pub reschedule_shift_minutes: i64,
    /// Fixed end offset applied after a reschedule shift.
    #[serde(default = "default_reschedule_end_offset_minutes")]
    pub reschedule_end_offset_minutes: i64,
    /// How many top-ranked waves become the critical set.
    #[serde(default = "default_critical_rank_count")]
    pub critical_rank_count: usize,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            max_signals_per_wave: default_max_signals_per_wave(),
            degenerate_pad_minutes: default_degenerate_pad_minutes(),
            reschedule_shift_minutes: default_reschedule_shift_minutes(),
            reschedule_end_offset_minutes: default_reschedule_end_offset_minutes(),
            critical_rank_count: default_critical_rank_count(),
        }
    }
}

/// Target thresholds for the readiness/SLO verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SloTargets {
    /// Every wave must exceed this readiness.
    #[serde(default = "default_min_wave_readiness")]
    pub min_wave_readiness: f64,
    /// The bundle average must exceed this readiness.
    #[serde(default = "default_min_average_readiness")]
    pub min_average_readiness: f64,
    /// Composite score required for a passing verdict.
    #[serde(default = "default_min_composite")]
    pub min_composite: f64,
    /// Bundle risk index above this is a breach.
    #[serde(default = "default_max_risk_index")]
    pub max_risk_index: f64,
}

impl Default for SloTargets {
    fn default() -> Self {
        Self {
            min_wave_readiness: default_min_wave_readiness(),
            min_average_readiness: default_min_average_readiness(),
            min_composite: default_min_composite(),
            max_risk_index: default_max_risk_index(),
        }
    }
}

/// Tuning for bundle evaluation risk recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Wave scores below this are recorded as a low-score risk entry.
    #[serde(default = "default_low_score_floor")]
    pub low_score_floor: f64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            low_score_floor: default_low_score_floor(),
        }
    }
}

fn default_min_signal_confidence() -> f64 {
    0.25
}

fn default_max_selected() -> usize {
    3
}

fn default_min_wave_score() -> f64 {
    0.05
}

fn default_max_overlap_minutes() -> i64 {
    90
}

fn default_min_criticality() -> f64 {
    0.2
}

fn default_max_signals_per_wave() -> usize {
    100
}

fn default_degenerate_pad_minutes() -> i64 {
    5
}

fn default_reschedule_shift_minutes() -> i64 {
    15
}

fn default_reschedule_end_offset_minutes() -> i64 {
    5
}

fn default_critical_rank_count() -> usize {
    3
}

fn default_min_wave_readiness() -> f64 {
    0.45
}

fn default_min_average_readiness() -> f64 {
    0.52
}

fn default_min_composite() -> f64 {
    0.6
}

fn default_max_risk_index() -> f64 {
    0.75
}

fn default_low_score_floor() -> f64 {
    0.35
}
