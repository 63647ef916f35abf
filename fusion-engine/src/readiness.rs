//! Readiness aggregation and SLO evaluation.
//!
//! Per-wave stability folds the wave's risk vector, command pressure, and
//! priority score into one [0,1] readiness estimate; the bundle profile
//! aggregates those into a verdict against the configured targets.
//! Breaches are data — human-readable strings, never errors — so a
//! failing verdict still carries the full diagnostic picture.

use serde::Serialize;
use tracing::debug;

use fusion_common::config::SloTargets;
use fusion_common::types::{clamp_unit, FusionBundle, FusionBundleId, FusionWaveId};

use crate::risk::{calculate_risk_vector, RiskVector};

/// Command count at which command pressure saturates.
const PRESSURE_SATURATION: f64 = 8.0;

/// Share of severity feeding the risk weight.
const SEVERITY_DAMPING: f64 = 0.1;

/// Share of command pressure subtracted from stability.
const PRESSURE_SHARE: f64 = 0.2;

/// Share of the priority score added back into stability.
const SCORE_SHARE: f64 = 0.4;

/// Readiness estimate for a single wave.
#[derive(Debug, Clone, Serialize)]
pub struct WaveReadiness {
    pub wave_id: FusionWaveId,
    /// Stability estimate in [0.0, 1.0].
    pub readiness: f64,
    /// Risk vector over the wave's readiness signals.
    pub risk: RiskVector,
    pub command_pressure: f64,
}

/// Bundle-level readiness aggregate.
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessProfile {
    pub bundle_id: FusionBundleId,
    pub waves: Vec<WaveReadiness>,
    pub average: f64,
    pub min: f64,
    pub max: f64,
    /// Fraction of waves not in a distressed state.
    pub transition_stability: f64,
    pub is_stable: bool,
}

impl ReadinessProfile {
    /// Readiness for one wave, when it was profiled.
    pub fn readiness_of(&self, wave_id: &FusionWaveId) -> Option<f64> {
        self.waves
            .iter()
            .find(|w| &w.wave_id == wave_id)
            .map(|w| w.readiness)
    }

    /// Risk vector for one wave, when it was profiled.
    pub fn risk_of(&self, wave_id: &FusionWaveId) -> Option<&RiskVector> {
        self.waves
            .iter()
            .find(|w| &w.wave_id == wave_id)
            .map(|w| &w.risk)
    }
}

/// Pass/fail SLO judgment with specific breach reasons.
#[derive(Debug, Clone, Serialize)]
pub struct SloVerdict {
    pub passed: bool,
    /// Mean of average readiness, utilization proxy, headroom, and
    /// transition stability.
    pub composite: f64,
    pub breaches: Vec<String>,
}

/// Stability estimate for one wave.
///
/// `score` is the wave's effective priority score, `density` the topology
/// density feeding the risk vector.
pub fn wave_stability(
    wave: &fusion_common::types::FusionWave,
    score: f64,
    density: f64,
) -> WaveReadiness {
    let risk = calculate_risk_vector(&wave.readiness_signals, density);
    let command_pressure = (wave.commands.len() as f64 / PRESSURE_SATURATION).clamp(0.0, 1.0);
    let severity_weight = clamp_unit(risk.severity * SEVERITY_DAMPING);

    let readiness = clamp_unit(
        (1.0 - risk.risk_index * severity_weight - command_pressure * PRESSURE_SHARE)
            + score * SCORE_SHARE,
    );

    WaveReadiness {
        wave_id: wave.id.clone(),
        readiness,
        risk,
        command_pressure,
    }
}

/// Aggregate per-wave stability into a bundle readiness profile.
///
/// `scores` maps wave ids to their effective priority scores.
pub fn build_readiness_profile(
    bundle: &FusionBundle,
    scores: &std::collections::BTreeMap<FusionWaveId, f64>,
    density: f64,
    targets: &SloTargets,
) -> ReadinessProfile {
    let waves: Vec<WaveReadiness> = bundle
        .waves
        .iter()
        .map(|wave| {
            let score = scores.get(&wave.id).copied().unwrap_or(wave.score);
            wave_stability(wave, score, density)
        })
        .collect();

    let count = waves.len() as f64;
    let (average, min, max) = if waves.is_empty() {
        (0.0, 0.0, 0.0)
    } else {
        let sum: f64 = waves.iter().map(|w| w.readiness).sum();
        let min = waves.iter().map(|w| w.readiness).fold(f64::MAX, f64::min);
        let max = waves.iter().map(|w| w.readiness).fold(f64::MIN, f64::max);
        (sum / count, min, max)
    };

    let transition_stability = if bundle.waves.is_empty() {
        0.0
    } else {
        bundle
            .waves
            .iter()
            .filter(|w| !w.state.is_distressed())
            .count() as f64
            / count
    };

    let is_stable = !waves.is_empty()
        && waves.iter().all(|w| w.readiness > targets.min_wave_readiness)
        && average > targets.min_average_readiness;

    debug!(
        bundle = %bundle.id,
        average,
        min,
        max,
        is_stable,
        "readiness profile built"
    );

    ReadinessProfile {
        bundle_id: bundle.id.clone(),
        waves,
        average,
        min,
        max,
        transition_stability,
        is_stable,
    }
}

/// Judge a readiness profile against the configured targets.
pub fn evaluate_slo(
    profile: &ReadinessProfile,
    risk: &RiskVector,
    targets: &SloTargets,
) -> SloVerdict {
    let mut breaches = Vec::new();

    if profile.average < targets.min_average_readiness {
        breaches.push(format!(
            "average readiness {:.2} below target {:.2}",
            profile.average, targets.min_average_readiness
        ));
    }
    for wave in &profile.waves {
        if wave.readiness < targets.min_wave_readiness {
            breaches.push(format!(
                "wave {} readiness {:.2} below target {:.2}",
                wave.wave_id, wave.readiness, targets.min_wave_readiness
            ));
        }
    }
    if risk.risk_index > targets.max_risk_index {
        breaches.push(format!(
            "risk index {:.2} exceeds target {:.2}",
            risk.risk_index, targets.max_risk_index
        ));
    }

    // Composite: average readiness, min as utilization proxy, headroom
    // above the hottest wave, and transition stability.
    let composite = (profile.average
        + profile.min
        + (1.0 - profile.max)
        + profile.transition_stability)
        / 4.0;

    SloVerdict {
        passed: breaches.is_empty() && composite >= targets.min_composite,
        composite,
        breaches,
    }
}
