//! Wave coordination: dependency inference and window overlap.
//!
//! Dependencies follow the plan's wave order — wave *i* depends on wave
//! *i-1* by position, not by declared data dependencies. Overlap is a
//! sweep-line accumulation of overlapping seconds across sorted windows.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use fusion_common::config::CoordinationConfig;
use fusion_common::types::{
    FusionBundle, FusionBundleId, FusionPlanId, FusionRunId, FusionWaveId,
};

use crate::risk::RiskVector;

/// Signal count at which a wave's signal density saturates.
const DENSITY_SATURATION: f64 = 10.0;

/// Confidence above which an inferred dependency counts as evidence-backed.
const STRONG_CONFIDENCE: f64 = 0.75;

/// One wave's raw execution window.
#[derive(Debug, Clone, Serialize)]
pub struct WaveWindow {
    pub wave_id: FusionWaveId,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

/// Inferred ordering dependency between two waves.
#[derive(Debug, Clone, Serialize)]
pub struct WaveDependency {
    pub from: FusionWaveId,
    pub to: FusionWaveId,
    /// How much the pair matters, in [0.1, 1.0].
    pub criticality: f64,
}

/// Predecessor/successor view for one wave.
#[derive(Debug, Clone, Serialize)]
pub struct DependencyPlan {
    pub wave_id: FusionWaveId,
    /// Waves whose windows close before this one opens.
    pub required_before: Vec<FusionWaveId>,
    /// Waves whose windows open after this one closes.
    pub blocks: Vec<FusionWaveId>,
    pub confidence: f64,
    pub reason: String,
}

/// Coordination outcome for one bundle evaluation. Ephemeral.
#[derive(Debug, Clone, Serialize)]
pub struct CoordinationWindow {
    pub bundle_id: FusionBundleId,
    pub plan_id: FusionPlanId,
    pub run_id: FusionRunId,
    pub windows: Vec<WaveWindow>,
    pub dependencies: Vec<WaveDependency>,
    pub dependency_plans: Vec<DependencyPlan>,
    /// Total overlapping seconds across all windows.
    pub overlap_seconds: i64,
    /// Wave gated by more predecessors than it gates successors.
    pub bottleneck: Option<FusionWaveId>,
    pub is_ready: bool,
}

/// Build the coordination view for a bundle.
///
/// `scores` maps each wave to its effective priority score; `risk` is the
/// bundle-level risk vector.
pub fn build_coordination(
    bundle: &FusionBundle,
    scores: &BTreeMap<FusionWaveId, f64>,
    risk: &RiskVector,
    config: &CoordinationConfig,
) -> CoordinationWindow {
    let dependencies = chain_dependencies(bundle, scores);
    let overlap_seconds = window_overlap_seconds(bundle);
    let dependency_plans = build_dependency_plans(bundle, scores, risk);
    let bottleneck = detect_bottleneck(&dependency_plans);

    let signal_count = bundle.signals.len() + bundle.wave_signal_count();
    let is_ready = dependencies
        .iter()
        .all(|d| d.criticality > config.min_criticality)
        && overlap_seconds < config.max_overlap_minutes * 60
        && signal_count > 0;

    debug!(
        bundle = %bundle.id,
        overlap_seconds,
        dependencies = dependencies.len(),
        is_ready,
        "coordination built"
    );

    CoordinationWindow {
        bundle_id: bundle.id.clone(),
        plan_id: bundle.plan_id.clone(),
        run_id: bundle.run_id.clone(),
        windows: bundle
            .waves
            .iter()
            .map(|w| WaveWindow {
                wave_id: w.id.clone(),
                starts_at: w.window_start,
                ends_at: w.window_end,
            })
            .collect(),
        dependencies,
        dependency_plans,
        overlap_seconds,
        bottleneck,
        is_ready,
    }
}

/// Pairwise chain dependencies over the given wave order.
fn chain_dependencies(
    bundle: &FusionBundle,
    scores: &BTreeMap<FusionWaveId, f64>,
) -> Vec<WaveDependency> {
    bundle
        .waves
        .windows(2)
        .map(|pair| {
            let previous = &pair[0];
            let current = &pair[1];
            let mean = (score_of(scores, &previous.id, previous.score)
                + score_of(scores, &current.id, current.score))
                / 2.0;
            WaveDependency {
                from: current.id.clone(),
                to: previous.id.clone(),
                criticality: mean.clamp(0.1, 1.0),
            }
        })
        .collect()
}

/// Total overlapping seconds across wave windows.
///
/// Sorts by window start, then sweeps while tracking the running max end.
fn window_overlap_seconds(bundle: &FusionBundle) -> i64 {
    let mut windows: Vec<(DateTime<Utc>, DateTime<Utc>)> = bundle
        .waves
        .iter()
        .map(|w| (w.window_start, w.window_end))
        .collect();
    windows.sort_by_key(|(start, _)| *start);

    let mut overlap = 0i64;
    let mut running_end: Option<DateTime<Utc>> = None;
    for (start, end) in windows {
        if let Some(max_end) = running_end {
            let bounded_end = end.min(max_end);
            if bounded_end > start {
                overlap += (bounded_end - start).num_seconds();
            }
            running_end = Some(max_end.max(end));
        } else {
            running_end = Some(end);
        }
    }
    overlap
}

fn build_dependency_plans(
    bundle: &FusionBundle,
    scores: &BTreeMap<FusionWaveId, f64>,
    risk: &RiskVector,
) -> Vec<DependencyPlan> {
    bundle
        .waves
        .iter()
        .map(|wave| {
            let required_before: Vec<FusionWaveId> = bundle
                .waves
                .iter()
                .filter(|other| other.id != wave.id && other.window_end < wave.window_start)
                .map(|other| other.id.clone())
                .collect();
            let blocks: Vec<FusionWaveId> = bundle
                .waves
                .iter()
                .filter(|other| other.id != wave.id && other.window_start > wave.window_end)
                .map(|other| other.id.clone())
                .collect();

            let signal_density =
                (wave.readiness_signals.len() as f64 / DENSITY_SATURATION).clamp(0.0, 1.0);
            let score = score_of(scores, &wave.id, wave.score);
            let confidence = (1.0 - (signal_density - 0.5).abs() * 0.2
                + (1.0 - risk.risk_index) * 0.5
                + score * 0.2)
                .clamp(0.1, 1.0);
            let reason = if confidence > STRONG_CONFIDENCE {
                "strong dependency evidence".to_string()
            } else {
                "heuristic ordering".to_string()
            };

            DependencyPlan {
                wave_id: wave.id.clone(),
                required_before,
                blocks,
                confidence,
                reason,
            }
        })
        .collect()
}

/// The critical-path bottleneck: a wave gated by more waves than it gates.
fn detect_bottleneck(plans: &[DependencyPlan]) -> Option<FusionWaveId> {
    plans
        .iter()
        .find(|plan| plan.required_before.len() > plan.blocks.len() + 1)
        .map(|plan| plan.wave_id.clone())
}

fn score_of(scores: &BTreeMap<FusionWaveId, f64>, id: &FusionWaveId, fallback: f64) -> f64 {
    scores.get(id).copied().unwrap_or(fallback)
}
