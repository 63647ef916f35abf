//! Bundle evaluation: per-wave synthesis and aggregate scoring.
//!
//! Waves are processed in descending score order. Commandless and
//! low-scoring waves become risk entries, not failures — the only hard
//! failure here is a bundle with no waves at all.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use fusion_common::config::EvaluationConfig;
use fusion_common::errors::FusionError;
use fusion_common::types::{FusionBundle, FusionBundleId, FusionSignalId, FusionWaveId};

use crate::priority::WavePriorityEntry;
use crate::readiness::ReadinessProfile;

/// Evaluation of a single wave.
#[derive(Debug, Clone, Serialize)]
pub struct FusionEvaluation {
    pub wave_id: FusionWaveId,
    pub score: f64,
    /// Mean severity over the wave's readiness signals.
    pub severity: f64,
    /// Mean confidence over the wave's readiness signals.
    pub confidence: f64,
    /// Readiness minus score: positive means the wave is more stable
    /// than its priority demands.
    pub readiness_delta: f64,
    pub recommended: Vec<FusionSignalId>,
}

/// Aggregate evaluation of one bundle.
#[derive(Debug, Clone, Serialize)]
pub struct BundleEvaluation {
    pub bundle_id: FusionBundleId,
    pub evaluations: Vec<FusionEvaluation>,
    /// Mean evaluated wave score (0 when every wave was skipped).
    pub aggregate_score: f64,
    pub top_wave: Option<FusionWaveId>,
    /// Soft risk entries: skipped waves and low scores.
    pub risks: Vec<String>,
}

/// Evaluate a single wave outside a bundle pass.
///
/// Unlike [`evaluate_bundle`], which downgrades commandless waves to risk
/// entries, a direct single-wave evaluation has nothing to fall back on
/// and fails with [`FusionError::NoCommands`].
pub fn evaluate_wave(
    wave: &fusion_common::types::FusionWave,
    entry: Option<&WavePriorityEntry>,
    profile: &ReadinessProfile,
) -> Result<FusionEvaluation, FusionError> {
    if wave.commands.is_empty() {
        return Err(FusionError::NoCommands(wave.id.clone()));
    }

    let score = entry.map(|e| e.score).unwrap_or(wave.score);
    let risk = profile.risk_of(&wave.id).copied().unwrap_or_default();
    let readiness = profile.readiness_of(&wave.id).unwrap_or(0.0);

    Ok(FusionEvaluation {
        wave_id: wave.id.clone(),
        score,
        severity: risk.severity,
        confidence: risk.confidence,
        readiness_delta: readiness - score,
        recommended: entry.map(|e| e.recommended.clone()).unwrap_or_default(),
    })
}

/// Evaluate a bundle wave-by-wave.
///
/// Fails only when the bundle has no waves. `ranking` supplies effective
/// scores and recommendations; `profile` supplies per-wave readiness and
/// risk vectors.
pub fn evaluate_bundle(
    bundle: &FusionBundle,
    ranking: &[WavePriorityEntry],
    profile: &ReadinessProfile,
    config: &EvaluationConfig,
) -> Result<BundleEvaluation, FusionError> {
    if bundle.waves.is_empty() {
        return Err(FusionError::EmptyBundle);
    }

    let by_wave: BTreeMap<&FusionWaveId, &WavePriorityEntry> =
        ranking.iter().map(|entry| (&entry.wave_id, entry)).collect();

    // Descending effective score, stable on ties.
    let mut ordered: Vec<&fusion_common::types::FusionWave> = bundle.waves.iter().collect();
    ordered.sort_by(|a, b| {
        let score_a = by_wave.get(&a.id).map(|e| e.score).unwrap_or(a.score);
        let score_b = by_wave.get(&b.id).map(|e| e.score).unwrap_or(b.score);
        score_b.partial_cmp(&score_a).unwrap_or(Ordering::Equal)
    });

    let mut evaluations = Vec::new();
    let mut risks = Vec::new();

    for wave in ordered {
        if wave.commands.is_empty() {
            risks.push(format!("wave:{}", wave.id));
            continue;
        }

        let score = by_wave.get(&wave.id).map(|e| e.score).unwrap_or(wave.score);
        if score < config.low_score_floor {
            risks.push(format!("low-score:{}:{:.2}", wave.id, score));
        }

        let risk = profile.risk_of(&wave.id).copied().unwrap_or_default();
        let readiness = profile.readiness_of(&wave.id).unwrap_or(0.0);

        evaluations.push(FusionEvaluation {
            wave_id: wave.id.clone(),
            score,
            severity: risk.severity,
            confidence: risk.confidence,
            readiness_delta: readiness - score,
            recommended: by_wave
                .get(&wave.id)
                .map(|e| e.recommended.clone())
                .unwrap_or_default(),
        });
    }

    let aggregate_score = if evaluations.is_empty() {
        0.0
    } else {
        evaluations.iter().map(|e| e.score).sum::<f64>() / evaluations.len() as f64
    };
    let top_wave = evaluations.first().map(|e| e.wave_id.clone());

    debug!(
        bundle = %bundle.id,
        evaluated = evaluations.len(),
        risks = risks.len(),
        aggregate_score,
        "bundle evaluated"
    );

    Ok(BundleEvaluation {
        bundle_id: bundle.id.clone(),
        evaluations,
        aggregate_score,
        top_wave,
        risks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::priority::rank_waves;
    use crate::readiness::build_readiness_profile;
    use chrono::{TimeZone, Utc};
    use fusion_common::config::{PriorityConfig, SloTargets};
    use fusion_common::types::{
        CommandAction, FusionBudget, FusionCommand, FusionCommandId, FusionPlanId, FusionRunId,
        FusionSignal, FusionWave, WaveState,
    };
    use std::collections::BTreeMap as Map;

    fn make_signal(id: &str, severity: f64, confidence: f64) -> FusionSignal {
        FusionSignal {
            id: FusionSignalId::new(id),
            run_id: FusionRunId::new("run-1"),
            source: "probe".to_string(),
            severity,
            confidence,
            detected_at: Utc::now(),
            observed_at: Utc::now(),
            tags: Vec::new(),
            payload: Map::new(),
            details: Map::new(),
        }
    }

    fn make_wave(id: &str, state: WaveState, commands: usize, signals: Vec<FusionSignal>) -> FusionWave {
        FusionWave {
            id: FusionWaveId::new(id),
            plan_id: FusionPlanId::new("plan-1"),
            run_id: FusionRunId::new("run-1"),
            state,
            window_start: Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap(),
            window_end: Utc.with_ymd_and_hms(2026, 3, 1, 10, 30, 0).unwrap(),
            commands: (0..commands)
                .map(|i| FusionCommand {
                    id: FusionCommandId::new(format!("cmd-{id}-{i}")),
                    wave_id: FusionWaveId::new(id),
                    step_key: "failover".to_string(),
                    action: CommandAction::Start,
                    actor: "sre-bot".to_string(),
                    requested_at: Utc::now(),
                    rationale: "promote replica".to_string(),
                })
                .collect(),
            readiness_signals: signals,
            budget: FusionBudget::default(),
            risk_band: Default::default(),
            score: 0.5,
            metadata: Map::new(),
        }
    }

    fn make_bundle(waves: Vec<FusionWave>) -> FusionBundle {
        FusionBundle {
            id: FusionBundleId::new("b-1"),
            tenant: "acme".to_string(),
            run_id: FusionRunId::new("run-1"),
            session: String::new(),
            plan_id: FusionPlanId::new("plan-1"),
            waves,
            signals: Vec::new(),
            created_at: Utc::now(),
            expires_at: Utc::now(),
        }
    }

    fn evaluate(bundle: &FusionBundle) -> BundleEvaluation {
        let ranking = rank_waves(bundle, &PriorityConfig::default());
        let profile =
            build_readiness_profile(bundle, &Map::new(), 0.3, &SloTargets::default());
        evaluate_bundle(bundle, &ranking, &profile, &EvaluationConfig::default()).unwrap()
    }

    #[test]
    fn direct_wave_evaluation_requires_commands() {
        let wave = make_wave("w-1", WaveState::Running, 0, Vec::new());
        let bundle = make_bundle(vec![wave.clone()]);
        let profile =
            build_readiness_profile(&bundle, &Map::new(), 0.0, &SloTargets::default());
        let err = evaluate_wave(&wave, None, &profile).unwrap_err();
        assert_eq!(err, FusionError::NoCommands(FusionWaveId::new("w-1")));
    }

    #[test]
    fn direct_wave_evaluation_uses_wave_score_without_entry() {
        let wave = make_wave("w-1", WaveState::Running, 1, vec![make_signal("s-1", 0.5, 0.8)]);
        let bundle = make_bundle(vec![wave.clone()]);
        let profile =
            build_readiness_profile(&bundle, &Map::new(), 0.0, &SloTargets::default());
        let evaluation = evaluate_wave(&wave, None, &profile).unwrap();
        assert_eq!(evaluation.score, 0.5);
        assert!(evaluation.recommended.is_empty());
    }

    #[test]
    fn empty_bundle_fails() {
        let bundle = make_bundle(Vec::new());
        let err = evaluate_bundle(
            &bundle,
            &[],
            &build_readiness_profile(&bundle, &Map::new(), 0.0, &SloTargets::default()),
            &EvaluationConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err, FusionError::EmptyBundle);
    }

    #[test]
    fn commandless_wave_becomes_risk_not_failure() {
        let bundle = make_bundle(vec![
            make_wave("w-1", WaveState::Running, 0, vec![make_signal("s-1", 0.5, 0.8)]),
            make_wave("w-2", WaveState::Running, 1, vec![make_signal("s-2", 0.5, 0.8)]),
        ]);
        let evaluation = evaluate(&bundle);
        assert_eq!(evaluation.evaluations.len(), 1);
        assert!(evaluation.risks.contains(&"wave:w-1".to_string()));
    }

    #[test]
    fn low_score_wave_is_recorded_but_still_evaluated() {
        // Idle wave with a weak signal scores under the floor.
        let bundle = make_bundle(vec![make_wave(
            "w-1",
            WaveState::Idle,
            1,
            vec![make_signal("s-1", 0.1, 0.5)],
        )]);
        let evaluation = evaluate(&bundle);
        assert_eq!(evaluation.evaluations.len(), 1);
        assert!(evaluation.risks.iter().any(|r| r.starts_with("low-score:w-1:")));
    }

    #[test]
    fn top_wave_is_highest_scorer() {
        let bundle = make_bundle(vec![
            make_wave("calm", WaveState::Idle, 1, vec![make_signal("s-1", 0.3, 0.8)]),
            make_wave("burning", WaveState::Failed, 1, vec![make_signal("s-2", 1.0, 1.0)]),
        ]);
        let evaluation = evaluate(&bundle);
        assert_eq!(evaluation.top_wave.as_ref().map(|w| w.as_str()), Some("burning"));
        assert_eq!(evaluation.evaluations[0].wave_id.as_str(), "burning");
    }

    #[test]
    fn severity_and_confidence_come_from_wave_signals() {
        let bundle = make_bundle(vec![make_wave(
            "w-1",
            WaveState::Running,
            1,
            vec![make_signal("s-1", 0.4, 0.6), make_signal("s-2", 0.8, 1.0)],
        )]);
        let evaluation = evaluate(&bundle);
        let wave = &evaluation.evaluations[0];
        assert!((wave.severity - 0.6).abs() < 1e-9);
        assert!((wave.confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn aggregate_is_mean_of_evaluated_scores() {
        let bundle = make_bundle(vec![
            make_wave("w-1", WaveState::Running, 1, vec![make_signal("s-1", 0.5, 0.8)]),
            make_wave("w-2", WaveState::Running, 1, vec![make_signal("s-2", 0.5, 0.8)]),
        ]);
        let evaluation = evaluate(&bundle);
        let mean = (evaluation.evaluations[0].score + evaluation.evaluations[1].score) / 2.0;
        assert!((evaluation.aggregate_score - mean).abs() < 1e-9);
    }
}
