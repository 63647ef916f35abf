//! Risk vector computation over observed signals.

use serde::Serialize;

use fusion_common::types::{clamp_unit, FusionSignal};

/// Weight of topology coupling in the risk index.
const DENSITY_COUPLING: f64 = 0.35;

/// Base multiplier applied before coupling.
const BASE_COUPLING: f64 = 0.65;

/// How strongly low confidence inflates risk.
const UNCERTAINTY_PENALTY: f64 = 0.2;

/// Normalized severity/confidence/risk triple for a signal population.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RiskVector {
    /// Mean signal severity in [0.0, 1.0].
    pub severity: f64,
    /// Mean signal confidence in [0.0, 1.0].
    pub confidence: f64,
    /// Combined risk index in [0.0, 1.0].
    pub risk_index: f64,
}

/// Compute the risk vector for a set of signals.
///
/// `density` is the dependency-density scalar from topology analysis:
/// risk scales up with coupling and down with confidence. An empty signal
/// list yields the all-zero vector.
pub fn calculate_risk_vector(signals: &[FusionSignal], density: f64) -> RiskVector {
    if signals.is_empty() {
        return RiskVector::default();
    }

    let count = signals.len() as f64;
    let severity = signals.iter().map(|s| clamp_unit(s.severity)).sum::<f64>() / count;
    let confidence = signals.iter().map(|s| clamp_unit(s.confidence)).sum::<f64>() / count;

    let coupling = BASE_COUPLING + clamp_unit(density) * DENSITY_COUPLING;
    let uncertainty = 1.0 + (1.0 - confidence) * UNCERTAINTY_PENALTY;
    let risk_index = clamp_unit(severity * coupling * uncertainty);

    RiskVector {
        severity,
        confidence,
        risk_index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fusion_common::types::{FusionRunId, FusionSignalId};
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn make_signal(severity: f64, confidence: f64) -> FusionSignal {
        FusionSignal {
            id: FusionSignalId::new("sig"),
            run_id: FusionRunId::new("run"),
            source: "probe".to_string(),
            severity,
            confidence,
            detected_at: Utc::now(),
            observed_at: Utc::now(),
            tags: Vec::new(),
            payload: BTreeMap::new(),
            details: BTreeMap::new(),
        }
    }

    #[test]
    fn empty_signals_yield_zero_vector() {
        let vector = calculate_risk_vector(&[], 0.8);
        assert_eq!(vector, RiskVector::default());
    }

    #[test]
    fn severity_and_confidence_are_means() {
        let signals = vec![make_signal(0.2, 0.4), make_signal(0.8, 0.6)];
        let vector = calculate_risk_vector(&signals, 0.0);
        assert!((vector.severity - 0.5).abs() < 1e-9);
        assert!((vector.confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn coupling_raises_risk() {
        let signals = vec![make_signal(0.7, 0.9)];
        let sparse = calculate_risk_vector(&signals, 0.0);
        let dense = calculate_risk_vector(&signals, 1.0);
        assert!(dense.risk_index > sparse.risk_index);
    }

    #[test]
    fn low_confidence_raises_risk() {
        let confident = calculate_risk_vector(&[make_signal(0.7, 1.0)], 0.5);
        let uncertain = calculate_risk_vector(&[make_signal(0.7, 0.1)], 0.5);
        assert!(uncertain.risk_index > confident.risk_index);
    }

    proptest! {
        #[test]
        fn risk_vector_stays_in_unit_range(
            severities in proptest::collection::vec(0.0f64..=1.0, 0..12),
            density in 0.0f64..=1.0,
        ) {
            let signals: Vec<FusionSignal> = severities
                .iter()
                .map(|&s| make_signal(s, 1.0 - s))
                .collect();
            let vector = calculate_risk_vector(&signals, density);
            prop_assert!((0.0..=1.0).contains(&vector.severity));
            prop_assert!((0.0..=1.0).contains(&vector.confidence));
            prop_assert!((0.0..=1.0).contains(&vector.risk_index));
        }
    }
}
