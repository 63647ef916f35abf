//! Wave priority matrix.
//!
//! Scores each wave's readiness signals into a [0,1] priority score and a
//! discrete band, selecting the top contributing signals. The selection
//! sort is stable on purpose: signals with equal scores keep their input
//! order, so repeated evaluations of the same bundle rank identically.

use std::cmp::Ordering;

use serde::Serialize;
use tracing::debug;

use fusion_common::config::PriorityConfig;
use fusion_common::types::{FusionBundle, FusionSignal, FusionSignalId, FusionWave, FusionWaveId};

// Sub-score weights. These are part of the scoring contract, not tuning
// knobs, which is why they are constants rather than configuration.
const WEIGHT_BASELINE: f64 = 0.34;
const WEIGHT_URGENCY: f64 = 0.24;
const WEIGHT_STABILITY: f64 = 0.20;
const WEIGHT_OWNER: f64 = 0.15;
const WEIGHT_CONFIDENCE: f64 = 0.07;

// Band thresholds on the final wave score.
const BAND_CRITICAL: f64 = 0.86;
const BAND_HIGH: f64 = 0.68;
const BAND_NORMAL: f64 = 0.48;
const BAND_LOW: f64 = 0.30;

/// Share of the wave score contributed by the selected-signal mean.
const SELECTED_SHARE: f64 = 0.75;

/// Share of the wave score contributed by state urgency.
const URGENCY_SHARE: f64 = 0.25;

/// Default stability when a signal payload carries no reading.
const DEFAULT_STABILITY: f64 = 0.5;

/// Priority band assigned to a wave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityBand {
    Critical,
    High,
    Normal,
    Low,
    Noise,
}

impl std::fmt::Display for PriorityBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::High => write!(f, "high"),
            Self::Normal => write!(f, "normal"),
            Self::Low => write!(f, "low"),
            Self::Noise => write!(f, "noise"),
        }
    }
}

/// Scored contribution of one readiness signal.
#[derive(Debug, Clone, Serialize)]
pub struct SignalScore {
    pub signal_id: FusionSignalId,
    pub score: f64,
    pub baseline: f64,
    pub urgency: f64,
    pub stability: f64,
    pub owner_weight: f64,
    pub confidence: f64,
}

/// One wave's entry in the priority matrix. Ephemeral, derived per pass.
#[derive(Debug, Clone, Serialize)]
pub struct WavePriorityEntry {
    pub wave_id: FusionWaveId,
    pub band: PriorityBand,
    pub score: f64,
    /// Top contributing signals, highest score first.
    pub recommended: Vec<FusionSignalId>,
    /// How many signals survived the confidence filter.
    pub contributors: usize,
}

/// Map a final wave score to its discrete band.
pub fn band_for(score: f64) -> PriorityBand {
    if score >= BAND_CRITICAL {
        PriorityBand::Critical
    } else if score >= BAND_HIGH {
        PriorityBand::High
    } else if score >= BAND_NORMAL {
        PriorityBand::Normal
    } else if score >= BAND_LOW {
        PriorityBand::Low
    } else {
        PriorityBand::Noise
    }
}

/// Baseline sub-score from the 0-5 severity tier.
fn baseline_for_tier(tier: f64) -> f64 {
    if tier >= 5.0 {
        1.0
    } else if tier >= 4.0 {
        0.75
    } else if tier >= 2.0 {
        0.5
    } else {
        0.15
    }
}

/// Owner weight from signal tags; the first matching ownership tag wins.
fn owner_weight(tags: &[String]) -> f64 {
    if tags.iter().any(|t| t == "security") {
        0.9
    } else if tags.iter().any(|t| t == "platform") {
        0.75
    } else if tags.iter().any(|t| t == "sre") {
        0.6
    } else {
        0.35
    }
}

/// Stability reading from the signal payload, defaulting when absent.
fn stability_of(signal: &FusionSignal) -> f64 {
    signal
        .payload
        .get("stability")
        .and_then(serde_json::Value::as_f64)
        .map(|v| v.clamp(0.0, 1.0))
        .unwrap_or(DEFAULT_STABILITY)
}

/// Score one readiness signal in the context of its wave.
pub fn score_signal(signal: &FusionSignal, wave: &FusionWave) -> SignalScore {
    let baseline = baseline_for_tier(signal.severity_tier());
    let urgency = wave.state.pressure();
    let stability = stability_of(signal);
    let owner = owner_weight(&signal.tags);
    let confidence = signal.confidence.clamp(0.0, 1.0);

    let score = WEIGHT_BASELINE * baseline
        + WEIGHT_URGENCY * urgency
        + WEIGHT_STABILITY * stability
        + WEIGHT_OWNER * owner
        + WEIGHT_CONFIDENCE * confidence;

    SignalScore {
        signal_id: signal.id.clone(),
        score,
        baseline,
        urgency,
        stability,
        owner_weight: owner,
        confidence,
    }
}

/// Build the priority entry for a single wave.
///
/// Returns `None` when no signal survives the confidence filter — such
/// waves carry nothing to rank on and stay out of the matrix.
pub fn build_wave_entry(wave: &FusionWave, config: &PriorityConfig) -> Option<WavePriorityEntry> {
    let mut scored: Vec<SignalScore> = wave
        .readiness_signals
        .iter()
        .filter(|s| s.confidence >= config.min_signal_confidence)
        .map(|s| score_signal(s, wave))
        .collect();

    if scored.is_empty() {
        return None;
    }
    let contributors = scored.len();

    // Stable sort: equal scores keep input order across repeated passes.
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    scored.truncate(config.max_selected);

    let mean_selected = scored.iter().map(|s| s.score).sum::<f64>() / scored.len() as f64;
    let urgency = wave.state.pressure();
    let score = (SELECTED_SHARE * mean_selected + URGENCY_SHARE * urgency)
        .max(config.min_wave_score);

    debug!(
        wave = %wave.id,
        score,
        contributors,
        "priority entry built"
    );

    Some(WavePriorityEntry {
        wave_id: wave.id.clone(),
        band: band_for(score),
        score,
        recommended: scored.into_iter().map(|s| s.signal_id).collect(),
        contributors,
    })
}

/// Rank every wave in the bundle, highest priority first.
///
/// Waves whose signals are all filtered out produce no entry. Equal
/// scores keep bundle order (stable sort).
pub fn rank_waves(bundle: &FusionBundle, config: &PriorityConfig) -> Vec<WavePriorityEntry> {
    let mut entries: Vec<WavePriorityEntry> = bundle
        .waves
        .iter()
        .filter_map(|wave| build_wave_entry(wave, config))
        .collect();
    entries.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    entries
}
