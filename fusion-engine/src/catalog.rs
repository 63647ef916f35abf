//! Command catalog construction.
//!
//! Clusters incoming readiness signals per (tenant, source) and expands
//! each wave's commands into actionable catalog entries. This is the only
//! place duplicate suppression happens — entries collapse on the
//! `(bundle, actor, action, rationale)` composite key, and callers must
//! not assume idempotence anywhere else in the pipeline.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use tracing::debug;

use fusion_common::types::{
    CommandAction, FusionBundle, FusionBundleId, FusionSignalId, FusionWave, FusionWaveId,
};

/// Weight of wave-state pressure in the action score.
const STATE_SHARE: f64 = 0.6;

/// Per-command bump in the action score.
const COMMAND_BUMP: f64 = 0.01;

/// One actionable entry derived from a signal/command pairing.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub bundle_id: FusionBundleId,
    pub wave_id: FusionWaveId,
    /// `(tenant, source)` cluster this entry came from.
    pub cluster: String,
    pub signal_id: FusionSignalId,
    pub actor: String,
    pub action: CommandAction,
    pub rationale: String,
    /// Urgency estimate in [0.0, 1.0].
    pub action_score: f64,
}

impl CatalogEntry {
    /// De-duplication key; see module docs.
    pub fn dedup_key(&self) -> (String, String, CommandAction, String) {
        (
            self.bundle_id.as_str().to_string(),
            self.actor.clone(),
            self.action,
            self.rationale.clone(),
        )
    }
}

/// Catalog of actionable commands for one bundle evaluation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CommandCatalog {
    pub bundle_id: FusionBundleId,
    /// Signals grouped by `(tenant, source)` cluster key.
    pub clusters: BTreeMap<String, Vec<FusionSignalId>>,
    pub entries: Vec<CatalogEntry>,
}

impl CommandCatalog {
    /// Entries belonging to one wave.
    pub fn entries_for(&self, wave_id: &FusionWaveId) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter().filter(move |e| &e.wave_id == wave_id)
    }

    /// Mean action score for a wave's entries (0.5 when it has none).
    pub fn mean_action_score(&self, wave_id: &FusionWaveId) -> f64 {
        let scores: Vec<f64> = self.entries_for(wave_id).map(|e| e.action_score).collect();
        if scores.is_empty() {
            return 0.5;
        }
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}

/// Urgency estimate for acting on `signal` within `wave`.
fn action_score(severity_tier: f64, wave: &FusionWave) -> f64 {
    (severity_tier / 5.0 + wave.state.pressure() * STATE_SHARE
        + wave.commands.len() as f64 * COMMAND_BUMP)
        .clamp(0.0, 1.0)
}

/// Build the command catalog for a bundle.
///
/// Each wave signal maps onto the wave's existing commands (one entry per
/// command); a wave with no commands gets a single synthesized `verify`
/// entry so it still surfaces in the catalog.
pub fn build_command_catalog(bundle: &FusionBundle) -> CommandCatalog {
    let mut clusters: BTreeMap<String, Vec<FusionSignalId>> = BTreeMap::new();
    let mut entries: Vec<CatalogEntry> = Vec::new();
    let mut seen: HashSet<(String, String, CommandAction, String)> = HashSet::new();

    for wave in &bundle.waves {
        for signal in &wave.readiness_signals {
            let cluster = format!("{}/{}", bundle.tenant, signal.source);
            clusters
                .entry(cluster.clone())
                .or_default()
                .push(signal.id.clone());

            let score = action_score(signal.severity_tier(), wave);

            if wave.commands.is_empty() {
                push_deduped(
                    &mut entries,
                    &mut seen,
                    CatalogEntry {
                        bundle_id: bundle.id.clone(),
                        wave_id: wave.id.clone(),
                        cluster: cluster.clone(),
                        signal_id: signal.id.clone(),
                        actor: signal.source.clone(),
                        action: CommandAction::Verify,
                        rationale: format!("verify readiness of wave {}", wave.id),
                        action_score: score,
                    },
                );
                continue;
            }

            for command in &wave.commands {
                push_deduped(
                    &mut entries,
                    &mut seen,
                    CatalogEntry {
                        bundle_id: bundle.id.clone(),
                        wave_id: wave.id.clone(),
                        cluster: cluster.clone(),
                        signal_id: signal.id.clone(),
                        actor: command.actor.clone(),
                        action: command.action,
                        rationale: command.rationale.clone(),
                        action_score: score,
                    },
                );
            }
        }
    }

    debug!(
        bundle = %bundle.id,
        clusters = clusters.len(),
        entries = entries.len(),
        "command catalog built"
    );

    CommandCatalog {
        bundle_id: bundle.id.clone(),
        clusters,
        entries,
    }
}

fn push_deduped(
    entries: &mut Vec<CatalogEntry>,
    seen: &mut HashSet<(String, String, CommandAction, String)>,
    entry: CatalogEntry,
) {
    if seen.insert(entry.dedup_key()) {
        entries.push(entry);
    }
}
