//! Raw signal envelope from the ingestion boundary.
//!
//! Upstream collectors post free-form envelopes; almost every field is
//! optional and normalization is defensive. The typed [`FusionSignal`]
//! produced from an envelope lives in [`crate::types`]; the normalization
//! itself is the engine's job, since it logs and batches.
//!
//! [`FusionSignal`]: crate::types::FusionSignal

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Free-form signal envelope as received from collectors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalEnvelope {
    /// Tenant the drill belongs to.
    pub tenant: String,
    pub run_id: String,
    /// Originating system; blank values normalize to "unknown".
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub signal_id: Option<String>,
    /// Severity in [0.0, 1.0]; absent values default during normalization.
    #[serde(default)]
    pub severity: Option<f64>,
    /// Confidence in [0.0, 1.0]; absent values default during normalization.
    #[serde(default)]
    pub confidence: Option<f64>,
    /// RFC 3339 timestamp; malformed values fall back to now.
    #[serde(default)]
    pub observed_at: Option<String>,
    #[serde(default)]
    pub command_id: Option<String>,
    #[serde(default)]
    pub payload: Option<BTreeMap<String, serde_json::Value>>,
}
