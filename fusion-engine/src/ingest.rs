//! Defensive signal ingestion.
//!
//! Collectors post free-form envelopes; this boundary turns them into
//! well-formed [`FusionSignal`]s without ever rejecting a batch. Missing
//! severity defaults to 0.4, missing confidence to 0.5, malformed
//! timestamps fall back to now, and blank sources become "unknown".
//! Async purely to compose with upstream I/O — there is no internal
//! suspension point.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use fusion_common::envelope::SignalEnvelope;
use fusion_common::types::{FusionRunId, FusionSignal, FusionSignalId};

/// Severity assumed when an envelope carries none.
const DEFAULT_SEVERITY: f64 = 0.4;

/// Confidence assumed when an envelope carries none.
const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Normalize a batch of raw envelopes into signals.
pub async fn ingest_signals(envelopes: Vec<SignalEnvelope>) -> Vec<FusionSignal> {
    let signals: Vec<FusionSignal> = envelopes.into_iter().map(normalize_envelope).collect();
    debug!(count = signals.len(), "ingested signal batch");
    signals
}

fn normalize_envelope(envelope: SignalEnvelope) -> FusionSignal {
    let id = envelope
        .signal_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| format!("sig-{}", Uuid::new_v4()));

    let severity = match envelope.severity {
        Some(value) if (0.0..=1.0).contains(&value) => value,
        Some(value) => {
            warn!(signal = %id, value, "severity out of range, clamping");
            value.clamp(0.0, 1.0)
        }
        None => DEFAULT_SEVERITY,
    };
    let confidence = match envelope.confidence {
        Some(value) if (0.0..=1.0).contains(&value) => value,
        Some(value) => {
            warn!(signal = %id, value, "confidence out of range, clamping");
            value.clamp(0.0, 1.0)
        }
        None => DEFAULT_CONFIDENCE,
    };

    let observed_at = match envelope.observed_at.as_deref() {
        Some(raw) => raw.parse::<DateTime<Utc>>().unwrap_or_else(|_| {
            warn!(signal = %id, raw, "malformed observedAt, falling back to now");
            Utc::now()
        }),
        None => Utc::now(),
    };

    let source = {
        let trimmed = envelope.source.trim();
        if trimmed.is_empty() {
            "unknown".to_string()
        } else {
            trimmed.to_string()
        }
    };

    let mut details = BTreeMap::new();
    details.insert("tenant".to_string(), envelope.tenant);
    if let Some(command_id) = envelope.command_id {
        details.insert("commandId".to_string(), command_id);
    }

    FusionSignal {
        id: FusionSignalId::new(id),
        run_id: FusionRunId::new(envelope.run_id),
        source,
        severity,
        confidence,
        detected_at: observed_at,
        observed_at,
        tags: Vec::new(),
        payload: envelope.payload.unwrap_or_default(),
        details,
    }
}
