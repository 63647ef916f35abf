//! JSON storage envelope for decision artifacts and bundles.
//!
//! Defines the on-wire/on-disk shape consumed by persistence and audit
//! sinks. Encoding is plain serde; decoding of stored bundles is
//! defensive — `id` and `planId` must be present as strings, everything
//! else falls back to a sane default so older envelopes keep decoding.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::errors::FusionError;
use crate::types::{
    FusionBundle, FusionBundleId, FusionPlanId, FusionPlanResult, FusionRunId, FusionSignal,
    FusionWave,
};

/// Encode a decision artifact to its JSON envelope.
pub fn encode_result(result: &FusionPlanResult) -> Result<String, FusionError> {
    serde_json::to_string(result).map_err(|e| FusionError::DecodeFailed(e.to_string()))
}

/// Encode a bundle to its JSON storage envelope.
pub fn encode_bundle(bundle: &FusionBundle) -> Result<String, FusionError> {
    serde_json::to_string(bundle).map_err(|e| FusionError::DecodeFailed(e.to_string()))
}

/// Decode a stored bundle envelope.
///
/// Requires at minimum `id` and `planId` as strings; every other field is
/// optional and defaults defensively (timestamps fall back to now).
pub fn decode_stored_bundle(raw: &str) -> Result<FusionBundle, FusionError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| FusionError::DecodeFailed(e.to_string()))?;

    let id = require_string(&value, "id")?;
    let plan_id = require_string(&value, "planId")?;

    let waves: Vec<FusionWave> = decode_list(&value, "waves");
    let signals: Vec<FusionSignal> = decode_list(&value, "signals");

    Ok(FusionBundle {
        id: FusionBundleId::new(id),
        tenant: optional_string(&value, "tenant"),
        run_id: FusionRunId::new(optional_string(&value, "runId")),
        session: optional_string(&value, "session"),
        plan_id: FusionPlanId::new(plan_id),
        waves,
        signals,
        created_at: optional_timestamp(&value, "createdAt"),
        expires_at: optional_timestamp(&value, "expiresAt"),
    })
}

fn require_string(value: &Value, key: &str) -> Result<String, FusionError> {
    match value.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        Some(_) => Err(FusionError::DecodeFailed(format!(
            "field {key} must be a non-empty string"
        ))),
        None => Err(FusionError::DecodeFailed(format!("missing field {key}"))),
    }
}

fn optional_string(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn optional_timestamp(value: &Value, key: &str) -> DateTime<Utc> {
    value
        .get(key)
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<DateTime<Utc>>().ok())
        .unwrap_or_else(Utc::now)
}

fn decode_list<T: serde::de::DeserializeOwned>(value: &Value, key: &str) -> Vec<T> {
    value
        .get(key)
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}
