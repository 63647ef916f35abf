//! Decision telemetry for the Fusion engine.
//!
//! A [`FusionTelemetrySnapshot`] captures the outcome of one coordination
//! pass for audit and dashboard consumers. Export is line-oriented —
//! `name value {tags-json}` — so downstream collectors can ship metrics
//! without owning any transport here.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use fusion_common::types::{FusionBundleId, FusionRunId, RiskBand};

/// A single named measurement with optional tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionMetric {
    pub name: String,
    pub value: f64,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl FusionMetric {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            tags: BTreeMap::new(),
        }
    }

    /// Attach a tag, builder-style.
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Render as one export line: `name value {tags-json}`.
    pub fn to_line(&self) -> String {
        let tags = serde_json::to_string(&self.tags).unwrap_or_else(|_| "{}".to_string());
        format!("{} {} {}", self.name, self.value, tags)
    }
}

/// Snapshot of one coordination decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusionTelemetrySnapshot {
    pub run_id: FusionRunId,
    pub bundle_id: FusionBundleId,
    pub wave_count: usize,
    pub decision_accepted: bool,
    pub risk_band: RiskBand,
    pub captured_at: DateTime<Utc>,
    pub metrics: Vec<FusionMetric>,
}

impl FusionTelemetrySnapshot {
    /// Start a snapshot for one run; metrics are pushed afterwards.
    pub fn new(
        run_id: FusionRunId,
        bundle_id: FusionBundleId,
        wave_count: usize,
        decision_accepted: bool,
        risk_band: RiskBand,
    ) -> Self {
        Self {
            run_id,
            bundle_id,
            wave_count,
            decision_accepted,
            risk_band,
            captured_at: Utc::now(),
            metrics: Vec::new(),
        }
    }

    pub fn push_metric(&mut self, metric: FusionMetric) {
        self.metrics.push(metric);
    }

    /// Render every metric as export lines, one per metric.
    pub fn render_lines(&self) -> String {
        let lines: Vec<String> = self.metrics.iter().map(FusionMetric::to_line).collect();
        debug!(
            run = %self.run_id,
            metrics = self.metrics.len(),
            "rendered telemetry lines"
        );
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_format_is_name_value_tags() {
        let metric = FusionMetric::new("fusion_risk_index", 0.42)
            .tag("run", "run-1")
            .tag("band", "amber");
        assert_eq!(
            metric.to_line(),
            r#"fusion_risk_index 0.42 {"band":"amber","run":"run-1"}"#
        );
    }

    #[test]
    fn untagged_metric_renders_empty_object() {
        let metric = FusionMetric::new("fusion_wave_count", 3.0);
        assert_eq!(metric.to_line(), "fusion_wave_count 3 {}");
    }

    #[test]
    fn snapshot_renders_one_line_per_metric() {
        let mut snapshot = FusionTelemetrySnapshot::new(
            FusionRunId::new("run-1"),
            FusionBundleId::new("b-1"),
            2,
            true,
            RiskBand::Green,
        );
        snapshot.push_metric(FusionMetric::new("fusion_wave_count", 2.0));
        snapshot.push_metric(FusionMetric::new("fusion_command_density", 1.5));
        let rendered = snapshot.render_lines();
        assert_eq!(rendered.lines().count(), 2);
        assert!(rendered.starts_with("fusion_wave_count 2 {}"));
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let snapshot = FusionTelemetrySnapshot::new(
            FusionRunId::new("run-1"),
            FusionBundleId::new("b-1"),
            4,
            false,
            RiskBand::Red,
        );
        let encoded = serde_json::to_string(&snapshot).unwrap();
        let decoded: FusionTelemetrySnapshot = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.wave_count, 4);
        assert!(!decoded.decision_accepted);
        assert_eq!(decoded.risk_band, RiskBand::Red);
    }
}
