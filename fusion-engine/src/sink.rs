//! Injected persistence/audit boundary.
//!
//! The engine never stores anything itself. After a decision is produced
//! the coordinator hands the artifacts to whatever sinks the embedding
//! application injected. Sink failures are logged and never alter the
//! decision.

use tracing::warn;

use fusion_common::types::FusionPlanResult;
use fusion_telemetry::FusionTelemetrySnapshot;

/// Receiver for decision artifacts.
///
/// Implementations live outside the engine (databases, audit logs,
/// message buses); errors are whatever the implementation produces.
pub trait DecisionSink: Send + Sync {
    fn record_decision(&self, result: &FusionPlanResult) -> anyhow::Result<()>;

    fn record_snapshot(&self, snapshot: &FusionTelemetrySnapshot) -> anyhow::Result<()>;
}

/// Sink that drops everything. The default when nothing is injected.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DecisionSink for NullSink {
    fn record_decision(&self, _result: &FusionPlanResult) -> anyhow::Result<()> {
        Ok(())
    }

    fn record_snapshot(&self, _snapshot: &FusionTelemetrySnapshot) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Deliver a decision to a sink, logging failures instead of surfacing them.
pub(crate) fn deliver_decision(sink: &dyn DecisionSink, result: &FusionPlanResult) {
    if let Err(error) = sink.record_decision(result) {
        warn!(bundle = %result.bundle_id, %error, "decision sink failed");
    }
}

/// Deliver a snapshot to a sink, logging failures instead of surfacing them.
pub(crate) fn deliver_snapshot(sink: &dyn DecisionSink, snapshot: &FusionTelemetrySnapshot) {
    if let Err(error) = sink.record_snapshot(snapshot) {
        warn!(bundle = %snapshot.bundle_id, %error, "snapshot sink failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fusion_common::types::{FusionBundleId, RiskBand};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        decisions: Mutex<Vec<String>>,
    }

    impl DecisionSink for RecordingSink {
        fn record_decision(&self, result: &FusionPlanResult) -> anyhow::Result<()> {
            self.decisions
                .lock()
                .unwrap()
                .push(result.bundle_id.as_str().to_string());
            Ok(())
        }

        fn record_snapshot(&self, _snapshot: &FusionTelemetrySnapshot) -> anyhow::Result<()> {
            anyhow::bail!("snapshot store offline")
        }
    }

    fn make_result() -> FusionPlanResult {
        FusionPlanResult {
            accepted: true,
            bundle_id: FusionBundleId::new("b-1"),
            wave_count: 1,
            estimated_minutes: 30,
            risk_band: RiskBand::Green,
            reasons: Vec::new(),
        }
    }

    #[test]
    fn decisions_reach_the_sink() {
        let sink = RecordingSink::default();
        deliver_decision(&sink, &make_result());
        assert_eq!(sink.decisions.lock().unwrap().len(), 1);
    }

    #[test]
    fn sink_failures_do_not_propagate() {
        let sink = RecordingSink::default();
        let snapshot = FusionTelemetrySnapshot::new(
            fusion_common::types::FusionRunId::new("run-1"),
            FusionBundleId::new("b-1"),
            1,
            true,
            RiskBand::Green,
        );
        // Must not panic or surface the error.
        deliver_snapshot(&sink, &snapshot);
    }
}
