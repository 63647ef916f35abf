//! Coordination entry point.
//!
//! Accepts a plan request, builds the bundle, and chains catalog,
//! topology, scheduling, coordination, readiness, telemetry, and
//! evaluation into one accept/reject decision. Validation failures
//! return an error before any bundle exists; hard pipeline failures
//! surface as a rejected decision carrying the error string, so callers
//! always get a decision artifact once intake succeeded.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use fusion_common::config::EngineConfig;
use fusion_common::errors::FusionError;
use fusion_common::types::{
    FusionBundle, FusionBundleId, FusionPlanId, FusionPlanRequest, FusionPlanResult, FusionRunId,
    FusionRunState, FusionWaveId, RiskBand,
};
use fusion_telemetry::{FusionMetric, FusionTelemetrySnapshot};

use crate::catalog::build_command_catalog;
use crate::coordination::build_coordination;
use crate::evaluate::evaluate_bundle;
use crate::priority::rank_waves;
use crate::readiness::{build_readiness_profile, evaluate_slo};
use crate::risk::calculate_risk_vector;
use crate::schedule::schedule_bundle;
use crate::sink::{deliver_decision, deliver_snapshot, DecisionSink, NullSink};
use crate::topology::{analyze, derive_topology};

/// Orchestrates one evaluation pass per plan request.
///
/// Holds no mutable state: every pass operates on a freshly constructed
/// bundle, so concurrent coordinations are safe without locking.
pub struct FusionCoordinator {
    config: EngineConfig,
    sink: Arc<dyn DecisionSink>,
}

impl FusionCoordinator {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            sink: Arc::new(NullSink),
        }
    }

    /// Inject a persistence/audit sink.
    pub fn with_sink(mut self, sink: Arc<dyn DecisionSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Validate a raw plan request field-by-field.
    pub fn validate_request(request: &FusionPlanRequest) -> Result<(), FusionError> {
        if request.plan_id.trim().is_empty() {
            return Err(FusionError::PlanIdRequired);
        }
        if request.run_id.trim().is_empty() {
            return Err(FusionError::RunIdRequired);
        }
        if request.budget.max_parallelism == 0 {
            return Err(FusionError::InvalidBudget(
                "maxParallelism must be at least 1".to_string(),
            ));
        }
        if request.budget.timeout_minutes == 0 {
            return Err(FusionError::InvalidBudget(
                "timeoutMinutes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the immutable bundle for one evaluation pass.
    pub fn build_bundle(&self, request: &FusionPlanRequest) -> FusionBundle {
        let created_at = Utc::now();
        FusionBundle {
            id: FusionBundleId::new(format!("bundle-{}", Uuid::new_v4())),
            tenant: request.tenant.clone(),
            run_id: FusionRunId::new(request.run_id.clone()),
            session: request.session.clone(),
            plan_id: FusionPlanId::new(request.plan_id.clone()),
            waves: request.waves.clone(),
            signals: request.signals.clone(),
            created_at,
            expires_at: created_at + Duration::minutes(i64::from(request.budget.timeout_minutes)),
        }
    }

    /// Run one full coordination pass.
    ///
    /// Async to compose with upstream intake and downstream sinks; the
    /// algorithmic core is synchronous and pure.
    pub async fn coordinate_fusion_bundle(
        &self,
        request: FusionPlanRequest,
    ) -> Result<FusionPlanResult, FusionError> {
        Self::validate_request(&request)?;
        let bundle = self.build_bundle(&request);
        info!(bundle = %bundle.id, plan = %bundle.plan_id, waves = bundle.waves.len(), "coordination started");

        let mut state = FusionRunState::Queued;
        state = self.transition(&bundle.id, state, FusionRunState::Warming);

        let catalog = build_command_catalog(&bundle);
        let topology = derive_topology(&bundle, &catalog);
        let insights = analyze(&topology);
        let risk = calculate_risk_vector(&bundle.signals, insights.density);
        let ranking = rank_waves(&bundle, &self.config.priority);
        let scores: BTreeMap<FusionWaveId, f64> = ranking
            .iter()
            .map(|entry| (entry.wave_id.clone(), entry.score))
            .collect();

        let schedule = match schedule_bundle(&bundle, &ranking, &self.config.schedule) {
            Ok(schedule) => schedule,
            Err(error) => return Ok(self.finish_failed(&bundle, state, error)),
        };
        if schedule.critical_wave_ids.is_empty() {
            state = self.transition(&bundle.id, state, FusionRunState::Running);
        }

        let coordination = build_coordination(&bundle, &scores, &risk, &self.config.coordination);
        let profile =
            build_readiness_profile(&bundle, &scores, insights.density, &self.config.slo);
        let verdict = evaluate_slo(&profile, &risk, &self.config.slo);

        let evaluation =
            match evaluate_bundle(&bundle, &ranking, &profile, &self.config.evaluation) {
                Ok(evaluation) => evaluation,
                Err(error) => return Ok(self.finish_failed(&bundle, state, error)),
            };

        let mut reasons = Vec::new();
        reasons.push(format!(
            "topology density {:.2} across {} nodes",
            insights.density,
            topology.nodes.len()
        ));
        reasons.push(format!(
            "catalog holds {} entries in {} clusters",
            catalog.entries.len(),
            catalog.clusters.len()
        ));
        reasons.push(format!(
            "scheduled {} windows at command density {:.2}",
            schedule.windows.len(),
            schedule.command_density
        ));
        if coordination.is_ready {
            reasons.push(format!(
                "coordination ready with {} minutes of window overlap",
                coordination.overlap_seconds / 60
            ));
        } else {
            reasons.push(format!(
                "coordination blocked with {} minutes of window overlap",
                coordination.overlap_seconds / 60
            ));
        }
        if let Some(bottleneck) = &coordination.bottleneck {
            reasons.push(format!("critical path bottleneck at wave {bottleneck}"));
        }
        if verdict.passed {
            reasons.push(format!("slo passed at composite {:.2}", verdict.composite));
        } else {
            for breach in &verdict.breaches {
                reasons.push(format!("slo breach: {breach}"));
            }
            reasons.push(format!("slo composite {:.2}", verdict.composite));
        }
        reasons.extend(evaluation.risks.iter().cloned());

        let risk_band = if evaluation.risks.is_empty() {
            RiskBand::Green
        } else {
            RiskBand::Red
        };

        let result = FusionPlanResult {
            accepted: !reasons.is_empty(),
            bundle_id: bundle.id.clone(),
            wave_count: bundle.waves.len(),
            estimated_minutes: schedule.total_minutes(),
            risk_band,
            reasons,
        };

        let mut snapshot = self.snapshot_for(&bundle, &result);
        snapshot.push_metric(metric(&bundle, "fusion_window_count", schedule.windows.len() as f64));
        snapshot.push_metric(metric(&bundle, "fusion_command_density", schedule.command_density));
        snapshot.push_metric(metric(&bundle, "fusion_risk_index", risk.risk_index));
        snapshot.push_metric(metric(&bundle, "fusion_readiness_avg", profile.average));
        snapshot.push_metric(metric(
            &bundle,
            "fusion_overlap_seconds",
            coordination.overlap_seconds as f64,
        ));
        snapshot.push_metric(metric(
            &bundle,
            "fusion_aggregate_score",
            evaluation.aggregate_score,
        ));

        deliver_decision(self.sink.as_ref(), &result);
        deliver_snapshot(self.sink.as_ref(), &snapshot);

        let state = self.transition(&bundle.id, state, FusionRunState::Review);
        info!(
            bundle = %bundle.id,
            accepted = result.accepted,
            band = %result.risk_band,
            ?state,
            "coordination finished"
        );
        Ok(result)
    }

    fn transition(
        &self,
        bundle_id: &FusionBundleId,
        from: FusionRunState,
        to: FusionRunState,
    ) -> FusionRunState {
        if from.can_transition_to(to) {
            debug!(bundle = %bundle_id, ?from, ?to, "run state transition");
            to
        } else {
            warn!(bundle = %bundle_id, ?from, ?to, "illegal run state transition ignored");
            from
        }
    }

    /// Terminal path for hard pipeline failures after intake succeeded.
    fn finish_failed(
        &self,
        bundle: &FusionBundle,
        state: FusionRunState,
        error: FusionError,
    ) -> FusionPlanResult {
        let state = self.transition(&bundle.id, state, FusionRunState::Failed);
        warn!(bundle = %bundle.id, %error, ?state, "coordination failed");

        let result = FusionPlanResult {
            accepted: false,
            bundle_id: bundle.id.clone(),
            wave_count: bundle.waves.len(),
            estimated_minutes: 0,
            risk_band: RiskBand::Red,
            reasons: vec![error.to_string()],
        };
        let snapshot = self.snapshot_for(bundle, &result);
        deliver_decision(self.sink.as_ref(), &result);
        deliver_snapshot(self.sink.as_ref(), &snapshot);
        result
    }

    fn snapshot_for(
        &self,
        bundle: &FusionBundle,
        result: &FusionPlanResult,
    ) -> FusionTelemetrySnapshot {
        let mut snapshot = FusionTelemetrySnapshot::new(
            bundle.run_id.clone(),
            bundle.id.clone(),
            result.wave_count,
            result.accepted,
            result.risk_band,
        );
        snapshot.push_metric(metric(bundle, "fusion_wave_count", result.wave_count as f64));
        snapshot
    }
}

fn metric(bundle: &FusionBundle, name: &str, value: f64) -> FusionMetric {
    FusionMetric::new(name, value).tag("run", bundle.run_id.as_str())
}
