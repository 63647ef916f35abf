//! End-to-end pipeline scenarios through the coordinator.

use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};
use fusion_common::codec::{decode_stored_bundle, encode_bundle, encode_result};
use fusion_common::config::EngineConfig;
use fusion_common::envelope::SignalEnvelope;
use fusion_common::types::{
    CommandAction, FusionBudget, FusionCommand, FusionCommandId, FusionPlanRequest,
    FusionRunId, FusionSignal, FusionSignalId, FusionWave, FusionWaveId, RiskBand, WaveState,
};
use fusion_engine::{ingest_signals, FusionCoordinator};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("fusion_engine=debug")
        .with_test_writer()
        .try_init();
}

fn make_signal(id: &str, severity: f64, confidence: f64) -> FusionSignal {
    FusionSignal {
        id: FusionSignalId::new(id),
        run_id: FusionRunId::new("run-e2e"),
        source: "probe".to_string(),
        severity,
        confidence,
        detected_at: Utc::now(),
        observed_at: Utc::now(),
        tags: vec!["sre".to_string()],
        payload: BTreeMap::new(),
        details: BTreeMap::new(),
    }
}

fn make_command(wave: &str, index: usize) -> FusionCommand {
    FusionCommand {
        id: FusionCommandId::new(format!("cmd-{wave}-{index}")),
        wave_id: FusionWaveId::new(wave),
        step_key: format!("step-{index}"),
        action: CommandAction::Start,
        actor: "recovery-bot".to_string(),
        requested_at: Utc::now(),
        rationale: format!("restore service {index}"),
    }
}

fn make_wave(
    id: &str,
    state: WaveState,
    start: (u32, u32),
    end: (u32, u32),
    commands: usize,
    signals: Vec<FusionSignal>,
) -> FusionWave {
    FusionWave {
        id: FusionWaveId::new(id),
        plan_id: fusion_common::types::FusionPlanId::new("plan-e2e"),
        run_id: FusionRunId::new("run-e2e"),
        state,
        window_start: Utc.with_ymd_and_hms(2026, 3, 1, start.0, start.1, 0).unwrap(),
        window_end: Utc.with_ymd_and_hms(2026, 3, 1, end.0, end.1, 0).unwrap(),
        commands: (0..commands).map(|i| make_command(id, i)).collect(),
        readiness_signals: signals,
        budget: FusionBudget::default(),
        risk_band: RiskBand::Green,
        score: 0.5,
        metadata: BTreeMap::new(),
    }
}

fn make_request(waves: Vec<FusionWave>) -> FusionPlanRequest {
    FusionPlanRequest {
        plan_id: "plan-e2e".to_string(),
        run_id: "run-e2e".to_string(),
        tenant: "acme".to_string(),
        session: "drill-42".to_string(),
        waves,
        signals: vec![make_signal("ambient-1", 0.3, 0.9)],
        budget: FusionBudget::default(),
    }
}

/// Two overlapping waves: [10:00, 10:30] and [10:15, 10:45] share 15
/// minutes, well under the readiness budget, so the plan is accepted.
#[tokio::test]
async fn overlapping_waves_within_budget_are_accepted() {
    init_tracing();
    let request = make_request(vec![
        make_wave(
            "wave-a",
            WaveState::Warming,
            (10, 0),
            (10, 30),
            2,
            vec![make_signal("sig-a", 0.7, 0.9)],
        ),
        make_wave(
            "wave-b",
            WaveState::Running,
            (10, 15),
            (10, 45),
            1,
            vec![make_signal("sig-b", 0.5, 0.8)],
        ),
    ]);

    let coordinator = FusionCoordinator::new(EngineConfig::default());
    let result = coordinator.coordinate_fusion_bundle(request).await.unwrap();

    assert!(result.accepted);
    assert_eq!(result.wave_count, 2);
    assert_eq!(result.estimated_minutes, 60);
    assert_eq!(result.risk_band, RiskBand::Green);
    assert!(result
        .reasons
        .iter()
        .any(|r| r.contains("coordination ready with 15 minutes")));
}

/// A bundle whose only wave has neither commands nor signals never
/// schedules; the decision is a rejection, not an error.
#[tokio::test]
async fn lonely_unhealthy_wave_is_rejected() {
    init_tracing();
    let request = make_request(vec![make_wave(
        "idle-wave",
        WaveState::Idle,
        (10, 0),
        (10, 30),
        0,
        Vec::new(),
    )]);

    let coordinator = FusionCoordinator::new(EngineConfig::default());
    let result = coordinator.coordinate_fusion_bundle(request).await.unwrap();

    assert!(!result.accepted);
    assert_eq!(result.reasons, vec!["bundle-not-schedulable".to_string()]);
    assert_eq!(result.estimated_minutes, 0);
}

/// The same request coordinates to the same decision every time.
#[tokio::test]
async fn coordination_is_deterministic() {
    init_tracing();
    let waves = vec![
        make_wave(
            "wave-a",
            WaveState::Degraded,
            (9, 0),
            (9, 45),
            2,
            vec![
                make_signal("sig-1", 0.8, 0.9),
                make_signal("sig-2", 0.8, 0.9),
            ],
        ),
        make_wave(
            "wave-b",
            WaveState::Running,
            (10, 0),
            (10, 20),
            1,
            vec![make_signal("sig-3", 0.4, 0.7)],
        ),
    ];

    let coordinator = FusionCoordinator::new(EngineConfig::default());
    let first = coordinator
        .coordinate_fusion_bundle(make_request(waves.clone()))
        .await
        .unwrap();
    let second = coordinator
        .coordinate_fusion_bundle(make_request(waves))
        .await
        .unwrap();

    assert_eq!(first.accepted, second.accepted);
    assert_eq!(first.risk_band, second.risk_band);
    assert_eq!(first.estimated_minutes, second.estimated_minutes);
    assert_eq!(first.reasons, second.reasons);
}

/// Ingested envelopes flow through a plan request end to end.
#[tokio::test]
async fn ingested_envelopes_feed_a_plan() {
    init_tracing();
    let envelopes = vec![
        SignalEnvelope {
            tenant: "acme".to_string(),
            run_id: "run-e2e".to_string(),
            source: "probe".to_string(),
            signal_id: Some("ingested-1".to_string()),
            severity: Some(0.9),
            confidence: Some(0.8),
            observed_at: Some("2026-03-01T09:55:00Z".to_string()),
            command_id: None,
            payload: None,
        },
        // Sparse envelope: everything defaults.
        SignalEnvelope {
            tenant: "acme".to_string(),
            run_id: "run-e2e".to_string(),
            ..Default::default()
        },
    ];

    let signals = ingest_signals(envelopes).await;
    assert_eq!(signals.len(), 2);

    let mut request = make_request(vec![make_wave(
        "wave-a",
        WaveState::Warming,
        (10, 0),
        (10, 30),
        1,
        signals.clone(),
    )]);
    request.signals = signals;

    let coordinator = FusionCoordinator::new(EngineConfig::default());
    let result = coordinator.coordinate_fusion_bundle(request).await.unwrap();
    assert!(result.accepted);
}

/// Decision artifacts and bundles survive the storage envelope.
#[tokio::test]
async fn decision_and_bundle_round_trip_storage() {
    init_tracing();
    let request = make_request(vec![make_wave(
        "wave-a",
        WaveState::Running,
        (10, 0),
        (11, 0),
        1,
        vec![make_signal("sig-a", 0.6, 0.9)],
    )]);

    let coordinator = FusionCoordinator::new(EngineConfig::default());
    let bundle = coordinator.build_bundle(&request);
    let stored = encode_bundle(&bundle).unwrap();
    let restored = decode_stored_bundle(&stored).unwrap();
    assert_eq!(restored.id, bundle.id);
    assert_eq!(restored.waves.len(), 1);

    let result = coordinator.coordinate_fusion_bundle(request).await.unwrap();
    let encoded = encode_result(&result).unwrap();
    assert!(encoded.contains("\"accepted\":true"));
}
