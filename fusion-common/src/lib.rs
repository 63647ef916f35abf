//! Shared types and configuration for the Fusion wave scheduling engine.
//!
//! This crate holds the data model (signals, commands, waves, bundles,
//! topologies), the engine configuration, the error taxonomy, the raw
//! ingestion envelope, and the JSON storage codec. It contains no
//! algorithms: scoring, scheduling, and evaluation live in
//! `fusion-engine`.

pub mod codec;
pub mod config;
pub mod envelope;
pub mod errors;
pub mod types;

pub use config::{
    CoordinationConfig, EngineConfig, EvaluationConfig, PriorityConfig, ScheduleConfig, SloTargets,
};
pub use envelope::SignalEnvelope;
pub use errors::FusionError;
pub use types::{
    clamp_unit, CommandAction, FusionBudget, FusionBundle, FusionBundleId, FusionCommand,
    FusionCommandId, FusionPlanId, FusionPlanRequest, FusionPlanResult, FusionRunId,
    FusionRunState, FusionSignal, FusionSignalId, FusionTopology, FusionWave, FusionWaveId,
    RiskBand, TopologyEdge, TopologyNode, WaveState,
};
