//! Fusion wave scheduling and risk evaluation core.
//!
//! Given a bundle of waves (time-boxed batches of remediation commands)
//! and observed signals, the engine ranks waves by operational priority,
//! infers scheduling conflicts and dependencies, estimates readiness
//! against SLO targets, and produces a go/no-go decision with supporting
//! diagnostics.
//!
//! The algorithmic core is single-threaded, synchronous, and pure: every
//! scoring, clustering, and graph function computes over immutable
//! inputs. Only the edges are async — signal ingestion and the
//! coordinator — and only to compose with upstream I/O. There is no
//! retry, no timeout enforcement, and no shared mutable state; callers
//! cancel by discarding the result.

pub mod catalog;
pub mod coordination;
pub mod coordinator;
pub mod evaluate;
pub mod ingest;
pub mod priority;
pub mod readiness;
pub mod risk;
pub mod schedule;
pub mod sink;
pub mod topology;

pub use catalog::{build_command_catalog, CatalogEntry, CommandCatalog};
pub use coordination::{
    build_coordination, CoordinationWindow, DependencyPlan, WaveDependency, WaveWindow,
};
pub use coordinator::FusionCoordinator;
pub use evaluate::{evaluate_bundle, evaluate_wave, BundleEvaluation, FusionEvaluation};
pub use ingest::ingest_signals;
pub use priority::{
    band_for, build_wave_entry, rank_waves, PriorityBand, SignalScore, WavePriorityEntry,
};
pub use readiness::{
    build_readiness_profile, evaluate_slo, ReadinessProfile, SloVerdict, WaveReadiness,
};
pub use risk::{calculate_risk_vector, RiskVector};
pub use schedule::{reschedule_window, schedule_bundle, FusionSchedule, ScheduleWindow};
pub use sink::{DecisionSink, NullSink};
pub use topology::{analyze, dependency_order, derive_topology, normalize, TopologyInsights};
