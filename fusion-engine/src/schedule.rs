//! Schedule engine: window construction, ranking, and rescheduling.
//!
//! Converts healthy waves into non-degenerate time windows and ranks the
//! bundle via the priority matrix. Producing zero healthy windows is the
//! pipeline's primary hard failure — an unschedulable bundle never
//! becomes an empty success.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use fusion_common::config::ScheduleConfig;
use fusion_common::errors::FusionError;
use fusion_common::types::{FusionBundle, FusionBundleId, FusionWave, FusionWaveId};

use crate::priority::WavePriorityEntry;

/// One scheduled execution window.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleWindow {
    pub wave_id: FusionWaveId,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    /// Whether a degenerate window was padded rather than rejected.
    pub padded: bool,
}

impl ScheduleWindow {
    /// Window length in whole minutes.
    pub fn minutes(&self) -> i64 {
        (self.ends_at - self.starts_at).num_minutes()
    }
}

/// Scheduling outcome for one bundle evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct FusionSchedule {
    pub bundle_id: FusionBundleId,
    pub windows: Vec<ScheduleWindow>,
    /// Top-ranked waves from the priority matrix.
    pub critical_wave_ids: Vec<FusionWaveId>,
    /// Signals per scheduled window (0 when nothing scheduled).
    pub command_density: f64,
}

impl FusionSchedule {
    /// Total scheduled minutes across all windows.
    pub fn total_minutes(&self) -> i64 {
        self.windows.iter().map(ScheduleWindow::minutes).sum()
    }
}

/// Whether a wave qualifies for scheduling.
fn is_healthy(wave: &FusionWave, config: &ScheduleConfig) -> bool {
    wave.has_commands() && wave.readiness_signals.len() <= config.max_signals_per_wave
}

/// Convert a wave into a window, padding degenerate ones.
fn to_window(wave: &FusionWave, config: &ScheduleConfig) -> ScheduleWindow {
    if wave.has_degenerate_window() {
        warn!(wave = %wave.id, "degenerate window, padding");
        return ScheduleWindow {
            wave_id: wave.id.clone(),
            starts_at: wave.window_start,
            ends_at: wave.window_start + Duration::minutes(config.degenerate_pad_minutes),
            padded: true,
        };
    }
    ScheduleWindow {
        wave_id: wave.id.clone(),
        starts_at: wave.window_start,
        ends_at: wave.window_end,
        padded: false,
    }
}

/// Schedule a bundle.
///
/// Fails with [`FusionError::BundleNotSchedulable`] when no healthy
/// window remains after filtering.
pub fn schedule_bundle(
    bundle: &FusionBundle,
    ranking: &[WavePriorityEntry],
    config: &ScheduleConfig,
) -> Result<FusionSchedule, FusionError> {
    let windows: Vec<ScheduleWindow> = bundle
        .waves
        .iter()
        .filter(|wave| is_healthy(wave, config))
        .map(|wave| to_window(wave, config))
        .collect();

    if windows.is_empty() {
        return Err(FusionError::BundleNotSchedulable);
    }

    let critical_wave_ids: Vec<FusionWaveId> = ranking
        .iter()
        .take(config.critical_rank_count)
        .map(|entry| entry.wave_id.clone())
        .collect();

    let total_signals = bundle.signals.len() + bundle.wave_signal_count();
    let command_density = total_signals as f64 / windows.len() as f64;

    debug!(
        bundle = %bundle.id,
        windows = windows.len(),
        command_density,
        "bundle scheduled"
    );

    Ok(FusionSchedule {
        bundle_id: bundle.id.clone(),
        windows,
        critical_wave_ids,
        command_density,
    })
}

/// Shift one window by the configured fixed offsets.
///
/// The start moves forward by the reschedule shift; the end lands a fixed
/// offset after the new start. Fails with
/// [`FusionError::WindowNotFound`] when the wave has no window.
pub fn reschedule_window(
    schedule: &FusionSchedule,
    wave_id: &FusionWaveId,
    config: &ScheduleConfig,
) -> Result<FusionSchedule, FusionError> {
    let mut updated = schedule.clone();
    let window = updated
        .windows
        .iter_mut()
        .find(|w| &w.wave_id == wave_id)
        .ok_or_else(|| FusionError::WindowNotFound(wave_id.clone()))?;

    window.starts_at += Duration::minutes(config.reschedule_shift_minutes);
    window.ends_at = window.starts_at + Duration::minutes(config.reschedule_end_offset_minutes);

    debug!(wave = %wave_id, starts_at = %window.starts_at, "window rescheduled");
    Ok(updated)
}
