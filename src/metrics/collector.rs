//! Metrics collection and registry.

use crate::scan::LoopStats;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// How a scan attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Succeeded,
    Failed,
    Cancelled,
}

/// Prometheus counters for the acquisition pipeline.
///
/// Counters are shared handles; clones of this struct update the same
/// registry.
#[derive(Clone)]
pub struct ScanMetrics {
    registry: Registry,

    // Attempt lifecycle
    scan_attempts: IntCounter,
    scans_succeeded: IntCounter,
    scans_failed: IntCounter,
    scans_cancelled: IntCounter,
    camera_active: IntGauge,
    constraint_fallbacks: IntCounter,

    // Frame loop
    frames_decoded: IntCounter,
    frames_dropped: IntCounter,
    candidates_rejected: IntCounter,
    candidates_throttled: IntCounter,
    slow_decodes: IntCounter,

    manual_rejected: IntCounter,
}

fn counter(registry: &Registry, name: &str, help: &str) -> Result<IntCounter, MetricsError> {
    let counter = IntCounter::new(name, help)?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

impl ScanMetrics {
    /// Creates a registry with all scanner metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let camera_active = IntGauge::new(
            "scanner_camera_active",
            "Whether a camera session is currently held (1=active, 0=released)",
        )?;
        registry.register(Box::new(camera_active.clone()))?;

        Ok(Self {
            scan_attempts: counter(&registry, "scanner_scan_attempts_total", "Scan attempts started")?,
            scans_succeeded: counter(
                &registry,
                "scanner_scans_succeeded_total",
                "Scan attempts that resolved a code",
            )?,
            scans_failed: counter(
                &registry,
                "scanner_scans_failed_total",
                "Scan attempts ending in an acquisition or decoder failure",
            )?,
            scans_cancelled: counter(
                &registry,
                "scanner_scans_cancelled_total",
                "Scan attempts abandoned by the user",
            )?,
            constraint_fallbacks: counter(
                &registry,
                "scanner_constraint_fallbacks_total",
                "Capture constraints rejected before one was accepted",
            )?,
            frames_decoded: counter(
                &registry,
                "scanner_frames_decoded_total",
                "Frames passed to the decoder",
            )?,
            frames_dropped: counter(
                &registry,
                "scanner_frames_dropped_total",
                "Frames that could not be sampled",
            )?,
            candidates_rejected: counter(
                &registry,
                "scanner_candidates_rejected_total",
                "Decoded symbols rejected by the code validator",
            )?,
            candidates_throttled: counter(
                &registry,
                "scanner_candidates_throttled_total",
                "Decoded symbols discarded inside the throttle window",
            )?,
            slow_decodes: counter(
                &registry,
                "scanner_slow_decodes_total",
                "Decode calls exceeding the configured time budget",
            )?,
            manual_rejected: counter(
                &registry,
                "scanner_manual_entries_rejected_total",
                "Manually typed codes that failed validation",
            )?,
            camera_active,
            registry,
        })
    }

    pub fn attempt_started(&self) {
        self.scan_attempts.inc();
    }

    /// Records a session acquired on the constraint at `index`.
    pub fn camera_acquired(&self, index: usize) {
        self.camera_active.set(1);
        self.constraint_fallbacks.inc_by(index as u64);
    }

    pub fn camera_released(&self) {
        self.camera_active.set(0);
    }

    pub fn candidate_rejected(&self) {
        self.candidates_rejected.inc();
    }

    pub fn manual_rejected(&self) {
        self.manual_rejected.inc();
    }

    /// Adds one finished attempt's loop counters.
    pub fn record_loop(&self, stats: &LoopStats) {
        self.frames_decoded.inc_by(stats.frames_decoded);
        self.frames_dropped.inc_by(stats.frames_dropped);
        self.candidates_throttled.inc_by(stats.throttled);
        self.slow_decodes.inc_by(stats.slow_decodes);
    }

    pub fn attempt_finished(&self, outcome: AttemptOutcome) {
        match outcome {
            AttemptOutcome::Succeeded => self.scans_succeeded.inc(),
            AttemptOutcome::Failed => self.scans_failed.inc(),
            AttemptOutcome::Cancelled => self.scans_cancelled.inc(),
        }
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        encode_registry(&self.registry)
    }
}

/// Renders a registry in the text exposition format.
pub fn encode_registry(registry: &Registry) -> Result<String, MetricsError> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

impl std::fmt::Debug for ScanMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanMetrics")
            .field("scan_attempts", &self.scan_attempts.get())
            .field("camera_active", &self.camera_active.get())
            .finish_non_exhaustive()
    }
}
