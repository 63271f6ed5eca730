//! Prometheus metrics for the scanning pipeline.
//!
//! # Metrics Exposed
//!
//! ## Attempts
//! - `scanner_scan_attempts_total` - Scan attempts started
//! - `scanner_scans_succeeded_total` / `_failed_total` / `_cancelled_total` - Terminal outcomes
//! - `scanner_camera_active` - 1 while a camera session is held
//! - `scanner_constraint_fallbacks_total` - Capture constraints rejected before acquisition succeeded
//!
//! ## Frame loop
//! - `scanner_frames_decoded_total` - Frames handed to the decoder
//! - `scanner_frames_dropped_total` - Frame samples that failed
//! - `scanner_candidates_rejected_total` - Decoded text the validator rejected
//! - `scanner_candidates_throttled_total` - Decoded text discarded by the throttle
//! - `scanner_slow_decodes_total` - Decodes over the time budget
//! - `scanner_manual_entries_rejected_total` - Typed codes that failed validation
//!
//! With the `metrics` feature the registry can be served over HTTP.

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{encode_registry, AttemptOutcome, MetricsError, ScanMetrics};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, ServerError};
