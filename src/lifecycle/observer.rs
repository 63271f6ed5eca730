//! Observers for lifecycle events.

use super::{ScanFailure, ScanState};
use crate::validation::ValidatedCode;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::mpsc;

/// Receives lifecycle notifications from the controller.
///
/// Each attempt produces any number of state changes followed by
/// exactly one terminal callback.
pub trait ScanObserver {
    fn on_state_change(&mut self, _from: ScanState, _to: ScanState) {}

    fn on_resolved(&mut self, code: &ValidatedCode);

    fn on_failed(&mut self, failure: &ScanFailure);

    fn on_cancelled(&mut self);
}

/// Logs every notification.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl ScanObserver for TracingObserver {
    fn on_state_change(&mut self, from: ScanState, to: ScanState) {
        tracing::debug!(%from, %to, "Scan state changed");
    }

    fn on_resolved(&mut self, code: &ValidatedCode) {
        let format = code.format.map(|f| f.to_string()).unwrap_or_default();
        tracing::info!(code = %code.code, %format, "Barcode resolved");
    }

    fn on_failed(&mut self, failure: &ScanFailure) {
        tracing::warn!(
            error = %failure,
            remediation = failure.remediation(),
            "Scan failed; manual entry remains available"
        );
    }

    fn on_cancelled(&mut self) {
        tracing::info!("Scan cancelled");
    }
}

/// A notification as delivered to UI layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScanEvent {
    StateChanged {
        from: ScanState,
        to: ScanState,
        at: DateTime<Utc>,
    },
    Resolved {
        code: ValidatedCode,
    },
    Failed {
        reason: String,
        remediation: String,
    },
    Cancelled,
}

/// Forwards notifications over a channel.
///
/// Sends after the receiver is gone are dropped.
#[derive(Debug)]
pub struct ChannelObserver {
    tx: mpsc::Sender<ScanEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::Receiver<ScanEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: ScanEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("Scan event receiver dropped");
        }
    }
}

impl ScanObserver for ChannelObserver {
    fn on_state_change(&mut self, from: ScanState, to: ScanState) {
        self.send(ScanEvent::StateChanged {
            from,
            to,
            at: Utc::now(),
        });
    }

    fn on_resolved(&mut self, code: &ValidatedCode) {
        self.send(ScanEvent::Resolved { code: code.clone() });
    }

    fn on_failed(&mut self, failure: &ScanFailure) {
        self.send(ScanEvent::Failed {
            reason: failure.to_string(),
            remediation: failure.remediation().to_string(),
        });
    }

    fn on_cancelled(&mut self) {
        self.send(ScanEvent::Cancelled);
    }
}
