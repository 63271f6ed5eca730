//! Scan attempt states and failures.

use crate::capture::CameraAcquisitionError;
use crate::decode::DecoderInitError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Where a scan attempt currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanState {
    Idle,
    Initializing,
    Acquiring,
    Scanning,
    Succeeded,
    Failed,
    Cancelled,
}

impl ScanState {
    /// No further frames or callbacks once here.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ScanState::Succeeded | ScanState::Failed | ScanState::Cancelled
        )
    }

    /// An attempt is underway.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            ScanState::Initializing | ScanState::Acquiring | ScanState::Scanning
        )
    }

    /// Whether the state machine permits moving from `self` to `next`.
    pub fn can_transition_to(self, next: ScanState) -> bool {
        use ScanState::*;
        match (self, next) {
            (Idle, Initializing) => true,
            (Initializing, Acquiring) => true,
            (Acquiring, Scanning) => true,
            (Scanning, Scanning) => true,
            (Initializing | Acquiring, Failed) => true,
            // The stream died under a running scan.
            (Scanning, Failed) => true,
            // Manual entry may resolve an attempt before the camera is up.
            (Initializing | Acquiring | Scanning, Succeeded | Cancelled) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScanState::Idle => "idle",
            ScanState::Initializing => "initializing",
            ScanState::Acquiring => "acquiring",
            ScanState::Scanning => "scanning",
            ScanState::Succeeded => "succeeded",
            ScanState::Failed => "failed",
            ScanState::Cancelled => "cancelled",
        })
    }
}

/// Why an attempt ended in [`ScanState::Failed`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanFailure {
    #[error(transparent)]
    Acquisition(#[from] CameraAcquisitionError),
    #[error(transparent)]
    DecoderInit(#[from] DecoderInitError),
}

impl ScanFailure {
    /// Guidance shown next to the failure.
    pub fn remediation(&self) -> &'static str {
        match self {
            ScanFailure::Acquisition(err) => err.remediation(),
            ScanFailure::DecoderInit(_) => {
                "The barcode reader could not start; restart the scanner or type the code by hand."
            }
        }
    }

    /// Typing the code is always offered after a failure.
    pub fn manual_entry_available(&self) -> bool {
        true
    }
}

/// A manually typed code was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManualEntryError {
    #[error("code '{code}' rejected: {reason}")]
    Rejected { code: String, reason: String },
    #[error("no scan attempt has been started")]
    NotStarted,
    #[error("scan attempt already {0}")]
    AttemptClosed(ScanState),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let path = [
            ScanState::Idle,
            ScanState::Initializing,
            ScanState::Acquiring,
            ScanState::Scanning,
            ScanState::Succeeded,
        ];
        assert!(path.windows(2).all(|w| w[0].can_transition_to(w[1])));
    }

    #[test]
    fn test_terminal_states_are_final() {
        for terminal in [ScanState::Succeeded, ScanState::Failed, ScanState::Cancelled] {
            assert!(terminal.is_terminal());
            assert!(!terminal.can_transition_to(ScanState::Scanning));
            assert!(!terminal.can_transition_to(ScanState::Initializing));
        }
    }

    #[test]
    fn test_idle_must_initialize_first() {
        assert!(!ScanState::Idle.can_transition_to(ScanState::Scanning));
        assert!(!ScanState::Idle.can_transition_to(ScanState::Succeeded));
    }

    #[test]
    fn test_failure_offers_remediation() {
        let failure: ScanFailure =
            CameraAcquisitionError::PermissionDenied("denied".into()).into();
        assert!(failure.remediation().contains("camera access"));
        assert!(failure.manual_entry_available());

        let failure: ScanFailure = DecoderInitError::new("wasm", "load failed").into();
        assert!(failure.to_string().contains("load failed"));
    }
}
