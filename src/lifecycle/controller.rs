//! The scan attempt state machine.

use super::observer::ScanObserver;
use super::state::{ManualEntryError, ScanFailure, ScanState};
use crate::capture::{
    CameraAcquisitionError, CameraBackend, CameraSessionManager, CaptureConstraint, ScanConfig,
    ScannerConfig,
};
use crate::decode::{Decoder, RawDecodeResult};
use crate::metrics::{AttemptOutcome, ScanMetrics};
use crate::scan::{CancelToken, FrameScanLoop, Tick, TickSource};
use crate::validation::{CodeValidator, ValidatedCode};
use chrono::{DateTime, Utc};
use std::ops::ControlFlow;

/// How an attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Resolved(ValidatedCode),
    Failed(ScanFailure),
    Cancelled,
}

/// Per-attempt state, dropped when the attempt reaches a terminal state.
#[derive(Debug)]
struct ScanAttempt {
    id: u64,
    started_at: DateTime<Utc>,
    scan_loop: FrameScanLoop,
}

/// Coordinates decoder start-up, camera acquisition, the frame scan loop
/// and validation for one attempt at a time.
///
/// The controller is the only writer of the scan state. Every terminal
/// transition releases the camera through the session manager's
/// idempotent release before observers are told.
pub struct LifecycleController<B: CameraBackend, D: Decoder, O: ScanObserver> {
    cameras: CameraSessionManager<B>,
    decoder: D,
    validator: CodeValidator,
    observer: O,
    constraints: Vec<CaptureConstraint>,
    scan_config: ScanConfig,
    metrics: Option<ScanMetrics>,
    state: ScanState,
    attempt: Option<ScanAttempt>,
    outcome: Option<ScanOutcome>,
    attempts_started: u64,
}

impl<B: CameraBackend, D: Decoder, O: ScanObserver> LifecycleController<B, D, O> {
    pub fn new(backend: B, decoder: D, observer: O, config: &ScannerConfig) -> Self {
        Self {
            cameras: CameraSessionManager::from_config(backend, &config.capture),
            decoder,
            validator: CodeValidator::new(&config.validation),
            observer,
            constraints: config.capture.constraints.clone(),
            scan_config: config.scan.clone(),
            metrics: None,
            state: ScanState::Idle,
            attempt: None,
            outcome: None,
            attempts_started: 0,
        }
    }

    pub fn with_metrics(mut self, metrics: ScanMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Identifier of the attempt in progress.
    pub fn attempt_id(&self) -> Option<u64> {
        self.attempt.as_ref().map(|a| a.id)
    }

    /// How the most recent attempt ended.
    pub fn outcome(&self) -> Option<&ScanOutcome> {
        self.outcome.as_ref()
    }

    pub fn cameras(&self) -> &CameraSessionManager<B> {
        &self.cameras
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    /// Begins a new attempt: decoder start-up, then camera acquisition.
    ///
    /// Returns the resulting state, `Scanning` on success or `Failed`.
    /// Calling this while an attempt is underway changes nothing.
    pub fn start_scan(&mut self) -> ScanState {
        if self.state.is_active() {
            tracing::warn!(state = %self.state, "Scan already in progress");
            return self.state;
        }

        self.attempts_started += 1;
        self.attempt = Some(ScanAttempt {
            id: self.attempts_started,
            started_at: Utc::now(),
            scan_loop: FrameScanLoop::new(&self.scan_config),
        });
        self.outcome = None;
        self.state = ScanState::Idle;
        if let Some(metrics) = &self.metrics {
            metrics.attempt_started();
        }
        tracing::info!(attempt = self.attempts_started, "Scan attempt started");

        self.transition(ScanState::Initializing);
        if let Err(err) = self.decoder.init() {
            self.fail(err.into());
            return self.state;
        }

        self.transition(ScanState::Acquiring);
        let acquired = self
            .cameras
            .acquire(&self.constraints)
            .map(|session| session.constraint_index());
        match acquired {
            Ok(index) => {
                if let Some(metrics) = &self.metrics {
                    metrics.camera_acquired(index);
                }
                self.transition(ScanState::Scanning);
            }
            Err(err) => self.fail(err.into()),
        }
        self.state
    }

    /// Processes one tick of the frame scan loop.
    ///
    /// For hosts that own the tick source. Does nothing unless scanning.
    pub fn tick(&mut self) -> ScanState {
        if self.state != ScanState::Scanning {
            return self.state;
        }

        let tick = match (self.cameras.session_mut(), self.attempt.as_mut()) {
            (Some(session), Some(attempt)) => {
                let validator = &self.validator;
                let metrics = self.metrics.as_ref();
                attempt
                    .scan_loop
                    .tick(session, &mut self.decoder, || false, |raw| {
                        screen(validator, metrics, raw)
                    })
            }
            _ => Tick::Inactive,
        };

        match tick {
            Tick::Break(code) => self.succeed(code),
            Tick::Inactive => self.fail(stream_lost()),
            _ => {}
        }
        self.state
    }

    /// Drives the frame scan loop until the attempt ends.
    ///
    /// `cancel` is polled once per tick; when set, the attempt ends in
    /// `Cancelled`. Returns `None` if no attempt was ever started.
    pub fn run(&mut self, ticks: &mut dyn TickSource, cancel: &CancelToken) -> Option<ScanOutcome> {
        if self.state == ScanState::Scanning {
            let found = match (self.cameras.session_mut(), self.attempt.as_mut()) {
                (Some(session), Some(attempt)) => {
                    let validator = &self.validator;
                    let metrics = self.metrics.as_ref();
                    attempt.scan_loop.run(
                        session,
                        &mut self.decoder,
                        ticks,
                        || cancel.is_cancelled(),
                        |raw| screen(validator, metrics, raw),
                    )
                }
                _ => None,
            };

            match found {
                Some(code) => self.succeed(code),
                None if cancel.is_cancelled() => {
                    self.cancel_scan();
                }
                None => self.fail(stream_lost()),
            }
        }
        self.outcome.clone()
    }

    /// Abandons the attempt in progress.
    pub fn cancel_scan(&mut self) -> ScanState {
        if !self.state.is_active() {
            tracing::debug!(state = %self.state, "Nothing to cancel");
            return self.state;
        }

        self.release_camera();
        self.transition(ScanState::Cancelled);
        self.observer.on_cancelled();
        self.finish(ScanOutcome::Cancelled);
        self.state
    }

    /// Resolves the attempt from a typed code instead of the camera.
    ///
    /// Rejected input leaves the state untouched. After a failed attempt
    /// a valid code is returned without further callbacks, since the
    /// attempt has already reported its outcome.
    pub fn submit_manual_code(&mut self, text: &str) -> Result<ValidatedCode, ManualEntryError> {
        match self.state {
            ScanState::Idle => return Err(ManualEntryError::NotStarted),
            ScanState::Succeeded | ScanState::Cancelled => {
                return Err(ManualEntryError::AttemptClosed(self.state))
            }
            _ => {}
        }

        let code = self.validator.validate(text);
        if !code.valid {
            if let Some(metrics) = &self.metrics {
                metrics.manual_rejected();
            }
            return Err(ManualEntryError::Rejected {
                reason: code.reason.clone().unwrap_or_default(),
                code: code.code,
            });
        }

        tracing::info!(code = %code.code, "Manual code accepted");
        if self.state.is_active() {
            self.succeed(code.clone());
        }
        Ok(code)
    }

    fn succeed(&mut self, code: ValidatedCode) {
        self.release_camera();
        self.transition(ScanState::Succeeded);
        self.observer.on_resolved(&code);
        self.finish(ScanOutcome::Resolved(code));
    }

    fn fail(&mut self, failure: ScanFailure) {
        // Acquisition may have left a partial session behind.
        self.release_camera();
        self.transition(ScanState::Failed);
        self.observer.on_failed(&failure);
        self.finish(ScanOutcome::Failed(failure));
    }

    fn release_camera(&mut self) {
        self.cameras.release();
        if let Some(metrics) = &self.metrics {
            metrics.camera_released();
        }
    }

    fn finish(&mut self, outcome: ScanOutcome) {
        if let Some(attempt) = self.attempt.take() {
            let stats = attempt.scan_loop.stats();
            if let Some(metrics) = &self.metrics {
                metrics.record_loop(&stats);
                metrics.attempt_finished(match outcome {
                    ScanOutcome::Resolved(_) => AttemptOutcome::Succeeded,
                    ScanOutcome::Failed(_) => AttemptOutcome::Failed,
                    ScanOutcome::Cancelled => AttemptOutcome::Cancelled,
                });
            }
            let elapsed_ms = (Utc::now() - attempt.started_at).num_milliseconds();
            tracing::info!(
                attempt = attempt.id,
                state = %self.state,
                frames = stats.frames_decoded,
                elapsed_ms,
                "Scan attempt finished"
            );
        }
        self.outcome = Some(outcome);
    }

    fn transition(&mut self, next: ScanState) {
        let from = self.state;
        debug_assert!(
            from.can_transition_to(next),
            "illegal scan transition {from} -> {next}"
        );
        self.state = next;
        tracing::debug!(%from, to = %next, "Scan state transition");
        self.observer.on_state_change(from, next);
    }
}

fn stream_lost() -> ScanFailure {
    CameraAcquisitionError::Unknown("camera stream ended during scanning".into()).into()
}

/// Validates a decoded symbol; a valid code stops the loop.
fn screen(
    validator: &CodeValidator,
    metrics: Option<&ScanMetrics>,
    raw: RawDecodeResult,
) -> ControlFlow<ValidatedCode> {
    let RawDecodeResult::Found(symbol) = raw else {
        return ControlFlow::Continue(());
    };

    let code = validator.validate(&symbol.text);
    if code.valid {
        return ControlFlow::Break(code);
    }

    tracing::debug!(
        text = %symbol.text,
        format = ?symbol.format,
        reason = code.reason.as_deref().unwrap_or_default(),
        "Candidate rejected"
    );
    if let Some(metrics) = metrics {
        metrics.candidate_rejected();
    }
    ControlFlow::Continue(())
}
