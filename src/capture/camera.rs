//! Camera abstraction for stream acquisition and frame sampling.
//!
//! This module provides a trait-based abstraction over camera hardware,
//! allowing for both real camera input and mock implementations for testing.

use super::{CaptureConstraint, Frame};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

/// Reasons a camera stream could not be acquired.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraAcquisitionError {
    #[error("camera permission denied: {0}")]
    PermissionDenied(String),
    #[error("no camera device found")]
    DeviceNotFound,
    #[error("capture constraint unsupported: {0}")]
    ConstraintUnsupported(String),
    #[error("camera acquisition timed out after {0:?}")]
    TimedOut(Duration),
    #[error("camera error: {0}")]
    Unknown(String),
}

impl CameraAcquisitionError {
    /// A suggestion the user can act on.
    pub fn remediation(&self) -> &'static str {
        match self {
            CameraAcquisitionError::PermissionDenied(_) => {
                "Allow camera access for this application in the system privacy settings, then start a new scan."
            }
            CameraAcquisitionError::DeviceNotFound => {
                "Connect a camera or check that it is enabled, then start a new scan."
            }
            CameraAcquisitionError::ConstraintUnsupported(_) => {
                "The camera rejected every capture mode; try another device or relax the configured resolutions."
            }
            CameraAcquisitionError::TimedOut(_) => {
                "The camera did not respond in time; close other applications using it and retry."
            }
            CameraAcquisitionError::Unknown(_) => {
                "Check that no other application is using the camera and that the page is served over HTTPS or localhost."
            }
        }
    }
}

/// Errors raised while sampling frames from an open stream.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("camera stream is not active")]
    NotActive,
    #[error("failed to capture frame: {0}")]
    CaptureFailed(String),
}

/// A physical camera as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Stable platform identifier.
    pub id: String,
    /// Human readable label; may be empty until permission is granted.
    pub label: String,
}

impl DeviceInfo {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// Platform camera access.
///
/// Implementations open hardware streams; ownership of the returned
/// stream passes to the camera session manager.
pub trait CameraBackend {
    /// Lists the cameras currently attached.
    fn enumerate(&mut self) -> Result<Vec<DeviceInfo>, CameraAcquisitionError>;

    /// Opens a stream on `device` honoring `constraint`.
    fn open(
        &mut self,
        device: &DeviceInfo,
        constraint: &CaptureConstraint,
    ) -> Result<Box<dyn VideoStream>, CameraAcquisitionError>;
}

/// A live hardware stream.
pub trait VideoStream {
    /// Resolution actually delivered by the device.
    fn resolution(&self) -> (u32, u32);

    /// Returns false while the hardware is still warming up.
    fn frame_ready(&mut self) -> bool;

    /// Samples the current frame.
    fn grab(&mut self) -> Result<Frame, FrameError>;

    /// Stops every underlying track.
    fn stop(&mut self);
}

/// Mock camera backend for testing that generates synthetic frames.
///
/// Open attempts consume scripted results in order; once the script is
/// exhausted a constraint is accepted when the device label does not
/// contradict its facing and its bounds admit the mock resolution.
#[derive(Debug)]
pub struct MockBackend {
    devices: Vec<DeviceInfo>,
    enumerate_error: Option<CameraAcquisitionError>,
    open_results: VecDeque<Result<(), CameraAcquisitionError>>,
    open_delay: Duration,
    resolution: (u32, u32),
    warmup_ticks: u32,
    probe: MockProbe,
}

/// Shared view into what a [`MockBackend`] has been asked to do.
#[derive(Debug, Clone, Default)]
pub struct MockProbe {
    attempts: Arc<Mutex<Vec<CaptureConstraint>>>,
    stop_calls: Arc<AtomicUsize>,
}

impl MockProbe {
    /// Constraints passed to `open`, in call order.
    pub fn attempts(&self) -> Vec<CaptureConstraint> {
        self.attempts
            .lock()
            .map(|a| a.clone())
            .unwrap_or_default()
    }

    /// Number of times any stream's `stop` has been called.
    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// A backend with a single rear camera delivering 640x480.
    pub fn new() -> Self {
        Self {
            devices: vec![DeviceInfo::new("mock-0", "Mock Back Camera")],
            enumerate_error: None,
            open_results: VecDeque::new(),
            open_delay: Duration::ZERO,
            resolution: (640, 480),
            warmup_ticks: 0,
            probe: MockProbe::default(),
        }
    }

    pub fn with_devices(mut self, devices: Vec<DeviceInfo>) -> Self {
        self.devices = devices;
        self
    }

    /// Makes device enumeration fail.
    pub fn failing_enumeration(mut self, error: CameraAcquisitionError) -> Self {
        self.enumerate_error = Some(error);
        self
    }

    /// Scripts the outcome of successive `open` calls.
    pub fn with_open_results(
        mut self,
        results: impl IntoIterator<Item = Result<(), CameraAcquisitionError>>,
    ) -> Self {
        self.open_results = results.into_iter().collect();
        self
    }

    /// Makes each `open` call block for `delay`.
    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = delay;
        self
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.resolution = (width, height);
        self
    }

    /// Number of ticks a fresh stream reports no frame.
    pub fn with_warmup(mut self, ticks: u32) -> Self {
        self.warmup_ticks = ticks;
        self
    }

    pub fn probe(&self) -> MockProbe {
        self.probe.clone()
    }
}

impl CameraBackend for MockBackend {
    fn enumerate(&mut self) -> Result<Vec<DeviceInfo>, CameraAcquisitionError> {
        match &self.enumerate_error {
            Some(err) => Err(err.clone()),
            None => Ok(self.devices.clone()),
        }
    }

    fn open(
        &mut self,
        device: &DeviceInfo,
        constraint: &CaptureConstraint,
    ) -> Result<Box<dyn VideoStream>, CameraAcquisitionError> {
        if let Ok(mut attempts) = self.probe.attempts.lock() {
            attempts.push(constraint.clone());
        }
        if !self.open_delay.is_zero() {
            std::thread::sleep(self.open_delay);
        }

        let (width, height) = self.resolution;
        match self.open_results.pop_front() {
            Some(Err(err)) => return Err(err),
            Some(Ok(())) => {}
            None if !constraint.accepts_facing(&device.label) => {
                return Err(CameraAcquisitionError::ConstraintUnsupported(format!(
                    "{} ({}) does not face {:?}",
                    device.id, device.label, constraint.facing
                )));
            }
            None if !constraint.accepts_resolution(width, height) => {
                return Err(CameraAcquisitionError::ConstraintUnsupported(format!(
                    "{} cannot deliver {}x{} within the requested bounds",
                    device.id, width, height
                )));
            }
            None => {}
        }

        tracing::info!(device = %device.id, width, height, "MockBackend opened stream");
        Ok(Box::new(MockStream {
            width,
            height,
            warmup_remaining: self.warmup_ticks,
            sequence: 0,
            stopped: false,
            stop_calls: Arc::clone(&self.probe.stop_calls),
        }))
    }
}

struct MockStream {
    width: u32,
    height: u32,
    warmup_remaining: u32,
    sequence: u64,
    stopped: bool,
    stop_calls: Arc<AtomicUsize>,
}

impl VideoStream for MockStream {
    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn frame_ready(&mut self) -> bool {
        if self.stopped {
            return false;
        }
        if self.warmup_remaining > 0 {
            self.warmup_remaining -= 1;
            return false;
        }
        true
    }

    fn grab(&mut self) -> Result<Frame, FrameError> {
        if self.stopped {
            return Err(FrameError::NotActive);
        }

        // Deterministic pattern mixed with sequence, only for exercising frame handling
        let pixel_count = (self.width * self.height) as usize;
        let pixels: Vec<u8> = (0..pixel_count)
            .map(|i| ((i as u64 ^ self.sequence) % 256) as u8)
            .collect();

        self.sequence += 1;
        Ok(Frame::new(pixels, self.width, self.height, self.sequence))
    }

    fn stop(&mut self) {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.stopped = true;
        tracing::info!("MockStream stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::FacingMode;

    #[test]
    fn test_mock_stream_lifecycle() {
        let mut backend = MockBackend::new().with_warmup(1);
        let probe = backend.probe();
        let device = backend.enumerate().unwrap().remove(0);

        let mut stream = backend
            .open(&device, &CaptureConstraint::facing(FacingMode::Any))
            .unwrap();

        assert!(!stream.frame_ready());
        assert!(stream.frame_ready());

        let frame = stream.grab().unwrap();
        assert!(frame.is_valid());
        assert_eq!(frame.sequence(), 1);

        let frame2 = stream.grab().unwrap();
        assert_eq!(frame2.sequence(), 2);

        stream.stop();
        assert_eq!(probe.stop_calls(), 1);
        assert!(matches!(stream.grab(), Err(FrameError::NotActive)));
    }

    #[test]
    fn test_open_consumes_script_in_order() {
        let mut backend = MockBackend::new().with_open_results([
            Err(CameraAcquisitionError::PermissionDenied("prompt dismissed".into())),
            Ok(()),
        ]);
        let device = DeviceInfo::new("mock-0", "");
        let constraint = CaptureConstraint::facing(FacingMode::Any);

        assert!(matches!(
            backend.open(&device, &constraint),
            Err(CameraAcquisitionError::PermissionDenied(_))
        ));
        assert!(backend.open(&device, &constraint).is_ok());
        assert_eq!(backend.probe().attempts().len(), 2);
    }

    #[test]
    fn test_unscripted_open_checks_resolution() {
        let mut backend = MockBackend::new().with_resolution(160, 120);
        let device = DeviceInfo::new("mock-0", "");
        let strict = CaptureConstraint::default_fallbacks().remove(0);

        assert!(matches!(
            backend.open(&device, &strict),
            Err(CameraAcquisitionError::ConstraintUnsupported(_))
        ));
    }

    #[test]
    fn test_unscripted_open_checks_facing() {
        let mut backend = MockBackend::new();
        let rear = DeviceInfo::new("mock-0", "Mock Back Camera");

        assert!(matches!(
            backend.open(&rear, &CaptureConstraint::facing(FacingMode::User)),
            Err(CameraAcquisitionError::ConstraintUnsupported(_))
        ));
        assert!(backend
            .open(&rear, &CaptureConstraint::facing(FacingMode::Environment))
            .is_ok());
        assert!(backend
            .open(&DeviceInfo::new("mock-1", "Front Camera"), &CaptureConstraint::facing(FacingMode::User))
            .is_ok());
    }

    #[test]
    fn test_every_error_has_remediation() {
        let errors = [
            CameraAcquisitionError::PermissionDenied(String::new()),
            CameraAcquisitionError::DeviceNotFound,
            CameraAcquisitionError::ConstraintUnsupported(String::new()),
            CameraAcquisitionError::TimedOut(Duration::from_secs(1)),
            CameraAcquisitionError::Unknown(String::new()),
        ];
        assert!(errors.iter().all(|e| !e.remediation().is_empty()));
    }
}
