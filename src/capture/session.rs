//! Camera session ownership and constraint fallback.
//!
//! The manager is the only owner of a live hardware stream. It opens one
//! by walking an ordered constraint list and tears it down through a
//! single idempotent release routine, whichever exit path asks for it.

use super::camera::{CameraAcquisitionError, CameraBackend, DeviceInfo, FrameError, VideoStream};
use super::{CaptureConfig, CaptureConstraint, FacingMode, Frame};
use std::time::{Duration, Instant};

/// One live hardware stream bound to the constraint that opened it.
pub struct CameraSession {
    stream: Option<Box<dyn VideoStream>>,
    device: DeviceInfo,
    constraint: CaptureConstraint,
    constraint_index: usize,
    resolution: (u32, u32),
}

impl CameraSession {
    fn new(
        stream: Box<dyn VideoStream>,
        device: DeviceInfo,
        constraint: CaptureConstraint,
        constraint_index: usize,
    ) -> Self {
        let resolution = stream.resolution();
        Self {
            stream: Some(stream),
            device,
            constraint,
            constraint_index,
            resolution,
        }
    }

    /// Returns true until the session has been released.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }

    /// The constraint the platform accepted.
    pub fn constraint(&self) -> &CaptureConstraint {
        &self.constraint
    }

    /// Position of the accepted constraint in the requested list.
    pub fn constraint_index(&self) -> usize {
        self.constraint_index
    }

    pub fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    /// Returns true when a frame can be sampled. Always false once released.
    pub fn frame_ready(&mut self) -> bool {
        self.stream.as_mut().map_or(false, |s| s.frame_ready())
    }

    /// Samples one frame from the live stream.
    pub fn grab(&mut self) -> Result<Frame, FrameError> {
        self.stream.as_mut().ok_or(FrameError::NotActive)?.grab()
    }

    /// Stops the stream's tracks the first time it is called.
    pub(crate) fn release(&mut self) -> bool {
        match self.stream.take() {
            Some(mut stream) => {
                stream.stop();
                tracing::info!(device = %self.device.id, "Camera session released");
                true
            }
            None => false,
        }
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for CameraSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraSession")
            .field("device", &self.device.id)
            .field("constraint_index", &self.constraint_index)
            .field("resolution", &self.resolution)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Picks the device whose label suggests a rear-facing camera.
///
/// Falls back to the first enumerated device. Labels may be blank
/// before the permission grant completes, so this is best effort.
pub fn select_device<'a>(devices: &'a [DeviceInfo], keywords: &[String]) -> Option<&'a DeviceInfo> {
    devices
        .iter()
        .find(|device| {
            let label = device.label.to_lowercase();
            keywords.iter().any(|k| label.contains(&k.to_lowercase()))
        })
        .or_else(|| devices.first())
}

/// Picks the device to try a constraint on.
///
/// A front-facing request goes to a device labelled as front-facing when
/// there is one; everything else uses the rear-preferring heuristic.
fn device_for<'a>(
    devices: &'a [DeviceInfo],
    keywords: &[String],
    facing: FacingMode,
) -> Option<&'a DeviceInfo> {
    if facing == FacingMode::User {
        let front = devices
            .iter()
            .find(|device| FacingMode::from_label(&device.label) == Some(FacingMode::User));
        if front.is_some() {
            return front;
        }
    }
    select_device(devices, keywords)
}

/// Acquires and releases camera sessions.
pub struct CameraSessionManager<B: CameraBackend> {
    backend: B,
    preferred_labels: Vec<String>,
    timeout: Option<Duration>,
    session: Option<CameraSession>,
}

impl<B: CameraBackend> CameraSessionManager<B> {
    /// Creates a manager with the default label heuristic and no timeout.
    pub fn new(backend: B) -> Self {
        Self::from_config(backend, &CaptureConfig::default())
    }

    pub fn from_config(backend: B, config: &CaptureConfig) -> Self {
        Self {
            backend,
            preferred_labels: config.preferred_labels.clone(),
            timeout: config.acquisition_timeout(),
            session: None,
        }
    }

    /// Sets an acquisition deadline covering the whole constraint list.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Opens a stream using the first constraint the platform accepts.
    ///
    /// Any session still held is released first. On failure the error
    /// from the last attempted constraint is returned.
    pub fn acquire(
        &mut self,
        constraints: &[CaptureConstraint],
    ) -> Result<&CameraSession, CameraAcquisitionError> {
        self.release();

        if constraints.is_empty() {
            return Err(CameraAcquisitionError::ConstraintUnsupported(
                "no capture constraints supplied".into(),
            ));
        }

        let devices = self.backend.enumerate()?;
        if devices.is_empty() {
            return Err(CameraAcquisitionError::DeviceNotFound);
        }

        let started = Instant::now();
        let mut last_error = None;

        for (index, constraint) in constraints.iter().enumerate() {
            if let Some(limit) = self.timeout {
                if started.elapsed() >= limit {
                    tracing::warn!(constraint = index, "Acquisition deadline passed");
                    return Err(CameraAcquisitionError::TimedOut(limit));
                }
            }

            let device = device_for(&devices, &self.preferred_labels, constraint.facing)
                .cloned()
                .ok_or(CameraAcquisitionError::DeviceNotFound)?;
            tracing::debug!(
                device = %device.id,
                label = %device.label,
                constraint = index,
                candidates = devices.len(),
                "Selected camera device"
            );

            match self.backend.open(&device, constraint) {
                Ok(stream) => {
                    let mut session = CameraSession::new(stream, device, constraint.clone(), index);
                    if let Some(limit) = self.timeout {
                        if started.elapsed() > limit {
                            session.release();
                            return Err(CameraAcquisitionError::TimedOut(limit));
                        }
                    }
                    tracing::info!(
                        device = %session.device.id,
                        constraint = index,
                        width = session.resolution.0,
                        height = session.resolution.1,
                        "Camera session acquired"
                    );
                    return Ok(self.session.insert(session));
                }
                Err(err) => {
                    tracing::warn!(constraint = index, error = %err, "Capture constraint rejected");
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            CameraAcquisitionError::Unknown("constraint list exhausted".into())
        }))
    }

    /// Returns the live session, if any.
    pub fn session(&self) -> Option<&CameraSession> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut CameraSession> {
        self.session.as_mut()
    }

    pub fn is_active(&self) -> bool {
        self.session.as_ref().map_or(false, CameraSession::is_active)
    }

    /// Stops every track of the current session and forgets it.
    ///
    /// Safe to call any number of times, including before any
    /// acquisition has completed.
    pub fn release(&mut self) {
        match self.session.take() {
            Some(mut session) => {
                session.release();
            }
            None => tracing::trace!("Release requested with no live session"),
        }
    }
}

impl<B: CameraBackend> Drop for CameraSessionManager<B> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{DimensionRange, FacingMode, MockBackend};

    fn denied() -> CameraAcquisitionError {
        CameraAcquisitionError::PermissionDenied("user dismissed prompt".into())
    }

    fn constraint(ideal: u32) -> CaptureConstraint {
        CaptureConstraint::facing(FacingMode::Environment).with_resolution(
            DimensionRange::new(1, ideal, 4096),
            DimensionRange::new(1, ideal, 4096),
        )
    }

    #[test]
    fn test_fallback_stops_at_first_accepted() {
        let unsupported = CameraAcquisitionError::ConstraintUnsupported("no 4k".into());
        let backend = MockBackend::new().with_open_results([
            Err(unsupported.clone()),
            Err(unsupported),
            Ok(()),
        ]);
        let probe = backend.probe();
        let mut manager = CameraSessionManager::new(backend);
        let list = [constraint(1), constraint(2), constraint(3)];

        let session = manager.acquire(&list).unwrap();
        assert_eq!(session.constraint_index(), 2);
        assert_eq!(session.constraint(), &list[2]);
        assert_eq!(probe.attempts(), list.to_vec());
    }

    #[test]
    fn test_exhausted_list_reports_last_error() {
        let backend = MockBackend::new().with_open_results([
            Err(CameraAcquisitionError::ConstraintUnsupported("a".into())),
            Err(denied()),
        ]);
        let mut manager = CameraSessionManager::new(backend);

        let err = manager.acquire(&[constraint(1), constraint(2)]).unwrap_err();
        assert_eq!(err, denied());
        assert!(!manager.is_active());
    }

    #[test]
    fn test_no_devices() {
        let backend = MockBackend::new().with_devices(Vec::new());
        let mut manager = CameraSessionManager::new(backend);
        assert_eq!(
            manager.acquire(&[constraint(1)]).unwrap_err(),
            CameraAcquisitionError::DeviceNotFound
        );
    }

    #[test]
    fn test_release_is_idempotent() {
        let backend = MockBackend::new();
        let probe = backend.probe();
        let mut manager = CameraSessionManager::new(backend);

        manager.release();
        assert_eq!(probe.stop_calls(), 0);

        manager.acquire(&[constraint(1)]).unwrap();
        assert!(manager.is_active());

        for _ in 0..3 {
            manager.release();
        }
        assert_eq!(probe.stop_calls(), 1);
        assert!(!manager.is_active());

        drop(manager);
        assert_eq!(probe.stop_calls(), 1);
    }

    #[test]
    fn test_acquire_replaces_previous_session() {
        let backend = MockBackend::new();
        let probe = backend.probe();
        let mut manager = CameraSessionManager::new(backend);

        manager.acquire(&[constraint(1)]).unwrap();
        manager.acquire(&[constraint(1)]).unwrap();
        assert_eq!(probe.stop_calls(), 1);
    }

    #[test]
    fn test_prefers_rear_label() {
        let devices = vec![
            DeviceInfo::new("0", "FaceTime HD Camera"),
            DeviceInfo::new("1", "Camera 2, facing back"),
        ];
        let keywords = vec!["back".to_string(), "rear".to_string()];
        assert_eq!(select_device(&devices, &keywords).unwrap().id, "1");

        let unlabeled = vec![DeviceInfo::new("a", ""), DeviceInfo::new("b", "")];
        assert_eq!(select_device(&unlabeled, &keywords).unwrap().id, "a");
    }

    #[test]
    fn test_facing_mismatch_falls_through() {
        let backend = MockBackend::new();
        let probe = backend.probe();
        let mut manager = CameraSessionManager::new(backend);

        let err = manager
            .acquire(&[CaptureConstraint::facing(FacingMode::User)])
            .unwrap_err();
        assert!(matches!(err, CameraAcquisitionError::ConstraintUnsupported(_)));
        assert!(!manager.is_active());

        let session = manager
            .acquire(&[
                CaptureConstraint::facing(FacingMode::User),
                CaptureConstraint::facing(FacingMode::Any),
            ])
            .unwrap();
        assert_eq!(session.constraint_index(), 1);
        assert_eq!(probe.attempts().len(), 3);
    }

    #[test]
    fn test_front_request_picks_front_device() {
        let backend = MockBackend::new().with_devices(vec![
            DeviceInfo::new("0", "Back Camera"),
            DeviceInfo::new("1", "Front Camera"),
        ]);
        let mut manager = CameraSessionManager::new(backend);

        let session = manager
            .acquire(&[CaptureConstraint::facing(FacingMode::User)])
            .unwrap();
        assert_eq!(session.device().id, "1");

        let session = manager
            .acquire(&[CaptureConstraint::facing(FacingMode::Environment)])
            .unwrap();
        assert_eq!(session.device().id, "0");
    }

    #[test]
    fn test_timeout_skips_remaining_constraints() {
        let backend = MockBackend::new()
            .with_open_delay(Duration::from_millis(20))
            .with_open_results([Err(denied()), Ok(())]);
        let probe = backend.probe();
        let mut manager =
            CameraSessionManager::new(backend).with_timeout(Duration::from_millis(5));

        let err = manager.acquire(&[constraint(1), constraint(2)]).unwrap_err();
        assert!(matches!(err, CameraAcquisitionError::TimedOut(_)));
        assert_eq!(probe.attempts().len(), 1);
    }
}
