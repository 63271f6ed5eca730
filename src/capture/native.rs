//! Native camera backend built on `nokhwa`.

use super::camera::{CameraAcquisitionError, CameraBackend, DeviceInfo, FrameError, VideoStream};
use super::{CaptureConstraint, Frame};
use nokhwa::pixel_format::LumaFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
    Resolution,
};
use nokhwa::{Camera, NokhwaError};

/// Camera access through the platform's native capture API.
#[derive(Debug, Default)]
pub struct NativeBackend {
    indices: Vec<(String, CameraIndex)>,
}

impl NativeBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Maps a platform error onto an acquisition failure reason.
///
/// The native APIs report most failures as free text, so the
/// classification goes by message.
fn classify(err: &NokhwaError) -> CameraAcquisitionError {
    let message = err.to_string();
    let lower = message.to_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("not authorized")
    {
        CameraAcquisitionError::PermissionDenied(message)
    } else if lower.contains("no device") || lower.contains("not found") {
        CameraAcquisitionError::DeviceNotFound
    } else if lower.contains("format") || lower.contains("resolution") || lower.contains("unsupported")
    {
        CameraAcquisitionError::ConstraintUnsupported(message)
    } else {
        CameraAcquisitionError::Unknown(message)
    }
}

impl CameraBackend for NativeBackend {
    fn enumerate(&mut self) -> Result<Vec<DeviceInfo>, CameraAcquisitionError> {
        let cameras = nokhwa::query(ApiBackend::Auto).map_err(|e| classify(&e))?;
        self.indices = cameras
            .iter()
            .map(|info| (info.index().to_string(), info.index().clone()))
            .collect();
        Ok(cameras
            .iter()
            .map(|info| DeviceInfo::new(info.index().to_string(), info.human_name()))
            .collect())
    }

    fn open(
        &mut self,
        device: &DeviceInfo,
        constraint: &CaptureConstraint,
    ) -> Result<Box<dyn VideoStream>, CameraAcquisitionError> {
        if !constraint.accepts_facing(&device.label) {
            return Err(CameraAcquisitionError::ConstraintUnsupported(format!(
                "{} does not face {:?}",
                device.label, constraint.facing
            )));
        }

        let index = self
            .indices
            .iter()
            .find(|(id, _)| *id == device.id)
            .map(|(_, index)| index.clone())
            .ok_or(CameraAcquisitionError::DeviceNotFound)?;

        let requested = match constraint.ideal_resolution() {
            Some((width, height)) => RequestedFormatType::Closest(CameraFormat::new(
                Resolution::new(width, height),
                FrameFormat::MJPEG,
                30,
            )),
            None => RequestedFormatType::AbsoluteHighestFrameRate,
        };

        let mut camera = Camera::new(index, RequestedFormat::new::<LumaFormat>(requested))
            .map_err(|e| classify(&e))?;
        camera.open_stream().map_err(|e| classify(&e))?;

        let resolution = camera.resolution();
        let (width, height) = (resolution.width(), resolution.height());
        if !constraint.accepts_resolution(width, height) {
            if let Err(e) = camera.stop_stream() {
                tracing::warn!(error = %e, "Failed to stop rejected native stream");
            }
            return Err(CameraAcquisitionError::ConstraintUnsupported(format!(
                "device delivered {width}x{height}"
            )));
        }

        Ok(Box::new(NativeStream {
            camera,
            width,
            height,
            sequence: 0,
        }))
    }
}

struct NativeStream {
    camera: Camera,
    width: u32,
    height: u32,
    sequence: u64,
}

impl VideoStream for NativeStream {
    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn frame_ready(&mut self) -> bool {
        self.camera.is_stream_open()
    }

    fn grab(&mut self) -> Result<Frame, FrameError> {
        let buffer = self
            .camera
            .frame()
            .map_err(|e| FrameError::CaptureFailed(e.to_string()))?;
        let image = buffer
            .decode_image::<LumaFormat>()
            .map_err(|e| FrameError::CaptureFailed(e.to_string()))?;
        let (width, height) = (image.width(), image.height());

        self.sequence += 1;
        Ok(Frame::new(image.into_raw(), width, height, self.sequence))
    }

    fn stop(&mut self) {
        if let Err(e) = self.camera.stop_stream() {
            tracing::warn!(error = %e, "Failed to stop native camera stream");
        }
    }
}
