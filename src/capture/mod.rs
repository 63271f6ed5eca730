//! Camera acquisition and frame handling.
//!
//! This module provides abstractions for opening a camera stream under
//! an ordered list of capture constraints, owning that stream for the
//! duration of one scan attempt, and sampling frames from it.

mod camera;
mod config;
mod frame;
#[cfg(feature = "camera")]
mod native;
mod session;

pub use camera::{
    CameraAcquisitionError, CameraBackend, DeviceInfo, FrameError, MockBackend, MockProbe,
    VideoStream,
};
pub use config::{
    CaptureConfig, CaptureConstraint, ConfigError, DimensionRange, FacingMode, OutputConfig,
    ScanConfig, ScannerConfig, ValidationConfig,
};
pub use frame::{Frame, PixelFormat};
#[cfg(feature = "camera")]
pub use native::NativeBackend;
pub use session::{select_device, CameraSession, CameraSessionManager};
