// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

/// Camera backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CameraBackendType {
    /// Direct V4L2 capture (Linux video devices)
    #[default]
    V4l2,
    /// Still images presented as a live camera
    FileSource,
}

impl std::fmt::Display for CameraBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraBackendType::V4l2 => write!(f, "V4L2"),
            CameraBackendType::FileSource => write!(f, "file source"),
        }
    }
}

/// Device information from V4L2 capability
#[derive(Debug, Clone, Default)]
pub struct DeviceInfo {
    /// Name of the device (V4L2 card)
    pub card: String,
    /// Driver name (V4L2 driver)
    pub driver: String,
    /// Device path (e.g., /dev/video0)
    pub path: String,
    /// Real device path (resolved symlinks)
    pub real_path: String,
}

/// Which way a camera points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Rear camera, facing away from the user
    #[default]
    Environment,
    /// Front camera, facing the user
    User,
}

impl FacingMode {
    /// Guess the facing mode from a device name
    ///
    /// Linux exposes no facing property for V4L2 nodes, so drivers that
    /// name their sensors "front"/"back" are the only hint available.
    pub fn guess_from_name(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        if ["back", "rear", "world", "environment"]
            .iter()
            .any(|k| lower.contains(k))
        {
            Some(FacingMode::Environment)
        } else if ["front", "user", "selfie"].iter().any(|k| lower.contains(k)) {
            Some(FacingMode::User)
        } else {
            None
        }
    }
}

/// Focus behaviour requested from the camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FocusMode {
    /// Continuous autofocus
    #[default]
    Continuous,
    /// Leave the device's focus settings alone
    Manual,
}

/// Constraints for a stream request
///
/// Resolution values are ideals, not requirements: backends pick the closest
/// mode the device offers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConstraints {
    /// Preferred camera direction
    pub facing: FacingMode,
    /// Ideal frame width
    pub ideal_width: u32,
    /// Ideal frame height
    pub ideal_height: u32,
    /// Focus behaviour
    pub focus: FocusMode,
    /// Ask for image stabilization where the device supports it
    pub stabilization: bool,
}

impl Default for StreamConstraints {
    fn default() -> Self {
        Self {
            facing: FacingMode::Environment,
            ideal_width: crate::constants::camera::IDEAL_WIDTH,
            ideal_height: crate::constants::camera::IDEAL_HEIGHT,
            focus: FocusMode::Continuous,
            stabilization: true,
        }
    }
}

/// Represents a camera device
#[derive(Debug, Clone)]
pub struct CameraDevice {
    pub name: String,
    pub path: String,                    // Device node or file path
    pub facing: Option<FacingMode>,      // None when the platform does not say
    pub device_info: Option<DeviceInfo>, // V4L2 device information
}

/// Pixel format of frames presented on the video surface
///
/// Backends convert device formats before presenting, so consumers only
/// ever see these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// RGBA - 32-bit with alpha (4 bytes per pixel)
    RGBA,
    /// Gray8 - 8-bit grayscale (single channel)
    Gray8,
}

impl PixelFormat {
    /// Bytes per pixel
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            Self::RGBA => 4,
            Self::Gray8 => 1,
        }
    }
}

/// A single frame from the camera
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    /// Pixel data, `stride` bytes per row
    pub data: Arc<[u8]>,
    /// Pixel format of the data
    pub format: PixelFormat,
    /// Row stride (bytes per row, may include padding)
    pub stride: u32,
    /// Timestamp when frame was captured
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Wrap tightly packed RGBA pixels
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data: Arc::from(data.into_boxed_slice()),
            format: PixelFormat::RGBA,
            stride: width * 4,
            captured_at: Instant::now(),
        }
    }

    /// Check that the buffer holds every row the header promises
    pub fn is_well_formed(&self) -> bool {
        let row_bytes = self.width as usize * self.format.bytes_per_pixel() as usize;
        if (self.stride as usize) < row_bytes {
            return false;
        }
        if self.height == 0 {
            return true;
        }
        let needed = (self.height as usize - 1) * self.stride as usize + row_bytes;
        self.data.len() >= needed
    }
}

/// Latest-frame slot written by a backend
pub type FrameSender = watch::Sender<Option<Arc<CameraFrame>>>;

/// Latest-frame slot read by the video surface
pub type FrameReceiver = watch::Receiver<Option<Arc<CameraFrame>>>;

/// Create an empty latest-frame channel
pub fn frame_channel() -> (FrameSender, FrameReceiver) {
    watch::channel(None)
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone)]
pub enum BackendError {
    /// Backend is not available on this system
    NotAvailable(String),
    /// The user or the system refused camera access
    PermissionDenied(String),
    /// Camera device not found
    DeviceNotFound(String),
    /// Format not supported
    FormatNotSupported(String),
    /// General I/O error
    IoError(String),
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Backend not available: {}", msg),
            BackendError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::FormatNotSupported(msg) => write!(f, "Format not supported: {}", msg),
            BackendError::IoError(msg) => write!(f, "I/O error: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => BackendError::PermissionDenied(err.to_string()),
            std::io::ErrorKind::NotFound => BackendError::DeviceNotFound(err.to_string()),
            _ => BackendError::IoError(err.to_string()),
        }
    }
}
