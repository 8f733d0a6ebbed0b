// SPDX-License-Identifier: MPL-2.0

//! Camera backend abstraction
//!
//! Camera access is a capability: "give me a live stream matching these
//! constraints". Everything platform specific sits behind [`CameraBackend`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  Scan controller    │
//! └──────────┬──────────┘
//!            │ acquire(constraints)
//!            ▼
//! ┌─────────────────────┐
//! │  CameraBackend Trait│  ← Common interface
//! └──────────┬──────────┘
//!            │
//!       ┌────┴─────┐
//!       ▼          ▼
//!   ┌──────┐  ┌───────────┐
//!   │ V4L2 │  │File source│
//!   └──────┘  └───────────┘
//! ```

pub mod file_source;
pub mod format_converters;
pub mod stream;
pub mod types;
#[cfg(all(target_os = "linux", feature = "v4l2"))]
pub mod v4l2;

pub use file_source::FileSourceBackend;
pub use stream::{MediaStream, MediaTrack};
pub use types::*;

use futures::future::BoxFuture;

/// Camera backend trait
///
/// Backends own device negotiation and frame production. The returned
/// stream's tracks keep producing frames into the stream's latest-frame slot
/// until they are stopped.
pub trait CameraBackend: Send + Sync {
    /// Enumerate available cameras on this backend
    fn enumerate_cameras(&self) -> Vec<CameraDevice>;

    /// Request a live stream matching the constraints
    ///
    /// May suspend while the platform negotiates permission or hardware.
    ///
    /// # Returns
    /// * `Ok(MediaStream)` - Stream is live and producing frames
    /// * `Err(BackendError)` - Permission denied, no device, or platform failure
    fn acquire(&self, constraints: &StreamConstraints) -> BoxFuture<'static, BackendResult<MediaStream>>;

    /// Get the backend type identifier
    fn backend_type(&self) -> CameraBackendType;
}

/// Create a backend of the given type
///
/// `device` is the device node for V4L2; the file source uses `files`.
pub fn get_backend_for_type(
    backend_type: CameraBackendType,
    device: Option<String>,
    files: Vec<std::path::PathBuf>,
) -> BackendResult<Box<dyn CameraBackend>> {
    match backend_type {
        #[cfg(all(target_os = "linux", feature = "v4l2"))]
        CameraBackendType::V4l2 => Ok(Box::new(v4l2::V4l2Backend::new(device))),
        #[cfg(not(all(target_os = "linux", feature = "v4l2")))]
        CameraBackendType::V4l2 => {
            let _ = device;
            Err(BackendError::NotAvailable(
                "V4L2 support was not compiled in".to_string(),
            ))
        }
        CameraBackendType::FileSource => Ok(Box::new(FileSourceBackend::new(files))),
    }
}
