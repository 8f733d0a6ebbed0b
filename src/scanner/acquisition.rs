// SPDX-License-Identifier: MPL-2.0

//! Camera acquisition: obtaining, binding and releasing the live stream

use super::surface::VideoSurface;
use crate::backends::camera::{CameraBackend, MediaStream, StreamConstraints};
use crate::errors::AcquisitionError;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Wraps a camera backend with the constraints and timeout for scanning
#[derive(Clone)]
pub struct CameraAcquisition {
    backend: Arc<dyn CameraBackend>,
    constraints: StreamConstraints,
    timeout: Option<Duration>,
}

impl CameraAcquisition {
    pub fn new(backend: Arc<dyn CameraBackend>, constraints: StreamConstraints) -> Self {
        Self {
            backend,
            constraints,
            timeout: None,
        }
    }

    /// Fail acquisition that takes longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn constraints(&self) -> &StreamConstraints {
        &self.constraints
    }

    /// Request a live stream from the backend
    ///
    /// On error no stream is left open: the backend never handed one out,
    /// or the timed-out future was dropped together with its result.
    pub async fn acquire(&self) -> Result<MediaStream, AcquisitionError> {
        let backend_type = self.backend.backend_type();
        info!(backend = %backend_type, constraints = ?self.constraints, "Requesting camera stream");

        let request = self.backend.acquire(&self.constraints);
        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, request).await {
                Ok(result) => result,
                Err(_) => {
                    error!(timeout_ms = limit.as_millis() as u64, "Camera acquisition timed out");
                    return Err(AcquisitionError::TimedOut(limit));
                }
            },
            None => request.await,
        };

        match result {
            Ok(stream) => {
                info!(stream = %stream.id(), tracks = stream.tracks().len(), "Camera stream acquired");
                Ok(stream)
            }
            Err(e) => {
                error!(error = %e, "Camera acquisition failed");
                Err(AcquisitionError::Backend(e))
            }
        }
    }

    /// Attach a stream to the surface and start playback
    pub fn bind(stream: &MediaStream, surface: &VideoSurface) {
        surface.attach(stream);
        surface.play();
    }

    /// Stop every track of the stream and clear the surface
    ///
    /// Safe to call more than once.
    pub fn release(stream: &mut MediaStream, surface: &VideoSurface) {
        debug!(stream = %stream.id(), "Releasing camera stream");
        stream.stop_all();
        if surface.source_id() == Some(stream.id()) {
            surface.clear();
        }
    }
}
