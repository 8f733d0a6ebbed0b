// SPDX-License-Identifier: MPL-2.0

//! Video surface: the render target a camera stream is bound to
//!
//! The camera side attaches a stream and starts playback; the sampler reads
//! whatever frame is current. A UI can hold a clone of the same handle to
//! render the preview.

use crate::backends::camera::{CameraFrame, FrameReceiver, MediaStream};
use std::sync::{Arc, Mutex};
use tracing::debug;
use uuid::Uuid;

/// How much of the bound stream is available
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    /// No source, or no frame produced yet
    HaveNothing,
    /// Frames exist but playback has not started
    HaveMetadata,
    /// Playing with a current frame
    HaveEnoughData,
}

#[derive(Default)]
struct SurfaceInner {
    source: Option<FrameReceiver>,
    source_id: Option<Uuid>,
    playing: bool,
}

/// Shared handle to the video surface
#[derive(Clone, Default)]
pub struct VideoSurface {
    inner: Arc<Mutex<SurfaceInner>>,
}

impl VideoSurface {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SurfaceInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Bind a stream as the surface source (paused)
    pub fn attach(&self, stream: &MediaStream) {
        let mut inner = self.lock();
        inner.source = Some(stream.frames());
        inner.source_id = Some(stream.id());
        inner.playing = false;
        debug!(stream = %stream.id(), "Stream attached to video surface");
    }

    /// Start playback of the bound source
    pub fn play(&self) -> bool {
        let mut inner = self.lock();
        inner.playing = inner.source.is_some();
        inner.playing
    }

    /// Detach the source
    pub fn clear(&self) {
        let mut inner = self.lock();
        if let Some(id) = inner.source_id.take() {
            debug!(stream = %id, "Video surface cleared");
        }
        inner.source = None;
        inner.playing = false;
    }

    /// Id of the bound stream
    pub fn source_id(&self) -> Option<Uuid> {
        self.lock().source_id
    }

    pub fn is_playing(&self) -> bool {
        self.lock().playing
    }

    pub fn ready_state(&self) -> ReadyState {
        let inner = self.lock();
        let has_frame = inner
            .source
            .as_ref()
            .is_some_and(|rx| rx.borrow().is_some());
        match (has_frame, inner.playing) {
            (false, _) => ReadyState::HaveNothing,
            (true, false) => ReadyState::HaveMetadata,
            (true, true) => ReadyState::HaveEnoughData,
        }
    }

    /// Frame currently shown, if any
    pub fn current_frame(&self) -> Option<Arc<CameraFrame>> {
        let inner = self.lock();
        inner.source.as_ref().and_then(|rx| rx.borrow().clone())
    }

    /// Dimensions of the current frame
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.current_frame().map(|f| (f.width, f.height))
    }
}

impl std::fmt::Debug for VideoSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("VideoSurface")
            .field("source_id", &inner.source_id)
            .field("playing", &inner.playing)
            .finish()
    }
}
