// SPDX-License-Identifier: GPL-3.0-only

//! Live media streams handed out by camera backends
//!
//! A [`MediaStream`] bundles the tracks producing frames with the
//! latest-frame slot they write to. Stopping a stream stops every track
//! individually; a stream that is dropped while still live stops itself.

use super::types::{CameraFrame, FrameReceiver};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// One source of frames inside a stream (usually a capture thread)
pub trait MediaTrack: Send {
    /// Human readable label for logging
    fn label(&self) -> &str;

    /// Stop producing frames and release the underlying device
    ///
    /// Must be safe to call more than once.
    fn stop(&mut self);

    /// Whether the track is still producing frames
    fn is_live(&self) -> bool;
}

/// A live camera stream
pub struct MediaStream {
    id: Uuid,
    tracks: Vec<Box<dyn MediaTrack>>,
    frames: FrameReceiver,
}

impl MediaStream {
    /// Create a stream from its tracks and the slot they write frames into
    pub fn new(tracks: Vec<Box<dyn MediaTrack>>, frames: FrameReceiver) -> Self {
        let id = Uuid::new_v4();
        debug!(stream = %id, tracks = tracks.len(), "Media stream created");
        Self { id, tracks, frames }
    }

    /// Stream identifier
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Tracks belonging to this stream
    pub fn tracks(&self) -> &[Box<dyn MediaTrack>] {
        &self.tracks
    }

    /// Whether any track is still live
    pub fn is_live(&self) -> bool {
        self.tracks.iter().any(|t| t.is_live())
    }

    /// A new reader of the stream's latest frame
    pub fn frames(&self) -> FrameReceiver {
        self.frames.clone()
    }

    /// Latest frame produced so far
    pub fn latest_frame(&self) -> Option<Arc<CameraFrame>> {
        self.frames.borrow().clone()
    }

    /// Stop every track of the stream
    pub fn stop_all(&mut self) {
        for track in self.tracks.iter_mut() {
            if track.is_live() {
                debug!(stream = %self.id, track = track.label(), "Stopping track");
                track.stop();
            }
        }
        info!(stream = %self.id, "Media stream stopped");
    }
}

impl Drop for MediaStream {
    fn drop(&mut self) {
        if self.is_live() {
            debug!(stream = %self.id, "Live media stream dropped, stopping tracks");
            self.stop_all();
        }
    }
}

impl std::fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaStream")
            .field("id", &self.id)
            .field("tracks", &self.tracks.len())
            .field("live", &self.is_live())
            .finish()
    }
}
