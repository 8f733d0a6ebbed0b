// SPDX-License-Identifier: GPL-3.0-only

//! File source camera
//!
//! Presents still images as a live camera: the images are loaded once and
//! cycled onto the stream at a fixed frame interval. Used by the CLI for
//! offline scanning and by tests that need real pixels.

use super::CameraBackend;
use super::stream::{MediaStream, MediaTrack};
use super::types::*;
use crate::constants::file_source as fs_consts;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Load an image file as an RGBA camera frame
pub fn load_image_as_frame(path: &Path) -> BackendResult<CameraFrame> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    if !fs_consts::is_image_extension(&extension) {
        return Err(BackendError::FormatNotSupported(format!(
            "Unsupported file format: {}",
            extension
        )));
    }

    debug!(path = %path.display(), "Loading image file");

    let img = image::open(path).map_err(|e| match e {
        image::ImageError::IoError(io) => BackendError::from(io),
        other => BackendError::Other(format!(
            "Failed to load image '{}': {}",
            path.display(),
            other
        )),
    })?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    debug!(width, height, "Image loaded successfully");
    Ok(CameraFrame::from_rgba(width, height, rgba.into_raw()))
}

/// Camera backend backed by image files
pub struct FileSourceBackend {
    paths: Vec<PathBuf>,
    frame_interval: Duration,
}

impl FileSourceBackend {
    /// Create a file source cycling the given images
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            frame_interval: fs_consts::FRAME_INTERVAL,
        }
    }

    /// Override how long each image stays on the stream
    pub fn with_frame_interval(mut self, frame_interval: Duration) -> Self {
        self.frame_interval = frame_interval;
        self
    }
}

impl CameraBackend for FileSourceBackend {
    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        self.paths
            .iter()
            .map(|p| CameraDevice {
                name: p
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| p.display().to_string()),
                path: p.display().to_string(),
                facing: None,
                device_info: None,
            })
            .collect()
    }

    fn acquire(&self, _constraints: &StreamConstraints) -> BoxFuture<'static, BackendResult<MediaStream>> {
        let paths = self.paths.clone();
        let frame_interval = self.frame_interval;

        async move {
            if paths.is_empty() {
                return Err(BackendError::DeviceNotFound(
                    "No image files configured".to_string(),
                ));
            }

            let frames = tokio::task::spawn_blocking(move || {
                paths
                    .iter()
                    .map(|p| load_image_as_frame(p).map(Arc::new))
                    .collect::<BackendResult<Vec<_>>>()
            })
            .await
            .map_err(|e| BackendError::Other(format!("Image load task failed: {}", e)))??;

            info!(count = frames.len(), "File source opened");

            let (sender, receiver) = frame_channel();
            let track = FileTrack::start(frames, frame_interval, sender)?;
            Ok(MediaStream::new(vec![Box::new(track)], receiver))
        }
        .boxed()
    }

    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::FileSource
    }
}

/// Thread presenting the loaded frames in a loop
struct FileTrack {
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl FileTrack {
    fn start(
        frames: Vec<Arc<CameraFrame>>,
        frame_interval: Duration,
        sender: FrameSender,
    ) -> BackendResult<Self> {
        // First frame is visible as soon as the stream is handed out
        sender.send_replace(frames.first().cloned());

        let running = Arc::new(AtomicBool::new(true));
        let running_clone = Arc::clone(&running);

        let thread_handle = std::thread::Builder::new()
            .name("file-source".to_string())
            .spawn(move || {
                let mut index = 0usize;
                while running_clone.load(Ordering::SeqCst) {
                    std::thread::sleep(frame_interval);
                    if frames.len() > 1 {
                        index = (index + 1) % frames.len();
                        let mut frame = (*frames[index]).clone();
                        frame.captured_at = std::time::Instant::now();
                        sender.send_replace(Some(Arc::new(frame)));
                    }
                }
                debug!("File source loop ended");
            })
            .map_err(|e| BackendError::Other(format!("Failed to spawn file source: {}", e)))?;

        Ok(Self {
            running,
            thread_handle: Some(thread_handle),
        })
    }
}

impl MediaTrack for FileTrack {
    fn label(&self) -> &str {
        "file-source"
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take()
            && handle.join().is_err()
        {
            warn!("File source thread panicked");
        }
    }

    fn is_live(&self) -> bool {
        self.thread_handle.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 10, 10, 255]));
        img.save(&path).expect("write test image");
        path
    }

    #[test]
    fn test_load_image_as_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "red.png", 8, 4);

        let frame = load_image_as_frame(&path).unwrap();
        assert_eq!((frame.width, frame.height), (8, 4));
        assert_eq!(frame.format, PixelFormat::RGBA);
        assert_eq!(frame.stride, 32);
        assert_eq!(&frame.data[0..4], &[200, 10, 10, 255]);
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        let err = load_image_as_frame(Path::new("clip.mp4")).unwrap_err();
        assert!(matches!(err, BackendError::FormatNotSupported(_)));
    }

    #[test]
    fn test_load_missing_file_is_device_not_found() {
        let err = load_image_as_frame(Path::new("/nonexistent/label.png")).unwrap_err();
        assert!(matches!(err, BackendError::DeviceNotFound(_)));
    }

    #[tokio::test]
    async fn test_acquire_presents_first_frame_and_stops() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_png(dir.path(), "a.png", 4, 4);
        let b = write_png(dir.path(), "b.png", 6, 6);

        let backend = FileSourceBackend::new(vec![a, b]).with_frame_interval(Duration::from_millis(5));
        let mut stream = backend
            .acquire(&StreamConstraints::default())
            .await
            .unwrap();

        let first = stream.latest_frame().expect("first frame presented on acquire");
        assert_eq!(first.width, 4);
        assert!(stream.is_live());

        stream.stop_all();
        assert!(!stream.is_live());
    }

    #[tokio::test]
    async fn test_acquire_without_files_fails() {
        let backend = FileSourceBackend::new(Vec::new());
        let err = backend
            .acquire(&StreamConstraints::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::DeviceNotFound(_)));
    }
}
