// SPDX-License-Identifier: GPL-3.0-only

//! Direct V4L2 camera capture
//!
//! Opens a Linux video device with the v4l crate, negotiates a packed YUV
//! (or grayscale) mode close to the requested resolution, and runs a capture
//! thread that converts each buffer to RGBA and publishes it as the stream's
//! latest frame.

use super::format_converters::{gray_to_rgba, yuyv_to_rgba};
use super::stream::{MediaStream, MediaTrack};
use super::types::*;
use super::CameraBackend;
use crate::constants::camera as camera_consts;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use v4l::buffer::Type;
use v4l::control::{Control, Value};
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::FourCC;

/// V4L2_CID_CAMERA_CLASS_BASE + 12
const V4L2_CID_FOCUS_AUTO: u32 = 0x009a_090c;

/// V4L2_CID_CAMERA_CLASS_BASE + 34
const V4L2_CID_IMAGE_STABILIZATION: u32 = 0x009a_0922;

/// Formats the capture thread knows how to convert, in preference order
const SUPPORTED_FOURCCS: [&[u8; 4]; 2] = [b"YUYV", b"GREY"];

/// V4L2 camera backend
pub struct V4l2Backend {
    /// Explicit device node; when unset the device is picked by facing mode
    device_path: Option<String>,
}

impl V4l2Backend {
    /// Create a backend, optionally pinned to one device node
    pub fn new(device_path: Option<String>) -> Self {
        Self { device_path }
    }
}

impl CameraBackend for V4l2Backend {
    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        enumerate_v4l2_cameras()
    }

    fn acquire(&self, constraints: &StreamConstraints) -> BoxFuture<'static, BackendResult<MediaStream>> {
        let device_path = self.device_path.clone();
        let constraints = constraints.clone();

        async move {
            // Opening and negotiating are blocking ioctls
            tokio::task::spawn_blocking(move || open_stream(device_path, &constraints))
                .await
                .map_err(|e| BackendError::Other(format!("Camera open task failed: {}", e)))?
        }
        .boxed()
    }

    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::V4l2
    }
}

/// List V4L2 nodes that can capture video
pub fn enumerate_v4l2_cameras() -> Vec<CameraDevice> {
    let mut cameras = Vec::new();

    for node in v4l::context::enum_devices() {
        let path = node.path().to_string_lossy().to_string();
        let dev = match Device::with_path(&path) {
            Ok(dev) => dev,
            Err(e) => {
                debug!(path = %path, error = %e, "Skipping unreadable video node");
                continue;
            }
        };
        let caps = match dev.query_caps() {
            Ok(caps) => caps,
            Err(e) => {
                debug!(path = %path, error = %e, "Failed to query capabilities");
                continue;
            }
        };
        if !caps
            .capabilities
            .contains(v4l::capability::Flags::VIDEO_CAPTURE)
        {
            continue;
        }

        let real_path = std::fs::canonicalize(&path)
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_else(|_| path.clone());
        let name = node.name().unwrap_or_else(|| caps.card.clone());

        cameras.push(CameraDevice {
            facing: FacingMode::guess_from_name(&name),
            name,
            path: path.clone(),
            device_info: Some(DeviceInfo {
                card: caps.card.clone(),
                driver: caps.driver.clone(),
                path,
                real_path,
            }),
        });
    }

    cameras.sort_by(|a, b| a.path.cmp(&b.path));
    cameras
}

/// Pick a device for the requested facing mode
///
/// Exact facing matches win, then devices of unknown facing, then anything.
pub fn select_device(cameras: &[CameraDevice], facing: FacingMode) -> Option<&CameraDevice> {
    cameras
        .iter()
        .find(|c| c.facing == Some(facing))
        .or_else(|| cameras.iter().find(|c| c.facing.is_none()))
        .or_else(|| cameras.first())
}

/// Choose the frame size closest to the ideal
///
/// Prefers the smallest size covering the ideal area; when nothing is that
/// large, takes the largest available.
pub fn choose_frame_size(sizes: &[(u32, u32)], ideal: (u32, u32)) -> Option<(u32, u32)> {
    let target = ideal.0 as u64 * ideal.1 as u64;
    let area = |s: &(u32, u32)| s.0 as u64 * s.1 as u64;

    sizes
        .iter()
        .filter(|s| area(s) >= target)
        .min_by_key(|s| area(s))
        .or_else(|| sizes.iter().max_by_key(|s| area(s)))
        .copied()
}

fn open_stream(device_path: Option<String>, constraints: &StreamConstraints) -> BackendResult<MediaStream> {
    let path = match device_path {
        Some(path) => path,
        None => {
            let cameras = enumerate_v4l2_cameras();
            select_device(&cameras, constraints.facing)
                .map(|c| c.path.clone())
                .ok_or_else(|| BackendError::DeviceNotFound("No video capture devices".to_string()))?
        }
    };

    info!(device_path = %path, "Opening V4L2 device");
    let dev = Device::with_path(&path)?;

    let format = negotiate_format(&dev, constraints)?;
    apply_controls(&dev, constraints);

    let (sender, receiver) = frame_channel();
    let track = V4l2Track::start(dev, path, format, sender)?;

    Ok(MediaStream::new(vec![Box::new(track)], receiver))
}

fn negotiate_format(dev: &Device, constraints: &StreamConstraints) -> BackendResult<v4l::Format> {
    let ideal = (constraints.ideal_width, constraints.ideal_height);

    for fourcc_bytes in SUPPORTED_FOURCCS {
        let fourcc = FourCC::new(fourcc_bytes);
        let sizes: Vec<(u32, u32)> = match dev.enum_framesizes(fourcc) {
            Ok(sizes) => sizes
                .into_iter()
                .flat_map(|fs| match fs.size {
                    v4l::framesize::FrameSizeEnum::Discrete(d) => vec![(d.width, d.height)],
                    v4l::framesize::FrameSizeEnum::Stepwise(step) => [ideal, (1280, 720), (640, 480)]
                        .into_iter()
                        .filter(|&(w, h)| {
                            w >= step.min_width
                                && w <= step.max_width
                                && h >= step.min_height
                                && h <= step.max_height
                        })
                        .collect(),
                })
                .collect(),
            Err(e) => {
                debug!(?fourcc, error = %e, "Frame size enumeration failed");
                continue;
            }
        };

        let Some((width, height)) = choose_frame_size(&sizes, ideal) else {
            continue;
        };

        let mut format = dev.format()?;
        format.width = width;
        format.height = height;
        format.fourcc = fourcc;

        let applied = dev.set_format(&format)?;
        if applied.fourcc != fourcc {
            warn!(requested = ?fourcc, got = ?applied.fourcc, "Device rejected pixel format");
            continue;
        }

        info!(
            width = applied.width,
            height = applied.height,
            fourcc = ?applied.fourcc,
            "Set V4L2 format"
        );
        return Ok(applied);
    }

    Err(BackendError::FormatNotSupported(
        "Device offers neither YUYV nor GREY capture".to_string(),
    ))
}

fn apply_controls(dev: &Device, constraints: &StreamConstraints) {
    if constraints.focus == FocusMode::Continuous {
        let control = Control {
            id: V4L2_CID_FOCUS_AUTO,
            value: Value::Boolean(true),
        };
        if let Err(e) = dev.set_control(control) {
            debug!(error = %e, "Continuous autofocus not supported");
        }
    }

    if constraints.stabilization {
        let control = Control {
            id: V4L2_CID_IMAGE_STABILIZATION,
            value: Value::Boolean(true),
        };
        if let Err(e) = dev.set_control(control) {
            debug!(error = %e, "Image stabilization not supported");
        }
    }
}

/// Capture thread for one V4L2 device
pub struct V4l2Track {
    label: String,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl V4l2Track {
    fn start(dev: Device, path: String, format: v4l::Format, sender: FrameSender) -> BackendResult<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = Arc::clone(&running);
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<BackendResult<()>>();
        let label = format!("{} {}x{}", path, format.width, format.height);

        let thread_handle = std::thread::Builder::new()
            .name("v4l2-capture".to_string())
            .spawn(move || capture_loop(dev, format, sender, running_clone, ready_tx))
            .map_err(|e| BackendError::Other(format!("Failed to spawn capture thread: {}", e)))?;

        // The stream is only handed out once buffers are queued
        let ready = ready_rx
            .recv()
            .unwrap_or_else(|_| Err(BackendError::Other("Capture thread exited early".to_string())));

        let mut track = Self {
            label,
            running,
            thread_handle: Some(thread_handle),
        };

        match ready {
            Ok(()) => Ok(track),
            Err(e) => {
                track.stop();
                Err(e)
            }
        }
    }
}

impl MediaTrack for V4l2Track {
    fn label(&self) -> &str {
        &self.label
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            match handle.join() {
                Ok(_) => info!(track = %self.label, "Capture thread stopped"),
                Err(_) => warn!(track = %self.label, "Capture thread panicked"),
            }
        }
    }

    fn is_live(&self) -> bool {
        self.thread_handle.is_some()
    }
}

impl Drop for V4l2Track {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Main capture loop running in a separate thread
fn capture_loop(
    mut dev: Device,
    format: v4l::Format,
    sender: FrameSender,
    running: Arc<AtomicBool>,
    ready: std::sync::mpsc::Sender<BackendResult<()>>,
) {
    static FRAME_COUNTER: AtomicU64 = AtomicU64::new(0);

    let mut stream = match MmapStream::with_buffers(&mut dev, Type::VideoCapture, camera_consts::V4L2_BUFFER_COUNT) {
        Ok(stream) => stream,
        Err(e) => {
            error!(error = %e, "Failed to create buffer stream");
            let _ = ready.send(Err(BackendError::from(e)));
            return;
        }
    };
    let _ = ready.send(Ok(()));

    let width = format.width;
    let height = format.height;
    let is_gray = format.fourcc == FourCC::new(b"GREY");
    let bytes_per_pixel = if is_gray { 1 } else { 2 };
    let stride = format.stride.max(width * bytes_per_pixel);

    info!(width, height, stride, "V4L2 capture stream started");

    while running.load(Ordering::SeqCst) {
        let frame_start = Instant::now();

        match stream.next() {
            Ok((buf, meta)) => {
                let frame_num = FRAME_COUNTER.fetch_add(1, Ordering::Relaxed);
                let packed = pack_rows(buf, width * bytes_per_pixel, stride, height);
                let rgba = if is_gray {
                    gray_to_rgba(&packed, width, height)
                } else {
                    yuyv_to_rgba(&packed, width, height)
                };

                let mut frame = CameraFrame::from_rgba(width, height, rgba);
                frame.captured_at = frame_start;
                sender.send_replace(Some(Arc::new(frame)));

                if frame_num % 60 == 0 {
                    debug!(
                        frame = frame_num,
                        sequence = meta.sequence,
                        elapsed_us = frame_start.elapsed().as_micros(),
                        "Frame captured"
                    );
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to capture frame");
                std::thread::sleep(std::time::Duration::from_millis(
                    camera_consts::CAPTURE_RETRY_DELAY_MS,
                ));
            }
        }
    }

    info!("V4L2 capture loop ended");
}

/// Drop per-row padding from a strided buffer
fn pack_rows(buf: &[u8], row_bytes: u32, stride: u32, height: u32) -> Vec<u8> {
    if row_bytes == stride {
        return buf.to_vec();
    }
    let row_bytes = row_bytes as usize;
    let stride = stride as usize;
    let mut packed = Vec::with_capacity(row_bytes * height as usize);
    for y in 0..height as usize {
        let start = y * stride;
        let end = start + row_bytes;
        if end <= buf.len() {
            packed.extend_from_slice(&buf[start..end]);
        }
    }
    packed
}
