// SPDX-License-Identifier: MPL-2.0

//! Frame sampler
//!
//! Copies the centered scan band out of the surface's current frame. The
//! band is where the user is asked to hold the barcode; decoding only that
//! region keeps per-tick work bounded at high camera resolutions.

use super::surface::{ReadyState, VideoSurface};
use super::types::FrameSample;
use crate::backends::camera::{CameraFrame, PixelFormat};
use crate::constants::scanner as scanner_consts;
use tracing::{trace, warn};

/// Rectangle of a frame, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropGeometry {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropGeometry {
    /// Crop of `floor(w * width_ratio) x floor(h * height_ratio)` centered in the frame
    pub fn centered(frame_width: u32, frame_height: u32, width_ratio: f32, height_ratio: f32) -> Self {
        let width = (frame_width as f64 * width_ratio as f64).floor() as u32;
        let height = (frame_height as f64 * height_ratio as f64).floor() as u32;
        let width = width.min(frame_width);
        let height = height.min(frame_height);
        Self {
            x: (frame_width - width) / 2,
            y: (frame_height - height) / 2,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Samples the scan band from the video surface
#[derive(Debug, Clone, Copy)]
pub struct FrameSampler {
    width_ratio: f32,
    height_ratio: f32,
}

impl Default for FrameSampler {
    fn default() -> Self {
        Self::new(
            scanner_consts::CROP_WIDTH_RATIO,
            scanner_consts::CROP_HEIGHT_RATIO,
        )
    }
}

impl FrameSampler {
    pub fn new(width_ratio: f32, height_ratio: f32) -> Self {
        Self {
            width_ratio,
            height_ratio,
        }
    }

    pub fn crop_for(&self, frame_width: u32, frame_height: u32) -> CropGeometry {
        CropGeometry::centered(frame_width, frame_height, self.width_ratio, self.height_ratio)
    }

    /// Sample the surface's current frame
    ///
    /// Returns `None` when the surface is not ready yet; the tick is skipped.
    pub fn sample(&self, surface: &VideoSurface) -> Option<FrameSample> {
        if surface.ready_state() != ReadyState::HaveEnoughData {
            trace!("Surface not ready, skipping sample");
            return None;
        }
        let frame = surface.current_frame()?;
        self.sample_frame(&frame)
    }

    /// Copy the scan band out of a frame as packed RGBA
    pub fn sample_frame(&self, frame: &CameraFrame) -> Option<FrameSample> {
        if !frame.is_well_formed() {
            warn!(
                width = frame.width,
                height = frame.height,
                stride = frame.stride,
                len = frame.data.len(),
                "Frame buffer shorter than its header, skipping"
            );
            return None;
        }

        let crop = self.crop_for(frame.width, frame.height);
        if crop.is_empty() {
            trace!(width = frame.width, height = frame.height, "Frame too small to crop");
            return None;
        }

        let data = copy_region_rgba(frame, &crop);
        trace!(
            x = crop.x,
            y = crop.y,
            width = crop.width,
            height = crop.height,
            "Sampled frame region"
        );
        Some(FrameSample {
            width: crop.width,
            height: crop.height,
            data,
        })
    }
}

/// Copy a region of a (possibly padded) frame into packed RGBA
fn copy_region_rgba(frame: &CameraFrame, crop: &CropGeometry) -> Vec<u8> {
    let bpp = frame.format.bytes_per_pixel() as usize;
    let stride = frame.stride as usize;
    let mut out = Vec::with_capacity(crop.width as usize * crop.height as usize * 4);

    for row in crop.y..crop.y + crop.height {
        let start = row as usize * stride + crop.x as usize * bpp;
        let end = start + crop.width as usize * bpp;
        let src = &frame.data[start..end];
        match frame.format {
            PixelFormat::RGBA => out.extend_from_slice(src),
            PixelFormat::Gray8 => {
                for &g in src {
                    out.extend_from_slice(&[g, g, g, 255]);
                }
            }
        }
    }

    out
}
