// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Scanner timing and geometry
pub mod scanner {
    use super::Duration;

    /// Interval between two frame samples
    pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(500);

    /// Crop width as a fraction of the frame width
    pub const CROP_WIDTH_RATIO: f32 = 0.8;

    /// Crop height as a fraction of the frame height
    ///
    /// Barcodes are wide and short, so a horizontal band through the middle
    /// of the frame is enough.
    pub const CROP_HEIGHT_RATIO: f32 = 0.3;
}

/// Camera stream constraints
pub mod camera {
    /// Ideal capture width
    pub const IDEAL_WIDTH: u32 = 1920;

    /// Ideal capture height
    pub const IDEAL_HEIGHT: u32 = 1080;

    /// Number of mmap buffers for V4L2 capture
    pub const V4L2_BUFFER_COUNT: u32 = 4;

    /// Delay before retrying after a failed V4L2 dequeue
    pub const CAPTURE_RETRY_DELAY_MS: u64 = 10;
}

/// File source (still images presented as a camera)
pub mod file_source {
    use super::Duration;

    /// Interval between two frames of a file source
    pub const FRAME_INTERVAL: Duration = Duration::from_millis(100);

    /// Image extensions accepted by the file source
    pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "webp", "tiff"];

    /// Check if an extension (lowercase, no dot) is a supported image file
    pub fn is_image_extension(ext: &str) -> bool {
        IMAGE_EXTENSIONS.contains(&ext)
    }
}

/// Configuration file location
pub mod config {
    /// Directory name under the user's config dir
    pub const APP_DIR: &str = "stockscan";

    /// Configuration file name
    pub const FILE_NAME: &str = "config.json";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crop_ratios_in_range() {
        assert!(scanner::CROP_WIDTH_RATIO > 0.0 && scanner::CROP_WIDTH_RATIO <= 1.0);
        assert!(scanner::CROP_HEIGHT_RATIO > 0.0 && scanner::CROP_HEIGHT_RATIO <= 1.0);
    }

    #[test]
    fn test_image_extensions() {
        assert!(file_source::is_image_extension("png"));
        assert!(file_source::is_image_extension("jpg"));
        assert!(!file_source::is_image_extension("mp4"));
        assert!(!file_source::is_image_extension("PNG"));
    }
}
