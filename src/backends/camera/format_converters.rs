// SPDX-License-Identifier: GPL-3.0-only
//! Pixel format conversion for frames captured straight from V4L2
//!
//! Device buffers arrive in packed YUV or grayscale; the video surface only
//! carries RGBA, so capture threads convert before presenting.

/// Convert YUYV (YUV 4:2:2) to RGBA
///
/// YUYV format: Y0 U0 Y1 V0 - each 4-byte group encodes 2 pixels.
/// Uses BT.601 coefficients for YUV to RGB conversion.
pub fn yuyv_to_rgba(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let pixel_count = (width * height) as usize;
    let mut rgba = Vec::with_capacity(pixel_count * 4);

    for chunk in data.chunks_exact(4) {
        let y0 = chunk[0] as f32;
        let u = chunk[1] as f32 - 128.0;
        let y1 = chunk[2] as f32;
        let v = chunk[3] as f32 - 128.0;

        for y in [y0, y1] {
            if rgba.len() >= pixel_count * 4 {
                break;
            }
            rgba.push((y + 1.402 * v).clamp(0.0, 255.0) as u8);
            rgba.push((y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8);
            rgba.push((y + 1.772 * u).clamp(0.0, 255.0) as u8);
            rgba.push(255);
        }
    }

    // Short buffers (truncated dequeue) are padded black
    rgba.resize(pixel_count * 4, 0);
    rgba
}

/// Expand 8-bit grayscale to RGBA
pub fn gray_to_rgba(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let pixel_count = (width * height) as usize;
    let mut rgba = Vec::with_capacity(pixel_count * 4);
    for &g in data.iter().take(pixel_count) {
        rgba.extend_from_slice(&[g, g, g, 255]);
    }
    rgba.resize(pixel_count * 4, 0);
    rgba
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuyv_gray_levels() {
        // Neutral chroma: RGB equals luma
        let data = [16u8, 128, 235, 128];
        let rgba = yuyv_to_rgba(&data, 2, 1);
        assert_eq!(rgba, vec![16, 16, 16, 255, 235, 235, 235, 255]);
    }

    #[test]
    fn test_yuyv_short_buffer_padded() {
        let data = [100u8, 128, 100, 128];
        let rgba = yuyv_to_rgba(&data, 4, 1);
        assert_eq!(rgba.len(), 16);
        assert_eq!(&rgba[8..], &[0; 8]);
    }

    #[test]
    fn test_gray_to_rgba() {
        let rgba = gray_to_rgba(&[0, 200], 2, 1);
        assert_eq!(rgba, vec![0, 0, 0, 255, 200, 200, 200, 255]);
    }
}
