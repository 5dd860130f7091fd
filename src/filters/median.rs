//! Blemish removal via rank-order (median) filtering
//!
//! Suppresses small high-frequency defects (spots, lint) while preserving
//! larger-scale texture edges.

use crate::error::{Result, StudioError};
use image::{DynamicImage, RgbImage, RgbaImage};
use log::debug;

/// Replace each channel sample with the median of its `window_size` x
/// `window_size` neighborhood
///
/// Every channel is filtered independently, the alpha channel included when
/// the source has one. Border pixels use edge replication: neighborhood
/// coordinates are clamped to the image bounds, so edge samples repeat
/// where the window overhangs the frame.
///
/// `window_size` must be a positive odd integer; the design default is 3.
/// A window of 1 is the identity transform.
pub fn median_denoise(image: &DynamicImage, window_size: u32) -> Result<DynamicImage> {
    validate_window_size(window_size)?;

    if window_size == 1 {
        return Ok(image.clone());
    }

    let radius = window_size / 2;
    debug!(
        "median denoise: {}x{}, window {window_size} (radius {radius})",
        image.width(),
        image.height()
    );

    let filtered = if image.color().has_alpha() {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        let raw = median_channels(rgba.as_raw(), width as usize, height as usize, 4, radius);
        DynamicImage::ImageRgba8(
            RgbaImage::from_raw(width, height, raw)
                .ok_or_else(|| StudioError::internal("median output buffer size mismatch"))?,
        )
    } else {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        let raw = median_channels(rgb.as_raw(), width as usize, height as usize, 3, radius);
        DynamicImage::ImageRgb8(
            RgbImage::from_raw(width, height, raw)
                .ok_or_else(|| StudioError::internal("median output buffer size mismatch"))?,
        )
    };

    Ok(filtered)
}

/// Per-channel median over an interleaved sample buffer
fn median_channels(src: &[u8], width: usize, height: usize, channels: usize, radius: u32) -> Vec<u8> {
    let r = radius as i64;
    let stride = width * channels;
    let mut dst = vec![0u8; src.len()];
    let mut window: Vec<u8> = Vec::with_capacity(((2 * r + 1) * (2 * r + 1)) as usize);

    for y in 0..height {
        for x in 0..width {
            let out_base = y * stride + x * channels;
            for c in 0..channels {
                window.clear();
                for dy in -r..=r {
                    let sy = (y as i64 + dy).clamp(0, height as i64 - 1) as usize;
                    for dx in -r..=r {
                        let sx = (x as i64 + dx).clamp(0, width as i64 - 1) as usize;
                        window.push(src[sy * stride + sx * channels + c]);
                    }
                }
                window.sort_unstable();
                dst[out_base + c] = window[window.len() / 2];
            }
        }
    }

    dst
}

fn validate_window_size(window_size: u32) -> Result<()> {
    if window_size == 0 || window_size % 2 == 0 {
        return Err(StudioError::param_value_error(
            "window size",
            window_size,
            "positive odd integer",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn solid_gray(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([128, 128, 128])))
    }

    #[test]
    fn test_rejects_invalid_window_sizes() {
        let image = solid_gray(4, 4);
        assert!(median_denoise(&image, 0).is_err());
        assert!(median_denoise(&image, 2).is_err());
        assert!(median_denoise(&image, 4).is_err());
    }

    #[test]
    fn test_window_one_is_identity() {
        let image = solid_gray(4, 4);
        let result = median_denoise(&image, 1).unwrap();
        assert_eq!(result.to_rgb8().as_raw(), image.to_rgb8().as_raw());
    }

    #[test]
    fn test_idempotent_on_uniform_region() {
        // A region of constant color is returned unchanged, borders included
        let image = solid_gray(100, 100);
        let result = median_denoise(&image, 3).unwrap();

        assert_eq!(result.width(), 100);
        assert_eq!(result.height(), 100);
        assert_eq!(result.to_rgb8().as_raw(), image.to_rgb8().as_raw());
    }

    #[test]
    fn test_suppresses_isolated_impulse() {
        // A single extreme pixel surrounded by uniform color disappears
        // after one pass with a 3x3 window
        let mut rgb = RgbImage::from_pixel(9, 9, Rgb([100, 100, 100]));
        rgb.put_pixel(4, 4, Rgb([255, 0, 255]));
        let image = DynamicImage::ImageRgb8(rgb);

        let result = median_denoise(&image, 3).unwrap();
        let filtered = result.to_rgb8();
        assert!(filtered.pixels().all(|p| p.0 == [100, 100, 100]));
    }

    #[test]
    fn test_corner_uses_replicated_edge_samples() {
        // Top-left corner of a uniform frame with one bright corner pixel:
        // replication triples the corner sample, but the five distinct
        // neighbors still outvote it
        let mut rgb = RgbImage::from_pixel(5, 5, Rgb([10, 10, 10]));
        rgb.put_pixel(0, 0, Rgb([250, 250, 250]));
        let image = DynamicImage::ImageRgb8(rgb);

        let result = median_denoise(&image, 3).unwrap();
        assert_eq!(result.to_rgb8().get_pixel(0, 0), &Rgb([10, 10, 10]));
    }

    #[test]
    fn test_determinism() {
        let mut rgb = RgbImage::from_pixel(8, 8, Rgb([50, 90, 130]));
        rgb.put_pixel(2, 3, Rgb([250, 10, 40]));
        rgb.put_pixel(6, 6, Rgb([0, 255, 0]));
        let image = DynamicImage::ImageRgb8(rgb);

        let first = median_denoise(&image, 3).unwrap();
        let second = median_denoise(&image, 3).unwrap();
        assert_eq!(first.to_rgb8().as_raw(), second.to_rgb8().as_raw());
    }

    #[test]
    fn test_preserves_alpha_channel_layout() {
        let rgba = image::RgbaImage::from_pixel(5, 5, image::Rgba([10, 20, 30, 200]));
        let image = DynamicImage::ImageRgba8(rgba);

        let result = median_denoise(&image, 3).unwrap();
        assert!(result.color().has_alpha());
        // Uniform input, so the alpha plane is untouched too
        assert!(result.to_rgba8().pixels().all(|p| p[3] == 200));
    }
}
