//! Cosmetic retouching: skin smoothing and brightness-based whitening
//!
//! Two steps in fixed order: a separable Gaussian low-pass blur
//! parameterized by the smoothing radius, then uniform multiplicative
//! brightness scaling with clamping. The order is fixed for reproducibility.

use crate::{
    config::FilterParams,
    error::{Result, StudioError},
};
use image::{DynamicImage, RgbImage, RgbaImage};
use log::debug;

/// Apply skin smoothing and whitening to the full frame
///
/// Step 1: separable Gaussian blur with `sigma = smoothing_radius` (the
/// radius is treated as the kernel's standard deviation, truncated at
/// `ceil(3 * sigma)`); radius 0 skips the blur entirely. Edge handling is
/// edge replication. Step 2: every color sample of the blurred result is
/// multiplied by `whitening_factor` and clamped to [0,255] (clamped, never
/// wrapped). The alpha channel, when present, carries opacity rather than
/// brightness: it participates in the blur but is not scaled.
///
/// `retouch(img, 0, 1.0)` returns an image pixel-identical to the input.
pub fn retouch(
    image: &DynamicImage,
    smoothing_radius: u32,
    whitening_factor: f32,
) -> Result<DynamicImage> {
    let params = FilterParams::new(smoothing_radius, whitening_factor)?;
    retouch_with_params(image, &params)
}

/// `retouch` with a pre-validated parameter object
pub fn retouch_with_params(image: &DynamicImage, params: &FilterParams) -> Result<DynamicImage> {
    params.validate()?;

    debug!(
        "retouch: {}x{}, radius {}, whitening {:.2}",
        image.width(),
        image.height(),
        params.smoothing_radius,
        params.whitening_factor
    );

    // Whitening folds into the final f32->u8 conversion so a uniform frame
    // survives blur-then-scale without intermediate rounding drift.
    let result = if image.color().has_alpha() {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        let raw = transform_samples(
            rgba.as_raw(),
            width as usize,
            height as usize,
            4,
            params.smoothing_radius,
            params.whitening_factor,
        );
        DynamicImage::ImageRgba8(
            RgbaImage::from_raw(width, height, raw)
                .ok_or_else(|| StudioError::internal("retouch output buffer size mismatch"))?,
        )
    } else {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        let raw = transform_samples(
            rgb.as_raw(),
            width as usize,
            height as usize,
            3,
            params.smoothing_radius,
            params.whitening_factor,
        );
        DynamicImage::ImageRgb8(
            RgbImage::from_raw(width, height, raw)
                .ok_or_else(|| StudioError::internal("retouch output buffer size mismatch"))?,
        )
    };

    Ok(result)
}

/// Blur then whiten an interleaved sample buffer
///
/// Alpha (the fourth channel when `channels == 4`) is blurred like the
/// color channels but excluded from brightness scaling.
fn transform_samples(
    src: &[u8],
    width: usize,
    height: usize,
    channels: usize,
    radius: u32,
    factor: f32,
) -> Vec<u8> {
    let blurred: Vec<f32> = if radius == 0 {
        src.iter().map(|&s| f32::from(s)).collect()
    } else {
        separable_blur(src, width, height, channels, &gaussian_kernel(radius as f32))
    };

    blurred
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let is_alpha = channels == 4 && i % 4 == 3;
            let scaled = if is_alpha { v } else { v * factor };
            scaled.round().clamp(0.0, 255.0) as u8
        })
        .collect()
}

/// Build a normalized 1-D Gaussian kernel truncated at `ceil(3 * sigma)`
fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (sigma * 3.0).ceil() as usize;
    if radius == 0 {
        return vec![1.0];
    }
    let len = radius * 2 + 1;
    let mut kernel = vec![0.0f32; len];
    let s2 = 2.0 * sigma * sigma;
    let mut sum = 0.0f32;
    for (i, value) in kernel.iter_mut().enumerate() {
        let x = i as f32 - radius as f32;
        *value = (-x * x / s2).exp();
        sum += *value;
    }
    let inv = 1.0 / sum;
    for value in &mut kernel {
        *value *= inv;
    }
    kernel
}

/// Two-pass separable convolution over an interleaved buffer, with sample
/// coordinates clamped to the frame (edge replication)
fn separable_blur(
    src: &[u8],
    width: usize,
    height: usize,
    channels: usize,
    kernel: &[f32],
) -> Vec<f32> {
    let radius = (kernel.len() / 2) as isize;
    let stride = width * channels;

    let input: Vec<f32> = src.iter().map(|&s| f32::from(s)).collect();

    // Horizontal pass
    let mut horizontal = vec![0.0f32; input.len()];
    for y in 0..height {
        let row = y * stride;
        for x in 0..width {
            for c in 0..channels {
                let mut acc = 0.0f32;
                for (ki, &kv) in kernel.iter().enumerate() {
                    let sx = (x as isize + ki as isize - radius).clamp(0, width as isize - 1)
                        as usize;
                    acc += input[row + sx * channels + c] * kv;
                }
                horizontal[row + x * channels + c] = acc;
            }
        }
    }

    // Vertical pass
    let mut vertical = vec![0.0f32; input.len()];
    for y in 0..height {
        for x in 0..width {
            for c in 0..channels {
                let mut acc = 0.0f32;
                for (ki, &kv) in kernel.iter().enumerate() {
                    let sy = (y as isize + ki as isize - radius).clamp(0, height as isize - 1)
                        as usize;
                    acc += horizontal[sy * stride + x * channels + c] * kv;
                }
                vertical[y * stride + x * channels + c] = acc;
            }
        }
    }

    vertical
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn solid(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
    }

    #[test]
    fn test_identity_at_boundary_parameters() {
        let mut rgb = RgbImage::from_pixel(12, 12, Rgb([90, 120, 150]));
        rgb.put_pixel(3, 7, Rgb([200, 10, 30]));
        let image = DynamicImage::ImageRgb8(rgb);

        let result = retouch(&image, 0, 1.0).unwrap();
        assert_eq!(result.to_rgb8().as_raw(), image.to_rgb8().as_raw());
    }

    #[test]
    fn test_rejects_out_of_range_parameters() {
        let image = solid(4, 4, [128, 128, 128]);
        assert!(retouch(&image, 11, 1.5).is_err());
        assert!(retouch(&image, 2, 0.5).is_err());
        assert!(retouch(&image, 2, 3.0).is_err());
    }

    #[test]
    fn test_kernel_is_normalized_and_symmetric() {
        for radius in 1..=10 {
            let kernel = gaussian_kernel(radius as f32);
            assert_eq!(kernel.len() % 2, 1);

            let sum: f32 = kernel.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5, "kernel sum {sum} for radius {radius}");

            for (a, b) in kernel.iter().zip(kernel.iter().rev()) {
                assert!((a - b).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_whitening_monotonicity() {
        // For a fixed radius, a larger whitening factor never decreases any
        // channel sample (until clamped at the maximum)
        let mut rgb = RgbImage::from_pixel(10, 10, Rgb([60, 110, 170]));
        rgb.put_pixel(5, 5, Rgb([240, 30, 90]));
        let image = DynamicImage::ImageRgb8(rgb);

        let low = retouch(&image, 2, 1.0).unwrap().to_rgb8();
        let mid = retouch(&image, 2, 1.5).unwrap().to_rgb8();
        let high = retouch(&image, 2, 2.0).unwrap().to_rgb8();

        for ((a, b), c) in low
            .as_raw()
            .iter()
            .zip(mid.as_raw().iter())
            .zip(high.as_raw().iter())
        {
            assert!(a <= b);
            assert!(b <= c);
        }
    }

    #[test]
    fn test_white_image_clamps_unchanged() {
        // Already at the sample maximum: blur of a uniform frame is the
        // frame, and whitening clamps back to 255
        let image = solid(100, 100, [255, 255, 255]);
        let result = retouch(&image, 2, 1.5).unwrap();

        assert_eq!(result.width(), 100);
        assert_eq!(result.height(), 100);
        assert!(result.to_rgb8().pixels().all(|p| p.0 == [255, 255, 255]));
    }

    #[test]
    fn test_whitening_scales_and_clamps() {
        let image = solid(4, 4, [100, 200, 0]);
        let result = retouch(&image, 0, 2.0).unwrap().to_rgb8();

        // 100*2 = 200, 200*2 = 400 -> clamped to 255, 0*2 = 0
        assert!(result.pixels().all(|p| p.0 == [200, 255, 0]));
    }

    #[test]
    fn test_blur_preserves_uniform_frame() {
        // Normalized kernel over replicated edges: a constant frame is a
        // fixed point of the blur
        let image = solid(20, 20, [128, 128, 128]);
        let result = retouch(&image, 5, 1.0).unwrap();
        assert!(result.to_rgb8().pixels().all(|p| p.0 == [128, 128, 128]));
    }

    #[test]
    fn test_blur_spreads_impulse() {
        let mut rgb = RgbImage::from_pixel(11, 11, Rgb([0, 0, 0]));
        rgb.put_pixel(5, 5, Rgb([255, 255, 255]));
        let image = DynamicImage::ImageRgb8(rgb);

        let result = retouch(&image, 2, 1.0).unwrap().to_rgb8();
        let center = result.get_pixel(5, 5);
        let neighbor = result.get_pixel(6, 5);

        assert!(center[0] < 255, "impulse must lose energy to its neighbors");
        assert!(neighbor[0] > 0, "neighbors must gain energy from the impulse");
        assert!(center[0] >= neighbor[0]);
    }

    #[test]
    fn test_alpha_not_scaled_by_whitening() {
        let rgba = image::RgbaImage::from_pixel(4, 4, image::Rgba([100, 100, 100, 128]));
        let image = DynamicImage::ImageRgba8(rgba);

        let result = retouch(&image, 0, 2.0).unwrap().to_rgba8();
        assert!(result.pixels().all(|p| p.0 == [200, 200, 200, 128]));
    }

    #[test]
    fn test_determinism() {
        let mut rgb = RgbImage::from_pixel(16, 16, Rgb([70, 140, 210]));
        rgb.put_pixel(8, 8, Rgb([255, 255, 255]));
        let image = DynamicImage::ImageRgb8(rgb);

        let first = retouch(&image, 3, 1.3).unwrap();
        let second = retouch(&image, 3, 1.3).unwrap();
        assert_eq!(first.to_rgb8().as_raw(), second.to_rgb8().as_raw());
    }
}
