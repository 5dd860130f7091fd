//! Background segmentation stage
//!
//! Pixel classification (foreground vs. background) is delegated to an
//! external pretrained model behind the [`SegmentationBackend`] trait, so
//! the real network-backed implementation can be swapped for a
//! deterministic fake in tests. The stage itself only applies the returned
//! mask to the image's alpha channel.

#[cfg(feature = "onnx")]
pub mod onnx;
pub mod test_utils;

use crate::error::{Result, StudioError};
use image::{DynamicImage, GrayImage};
use log::debug;

/// Threshold above which a mask value counts as foreground
const FOREGROUND_THRESHOLD: u8 = 127;

/// Trait for segmentation model backends
///
/// A backend is a pure function of the input image as far as this stage is
/// concerned; any internal session state exists only for performance.
pub trait SegmentationBackend: Send {
    /// Classify each pixel of the image, returning a grayscale mask at the
    /// image's dimensions (0 = background, 255 = foreground; intermediate
    /// values are model confidence)
    fn segment(&mut self, image: &DynamicImage) -> Result<SegmentationMask>;

    /// Backend name for diagnostics
    fn name(&self) -> &'static str;
}

/// Grayscale segmentation mask
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentationMask {
    /// Mask data as grayscale values (0-255), row-major
    pub data: Vec<u8>,

    /// Mask dimensions (width, height)
    pub dimensions: (u32, u32),
}

impl SegmentationMask {
    /// Create a new segmentation mask, checking the buffer size invariant
    pub fn new(data: Vec<u8>, dimensions: (u32, u32)) -> Result<Self> {
        let (width, height) = dimensions;
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(StudioError::internal(format!(
                "mask buffer has {} samples, expected {expected} for {width}x{height}",
                data.len()
            )));
        }
        Ok(Self { data, dimensions })
    }

    /// Create a mask from a grayscale image
    #[must_use]
    pub fn from_image(image: &GrayImage) -> Self {
        Self {
            data: image.as_raw().clone(),
            dimensions: image.dimensions(),
        }
    }

    /// Convert the mask to a grayscale image
    pub fn to_image(&self) -> Result<GrayImage> {
        let (width, height) = self.dimensions;
        GrayImage::from_raw(width, height, self.data.clone())
            .ok_or_else(|| StudioError::internal("failed to create image from mask data"))
    }

    /// Resize the mask to new dimensions
    pub fn resize(&self, new_width: u32, new_height: u32) -> Result<SegmentationMask> {
        let current = self.to_image()?;
        let resized = image::imageops::resize(
            &current,
            new_width,
            new_height,
            image::imageops::FilterType::Triangle,
        );
        Ok(Self::from_image(&resized))
    }

    /// Fraction of pixels classified as foreground
    #[must_use]
    pub fn foreground_ratio(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        let foreground = self
            .data
            .iter()
            .filter(|&&v| v > FOREGROUND_THRESHOLD)
            .count();
        foreground as f32 / self.data.len() as f32
    }
}

/// Replace background pixels with transparency
///
/// The output always carries an alpha channel. The mask is binarized at
/// threshold 127, so every output alpha is exactly 0 or 255: foreground
/// pixels keep their original color with full opacity, background pixels
/// get zero opacity (their color samples are left as-is; only alpha
/// matters once transparent).
pub fn remove_background(
    image: &DynamicImage,
    backend: &mut dyn SegmentationBackend,
) -> Result<DynamicImage> {
    let (width, height) = (image.width(), image.height());
    debug!(
        "removing background: {width}x{height} via {}",
        backend.name()
    );

    let mask = backend.segment(image)?;
    let mask = if mask.dimensions == (width, height) {
        mask
    } else {
        mask.resize(width, height)?
    };

    let mut rgba = image.to_rgba8();
    for (pixel, &value) in rgba.pixels_mut().zip(mask.data.iter()) {
        pixel[3] = if value > FOREGROUND_THRESHOLD { 255 } else { 0 };
    }

    debug!(
        "segmentation kept {:.1}% of the frame",
        mask.foreground_ratio() * 100.0
    );

    Ok(DynamicImage::ImageRgba8(rgba))
}

/// Placeholder backend used when no real segmentation model is configured
///
/// Every call fails with `SegmentationUnavailable`, which is surfaced to
/// the caller rather than silently skipping the stage.
pub struct UnavailableBackend {
    reason: &'static str,
}

impl UnavailableBackend {
    /// Create a placeholder backend with a human-readable reason
    #[must_use]
    pub fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

impl Default for UnavailableBackend {
    fn default() -> Self {
        Self::new("no segmentation backend configured (build with the `onnx` feature and supply a model path)")
    }
}

impl SegmentationBackend for UnavailableBackend {
    fn segment(&mut self, _image: &DynamicImage) -> Result<SegmentationMask> {
        Err(StudioError::segmentation_unavailable(self.reason))
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use test_utils::FakeSegmenter;

    fn test_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([40, 80, 120])))
    }

    #[test]
    fn test_mask_size_invariant() {
        assert!(SegmentationMask::new(vec![0u8; 6], (2, 3)).is_ok());
        assert!(SegmentationMask::new(vec![0u8; 5], (2, 3)).is_err());
    }

    #[test]
    fn test_mask_resize() {
        let mask = SegmentationMask::new(vec![255u8; 16], (4, 4)).unwrap();
        let resized = mask.resize(8, 8).unwrap();
        assert_eq!(resized.dimensions, (8, 8));
        assert!(resized.data.iter().all(|&v| v == 255));
    }

    #[test]
    fn test_foreground_ratio() {
        let mask = SegmentationMask::new(vec![255, 255, 0, 0], (2, 2)).unwrap();
        assert!((mask.foreground_ratio() - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_remove_background_alpha_is_binary() {
        let image = test_image(10, 10);
        let mut backend = FakeSegmenter::foreground_rect(2, 2, 6, 6);

        let result = remove_background(&image, &mut backend).unwrap();
        assert!(result.color().has_alpha());

        for pixel in result.to_rgba8().pixels() {
            assert!(pixel[3] == 0 || pixel[3] == 255);
        }
    }

    #[test]
    fn test_opaque_pixels_keep_original_color() {
        let image = test_image(10, 10);
        let mut backend = FakeSegmenter::foreground_rect(2, 2, 6, 6);

        let result = remove_background(&image, &mut backend).unwrap();
        let rgba = result.to_rgba8();
        let original = image.to_rgba8();

        for (out, src) in rgba.pixels().zip(original.pixels()) {
            if out[3] == 255 {
                assert_eq!([out[0], out[1], out[2]], [src[0], src[1], src[2]]);
            }
        }
    }

    #[test]
    fn test_remove_background_marks_expected_region() {
        let image = test_image(10, 10);
        let mut backend = FakeSegmenter::foreground_rect(2, 2, 6, 6);

        let result = remove_background(&image, &mut backend).unwrap().to_rgba8();
        assert_eq!(result.get_pixel(4, 4)[3], 255); // inside the rect
        assert_eq!(result.get_pixel(0, 0)[3], 0); // outside the rect
        assert_eq!(result.get_pixel(9, 9)[3], 0);
    }

    #[test]
    fn test_unavailable_backend_surfaces_error() {
        let image = test_image(4, 4);
        let mut backend = UnavailableBackend::default();

        let result = remove_background(&image, &mut backend);
        assert!(matches!(
            result,
            Err(StudioError::SegmentationUnavailable(_))
        ));
    }
}
