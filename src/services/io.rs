//! Image decode and encode adapters
//!
//! The source adapter turns uploaded bytes into an in-memory image; the
//! export adapter serializes a processed image back into PNG or JPEG bytes.
//! Both are deterministic given identical inputs.

use crate::{
    config::OutputFormat,
    error::{Result, StudioError},
};
use image::{DynamicImage, RgbImage};
use log::debug;

/// Decode uploaded bytes into an in-memory image
///
/// Channel count is inferred from the source encoding (3 for JPEG, 3 or 4
/// for PNG). Fails with a decode error when the bytes do not parse as a
/// supported image format.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    if bytes.is_empty() {
        return Err(StudioError::decode_error("empty input"));
    }
    let image = image::load_from_memory(bytes)?;
    debug!(
        "decoded image: {}x{}, color {:?}",
        image.width(),
        image.height(),
        image.color()
    );
    Ok(image)
}

/// Encode an image into the requested output format
///
/// PNG preserves an alpha channel if present. JPEG cannot carry alpha, so
/// any alpha is composited against a solid black background before
/// encoding rather than being silently dropped.
pub fn encode_image(image: &DynamicImage, format: OutputFormat, quality: u8) -> Result<Vec<u8>> {
    if quality > 100 {
        return Err(StudioError::param_value_error(
            "JPEG quality",
            quality,
            "0-100",
        ));
    }

    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);

    match format {
        OutputFormat::Png => {
            image.write_to(&mut cursor, image::ImageFormat::Png)?;
        },
        OutputFormat::Jpeg => {
            let rgb = if image.color().has_alpha() {
                flatten_alpha(image)
            } else {
                image.to_rgb8()
            };
            let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(cursor, quality);
            encoder.encode_image(&rgb)?;
        },
    }

    Ok(buffer)
}

/// Composite an image's alpha channel against a solid black background
///
/// Per-channel: `out = channel * alpha / 255`. Fully opaque pixels keep
/// their original color; fully transparent pixels become black.
#[must_use]
pub fn flatten_alpha(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut rgb = RgbImage::new(width, height);

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = u16::from(pixel[3]);
        let composite = |c: u8| ((u16::from(c) * alpha + 127) / 255) as u8;
        rgb.put_pixel(
            x,
            y,
            image::Rgb([composite(pixel[0]), composite(pixel[1]), composite(pixel[2])]),
        );
    }

    rgb
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, Rgba, RgbaImage};

    fn solid_rgb(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_image(&[0x00, 0x01, 0x02, 0x03]).is_err());
        assert!(decode_image(&[]).is_err());
    }

    #[test]
    fn test_png_round_trip_is_lossless() {
        let original = solid_rgb(10, 8, [12, 200, 99]);
        let bytes = encode_image(&original, OutputFormat::Png, 100).unwrap();
        let decoded = decode_image(&bytes).unwrap();

        assert_eq!(decoded.width(), 10);
        assert_eq!(decoded.height(), 8);
        assert_eq!(decoded.to_rgb8().as_raw(), original.to_rgb8().as_raw());
    }

    #[test]
    fn test_png_round_trip_preserves_alpha() {
        let mut rgba = RgbaImage::from_pixel(4, 4, Rgba([50, 60, 70, 255]));
        rgba.put_pixel(1, 1, Rgba([50, 60, 70, 0]));
        let original = DynamicImage::ImageRgba8(rgba);

        let bytes = encode_image(&original, OutputFormat::Png, 100).unwrap();
        let decoded = decode_image(&bytes).unwrap();

        assert!(decoded.color().has_alpha());
        assert_eq!(decoded.to_rgba8().as_raw(), original.to_rgba8().as_raw());
    }

    #[test]
    fn test_jpeg_round_trip_keeps_dimensions() {
        let original = solid_rgb(17, 11, [128, 128, 128]);
        let bytes = encode_image(&original, OutputFormat::Jpeg, 90).unwrap();
        let decoded = decode_image(&bytes).unwrap();

        // JPEG is lossy; only dimensions are asserted
        assert_eq!(decoded.width(), 17);
        assert_eq!(decoded.height(), 11);
    }

    #[test]
    fn test_jpeg_export_composites_alpha_against_black() {
        let mut rgba = RgbaImage::from_pixel(3, 3, Rgba([200, 100, 50, 255]));
        rgba.put_pixel(1, 1, Rgba([200, 100, 50, 0]));
        let image = DynamicImage::ImageRgba8(rgba);

        let flattened = flatten_alpha(&image);
        assert_eq!(flattened.get_pixel(0, 0), &Rgb([200, 100, 50]));
        assert_eq!(flattened.get_pixel(1, 1), &Rgb([0, 0, 0]));

        // Encoding must not fail on alpha input
        assert!(encode_image(&image, OutputFormat::Jpeg, 90).is_ok());
    }

    #[test]
    fn test_encode_rejects_bad_quality() {
        let image = solid_rgb(2, 2, [0, 0, 0]);
        assert!(encode_image(&image, OutputFormat::Jpeg, 101).is_err());
    }
}
