//! Pure Rust image processing backend on the `image` crate.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::load_from_memory` |
//! | Identify | `ImageReader::into_dimensions` (header only) |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Blur | `DynamicImage::blur` |
//! | Encode → JPEG | `JpegEncoder::new_with_quality` |
//! | Encode → PNG | `PngEncoder::new_with_quality` (best compression) |
//! | Encode → WebP | `WebPEncoder::new_lossless` |
//! | Encode → AVIF | `AvifEncoder` (rav1e, speed 6) |
//!
//! AVIF *sources* cannot be decoded: the `"avif"` feature only enables the
//! encoder. The transcoder passes AVIF sources through untouched.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::{EncodeParams, OutputFormat};
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::io::Cursor;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn decode(source: &[u8]) -> Result<DynamicImage, BackendError> {
    image::load_from_memory(source)
        .map_err(|e| BackendError::ProcessingFailed(format!("Failed to decode image: {}", e)))
}

fn encode_image(
    img: &DynamicImage,
    format: OutputFormat,
    quality: u32,
) -> Result<Vec<u8>, BackendError> {
    let mut buf = Vec::new();
    let result = match format {
        OutputFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality as u8))
        }
        OutputFormat::Png => img.write_with_encoder(PngEncoder::new_with_quality(
            &mut buf,
            CompressionType::Best,
            PngFilterType::Adaptive,
        )),
        // The `image` crate only encodes lossless WebP, so quality does not apply.
        OutputFormat::Webp => {
            let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
            rgba.write_with_encoder(WebPEncoder::new_lossless(&mut buf))
        }
        OutputFormat::Avif => {
            let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
            rgba.write_with_encoder(AvifEncoder::new_with_speed_quality(
                &mut buf,
                6,
                quality as u8,
            ))
        }
    };
    result.map_err(|e| {
        BackendError::ProcessingFailed(format!("{} encode failed: {}", format.extension(), e))
    })?;
    Ok(buf)
}

impl ImageBackend for RustBackend {
    fn identify(&self, source: &[u8]) -> Result<Dimensions, BackendError> {
        let (width, height) = ImageReader::new(Cursor::new(source))
            .with_guessed_format()?
            .into_dimensions()
            .map_err(|e| {
                BackendError::ProcessingFailed(format!("Failed to read dimensions: {}", e))
            })?;
        Ok(Dimensions { width, height })
    }

    fn encode(&self, params: &EncodeParams, source: &[u8]) -> Result<Vec<u8>, BackendError> {
        let mut img = decode(source)?;
        if let Some((width, height)) = params.resize {
            img = img.resize_exact(width, height, FilterType::Lanczos3);
        }
        if let Some(sigma) = params.blur {
            img = img.blur(sigma);
        }
        encode_image(&img, params.format, params.quality.value())
    }

    fn dominant_color(&self, source: &[u8]) -> Result<[u8; 3], BackendError> {
        let img = decode(source)?;
        let small = if img.width() <= 16 && img.height() <= 16 {
            img.to_rgb8()
        } else {
            img.thumbnail(16, 16).to_rgb8()
        };
        let count = (small.width() as u64 * small.height() as u64).max(1);
        let mut sums = [0u64; 3];
        for pixel in small.pixels() {
            for (sum, channel) in sums.iter_mut().zip(pixel.0) {
                *sum += channel as u64;
            }
        }
        Ok(sums.map(|s| (s / count) as u8))
    }
}
