//! High-level image operations.
//!
//! These functions combine calculations with backend execution. They take
//! configuration, compute parameters, and call the backend. None of them
//! touch the filesystem: callers hand in source bytes and get bytes back.

use super::backend::{BackendError, ImageBackend};
use super::calculations::{ResponsiveSize, calculate_fit_dimensions, calculate_responsive_sizes};
use super::params::{EncodeParams, OutputFormat, Quality};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::warn;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Longest edge of the blurred placeholder.
const BLUR_EDGE: u32 = 20;
const BLUR_SIGMA: f32 = 2.0;
/// Longest edge of the low-quality placeholder.
const LQIP_EDGE: u32 = 32;
const LQIP_QUALITY: u32 = 30;

/// Get image dimensions using the backend.
pub fn get_dimensions(backend: &impl ImageBackend, source: &[u8]) -> Result<(u32, u32)> {
    let dims = backend.identify(source)?;
    Ok((dims.width, dims.height))
}

/// One encoded responsive variant.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedVariant {
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

/// Configuration for responsive image generation.
#[derive(Debug, Clone)]
pub struct ResponsiveConfig {
    pub widths: Vec<u32>,
    pub format: OutputFormat,
    pub quality: Quality,
}

/// Encode responsive variants at every configured width below the source width.
///
/// A failing width is logged and dropped; the others are still returned.
pub fn create_responsive_images(
    backend: &impl ImageBackend,
    source: &[u8],
    original_dims: (u32, u32),
    config: &ResponsiveConfig,
) -> Vec<EncodedVariant> {
    calculate_responsive_sizes(original_dims, &config.widths)
        .into_iter()
        .filter_map(|ResponsiveSize { width, height }| {
            let params = EncodeParams::new(config.format, config.quality).resized(width, height);
            match backend.encode(&params, source) {
                Ok(bytes) => Some(EncodedVariant {
                    width,
                    height,
                    bytes,
                }),
                Err(e) => {
                    warn!(width, error = %e, "responsive variant failed");
                    None
                }
            }
        })
        .collect()
}

/// Encode `bytes` as a `data:` URI.
pub fn data_uri(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

/// Tiny blurred JPEG as a data URI.
pub fn blur_placeholder(
    backend: &impl ImageBackend,
    source: &[u8],
    original_dims: (u32, u32),
) -> Result<String> {
    let (w, h) = calculate_fit_dimensions(original_dims, BLUR_EDGE);
    let params = EncodeParams::new(OutputFormat::Jpeg, Quality::new(60))
        .resized(w, h)
        .blurred(BLUR_SIGMA);
    let bytes = backend.encode(&params, source)?;
    Ok(data_uri(OutputFormat::Jpeg.mime_type(), &bytes))
}

/// Tiny low-quality JPEG as a data URI.
pub fn lqip_placeholder(
    backend: &impl ImageBackend,
    source: &[u8],
    original_dims: (u32, u32),
) -> Result<String> {
    let (w, h) = calculate_fit_dimensions(original_dims, LQIP_EDGE);
    let params = EncodeParams::new(OutputFormat::Jpeg, Quality::new(LQIP_QUALITY)).resized(w, h);
    let bytes = backend.encode(&params, source)?;
    Ok(data_uri(OutputFormat::Jpeg.mime_type(), &bytes))
}

/// Average color as `#rrggbb`.
pub fn dominant_color_hex(backend: &impl ImageBackend, source: &[u8]) -> Result<String> {
    let [r, g, b] = backend.dominant_color(source)?;
    Ok(format!("#{:02x}{:02x}{:02x}", r, g, b))
}
