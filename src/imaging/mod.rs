//! Image processing in pure Rust, statically linked.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` |
//! | **Resize → WebP/AVIF/JPEG/PNG** | Lanczos3 + the `image` encoders |
//! | **Placeholders** | tiny resize (+ blur) → JPEG → base64 data URI |
//! | **Dominant color** | 16px thumbnail, channel average |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{ResponsiveSize, calculate_fit_dimensions, calculate_responsive_sizes};
pub use operations::{
    EncodedVariant, ResponsiveConfig, blur_placeholder, create_responsive_images, data_uri,
    dominant_color_hex, get_dimensions, lqip_placeholder,
};
pub use params::{EncodeParams, OutputFormat, Quality};
pub use rust_backend::RustBackend;
