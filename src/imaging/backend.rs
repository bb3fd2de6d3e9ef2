//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three operations every backend must
//! support: identify, encode, and dominant color. All of them work on source
//! bytes already read into memory, so the transcoder reads each asset once
//! and the backend never touches the filesystem.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate.

use super::params::EncodeParams;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// `Sync` so one backend can be shared across the worker pool.
pub trait ImageBackend: Sync {
    /// Get image dimensions without a full decode where possible.
    fn identify(&self, source: &[u8]) -> Result<Dimensions, BackendError>;

    /// Decode `source`, apply the optional resize and blur, encode.
    fn encode(&self, params: &EncodeParams, source: &[u8]) -> Result<Vec<u8>, BackendError>;

    /// Average color of the image as RGB.
    fn dominant_color(&self, source: &[u8]) -> Result<[u8; 3], BackendError>;
}
