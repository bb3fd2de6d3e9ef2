//! Parameter types for image operations.
//!
//! These structs describe *what* to encode, not *how*. They are the
//! interface between [`operations`](super::operations) (which decides which
//! outputs an asset needs) and the [`backend`](super::backend) (which does
//! the pixel work), so a mock backend can stand in during tests.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`OutputFormat`]: Encoder family: JPEG, PNG, WebP or AVIF.
//! - [`EncodeParams`]: Format, quality, optional exact resize and optional blur.

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Jpeg,
    Png,
    Webp,
    Avif,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
            OutputFormat::Avif => "avif",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::Webp => "image/webp",
            OutputFormat::Avif => "image/avif",
        }
    }
}

/// Parameters for one encode of an in-memory source image.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeParams {
    pub format: OutputFormat,
    pub quality: Quality,
    /// Exact output dimensions. `None` keeps the source size.
    pub resize: Option<(u32, u32)>,
    /// Gaussian blur sigma applied after resizing.
    pub blur: Option<f32>,
}

impl EncodeParams {
    pub fn new(format: OutputFormat, quality: Quality) -> Self {
        Self {
            format,
            quality,
            resize: None,
            blur: None,
        }
    }

    pub fn resized(mut self, width: u32, height: u32) -> Self {
        self.resize = Some((width, height));
        self
    }

    pub fn blurred(mut self, sigma: f32) -> Self {
        self.blur = Some(sigma);
        self
    }
}
