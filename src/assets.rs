//! Asset transcoding.
//!
//! Every [`Asset`] in a project goes through [`AssetTranscoder::process`]
//! exactly once per run. Dispatch is by kind:
//!
//! - **Images**: negotiate an output format, re-encode, produce responsive
//!   variants and optional placeholders.
//! - **Fonts**: copied through unchanged. No subsetting.
//! - **Everything else**: copied through unchanged.
//!
//! ## Format negotiation
//!
//! | Source extension | `modern_format = webp/avif` | `modern_format = original` |
//! |---|---|---|
//! | jpg, jpeg | WebP / AVIF | JPEG |
//! | png | WebP / AVIF | PNG |
//! | tif, tiff | WebP / AVIF | passthrough |
//! | gif, svg, ico, avif, webp | passthrough | passthrough |
//!
//! A re-encode that comes out larger than the source is discarded and the
//! source bytes are kept under the original path.
//!
//! ## Failure isolation
//!
//! `process` never fails. A read, decode or encode error yields the source
//! bytes (empty when the read itself failed) with `compressed = false`, and
//! a warning is logged. A failing responsive width drops only that variant.
//!
//! ## Output naming
//!
//! ```text
//! images/hero.jpg  (webp)  →  images/hero.webp
//!                              images/hero-640w.webp
//!                              images/hero-1024w.webp
//! ```

use crate::cache::{BuildCache, hash_bytes, hash_encode_params};
use crate::config::{ImagesConfig, ModernFormat};
use crate::imaging::{
    self, BackendError, Dimensions, EncodeParams, ImageBackend, OutputFormat, Quality,
    ResponsiveConfig,
};
use crate::types::{Asset, AssetKind, extension_of, mime_for_extension};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Backend(#[from] BackendError),
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// A transcoded asset ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedAsset {
    /// Output path relative to the bundle root.
    pub path: String,
    pub content: Vec<u8>,
    pub mime_type: String,
    /// True when `content` is the product of a successful re-encode.
    pub compressed: bool,
    pub variants: Vec<AssetVariant>,
    pub placeholders: Placeholders,
    /// Non-fatal problems met while processing, for the run's warning list.
    pub warnings: Vec<String>,
    /// The source could not be read; `content` is empty and nothing is written.
    pub read_failed: bool,
}

impl ProcessedAsset {
    /// Passthrough of the source bytes.
    fn passthrough(asset: &Asset, content: Vec<u8>) -> Self {
        let mime_type = if asset.mime_type.is_empty() {
            mime_for_extension(&extension_of(Path::new(&asset.path))).to_string()
        } else {
            asset.mime_type.clone()
        };
        Self {
            path: asset.path.clone(),
            content,
            mime_type,
            compressed: false,
            variants: Vec::new(),
            placeholders: Placeholders::default(),
            warnings: Vec::new(),
            read_failed: false,
        }
    }

    /// True when the source could not be read and there is nothing to write.
    pub fn is_missing(&self) -> bool {
        self.read_failed
    }

    /// `srcset` over the responsive variants plus the full-size output.
    pub fn srcset(&self, full_width: Option<u32>) -> String {
        let mut entries: Vec<(u32, String)> = self
            .variants
            .iter()
            .map(|v| (v.width, v.path.clone()))
            .collect();
        if let Some(w) = full_width {
            entries.push((w, self.path.clone()));
        }
        srcset(&entries)
    }
}

/// A resized copy of an image at `<stem>-<width>w.<ext>`.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetVariant {
    pub path: String,
    pub width: u32,
    pub height: u32,
    pub content: Vec<u8>,
}

/// Optional low-cost stand-ins shown while the real image loads.
///
/// Each field is empty when disabled or when generating it failed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Placeholders {
    /// Blurred tiny image as a data URI.
    pub blur: String,
    /// Low-quality tiny image as a data URI.
    pub lqip: String,
    /// `#rrggbb`.
    pub dominant_color: String,
}

/// Build a `srcset` attribute value from `(width, url)` pairs.
///
/// ```
/// # use pagesmith::assets::srcset;
/// let s = srcset(&[(640, "/a-640w.webp".into()), (1024, "/a-1024w.webp".into())]);
/// assert_eq!(s, "/a-640w.webp 640w, /a-1024w.webp 1024w");
/// ```
pub fn srcset(entries: &[(u32, String)]) -> String {
    entries
        .iter()
        .map(|(w, url)| format!("{} {}w", url, w))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `<source>` tags for a `<picture>` offering `path` in alternate formats.
///
/// Each format gets the same stem with its own extension, most efficient
/// format first as listed.
pub fn picture_sources(path: &str, formats: &[OutputFormat]) -> String {
    formats
        .iter()
        .map(|f| {
            format!(
                r#"<source type="{}" srcset="{}">"#,
                f.mime_type(),
                with_extension(path, f.extension())
            )
        })
        .collect::<Vec<_>>()
        .join("")
}

/// Replace the extension of a `/`-separated logical path.
fn with_extension(path: &str, ext: &str) -> String {
    let (dir, file) = match path.rfind('/') {
        Some(i) => (&path[..=i], &path[i + 1..]),
        None => ("", path),
    };
    let stem = match file.rfind('.') {
        Some(i) if i > 0 => &file[..i],
        _ => file,
    };
    format!("{}{}.{}", dir, stem, ext)
}

/// `<stem>-<width>w.<ext>` next to `path`.
fn variant_path(path: &str, width: u32, ext: &str) -> String {
    let base = with_extension(path, ext);
    let dot = base.rfind('.').unwrap_or(base.len());
    format!("{}-{}w{}", &base[..dot], width, &base[dot..])
}

/// Pick the output format for an image source, or `None` to pass through.
fn negotiate_format(ext: &str, modern: ModernFormat) -> Option<OutputFormat> {
    let convertible = matches!(ext, "jpg" | "jpeg" | "png" | "tif" | "tiff");
    if !convertible {
        return None;
    }
    match modern {
        ModernFormat::Webp => Some(OutputFormat::Webp),
        ModernFormat::Avif => Some(OutputFormat::Avif),
        ModernFormat::Original => match ext {
            "jpg" | "jpeg" => Some(OutputFormat::Jpeg),
            "png" => Some(OutputFormat::Png),
            _ => None,
        },
    }
}

/// Backend wrapper that memoizes `encode` in the run's [`BuildCache`].
struct CachingBackend<'a, B: ImageBackend> {
    inner: &'a B,
    cache: &'a BuildCache,
}

impl<B: ImageBackend> ImageBackend for CachingBackend<'_, B> {
    fn identify(&self, source: &[u8]) -> Result<Dimensions, BackendError> {
        self.inner.identify(source)
    }

    fn encode(&self, params: &EncodeParams, source: &[u8]) -> Result<Vec<u8>, BackendError> {
        if !self.cache.is_enabled() {
            return self.inner.encode(params, source);
        }
        let source_hash = hash_bytes(source);
        let params_hash = hash_encode_params(params);
        if let Some(bytes) = self.cache.get_encoded(&source_hash, &params_hash) {
            return Ok(bytes);
        }
        let bytes = self.inner.encode(params, source)?;
        self.cache
            .put_encoded(&source_hash, &params_hash, bytes.clone());
        Ok(bytes)
    }

    fn dominant_color(&self, source: &[u8]) -> Result<[u8; 3], BackendError> {
        self.inner.dominant_color(source)
    }
}

/// Per-run asset processor.
pub struct AssetTranscoder<'a, B: ImageBackend> {
    backend: CachingBackend<'a, B>,
    images: &'a ImagesConfig,
    source_dir: PathBuf,
}

impl<'a, B: ImageBackend> AssetTranscoder<'a, B> {
    pub fn new(
        backend: &'a B,
        images: &'a ImagesConfig,
        source_dir: impl Into<PathBuf>,
        cache: &'a BuildCache,
    ) -> Self {
        Self {
            backend: CachingBackend {
                inner: backend,
                cache,
            },
            images,
            source_dir: source_dir.into(),
        }
    }

    /// Absolute or source-dir-relative location of the asset bytes.
    pub fn resolve_origin(&self, asset: &Asset) -> PathBuf {
        if asset.origin.is_absolute() {
            asset.origin.clone()
        } else {
            self.source_dir.join(&asset.origin)
        }
    }

    /// Transform one asset. Never fails; see the module docs.
    pub fn process(&self, asset: &Asset) -> ProcessedAsset {
        let origin = self.resolve_origin(asset);
        let source = match fs::read(&origin) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(asset = %asset.path, origin = %origin.display(), error = %e, "asset read failed");
                let mut missing = ProcessedAsset::passthrough(asset, Vec::new());
                missing.read_failed = true;
                missing
                    .warnings
                    .push(format!("asset {}: {}: {}", asset.path, origin.display(), e));
                return missing;
            }
        };

        match asset.kind {
            AssetKind::Image => self.process_image(asset, source),
            AssetKind::Font | AssetKind::Other => ProcessedAsset::passthrough(asset, source),
        }
    }

    fn process_image(&self, asset: &Asset, source: Vec<u8>) -> ProcessedAsset {
        let ext = extension_of(Path::new(&asset.path));
        let Some(format) = negotiate_format(&ext, self.images.modern_format) else {
            debug!(asset = %asset.path, "image passed through");
            return ProcessedAsset::passthrough(asset, source);
        };

        match self.transcode(asset, &source, format) {
            Ok(processed) => processed,
            Err(e) => {
                warn!(asset = %asset.path, error = %e, "image transcode failed, keeping source");
                let mut kept = ProcessedAsset::passthrough(asset, source);
                kept.warnings
                    .push(format!("asset {}: transcode failed: {}", asset.path, e));
                kept
            }
        }
    }

    fn transcode(
        &self,
        asset: &Asset,
        source: &[u8],
        format: OutputFormat,
    ) -> Result<ProcessedAsset, AssetError> {
        let dims = imaging::get_dimensions(&self.backend, source)?;
        let quality = Quality::new(self.images.quality);
        let encoded = self
            .backend
            .encode(&EncodeParams::new(format, quality), source)?;

        let mut processed = if encoded.len() > source.len() {
            debug!(
                asset = %asset.path,
                source = source.len(),
                encoded = encoded.len(),
                "re-encode larger than source, keeping source"
            );
            ProcessedAsset::passthrough(asset, source.to_vec())
        } else {
            ProcessedAsset {
                path: with_extension(&asset.path, format.extension()),
                content: encoded,
                mime_type: format.mime_type().to_string(),
                compressed: true,
                variants: Vec::new(),
                placeholders: Placeholders::default(),
                warnings: Vec::new(),
                read_failed: false,
            }
        };

        let responsive = ResponsiveConfig {
            widths: self.images.responsive_sizes.clone(),
            format,
            quality,
        };
        processed.variants = imaging::create_responsive_images(&self.backend, source, dims, &responsive)
            .into_iter()
            .filter(|v| {
                let smaller = v.bytes.len() < source.len();
                if !smaller {
                    debug!(
                        asset = %asset.path,
                        width = v.width,
                        bytes = v.bytes.len(),
                        "variant not smaller than source, dropped"
                    );
                }
                smaller
            })
            .map(|v| AssetVariant {
                path: variant_path(&asset.path, v.width, format.extension()),
                width: v.width,
                height: v.height,
                content: v.bytes,
            })
            .collect();

        processed.placeholders = self.placeholders(asset, source, dims);
        Ok(processed)
    }

    fn placeholders(&self, asset: &Asset, source: &[u8], dims: (u32, u32)) -> Placeholders {
        let cfg = &self.images.placeholders;
        let or_empty = |kind: &str, r: Result<String, BackendError>| {
            r.unwrap_or_else(|e| {
                warn!(asset = %asset.path, kind, error = %e, "placeholder failed");
                String::new()
            })
        };
        Placeholders {
            blur: if cfg.blur {
                or_empty("blur", imaging::blur_placeholder(&self.backend, source, dims))
            } else {
                String::new()
            },
            lqip: if cfg.lqip {
                or_empty("lqip", imaging::lqip_placeholder(&self.backend, source, dims))
            } else {
                String::new()
            },
            dominant_color: if cfg.dominant_color {
                or_empty(
                    "dominant_color",
                    imaging::dominant_color_hex(&self.backend, source),
                )
            } else {
                String::new()
            },
        }
    }
}

/// Recursively collect every file under `root` as an [`Asset`].
///
/// Logical paths are relative to `root` with `/` separators; origins are
/// the absolute file paths. Hidden files are skipped. Output is sorted by
/// logical path.
pub fn scan_assets(root: &Path) -> Result<Vec<Asset>, AssetError> {
    let mut assets = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        let logical = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        assets.push(Asset::from_origin(&logical, entry.path()));
    }
    assets.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(assets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlaceholderConfig;
    use crate::imaging::RustBackend;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use tempfile::TempDir;

    fn images_config() -> ImagesConfig {
        ImagesConfig {
            modern_format: ModernFormat::Webp,
            quality: 82,
            responsive_sizes: vec![640, 1024],
            placeholders: PlaceholderConfig::default(),
        }
    }

    fn write_source(dir: &Path, name: &str, bytes: &[u8]) -> Asset {
        fs::write(dir.join(name), bytes).unwrap();
        Asset::from_origin(&format!("images/{}", name), name)
    }

    // =========================================================================
    // Path helpers
    // =========================================================================

    #[test]
    fn with_extension_replaces_last_extension() {
        assert_eq!(with_extension("images/hero.jpg", "webp"), "images/hero.webp");
        assert_eq!(with_extension("a.b/c.tar.gz", "x"), "a.b/c.tar.x");
        assert_eq!(with_extension("noext", "png"), "noext.png");
    }

    #[test]
    fn variant_path_appends_width() {
        assert_eq!(
            variant_path("images/hero.jpg", 640, "webp"),
            "images/hero-640w.webp"
        );
    }

    #[test]
    fn negotiate_table() {
        assert_eq!(negotiate_format("jpg", ModernFormat::Avif), Some(OutputFormat::Avif));
        assert_eq!(negotiate_format("tiff", ModernFormat::Webp), Some(OutputFormat::Webp));
        assert_eq!(negotiate_format("jpeg", ModernFormat::Original), Some(OutputFormat::Jpeg));
        assert_eq!(negotiate_format("png", ModernFormat::Original), Some(OutputFormat::Png));
        assert_eq!(negotiate_format("tif", ModernFormat::Original), None);
        for ext in ["gif", "svg", "ico", "avif", "webp"] {
            assert_eq!(negotiate_format(ext, ModernFormat::Webp), None, "{ext}");
        }
    }

    #[test]
    fn srcset_joins_entries() {
        assert_eq!(srcset(&[]), "");
        assert_eq!(srcset(&[(320, "/x.webp".into())]), "/x.webp 320w");
    }

    #[test]
    fn picture_sources_per_format() {
        let html = picture_sources("/img/a.jpg", &[OutputFormat::Avif, OutputFormat::Webp]);
        assert_eq!(
            html,
            r#"<source type="image/avif" srcset="/img/a.avif"><source type="image/webp" srcset="/img/a.webp">"#
        );
    }

    // =========================================================================
    // process
    // =========================================================================

    #[test]
    fn image_converted_with_variants() {
        let tmp = TempDir::new().unwrap();
        let asset = write_source(tmp.path(), "hero.jpg", &[0u8; 64]);
        let backend = MockBackend::with_dimensions(1200, 600);
        let cfg = images_config();
        let cache = BuildCache::new(true);
        let transcoder = AssetTranscoder::new(&backend, &cfg, tmp.path(), &cache);

        let out = transcoder.process(&asset);
        assert!(out.compressed);
        assert_eq!(out.path, "images/hero.webp");
        assert_eq!(out.mime_type, "image/webp");
        assert_eq!(out.content, vec![0xAB; 4]);
        let paths: Vec<&str> = out.variants.iter().map(|v| v.path.as_str()).collect();
        assert_eq!(paths, vec!["images/hero-640w.webp", "images/hero-1024w.webp"]);
        assert_eq!(out.variants[0].height, 320);
        assert_eq!(
            out.srcset(Some(1200)),
            "images/hero-640w.webp 640w, images/hero-1024w.webp 1024w, images/hero.webp 1200w"
        );
    }

    #[test]
    fn missing_source_yields_empty_uncompressed() {
        let tmp = TempDir::new().unwrap();
        let asset = Asset::from_origin("images/gone.jpg", "gone.jpg");
        let backend = MockBackend::with_dimensions(100, 100);
        let cfg = images_config();
        let cache = BuildCache::new(true);
        let transcoder = AssetTranscoder::new(&backend, &cfg, tmp.path(), &cache);

        let out = transcoder.process(&asset);
        assert!(!out.compressed);
        assert!(out.content.is_empty());
        assert_eq!(out.path, "images/gone.jpg");
        assert!(out.is_missing());
        assert!(out.read_failed);
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn corrupt_source_keeps_original_bytes() {
        let tmp = TempDir::new().unwrap();
        let asset = write_source(tmp.path(), "bad.png", MockBackend::CORRUPT);
        let backend = MockBackend::with_dimensions(100, 100);
        let cfg = images_config();
        let cache = BuildCache::new(true);
        let transcoder = AssetTranscoder::new(&backend, &cfg, tmp.path(), &cache);

        let out = transcoder.process(&asset);
        assert!(!out.compressed);
        assert_eq!(out.content, MockBackend::CORRUPT);
        assert_eq!(out.path, "images/bad.png");
        assert!(out.variants.is_empty());
        assert_eq!(out.warnings.len(), 1);
        assert!(!out.is_missing());
    }

    #[test]
    fn variants_not_smaller_than_source_are_dropped() {
        let tmp = TempDir::new().unwrap();
        let asset = write_source(tmp.path(), "hero.jpg", &[0u8; 64]);
        let backend = MockBackend::with_dimensions(1200, 600).with_encoded_len(64);
        let cfg = images_config();
        let cache = BuildCache::new(true);
        let transcoder = AssetTranscoder::new(&backend, &cfg, tmp.path(), &cache);

        let out = transcoder.process(&asset);
        assert!(out.variants.is_empty(), "{:?}", out.variants);
        assert!(out.compressed);
        assert_eq!(out.path, "images/hero.webp");
    }

    #[test]
    fn empty_undecodable_source_is_written_not_missing() {
        let tmp = TempDir::new().unwrap();
        let asset = write_source(tmp.path(), "blank.png", &[]);
        let backend = RustBackend::new();
        let cfg = images_config();
        let cache = BuildCache::new(false);
        let out = AssetTranscoder::new(&backend, &cfg, tmp.path(), &cache).process(&asset);

        assert!(out.content.is_empty());
        assert_eq!(out.warnings.len(), 1, "{:?}", out.warnings);
        assert!(out.warnings[0].contains("transcode failed"));
        assert!(!out.read_failed);
        assert!(!out.is_missing());
    }

    #[test]
    fn larger_reencode_keeps_source() {
        let tmp = TempDir::new().unwrap();
        let asset = write_source(tmp.path(), "tiny.png", &[1, 2]);
        let backend = MockBackend::with_dimensions(100, 100).with_encoded_len(50);
        let cfg = ImagesConfig {
            modern_format: ModernFormat::Original,
            ..images_config()
        };
        let cache = BuildCache::new(true);
        let transcoder = AssetTranscoder::new(&backend, &cfg, tmp.path(), &cache);

        let out = transcoder.process(&asset);
        assert!(!out.compressed);
        assert_eq!(out.content, vec![1, 2]);
        assert_eq!(out.path, "images/tiny.png");
        assert_eq!(out.mime_type, "image/png");
    }

    #[test]
    fn gif_passes_through_untouched() {
        let tmp = TempDir::new().unwrap();
        let asset = write_source(tmp.path(), "anim.gif", b"GIF89a");
        let backend = MockBackend::new();
        let cfg = images_config();
        let cache = BuildCache::new(true);
        let transcoder = AssetTranscoder::new(&backend, &cfg, tmp.path(), &cache);

        let out = transcoder.process(&asset);
        assert_eq!(out.content, b"GIF89a");
        assert_eq!(out.mime_type, "image/gif");
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn font_is_copied() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("inter.woff2"), b"wOF2").unwrap();
        let asset = Asset::from_origin("fonts/inter.woff2", "inter.woff2");
        let backend = MockBackend::new();
        let cfg = images_config();
        let cache = BuildCache::new(true);
        let out = AssetTranscoder::new(&backend, &cfg, tmp.path(), &cache).process(&asset);

        assert_eq!(out.content, b"wOF2");
        assert_eq!(out.mime_type, "font/woff2");
        assert!(!out.compressed);
    }

    #[test]
    fn identical_sources_encode_once_with_cache() {
        let tmp = TempDir::new().unwrap();
        let a = write_source(tmp.path(), "a.jpg", &[7u8; 32]);
        let b = write_source(tmp.path(), "b.jpg", &[7u8; 32]);
        let backend = MockBackend::with_dimensions(500, 500);
        let cfg = images_config();
        let cache = BuildCache::new(true);
        let transcoder = AssetTranscoder::new(&backend, &cfg, tmp.path(), &cache);

        let out_a = transcoder.process(&a);
        let out_b = transcoder.process(&b);
        assert_eq!(out_a.content, out_b.content);

        let encodes = backend
            .get_operations()
            .into_iter()
            .filter(|op| matches!(op, RecordedOp::Encode { .. }))
            .count();
        assert_eq!(encodes, 1);
    }

    #[test]
    fn placeholders_only_when_enabled() {
        let tmp = TempDir::new().unwrap();
        let asset = write_source(tmp.path(), "p.jpg", &[0u8; 16]);
        let backend = MockBackend::with_dimensions(400, 200);
        let cfg = ImagesConfig {
            responsive_sizes: vec![],
            placeholders: PlaceholderConfig {
                blur: true,
                lqip: false,
                dominant_color: true,
            },
            ..images_config()
        };
        let cache = BuildCache::new(false);
        let out = AssetTranscoder::new(&backend, &cfg, tmp.path(), &cache).process(&asset);

        assert!(out.placeholders.blur.starts_with("data:image/jpeg;base64,"));
        assert!(out.placeholders.lqip.is_empty());
        assert_eq!(out.placeholders.dominant_color, "#336699");
    }

    #[test]
    fn absolute_origin_ignores_source_dir() {
        let tmp = TempDir::new().unwrap();
        let abs = tmp.path().join("x.txt");
        fs::write(&abs, "hi").unwrap();
        let asset = Asset::from_origin("docs/x.txt", &abs);
        let backend = MockBackend::new();
        let cfg = images_config();
        let cache = BuildCache::new(true);
        let out = AssetTranscoder::new(&backend, &cfg, "/does/not/matter", &cache).process(&asset);
        assert_eq!(out.content, b"hi");
    }

    // =========================================================================
    // scan_assets
    // =========================================================================

    #[test]
    fn scan_assets_walks_recursively_and_sorts() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("images/team")).unwrap();
        fs::create_dir_all(tmp.path().join("fonts")).unwrap();
        fs::write(tmp.path().join("images/team/ana.png"), "x").unwrap();
        fs::write(tmp.path().join("images/hero.jpg"), "x").unwrap();
        fs::write(tmp.path().join("fonts/inter.woff2"), "x").unwrap();
        fs::write(tmp.path().join(".DS_Store"), "x").unwrap();

        let assets = scan_assets(tmp.path()).unwrap();
        let paths: Vec<&str> = assets.iter().map(|a| a.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["fonts/inter.woff2", "images/hero.jpg", "images/team/ana.png"]
        );
        assert_eq!(assets[0].kind, AssetKind::Font);
        assert_eq!(assets[1].kind, AssetKind::Image);
        assert!(assets[2].origin.is_absolute() || assets[2].origin.starts_with(tmp.path()));
    }
}
