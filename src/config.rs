//! Generator configuration.
//!
//! Handles loading, validating, and merging `pagesmith.toml`. Stock defaults
//! are serialized to a TOML table and the user's file is merged on top, so a
//! config file only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! output_path = "dist"
//! base_url = ""              # e.g. "https://example.com" (no trailing slash)
//! source_dir = "."           # Relative asset origins resolve against this
//! environment = "production" # or "development"
//! # build_date = "2024-05-01" # Fixed sitemap lastmod fallback
//! report = false             # Write performance-report.json
//!
//! [performance.optimization]
//! minify_html = true
//! minify_css = true
//! minify_js = true
//! critical_css = true
//! lazy_loading = true
//! remove_comments = true
//! remove_whitespace = true
//!
//! [performance.styles]
//! autoprefixer = true
//! purge = true
//!
//! [performance.images]
//! modern_format = "avif"     # "webp" (lossless), or "original" to keep the source family
//! quality = 82
//! responsive_sizes = [640, 1024, 1600]
//!
//! [performance.images.placeholders]
//! blur = false
//! lqip = false
//! dominant_color = false
//!
//! [performance.caching]
//! enabled = true
//! public = true
//! max_age = 31536000
//! must_revalidate = false
//! immutable = true
//! vary_headers = []
//!
//! [performance.preloading]
//! dns_prefetch = []
//! preconnect = []
//!
//! [performance.expected_timings]
//! fcp = 1200.0
//! lcp = 2500.0
//! fid = 50.0
//! cls = 0.05
//! ttfb = 600.0
//!
//! [seo]
//! crawl_delay = 1
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Run configuration loaded from `pagesmith.toml`.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Directory the bundle is written to.
    pub output_path: String,
    /// Absolute site URL used for sitemap `<loc>` entries.
    pub base_url: String,
    /// Base directory for relative asset origins.
    pub source_dir: String,
    pub environment: Environment,
    /// Sitemap `lastmod` fallback when neither page nor project carry a date.
    pub build_date: Option<NaiveDate>,
    /// Whether to write `performance-report.json`.
    pub report: bool,
    pub performance: PerformanceConfig,
    pub seo: SeoSettings,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            output_path: "dist".to_string(),
            base_url: String::new(),
            source_dir: ".".to_string(),
            environment: Environment::Production,
            build_date: None,
            report: false,
            performance: PerformanceConfig::default(),
            seo: SeoSettings::default(),
        }
    }
}

impl GeneratorConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let images = &self.performance.images;
        if images.quality == 0 || images.quality > 100 {
            return Err(ConfigError::Validation(
                "performance.images.quality must be 1-100".into(),
            ));
        }
        if images.responsive_sizes.contains(&0) {
            return Err(ConfigError::Validation(
                "performance.images.responsive_sizes values must be non-zero".into(),
            ));
        }
        let t = &self.performance.expected_timings;
        if [t.fcp, t.lcp, t.fid, t.cls, t.ttfb]
            .iter()
            .any(|v| !v.is_finite() || *v < 0.0)
        {
            return Err(ConfigError::Validation(
                "performance.expected_timings values must be non-negative numbers".into(),
            ));
        }
        if self.output_path.trim().is_empty() {
            return Err(ConfigError::Validation("output_path must not be empty".into()));
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PerformanceConfig {
    pub optimization: OptimizationFlags,
    pub styles: StylesConfig,
    pub images: ImagesConfig,
    pub caching: CachingPolicy,
    pub preloading: PreloadingPolicy,
    /// Timings fed to the performance score. Nothing is measured.
    pub expected_timings: TimingMetrics,
}

/// Per-stage optimization switches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptimizationFlags {
    pub minify_html: bool,
    pub minify_css: bool,
    pub minify_js: bool,
    pub critical_css: bool,
    pub lazy_loading: bool,
    pub remove_comments: bool,
    pub remove_whitespace: bool,
}

impl Default for OptimizationFlags {
    fn default() -> Self {
        Self {
            minify_html: true,
            minify_css: true,
            minify_js: true,
            critical_css: true,
            lazy_loading: true,
            remove_comments: true,
            remove_whitespace: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StylesConfig {
    /// Add vendor-prefixed duplicates for a fixed set of properties.
    pub autoprefixer: bool,
    /// Drop rules that match nothing before selecting critical CSS.
    pub purge: bool,
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            autoprefixer: true,
            purge: true,
        }
    }
}

/// Target format for convertible images. `Original` re-encodes within the
/// source family (JPEG stays JPEG, PNG stays PNG).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModernFormat {
    Webp,
    Avif,
    Original,
}

/// Image transcoding settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Target format for convertible sources (jpg, png, tiff).
    pub modern_format: ModernFormat,
    /// Encoding quality (1 = worst, 100 = best).
    pub quality: u32,
    /// Pixel widths for responsive variants. Widths at or above the source
    /// width are skipped.
    pub responsive_sizes: Vec<u32>,
    pub placeholders: PlaceholderConfig,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            modern_format: ModernFormat::Avif,
            quality: 82,
            responsive_sizes: vec![640, 1024, 1600],
            placeholders: PlaceholderConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlaceholderConfig {
    pub blur: bool,
    pub lqip: bool,
    pub dominant_color: bool,
}

/// HTTP caching policy, reported as suggested headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CachingPolicy {
    pub enabled: bool,
    pub public: bool,
    /// Seconds.
    pub max_age: u64,
    pub stale_while_revalidate: Option<u64>,
    pub must_revalidate: bool,
    pub immutable: bool,
    pub vary_headers: Vec<String>,
}

impl Default for CachingPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            public: true,
            max_age: 31_536_000,
            stale_while_revalidate: None,
            must_revalidate: false,
            immutable: true,
            vary_headers: Vec::new(),
        }
    }
}

/// Origins to warm up with resource hints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreloadingPolicy {
    pub dns_prefetch: Vec<String>,
    pub preconnect: Vec<String>,
}

/// Web-vitals timings in milliseconds (CLS is unitless).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingMetrics {
    pub fcp: f64,
    pub lcp: f64,
    pub fid: f64,
    pub cls: f64,
    pub ttfb: f64,
}

impl Default for TimingMetrics {
    fn default() -> Self {
        Self {
            fcp: 1200.0,
            lcp: 2500.0,
            fid: 50.0,
            cls: 0.05,
            ttfb: 600.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SeoSettings {
    /// `Crawl-delay` value in robots.txt.
    pub crawl_delay: u32,
}

impl Default for SeoSettings {
    fn default() -> Self {
        Self { crawl_delay: 1 }
    }
}

// =============================================================================
// Run options
// =============================================================================

/// Per-invocation switches. Not read from the config file.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorOptions {
    pub parallel: bool,
    /// Worker count. `None` uses all cores.
    pub workers: Option<usize>,
    /// Memoize rendered blocks and encoded images within the run.
    pub cache: bool,
    /// Accepted for API parity; rebuild-on-change is not supported.
    pub watch: bool,
    pub verbose: bool,
    pub dry_run: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            workers: None,
            cache: true,
            watch: false,
            verbose: false,
            dry_run: false,
        }
    }
}

/// Resolve the effective worker count.
///
/// - `parallel == false` → 1
/// - `workers: None` → use all available cores
/// - `workers: Some(n)` → `min(n, cores)`, at least 1
pub fn effective_threads(options: &GeneratorOptions) -> usize {
    if !options.parallel {
        return 1;
    }
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    options
        .workers
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

pub const CONFIG_FILENAME: &str = "pagesmith.toml";

/// Returns the stock default config as a `toml::Value::Table`.
///
/// The base layer user overrides are merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(GeneratorConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<GeneratorConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: GeneratorConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a TOML file, falling back to defaults when it is absent.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(path: &Path) -> Result<GeneratorConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `pagesmith.toml` with all keys.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Pagesmith Configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# Directory the generated site is written to.
output_path = "dist"

# Absolute site URL used in sitemap.xml (no trailing slash).
base_url = ""

# Base directory for relative asset origins.
source_dir = "."

# "production" strips console/debugger calls from scripts.
environment = "production"

# Fixed lastmod fallback for sitemap entries (defaults to today).
# build_date = "2024-05-01"

# Write performance-report.json next to the site.
report = false

# ---------------------------------------------------------------------------
# Optimization switches
# ---------------------------------------------------------------------------
[performance.optimization]
minify_html = true
minify_css = true
minify_js = true
# Inline above-the-fold CSS and defer the full stylesheet.
critical_css = true
lazy_loading = true
remove_comments = true
remove_whitespace = true

[performance.styles]
# Add vendor-prefixed copies of selected properties.
autoprefixer = true
# Drop rules that match nothing before selecting critical CSS.
purge = true

# ---------------------------------------------------------------------------
# Images
# ---------------------------------------------------------------------------
[performance.images]
# Output format for jpg/png/tiff sources: "avif", "webp", or "original"
# (re-encode as the source family: jpeg stays jpeg, png stays png).
# WebP output is lossless and ignores quality.
modern_format = "avif"

# Encoding quality (1 = worst, 100 = best).
quality = 82

# Widths for responsive variants (<stem>-<width>w.<ext>).
responsive_sizes = [640, 1024, 1600]

[performance.images.placeholders]
blur = false
lqip = false
dominant_color = false

# ---------------------------------------------------------------------------
# Suggested HTTP caching headers
# ---------------------------------------------------------------------------
[performance.caching]
enabled = true
public = true
max_age = 31536000
# stale_while_revalidate = 86400
must_revalidate = false
immutable = true
vary_headers = []

# ---------------------------------------------------------------------------
# Resource hints added to every page
# ---------------------------------------------------------------------------
[performance.preloading]
dns_prefetch = []
preconnect = []

# ---------------------------------------------------------------------------
# Timings used for the performance score (milliseconds, CLS unitless)
# ---------------------------------------------------------------------------
[performance.expected_timings]
fcp = 1200.0
lcp = 2500.0
fid = 50.0
cls = 0.05
ttfb = 600.0

# ---------------------------------------------------------------------------
# SEO
# ---------------------------------------------------------------------------
[seo]
crawl_delay = 1
"##
}
