//! Shared data model for a generation run.
//!
//! Everything a run consumes (the [`Project`] and its pages, blocks, assets
//! and SEO settings) and everything it produces ([`GeneratedFile`],
//! [`GeneratorResult`]) lives here so that every pipeline stage agrees on
//! one shape. Input types load from JSON or TOML project files.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Free-form block properties. Keys are property names, values arbitrary JSON.
pub type Properties = serde_json::Map<String, serde_json::Value>;

// =============================================================================
// Project input
// =============================================================================

/// The declarative description of one website. Immutable for the duration of
/// a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub business: BusinessInfo,
    /// Pages in navigation order.
    pub pages: Vec<Page>,
    #[serde(default)]
    pub assets: Vec<Asset>,
    #[serde(default)]
    pub template: TemplateRef,
    #[serde(default)]
    pub seo: SeoConfig,
    /// Extra block definitions overlaid on the stock catalog.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Block>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BusinessInfo {
    pub company_name: String,
    pub description: String,
    /// Industry category, used as the `serviceType` in structured data.
    pub industry: String,
    pub logo: Option<String>,
    pub contact: ContactInfo,
    pub location: Location,
    /// Platform name → profile URL. Ordered so output is stable.
    pub social_media: BTreeMap<String, String>,
    pub services: Vec<Service>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContactInfo {
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<Address>,
    pub hours: Vec<OpeningHours>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Day {
    /// Two-letter schema.org day code.
    pub fn code(self) -> &'static str {
        match self {
            Day::Monday => "Mo",
            Day::Tuesday => "Tu",
            Day::Wednesday => "We",
            Day::Thursday => "Th",
            Day::Friday => "Fr",
            Day::Saturday => "Sa",
            Day::Sunday => "Su",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpeningHours {
    pub day: Day,
    #[serde(default)]
    pub open: String,
    #[serde(default)]
    pub close: String,
    #[serde(default)]
    pub closed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Location {
    pub coordinates: Option<Coordinates>,
    pub service_area: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Service {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Price {
    pub amount: f64,
    pub currency: String,
}

/// Which template the project uses, plus its theme tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplateRef {
    pub id: String,
    pub variant: Option<String>,
    pub customizations: Customizations,
}

impl Default for TemplateRef {
    fn default() -> Self {
        Self {
            id: "modern-business".to_string(),
            variant: None,
            customizations: Customizations::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Customizations {
    pub colors: ColorTokens,
    pub fonts: FontTokens,
    pub spacing: SpacingTokens,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorTokens {
    pub primary: String,
    pub secondary: String,
    pub accent: String,
    pub background: String,
    pub text: String,
    pub text_secondary: String,
    pub border: String,
}

impl Default for ColorTokens {
    fn default() -> Self {
        Self {
            primary: "#2563eb".to_string(),
            secondary: "#1e40af".to_string(),
            accent: "#f59e0b".to_string(),
            background: "#ffffff".to_string(),
            text: "#111827".to_string(),
            text_secondary: "#6b7280".to_string(),
            border: "#e5e7eb".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FontTokens {
    pub heading: String,
    pub body: String,
    /// CSS length, e.g. `"16px"`.
    pub base_size: String,
}

impl Default for FontTokens {
    fn default() -> Self {
        Self {
            heading: "Inter, sans-serif".to_string(),
            body: "Inter, sans-serif".to_string(),
            base_size: "16px".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpacingTokens {
    /// Base spacing unit in pixels.
    pub base_unit: u32,
}

impl Default for SpacingTokens {
    fn default() -> Self {
        Self { base_unit: 8 }
    }
}

// =============================================================================
// Pages and blocks
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Page {
    pub id: String,
    /// URL path, e.g. `/`, `/about` or `/pricing.html`.
    pub path: String,
    pub title: String,
    #[serde(default)]
    pub is_home: bool,
    #[serde(default)]
    pub blocks: Vec<BlockInstance>,
    #[serde(default)]
    pub meta: PageMeta,
}

impl Page {
    /// Relative output file for this page.
    ///
    /// `/` becomes `index.html`, extensionless paths become directories with
    /// an `index.html`, and paths already ending in `.html` are kept.
    pub fn output_path(&self) -> PathBuf {
        page_output_path(&self.path)
    }

    /// Flagged `is_home`, or served at `/`.
    pub fn is_home_page(&self) -> bool {
        self.is_home || self.path == "/"
    }
}

/// See [`Page::output_path`].
pub fn page_output_path(path: &str) -> PathBuf {
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() {
        return PathBuf::from("index.html");
    }
    if trimmed.ends_with(".html") {
        PathBuf::from(trimmed)
    } else {
        PathBuf::from(trimmed.trim_end_matches('/')).join("index.html")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PageMeta {
    pub title: String,
    pub description: String,
    pub canonical: Option<String>,
    pub keywords: Vec<String>,
    pub last_modified: Option<NaiveDate>,
}

/// A use of a catalog block on a page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlockInstance {
    pub block_id: String,
    /// Variant ids, applied in this order.
    #[serde(default)]
    pub variants: Vec<String>,
    /// Instance-level overrides, applied last.
    #[serde(default)]
    pub props: Properties,
}

impl BlockInstance {
    pub fn new(block_id: &str) -> Self {
        Self {
            block_id: block_id.to_string(),
            variants: Vec::new(),
            props: Properties::new(),
        }
    }
}

/// Renderer family of a block. Unknown names are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Hero,
    Header,
    Features,
    Cta,
    Footer,
    Content,
    Other(String),
}

impl From<String> for Category {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "hero" => Category::Hero,
            "header" => Category::Header,
            "features" => Category::Features,
            "cta" => Category::Cta,
            "footer" => Category::Footer,
            "content" => Category::Content,
            _ => Category::Other(s),
        }
    }
}

impl From<Category> for String {
    fn from(c: Category) -> Self {
        c.to_string()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Hero => "hero",
            Category::Header => "header",
            Category::Features => "features",
            Category::Cta => "cta",
            Category::Footer => "footer",
            Category::Content => "content",
            Category::Other(name) => name.as_str(),
        };
        f.write_str(name)
    }
}

/// A reusable block definition from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Block {
    pub id: String,
    pub name: String,
    pub category: Category,
    #[serde(default)]
    pub defaults: Properties,
    #[serde(default)]
    pub variants: Vec<BlockVariant>,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// A named partial-property overlay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlockVariant {
    pub id: String,
    #[serde(default)]
    pub modifications: Properties,
}

// =============================================================================
// Assets
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Asset {
    /// Logical output path, e.g. `images/hero.jpg`.
    pub path: String,
    /// Where to read the bytes from. Relative origins resolve against the
    /// configured source directory.
    pub origin: PathBuf,
    pub kind: AssetKind,
    #[serde(default)]
    pub mime_type: String,
}

impl Asset {
    /// Build an asset record for a file, classifying it by extension.
    pub fn from_origin(path: &str, origin: impl Into<PathBuf>) -> Self {
        let origin = origin.into();
        let ext = extension_of(&origin);
        Self {
            path: path.to_string(),
            kind: AssetKind::from_extension(&ext),
            mime_type: mime_for_extension(&ext).to_string(),
            origin,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Image,
    Font,
    #[serde(other)]
    Other,
}

impl AssetKind {
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            "jpg" | "jpeg" | "png" | "gif" | "webp" | "svg" | "avif" | "tif" | "tiff" | "ico" => {
                AssetKind::Image
            }
            "woff" | "woff2" | "ttf" | "eot" | "otf" => AssetKind::Font,
            _ => AssetKind::Other,
        }
    }
}

/// Lowercased extension of a path, or an empty string.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

pub fn mime_for_extension(ext: &str) -> &'static str {
    match ext {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "tif" | "tiff" => "image/tiff",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "eot" => "application/vnd.ms-fontobject",
        "css" => "text/css",
        "js" | "mjs" => "text/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "html" | "htm" => "text/html",
        "txt" => "text/plain",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

// =============================================================================
// SEO configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SeoConfig {
    pub title: String,
    pub description: String,
    pub author: Option<String>,
    pub robots: RobotsConfig,
    pub open_graph: OpenGraph,
    pub twitter: TwitterCard,
    pub favicon: Option<FaviconSet>,
    pub sitemap: SitemapConfig,
    /// Custom JSON-LD documents emitted as-is.
    pub structured_data: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RobotsConfig {
    pub index: bool,
    pub follow: bool,
    pub noarchive: bool,
    pub nosnippet: bool,
    pub noimageindex: bool,
    pub max_snippet: Option<i32>,
    /// `none`, `standard` or `large`.
    pub max_image_preview: Option<String>,
    pub max_video_preview: Option<i32>,
}

impl Default for RobotsConfig {
    fn default() -> Self {
        Self {
            index: true,
            follow: true,
            noarchive: false,
            nosnippet: false,
            noimageindex: false,
            max_snippet: None,
            max_image_preview: None,
            max_video_preview: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OpenGraph {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Site base URL without trailing slash.
    pub url: String,
    pub site_name: String,
    pub locale: String,
    pub image: Option<OgImage>,
}

impl Default for OpenGraph {
    fn default() -> Self {
        Self {
            kind: "website".to_string(),
            title: None,
            description: None,
            url: String::new(),
            site_name: String::new(),
            locale: "en_US".to_string(),
            image: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OgImage {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub alt: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TwitterCard {
    pub card: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub site: Option<String>,
    pub creator: Option<String>,
    pub image: Option<String>,
    pub image_alt: Option<String>,
}

impl Default for TwitterCard {
    fn default() -> Self {
        Self {
            card: "summary_large_image".to_string(),
            title: None,
            description: None,
            site: None,
            creator: None,
            image: None,
            image_alt: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FaviconSet {
    pub ico: String,
    pub png16: String,
    pub png32: String,
    #[serde(default)]
    pub png192: Option<String>,
    #[serde(default)]
    pub apple_touch_icon: Option<String>,
    #[serde(default)]
    pub manifest: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SitemapConfig {
    pub enabled: bool,
    pub change_frequency: ChangeFrequency,
    /// Priority for non-home pages, 0.0 to 1.0.
    pub priority: f32,
    /// Paths left out of the sitemap and disallowed in robots.txt.
    pub exclude_paths: Vec<String>,
}

impl Default for SitemapConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            change_frequency: ChangeFrequency::Weekly,
            priority: 0.8,
            exclude_paths: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeFrequency {
    Always,
    Hourly,
    Daily,
    #[default]
    Weekly,
    Monthly,
    Yearly,
    Never,
}

impl ChangeFrequency {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeFrequency::Always => "always",
            ChangeFrequency::Hourly => "hourly",
            ChangeFrequency::Daily => "daily",
            ChangeFrequency::Weekly => "weekly",
            ChangeFrequency::Monthly => "monthly",
            ChangeFrequency::Yearly => "yearly",
            ChangeFrequency::Never => "never",
        }
    }
}

// =============================================================================
// Run output
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Html,
    Css,
    Js,
    Image,
    Font,
    Json,
    Xml,
    Other,
}

impl FileType {
    pub fn from_path(path: &Path) -> Self {
        match extension_of(path).as_str() {
            "html" | "htm" => FileType::Html,
            "css" => FileType::Css,
            "js" | "mjs" => FileType::Js,
            "jpg" | "jpeg" | "png" | "gif" | "webp" | "svg" | "avif" => FileType::Image,
            "woff" | "woff2" | "ttf" | "eot" | "otf" => FileType::Font,
            "json" => FileType::Json,
            "xml" => FileType::Xml,
            _ => FileType::Other,
        }
    }
}

/// One file in the generated bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedFile {
    /// Path relative to the output directory, `/`-separated.
    pub path: String,
    pub file_type: FileType,
    pub size: u64,
    /// First 8 hex characters of the SHA-256 of the final bytes.
    pub hash: String,
    pub optimized: bool,
    pub compressed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratorMetrics {
    pub duration_ms: u64,
    pub file_count: usize,
    pub total_size: u64,
    /// Bytes of files produced by a successful re-encode.
    pub compressed_size: u64,
    pub performance_score: u32,
    pub seo_score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

pub const GENERATION_ERROR: &str = "GENERATION_ERROR";
pub const CANCELLED: &str = "CANCELLED";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratorResult {
    pub success: bool,
    pub cancelled: bool,
    pub files: Vec<GeneratedFile>,
    pub metrics: GeneratorMetrics,
    pub errors: Vec<ErrorRecord>,
    pub warnings: Vec<String>,
}
