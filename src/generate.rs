//! Site generation.
//!
//! [`Generator`] turns a [`Project`] into a deployable bundle. One call to
//! [`Generator::generate`] is one run:
//!
//! ```text
//! 1. Output directory    created up front; failure aborts the run
//! 2. Assets              transcoded in parallel
//! 3. Pages               compose → SEO → critical CSS → HTML minify, in parallel
//! 4. Write               assets, pages, css/<id>.css, js/<id>.js
//! 5. Crawler files       robots.txt, sitemap.xml
//! 6. Report              performance-report.json (when enabled)
//! ```
//!
//! ## Output Structure
//!
//! ```text
//! dist/
//! ├── index.html                 # page "/"
//! ├── about/index.html           # page "/about"
//! ├── pricing.html               # page "/pricing.html", kept as-is
//! ├── css/home.css               # one stylesheet per page
//! ├── js/home.js                 # only when the page has script
//! ├── assets/hero.avif           # assets at their logical path
//! ├── assets/hero-640w.avif      # responsive variants
//! ├── robots.txt
//! └── sitemap.xml
//! ```
//!
//! ## Concurrency
//!
//! Each run builds its own rayon pool sized by
//! [`effective_threads`](crate::config::effective_threads). Workers send
//! `(index, output)` pairs over an mpsc channel and the orchestrator, the
//! only place results are accumulated, puts them back in input order. All
//! writes happen on the calling thread after both parallel phases, so file
//! order and content hashes do not depend on scheduling.
//!
//! ## Failures
//!
//! A failed asset or page becomes a warning and the run carries on. A
//! failure to create the output directory, or a panic anywhere in the run,
//! ends it with a single [`GENERATION_ERROR`] record. A cancelled run
//! writes nothing and reports [`CANCELLED`].

use crate::assets::{AssetTranscoder, ProcessedAsset};
use crate::blocks::{BlockCatalog, RenderError, compose_page};
use crate::cache::{CacheStats, content_hash};
use crate::config::{GeneratorConfig, GeneratorOptions, effective_threads};
use crate::context::GeneratorContext;
use crate::critical_css;
use crate::imaging::{ImageBackend, RustBackend};
use crate::optimize::{self, generate_performance_report};
use crate::seo::{self, calculate_seo_score};
use crate::types::{
    CANCELLED, ErrorRecord, FileType, GENERATION_ERROR, GeneratedFile, GeneratorMetrics,
    GeneratorResult, Page, Project,
};
use chrono::{Local, Utc};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::any::Any;
use std::fs;
use std::io::ErrorKind;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Sender, channel};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
    #[error("Thread pool error: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error("cannot create output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Cooperative cancellation flag, checked before each asset and page.
///
/// Clones share the flag, so one clone can be handed to another thread
/// (a signal handler, a UI) while the run holds the other.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress events sent while a run is in flight.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerateEvent {
    /// An asset finished transcoding.
    Asset {
        path: String,
        variants: usize,
        compressed: bool,
    },
    /// A page finished rendering.
    Page { id: String, path: String },
    /// An asset or page was skipped or degraded.
    Warning(String),
}

/// Final bytes of one page and its companion files.
struct PageOutput {
    path: String,
    html: String,
    css: String,
    js: String,
}

pub struct Generator<B: ImageBackend = RustBackend> {
    config: GeneratorConfig,
    options: GeneratorOptions,
    catalog: BlockCatalog,
    backend: B,
}

impl Generator<RustBackend> {
    /// Generator with the stock block catalog and the `image`-crate backend.
    pub fn new(config: GeneratorConfig, options: GeneratorOptions) -> Self {
        Self {
            config,
            options,
            catalog: BlockCatalog::stock(),
            backend: RustBackend::new(),
        }
    }
}

impl<B: ImageBackend> Generator<B> {
    /// Replace the block catalog. Project-supplied blocks still overlay it.
    pub fn with_catalog(mut self, catalog: BlockCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Swap the image backend.
    pub fn with_backend<C: ImageBackend>(self, backend: C) -> Generator<C> {
        Generator {
            config: self.config,
            options: self.options,
            catalog: self.catalog,
            backend,
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    pub fn generate(&self, project: &Project) -> GeneratorResult {
        self.generate_with_cancellation(project, &CancellationToken::new())
    }

    pub fn generate_with_cancellation(
        &self,
        project: &Project,
        token: &CancellationToken,
    ) -> GeneratorResult {
        self.generate_with_progress(project, token, None)
    }

    /// Run a generation, sending [`GenerateEvent`]s to `progress` as units
    /// complete. Never panics and never returns `Err`: every outcome is
    /// described by the returned [`GeneratorResult`].
    pub fn generate_with_progress(
        &self,
        project: &Project,
        token: &CancellationToken,
        progress: Option<Sender<GenerateEvent>>,
    ) -> GeneratorResult {
        let start = Instant::now();
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.run(project, token, progress.as_ref(), start)
        }));

        let mut result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                warn!(error = %e, "generation failed");
                failed(ErrorRecord {
                    code: GENERATION_ERROR.to_string(),
                    message: e.to_string(),
                    stack: Some(format!("{:?}", e)),
                })
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(%message, "generation panicked");
                failed(ErrorRecord {
                    code: GENERATION_ERROR.to_string(),
                    message,
                    stack: None,
                })
            }
        };
        result.metrics.duration_ms = elapsed_ms(start);
        result
    }

    fn run(
        &self,
        project: &Project,
        token: &CancellationToken,
        progress: Option<&Sender<GenerateEvent>>,
        start: Instant,
    ) -> Result<GeneratorResult, GenerateError> {
        let config = &self.config;
        let dry_run = self.options.dry_run;
        let output_dir = PathBuf::from(&config.output_path);

        if !dry_run {
            fs::create_dir_all(&output_dir).map_err(|source| GenerateError::OutputDir {
                path: output_dir.clone(),
                source,
            })?;
        }
        if self.options.watch {
            warn!("watch mode is not supported, building once");
        }

        let build_date = config
            .build_date
            .unwrap_or_else(|| Local::now().date_naive());
        let catalog = self.catalog.with_overlay(&project.blocks);
        let ctx = GeneratorContext::new(config, &catalog, self.options.cache, build_date);
        let threads = effective_threads(&self.options);
        let pool = ThreadPoolBuilder::new().num_threads(threads).build()?;

        info!(
            project = %project.name,
            pages = project.pages.len(),
            assets = project.assets.len(),
            threads,
            dry_run,
            "generating site"
        );

        let transcoder = AssetTranscoder::new(
            &self.backend,
            &config.performance.images,
            &config.source_dir,
            &ctx.cache,
        );
        let Some(assets) = run_indexed(&pool, &project.assets, token, |asset| {
            let processed = transcoder.process(asset);
            notify(
                progress,
                GenerateEvent::Asset {
                    path: processed.path.clone(),
                    variants: processed.variants.len(),
                    compressed: processed.compressed,
                },
            );
            for w in &processed.warnings {
                notify(progress, GenerateEvent::Warning(w.clone()));
            }
            processed
        }) else {
            return Ok(cancelled());
        };

        let Some(pages) = run_indexed(&pool, &project.pages, token, |page| {
            let output = build_page(page, project, &ctx);
            match &output {
                Ok(out) => notify(
                    progress,
                    GenerateEvent::Page {
                        id: page.id.clone(),
                        path: out.path.clone(),
                    },
                ),
                Err(e) => notify(
                    progress,
                    GenerateEvent::Warning(format!("page {}: {}", page.id, e)),
                ),
            }
            output
        }) else {
            return Ok(cancelled());
        };

        if token.is_cancelled() {
            return Ok(cancelled());
        }

        let mut bundle = Bundle::new(&output_dir, dry_run);
        for asset in &assets {
            bundle.warnings.extend(asset.warnings.iter().cloned());
            write_asset(&mut bundle, asset);
        }

        let flags = &config.performance.optimization;
        for (page, output) in project.pages.iter().zip(pages) {
            let output = match output {
                Ok(output) => output,
                Err(e) => {
                    warn!(page = %page.id, error = %e, "page skipped");
                    bundle.warnings.push(format!("page {}: {}", page.id, e));
                    continue;
                }
            };
            bundle.add_lenient(&output.path, output.html.as_bytes(), flags.minify_html, false);
            bundle.add_lenient(
                &format!("css/{}.css", page.id),
                output.css.as_bytes(),
                flags.minify_css,
                false,
            );
            if !output.js.is_empty() {
                bundle.add_lenient(
                    &format!("js/{}.js", page.id),
                    output.js.as_bytes(),
                    flags.minify_js,
                    false,
                );
            }
        }

        let base_url = site_url(config, project);
        bundle.add(
            "robots.txt",
            seo::generate_robots_txt(project, base_url, config.seo.crawl_delay).as_bytes(),
            false,
            false,
        )?;
        bundle.add(
            "sitemap.xml",
            seo::generate_sitemap(project, base_url, build_date).as_bytes(),
            false,
            false,
        )?;

        let mut metrics = bundle.metrics(config, project);
        metrics.duration_ms = elapsed_ms(start);
        if config.report {
            let report = generate_performance_report(&project.name, config, &metrics, Utc::now());
            let json = serde_json::to_string_pretty(&report)?;
            bundle.add("performance-report.json", json.as_bytes(), false, false)?;
            metrics = bundle.metrics(config, project);
        }

        log_cache_stats(ctx.cache.stats());
        info!(
            files = metrics.file_count,
            bytes = metrics.total_size,
            warnings = bundle.warnings.len(),
            "site generated"
        );

        Ok(GeneratorResult {
            success: true,
            cancelled: false,
            files: bundle.files,
            metrics,
            errors: Vec::new(),
            warnings: bundle.warnings,
        })
    }
}

/// Render one page through the full pipeline.
fn build_page(
    page: &Page,
    project: &Project,
    ctx: &GeneratorContext<'_>,
) -> Result<PageOutput, RenderError> {
    let composed = compose_page(page, project, ctx)?;
    let html = seo::optimize(&composed.html, page, project);
    let html = critical_css::process(&html, page, ctx);
    let html = optimize::optimize_html(&html, ctx.config);
    debug!(page = %page.id, bytes = html.len(), "page rendered");
    Ok(PageOutput {
        path: relative_string(&page.output_path()),
        html,
        css: optimize::optimize_css(&composed.css, ctx.config),
        js: if composed.js.is_empty() {
            String::new()
        } else {
            optimize::optimize_js(&composed.js, ctx.config)
        },
    })
}

/// Apply `f` to every item on `pool`, returning outputs in input order.
///
/// `None` when the token was cancelled before every item ran.
fn run_indexed<T, R, F>(
    pool: &ThreadPool,
    items: &[T],
    token: &CancellationToken,
    f: F,
) -> Option<Vec<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    let (tx, rx) = channel();
    pool.install(|| {
        items
            .par_iter()
            .enumerate()
            .for_each_with(tx, |tx, (index, item)| {
                if token.is_cancelled() {
                    return;
                }
                // The receiver outlives the pool, so send cannot fail here.
                let _ = tx.send((index, f(item)));
            });
    });

    let mut results: Vec<(usize, R)> = rx.into_iter().collect();
    if token.is_cancelled() || results.len() != items.len() {
        return None;
    }
    results.sort_by_key(|(index, _)| *index);
    Some(results.into_iter().map(|(_, r)| r).collect())
}

fn write_asset(bundle: &mut Bundle, asset: &ProcessedAsset) {
    if asset.is_missing() {
        return;
    }
    bundle.add_lenient(&asset.path, &asset.content, asset.compressed, asset.compressed);
    for variant in &asset.variants {
        bundle.add_lenient(&variant.path, &variant.content, true, true);
    }
}

/// Files written so far plus the warnings collected along the way.
struct Bundle<'a> {
    root: &'a Path,
    dry_run: bool,
    files: Vec<GeneratedFile>,
    warnings: Vec<String>,
}

impl<'a> Bundle<'a> {
    fn new(root: &'a Path, dry_run: bool) -> Self {
        Self {
            root,
            dry_run,
            files: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Write `bytes` at `path` under the root and record it.
    ///
    /// `path` is a logical path: a leading `/` is dropped, and a path that
    /// would leave the root is refused with `InvalidInput`.
    fn add(
        &mut self,
        path: &str,
        bytes: &[u8],
        optimized: bool,
        compressed: bool,
    ) -> Result<(), std::io::Error> {
        let Some(path) = output_relative_path(path) else {
            return Err(std::io::Error::new(
                ErrorKind::InvalidInput,
                format!("unsafe output path '{path}'"),
            ));
        };
        let path = path.as_str();
        if !self.dry_run {
            let target = self.root.join(path);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, bytes)?;
        }
        debug!(path, bytes = bytes.len(), "file written");
        self.files.push(GeneratedFile {
            path: path.to_string(),
            file_type: FileType::from_path(Path::new(path)),
            size: bytes.len() as u64,
            hash: content_hash(bytes),
            optimized,
            compressed,
        });
        Ok(())
    }

    /// Like [`Bundle::add`], but a write failure becomes a warning.
    fn add_lenient(&mut self, path: &str, bytes: &[u8], optimized: bool, compressed: bool) {
        if let Err(e) = self.add(path, bytes, optimized, compressed) {
            warn!(path, error = %e, "write failed");
            self.warnings.push(format!("{}: {}", path, e));
        }
    }

    fn metrics(&self, config: &GeneratorConfig, project: &Project) -> GeneratorMetrics {
        GeneratorMetrics {
            duration_ms: 0,
            file_count: self.files.len(),
            total_size: self.files.iter().map(|f| f.size).sum(),
            compressed_size: self
                .files
                .iter()
                .filter(|f| f.compressed)
                .map(|f| f.size)
                .sum(),
            performance_score: optimize::calculate_performance_score(
                &config.performance.expected_timings,
            ),
            seo_score: calculate_seo_score(project),
        }
    }
}

/// Sitemap base: the configured `base_url`, else the Open Graph URL.
fn site_url<'a>(config: &'a GeneratorConfig, project: &'a Project) -> &'a str {
    let url = if config.base_url.is_empty() {
        project.seo.open_graph.url.as_str()
    } else {
        config.base_url.as_str()
    };
    url.trim_end_matches('/')
}

/// Normalize a logical output path to a `/`-separated path under the
/// output root. `None` for `..`, drive prefixes, or an empty result.
fn output_relative_path(path: &str) -> Option<String> {
    let mut parts = Vec::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::RootDir | Component::CurDir => {}
            Component::ParentDir | Component::Prefix(_) => return None,
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// `/`-separated form of a relative path.
fn relative_string(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn notify(progress: Option<&Sender<GenerateEvent>>, event: GenerateEvent) {
    if let Some(tx) = progress {
        let _ = tx.send(event);
    }
}

fn log_cache_stats(stats: CacheStats) {
    if stats.total() > 0 {
        debug!(%stats, "build cache");
    }
}

fn failed(error: ErrorRecord) -> GeneratorResult {
    GeneratorResult {
        success: false,
        errors: vec![error],
        ..GeneratorResult::default()
    }
}

fn cancelled() -> GeneratorResult {
    info!("generation cancelled");
    GeneratorResult {
        cancelled: true,
        ..failed(ErrorRecord {
            code: CANCELLED.to_string(),
            message: "generation cancelled".to_string(),
            stack: None,
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::MockBackend;
    use crate::imaging::{BackendError, Dimensions, EncodeParams};
    use crate::test_helpers::*;
    use crate::types::{Asset, BlockInstance};
    use tempfile::TempDir;

    fn fixture_config(tmp: &TempDir) -> GeneratorConfig {
        GeneratorConfig {
            output_path: tmp.path().join("dist").to_string_lossy().into_owned(),
            source_dir: tmp.path().to_string_lossy().into_owned(),
            build_date: Some(build_date()),
            ..GeneratorConfig::default()
        }
    }

    fn mock_generator(config: GeneratorConfig, options: GeneratorOptions) -> Generator<MockBackend> {
        Generator::new(config, options).with_backend(MockBackend::with_dimensions(1600, 900))
    }

    fn with_hero(tmp: &TempDir) {
        fs::write(tmp.path().join("assets/hero.jpg"), [0u8; 256]).unwrap();
    }

    struct PanicBackend;

    impl ImageBackend for PanicBackend {
        fn identify(&self, _source: &[u8]) -> Result<Dimensions, BackendError> {
            panic!("backend exploded");
        }

        fn encode(&self, _params: &EncodeParams, _source: &[u8]) -> Result<Vec<u8>, BackendError> {
            panic!("backend exploded");
        }

        fn dominant_color(&self, _source: &[u8]) -> Result<[u8; 3], BackendError> {
            panic!("backend exploded");
        }
    }

    // =========================================================================
    // Cancellation token
    // =========================================================================

    #[test]
    fn token_clones_share_state() {
        let token = CancellationToken::new();
        let other = token.clone();
        assert!(!token.is_cancelled());
        other.cancel();
        assert!(token.is_cancelled());
    }

    // =========================================================================
    // Full runs
    // =========================================================================

    #[test]
    fn generates_expected_layout() {
        let tmp = setup_fixtures();
        with_hero(&tmp);
        let config = fixture_config(&tmp);
        let out = PathBuf::from(&config.output_path);
        let result = mock_generator(config, GeneratorOptions::default()).generate(&sample_project());

        assert!(result.success, "{:?}", result.errors);
        assert!(!result.cancelled);
        assert!(result.errors.is_empty());

        for path in [
            "index.html",
            "about/index.html",
            "pricing.html",
            "css/home.css",
            "robots.txt",
            "sitemap.xml",
            "assets/logo.svg",
            "assets/hero.avif",
            "assets/hero-640w.avif",
            "fonts/inter.woff2",
        ] {
            find_file(&result, path);
            assert!(out.join(path).is_file(), "{path} not on disk");
        }
        assert!(!out.join("performance-report.json").exists());
    }

    #[test]
    fn file_order_is_assets_then_pages_then_crawler_files() {
        let tmp = setup_fixtures();
        with_hero(&tmp);
        let result = mock_generator(fixture_config(&tmp), GeneratorOptions::default())
            .generate(&sample_project());
        let paths = file_paths(&result);

        assert_eq!(paths[0], "assets/logo.svg");
        assert_eq!(paths[1], "assets/hero.avif");
        let home = paths.iter().position(|p| *p == "index.html").unwrap();
        let about = paths.iter().position(|p| *p == "about/index.html").unwrap();
        let fonts = paths.iter().position(|p| *p == "fonts/inter.woff2").unwrap();
        assert!(fonts < home && home < about);
        assert_eq!(&paths[paths.len() - 2..], &["robots.txt", "sitemap.xml"]);
    }

    #[test]
    fn recorded_hash_and_size_match_disk() {
        let tmp = setup_fixtures();
        let config = fixture_config(&tmp);
        let out = PathBuf::from(&config.output_path);
        let result = mock_generator(config, GeneratorOptions::default()).generate(&sample_project());

        for file in &result.files {
            let bytes = fs::read(out.join(&file.path)).unwrap();
            assert_eq!(file.size, bytes.len() as u64, "{}", file.path);
            assert_eq!(file.hash, content_hash(&bytes), "{}", file.path);
            assert_eq!(file.hash.len(), 8);
        }
    }

    #[test]
    fn missing_asset_is_a_warning() {
        let tmp = setup_fixtures();
        let result = mock_generator(fixture_config(&tmp), GeneratorOptions::default())
            .generate(&sample_project());

        assert!(result.success);
        assert!(
            result.warnings.iter().any(|w| w.contains("assets/hero.jpg")),
            "{:?}",
            result.warnings
        );
        assert!(!file_paths(&result).iter().any(|p| p.starts_with("assets/hero")));
        find_file(&result, "index.html");
    }

    #[test]
    fn unknown_block_skips_only_that_page() {
        let tmp = setup_fixtures();
        let mut project = sample_project();
        project.pages[1].blocks.push(BlockInstance::new("no-such-block"));

        let result = mock_generator(fixture_config(&tmp), GeneratorOptions::default())
            .generate(&project);

        assert!(result.success);
        assert!(result.warnings.iter().any(|w| w.contains("no-such-block")));
        let paths = file_paths(&result);
        assert!(!paths.contains(&"about/index.html"));
        assert!(!paths.contains(&"css/about.css"));
        assert!(paths.contains(&"index.html"));
    }

    #[test]
    fn pages_carry_seo_and_critical_css() {
        let tmp = setup_fixtures();
        let config = fixture_config(&tmp);
        let out = PathBuf::from(&config.output_path);
        mock_generator(config, GeneratorOptions::default()).generate(&sample_project());

        let home = fs::read_to_string(out.join("index.html")).unwrap();
        assert!(home.contains(r#"property="og:title""#), "{home}");
        assert!(home.contains("application/ld+json"));
        assert!(home.contains(r#"id="critical-css""#));
        assert!(home.contains("/css/home.css"));
        assert!(!home.contains("<!--"));
    }

    #[test]
    fn sitemap_uses_og_url_and_skips_excluded() {
        let tmp = setup_fixtures();
        let config = fixture_config(&tmp);
        let out = PathBuf::from(&config.output_path);
        mock_generator(config, GeneratorOptions::default()).generate(&sample_project());

        let sitemap = fs::read_to_string(out.join("sitemap.xml")).unwrap();
        assert!(sitemap.contains("<loc>https://acme.example</loc>"));
        assert!(sitemap.contains("<loc>https://acme.example/about</loc>"));
        assert!(!sitemap.contains("pricing"));
    }

    #[test]
    fn configured_base_url_wins_over_og_url() {
        let tmp = setup_fixtures();
        let config = GeneratorConfig {
            base_url: "https://www.acme.test/".to_string(),
            ..fixture_config(&tmp)
        };
        let out = PathBuf::from(&config.output_path);
        mock_generator(config, GeneratorOptions::default()).generate(&sample_project());

        let sitemap = fs::read_to_string(out.join("sitemap.xml")).unwrap();
        assert!(sitemap.contains("<loc>https://www.acme.test/about</loc>"));
        let robots = fs::read_to_string(out.join("robots.txt")).unwrap();
        assert!(robots.contains("Sitemap: https://www.acme.test/sitemap.xml"), "{robots}");
        assert!(!robots.contains("acme.example"));
    }

    #[test]
    fn metrics_summarize_files() {
        let tmp = setup_fixtures();
        with_hero(&tmp);
        let project = sample_project();
        let result = mock_generator(fixture_config(&tmp), GeneratorOptions::default())
            .generate(&project);

        let m = &result.metrics;
        assert_eq!(m.file_count, result.files.len());
        assert_eq!(m.total_size, result.files.iter().map(|f| f.size).sum::<u64>());
        assert!(m.compressed_size > 0);
        assert!(m.compressed_size <= m.total_size);
        assert_eq!(m.seo_score, calculate_seo_score(&project));
        assert_eq!(
            m.performance_score,
            optimize::calculate_performance_score(&GeneratorConfig::default().performance.expected_timings)
        );
    }

    #[test]
    fn report_written_when_enabled() {
        let tmp = setup_fixtures();
        let config = GeneratorConfig {
            report: true,
            ..fixture_config(&tmp)
        };
        let out = PathBuf::from(&config.output_path);
        let result = mock_generator(config, GeneratorOptions::default()).generate(&sample_project());

        let file = find_file(&result, "performance-report.json");
        assert_eq!(file.file_type, FileType::Json);
        assert_eq!(result.metrics.file_count, result.files.len());
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out.join("performance-report.json")).unwrap())
                .unwrap();
        assert_eq!(json["project"], "Acme Plumbing");
        assert!(json["cacheHeaders"]["Cache-Control"].is_string());
    }

    #[test]
    fn dry_run_writes_nothing() {
        let tmp = setup_fixtures();
        let config = fixture_config(&tmp);
        let out = PathBuf::from(&config.output_path);
        let options = GeneratorOptions {
            dry_run: true,
            ..GeneratorOptions::default()
        };
        let result = mock_generator(config, options).generate(&sample_project());

        assert!(result.success);
        assert!(!result.files.is_empty());
        find_file(&result, "index.html");
        assert!(!out.exists());
    }

    #[test]
    fn sequential_and_parallel_builds_match() {
        let project = sample_project();
        let run = |parallel: bool| {
            let tmp = setup_fixtures();
            with_hero(&tmp);
            let options = GeneratorOptions {
                parallel,
                dry_run: true,
                ..GeneratorOptions::default()
            };
            mock_generator(fixture_config(&tmp), options).generate(&project).files
        };
        assert_eq!(run(false), run(true));
    }

    #[test]
    fn cancelled_run_writes_nothing() {
        let tmp = setup_fixtures();
        let config = fixture_config(&tmp);
        let out = PathBuf::from(&config.output_path);
        let token = CancellationToken::new();
        token.cancel();

        let result = mock_generator(config, GeneratorOptions::default())
            .generate_with_cancellation(&sample_project(), &token);

        assert!(!result.success);
        assert!(result.cancelled);
        assert!(result.files.is_empty());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].code, CANCELLED);
        assert!(!out.join("index.html").exists());
        assert!(!out.join("robots.txt").exists());
    }

    #[test]
    fn output_dir_failure_is_fatal() {
        let tmp = setup_fixtures();
        let blocker = tmp.path().join("blocker");
        fs::write(&blocker, "file, not a directory").unwrap();
        let config = GeneratorConfig {
            output_path: blocker.join("dist").to_string_lossy().into_owned(),
            ..fixture_config(&tmp)
        };

        let result = mock_generator(config, GeneratorOptions::default()).generate(&sample_project());

        assert!(!result.success);
        assert!(!result.cancelled);
        assert_eq!(result.errors[0].code, GENERATION_ERROR);
        assert!(result.errors[0].message.contains("output directory"));
        assert!(result.files.is_empty());
    }

    #[test]
    fn panic_becomes_generation_error() {
        let tmp = setup_fixtures();
        with_hero(&tmp);
        let generator = Generator::new(fixture_config(&tmp), GeneratorOptions::default())
            .with_backend(PanicBackend);

        let result = generator.generate(&sample_project());

        assert!(!result.success);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].code, GENERATION_ERROR);
        assert!(result.errors[0].message.contains("backend exploded"));
    }

    #[test]
    fn progress_reports_every_unit() {
        let tmp = setup_fixtures();
        with_hero(&tmp);
        let project = sample_project();
        let (tx, rx) = channel();
        let result = mock_generator(fixture_config(&tmp), GeneratorOptions::default())
            .generate_with_progress(&project, &CancellationToken::new(), Some(tx));
        assert!(result.success);

        let events: Vec<GenerateEvent> = rx.into_iter().collect();
        let pages = events
            .iter()
            .filter(|e| matches!(e, GenerateEvent::Page { .. }))
            .count();
        let assets = events
            .iter()
            .filter(|e| matches!(e, GenerateEvent::Asset { .. }))
            .count();
        assert_eq!(pages, project.pages.len());
        assert_eq!(assets, project.assets.len());
        assert!(events.contains(&GenerateEvent::Page {
            id: "about".to_string(),
            path: "about/index.html".to_string(),
        }));
    }

    #[test]
    fn run_indexed_restores_input_order() {
        let pool = ThreadPoolBuilder::new().num_threads(4).build().unwrap();
        let items: Vec<u32> = (0..64).collect();
        let out = run_indexed(&pool, &items, &CancellationToken::new(), |n| n * 2).unwrap();
        assert_eq!(out, (0..64).map(|n| n * 2).collect::<Vec<_>>());
    }

    #[test]
    fn single_root_page_builds_minimal_site() {
        let tmp = setup_fixtures();
        let config = fixture_config(&tmp);
        let out = PathBuf::from(&config.output_path);
        let mut project = sample_project();
        project.pages.truncate(1);
        project.pages[0].is_home = false;
        project.pages[0].blocks = vec![BlockInstance::new("hero")];
        project.assets.clear();
        project.seo.sitemap.exclude_paths.clear();

        let result = mock_generator(config, GeneratorOptions::default()).generate(&project);

        assert!(result.success, "{:?}", result.errors);
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
        assert_eq!(
            file_paths(&result),
            vec!["index.html", "css/home.css", "robots.txt", "sitemap.xml"]
        );
        let sitemap = fs::read_to_string(out.join("sitemap.xml")).unwrap();
        assert_eq!(count_occurrences(&sitemap, "<url>"), 1);
        assert!(sitemap.contains("<priority>1.0</priority>"), "{sitemap}");
        let home = fs::read_to_string(out.join("index.html")).unwrap();
        assert!(!home.contains("BreadcrumbList"));
    }

    // =========================================================================
    // Output paths
    // =========================================================================

    #[test]
    fn leading_slash_asset_lands_inside_output_dir() {
        let tmp = setup_fixtures();
        let config = fixture_config(&tmp);
        let out = PathBuf::from(&config.output_path);
        let mut project = sample_project();
        project.assets = vec![Asset::from_origin("/assets/logo.svg", "assets/logo.svg")];

        let result = mock_generator(config, GeneratorOptions::default()).generate(&project);

        assert!(result.success, "{:?}", result.errors);
        find_file(&result, "assets/logo.svg");
        assert!(out.join("assets/logo.svg").is_file());
        assert!(!file_paths(&result).iter().any(|p| p.starts_with('/')));
    }

    #[test]
    fn escaping_paths_become_warnings() {
        let tmp = setup_fixtures();
        let config = fixture_config(&tmp);
        let mut project = sample_project();
        project.assets = vec![Asset::from_origin("../escape.svg", "assets/logo.svg")];
        project.pages[1].id = "../about".to_string();

        let result = mock_generator(config, GeneratorOptions::default()).generate(&project);

        assert!(result.success, "{:?}", result.errors);
        assert!(!tmp.path().join("escape.svg").exists());
        assert!(!tmp.path().join("about.css").exists());
        assert!(result.warnings.iter().any(|w| w.contains("../escape.svg")), "{:?}", result.warnings);
        assert!(result.warnings.iter().any(|w| w.contains("css/../about.css")), "{:?}", result.warnings);
        assert!(!file_paths(&result).iter().any(|p| p.contains("..")));
        find_file(&result, "about/index.html");
    }

    #[test]
    fn output_relative_path_normalizes_or_refuses() {
        assert_eq!(output_relative_path("/assets/a.png").as_deref(), Some("assets/a.png"));
        assert_eq!(output_relative_path("./css/home.css").as_deref(), Some("css/home.css"));
        assert_eq!(output_relative_path("index.html").as_deref(), Some("index.html"));
        assert_eq!(output_relative_path("assets/../../x"), None);
        assert_eq!(output_relative_path("css/../home.css"), None);
        assert_eq!(output_relative_path("/"), None);
        assert_eq!(output_relative_path(""), None);
    }

    #[test]
    fn site_url_trims_trailing_slash() {
        let project = sample_project();
        let mut config = GeneratorConfig::default();
        assert_eq!(site_url(&config, &project), "https://acme.example");
        config.base_url = "https://x.test/".to_string();
        assert_eq!(site_url(&config, &project), "https://x.test");
    }
}
