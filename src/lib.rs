//! # Pagesmith
//!
//! A block-based static site compiler for small-business websites. A
//! [`types::Project`] describes the business, its pages and the blocks on
//! each page; pagesmith turns it into a deployable directory of HTML, CSS,
//! JavaScript, images, `robots.txt` and `sitemap.xml`.
//!
//! # Architecture: One Run, Two Parallel Phases
//!
//! ```text
//! Project ──► assets  (transcode, variants, placeholders)   ─┐
//!         └─► pages   (compose → SEO → critical CSS → minify) ├─► write ─► crawler files ─► report
//!                                                             ─┘
//! ```
//!
//! [`generate::Generator`] owns a run. Assets and pages are independent
//! units processed on a per-run rayon pool; the generator collects their
//! outputs in input order and writes them from the calling thread, so the
//! bundle is byte-identical no matter how work was scheduled.
//!
//! Every optional stage is non-destructive: the SEO injector, the
//! critical-CSS extractor and the minifiers hand back their input unchanged
//! when they cannot do their job. A broken page or asset becomes a warning
//! rather than a failed build.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`generate`] | Orchestrator: worker pool, ordering, cancellation, file bookkeeping, metrics |
//! | [`assets`] | Asset transcoding: format negotiation, responsive variants, placeholders, directory scan |
//! | [`blocks`] | Block catalog, per-category renderers, page composition |
//! | [`critical_css`] | Purge unused rules, select above-the-fold CSS, inline it under a byte budget |
//! | [`optimize`] | HTML/CSS/JS minification, cache headers, resource hints, performance score and report |
//! | [`seo`] | Meta tags, JSON-LD, robots directive, `robots.txt`, `sitemap.xml`, SEO score |
//! | [`css`] | Small CSS parser and serializer shared by the CSS stages |
//! | [`config`] | `pagesmith.toml` loading, layering over stock defaults, validation |
//! | [`context`] | Per-run state shared with workers |
//! | [`cache`] | Content hashes and the in-run block/image memo |
//! | [`imaging`] | Pure-Rust image operations behind the [`imaging::ImageBackend`] trait |
//! | [`types`] | Project model and run results |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## No Global State
//!
//! Everything a run needs travels in a [`context::GeneratorContext`] built at
//! the start of the run, including the [`cache::BuildCache`]. Two runs never
//! share memoized blocks or encoded images, and tests can run generators side
//! by side.
//!
//! ## Maud Over Template Engines
//!
//! Block markup, meta tags and the critical-CSS loader are produced with
//! [Maud](https://maud.lambda.xyz/): malformed HTML is a compile error and
//! interpolation is escaped by default.
//!
//! ## Pure-Rust Imaging
//!
//! The [`imaging`] module uses the `image` crate for decode, resize and
//! encode, so the binary has no system dependencies.

pub mod assets;
pub mod blocks;
pub mod cache;
pub mod config;
pub mod context;
pub mod critical_css;
pub mod css;
pub mod generate;
pub mod imaging;
pub mod optimize;
pub mod output;
pub mod seo;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
