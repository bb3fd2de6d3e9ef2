//! Shared test utilities for the pagesmith test suite.
//!
//! Provides the fixture project, a ready-made generation context, and lookup
//! helpers that panic with a useful message on miss.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let project = sample_project();
//! let config = GeneratorConfig::default();
//! let catalog = BlockCatalog::stock();
//! let ctx = test_context(&config, &catalog);
//!
//! let page = find_page(&project, "about");
//! let html = render_page(page, &project, &ctx).unwrap();
//! ```

use chrono::NaiveDate;
use std::path::Path;
use tempfile::TempDir;

use crate::blocks::BlockCatalog;
use crate::config::GeneratorConfig;
use crate::context::GeneratorContext;
use crate::types::{GeneratedFile, GeneratorResult, Page, Project};

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/site/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// The fixture project (`fixtures/site/project.json`).
pub fn sample_project() -> Project {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site/project.json");
    let json = std::fs::read_to_string(path).unwrap();
    serde_json::from_str(&json).unwrap()
}

/// Fixed build date so rendered output does not depend on the clock.
pub fn build_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
}

/// Context with caching on and the fixed [`build_date`].
pub fn test_context<'a>(
    config: &'a GeneratorConfig,
    catalog: &'a BlockCatalog,
) -> GeneratorContext<'a> {
    GeneratorContext::new(config, catalog, true, build_date())
}

// =========================================================================
// Lookups: panic with a clear message on miss
// =========================================================================

/// Find a page by id. Panics if not found.
pub fn find_page<'a>(project: &'a Project, id: &str) -> &'a Page {
    project
        .pages
        .iter()
        .find(|p| p.id == id)
        .unwrap_or_else(|| {
            let ids: Vec<&str> = project.pages.iter().map(|p| p.id.as_str()).collect();
            panic!("page '{id}' not found. Available: {ids:?}")
        })
}

/// Find a generated file by relative path. Panics if not found.
pub fn find_file<'a>(result: &'a GeneratorResult, path: &str) -> &'a GeneratedFile {
    result
        .files
        .iter()
        .find(|f| f.path == path)
        .unwrap_or_else(|| {
            let paths = file_paths(result);
            panic!("file '{path}' not found. Available: {paths:?}")
        })
}

/// All generated file paths in result order.
pub fn file_paths(result: &GeneratorResult) -> Vec<&str> {
    result.files.iter().map(|f| f.path.as_str()).collect()
}

/// Number of non-overlapping occurrences of `needle` in `haystack`.
pub fn count_occurrences(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}
