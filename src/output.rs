//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Build progress
//!
//! ```text
//! asset assets/hero.webp (3 variants, compressed)
//! asset assets/logo.svg
//! page  about → about/index.html
//! warn  asset assets/missing.jpg: No such file or directory
//! ```
//!
//! ## Build summary
//!
//! ```text
//! Files
//! 001 assets/hero.webp  image  18.2 KB  1a2b3c4d  compressed
//! 002 index.html        html    6.1 KB  9f8e7d6c  optimized
//!
//! Warnings
//!     page contact: unknown block 'map'
//!
//! Generated 12 files (84.0 KB, 31.5 KB compressed) in 420 ms
//! Performance score: 94  SEO score: 86
//! ```
//!
//! ## Check
//!
//! ```text
//! Acme Plumbing: 3 pages, 2 assets
//! Unresolved blocks
//!     about: map
//! SEO score: 86
//! ```
//!
//! # Architecture
//!
//! Each report has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure.

use crate::generate::GenerateEvent;
use crate::types::{FileType, GeneratorResult, Project};

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Human-readable byte count, one decimal above 1 KB.
fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{} B", bytes)
    } else if b < KB * KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{:.1} MB", b / (KB * KB))
    }
}

fn file_type_label(file_type: FileType) -> &'static str {
    match file_type {
        FileType::Html => "html",
        FileType::Css => "css",
        FileType::Js => "js",
        FileType::Image => "image",
        FileType::Font => "font",
        FileType::Json => "json",
        FileType::Xml => "xml",
        FileType::Other => "other",
    }
}

// ============================================================================
// Build
// ============================================================================

pub fn format_generate_event(event: &GenerateEvent) -> Vec<String> {
    match event {
        GenerateEvent::Asset {
            path,
            variants,
            compressed,
        } => {
            let mut details = Vec::new();
            if *variants > 0 {
                details.push(format!("{} variants", variants));
            }
            if *compressed {
                details.push("compressed".to_string());
            }
            if details.is_empty() {
                vec![format!("asset {}", path)]
            } else {
                vec![format!("asset {} ({})", path, details.join(", "))]
            }
        }
        GenerateEvent::Page { id, path } => vec![format!("page  {} → {}", id, path)],
        GenerateEvent::Warning(message) => vec![format!("warn  {}", message)],
    }
}

pub fn format_build_summary(result: &GeneratorResult) -> Vec<String> {
    let mut lines = Vec::new();

    if !result.files.is_empty() {
        let width = result.files.iter().map(|f| f.path.len()).max().unwrap_or(0);
        lines.push("Files".to_string());
        for (i, file) in result.files.iter().enumerate() {
            let mut line = format!(
                "{} {:<width$}  {:<5}  {:>8}  {}",
                format_index(i + 1),
                file.path,
                file_type_label(file.file_type),
                format_size(file.size),
                file.hash,
                width = width
            );
            if file.compressed {
                line.push_str("  compressed");
            } else if file.optimized {
                line.push_str("  optimized");
            }
            lines.push(line);
        }
    }

    if !result.warnings.is_empty() {
        lines.push(String::new());
        lines.push("Warnings".to_string());
        for warning in &result.warnings {
            lines.push(format!("{}{}", indent(1), warning));
        }
    }

    if !result.errors.is_empty() {
        lines.push(String::new());
        lines.push("Errors".to_string());
        for error in &result.errors {
            lines.push(format!("{}{}: {}", indent(1), error.code, error.message));
        }
    }

    let m = &result.metrics;
    lines.push(String::new());
    if result.cancelled {
        lines.push(format!("Cancelled after {} ms", m.duration_ms));
    } else if result.success {
        lines.push(format!(
            "Generated {} files ({}, {} compressed) in {} ms",
            m.file_count,
            format_size(m.total_size),
            format_size(m.compressed_size),
            m.duration_ms
        ));
        lines.push(format!(
            "Performance score: {}  SEO score: {}",
            m.performance_score, m.seo_score
        ));
    } else {
        lines.push(format!("Generation failed after {} ms", m.duration_ms));
    }
    lines
}

pub fn print_build_summary(result: &GeneratorResult) {
    for line in format_build_summary(result) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Check report. `unresolved` is `(page_id, block_id)` pairs.
pub fn format_check_report(
    project: &Project,
    unresolved: &[(String, String)],
    seo_score: u32,
) -> Vec<String> {
    let mut lines = vec![format!(
        "{}: {} pages, {} assets",
        project.name,
        project.pages.len(),
        project.assets.len()
    )];
    if !unresolved.is_empty() {
        lines.push("Unresolved blocks".to_string());
        for (page, block) in unresolved {
            lines.push(format!("{}{}: {}", indent(1), page, block));
        }
    }
    lines.push(format!("SEO score: {}", seo_score));
    lines
}

pub fn print_check_report(project: &Project, unresolved: &[(String, String)], seo_score: u32) {
    for line in format_check_report(project, unresolved, seo_score) {
        println!("{}", line);
    }
}
