//! Output optimization and performance accounting.
//!
//! Independent passes applied by the orchestrator after rendering:
//!
//! | Function | Gate |
//! |----------|------|
//! | [`optimize_html`] | `minify_html` (whitespace/comments), `lazy_loading` |
//! | [`optimize_css`] | `minify_css`, `styles.autoprefixer` |
//! | [`optimize_js`] | `minify_js`; debug calls stripped in production only |
//!
//! Every pass returns its input untouched when its gate is off or when the
//! input cannot be processed.
//!
//! The suggested HTTP headers, resource hints, the web-vitals score and the
//! JSON performance report are derived from configuration alone. Nothing is
//! measured.

use crate::config::{
    CachingPolicy, GeneratorConfig, ModernFormat, PreloadingPolicy, TimingMetrics,
};
use crate::css::{self, CssError};
use crate::types::GeneratorMetrics;
use chrono::{DateTime, SecondsFormat, Utc};
use maud::html;
use regex::{Captures, Regex};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MinifyError {
    #[error("CSS: {0}")]
    Css(#[from] CssError),
    #[error("unterminated string at byte {0}")]
    UnterminatedString(usize),
    #[error("unterminated comment at byte {0}")]
    UnterminatedComment(usize),
    #[error("unterminated regular expression at byte {0}")]
    UnterminatedRegex(usize),
    #[error("unbalanced call arguments at byte {0}")]
    UnbalancedCall(usize),
}

// ============================================================================
// HTML
// ============================================================================

static RAW_TEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)(<(pre|textarea|script|style)\b[^>]*>)(.*?)(</(?:pre|textarea|script|style)\s*>)",
    )
    .unwrap()
});
static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--(?:[^\[].*?)?-->").unwrap());
static BETWEEN_TAGS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r">\s+<").unwrap());
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}").unwrap());
static LAZY_TARGET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<(img|iframe)\b([^>]*?)(\s*/?)>").unwrap());

/// Minify a page and add `loading="lazy"` to images and iframes.
pub fn optimize_html(html: &str, config: &GeneratorConfig) -> String {
    let flags = &config.performance.optimization;
    let html = if flags.lazy_loading {
        add_lazy_loading(html)
    } else {
        html.to_string()
    };
    if !flags.minify_html {
        return html;
    }
    match minify_html(&html, config) {
        Ok(out) => out,
        Err(e) => {
            debug!(error = %e, "HTML minification skipped");
            html
        }
    }
}

fn add_lazy_loading(html: &str) -> String {
    LAZY_TARGET_RE
        .replace_all(html, |caps: &Captures| {
            let attrs = &caps[2];
            if attrs.to_ascii_lowercase().contains("loading=") {
                caps[0].to_string()
            } else {
                format!("<{}{} loading=\"lazy\"{}>", &caps[1], attrs, &caps[3])
            }
        })
        .into_owned()
}

fn minify_html(html: &str, config: &GeneratorConfig) -> Result<String, MinifyError> {
    let flags = &config.performance.optimization;
    let mut out = String::with_capacity(html.len());
    let mut last = 0;
    let mut after_raw = false;

    for caps in RAW_TEXT_RE.captures_iter(html) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&minify_markup(
            &html[last..whole.start()],
            flags.remove_comments,
            flags.remove_whitespace,
            after_raw,
            true,
        ));

        let open = &caps[1];
        let tag = caps[2].to_ascii_lowercase();
        let body = &caps[3];
        let body = match tag.as_str() {
            "style" if flags.minify_css => optimize_css_strict(body, config)?,
            "script" if flags.minify_js && is_inline_javascript(open) => {
                minify_js(body, config.is_production())?
            }
            _ => body.to_string(),
        };
        out.push_str(open);
        out.push_str(&body);
        out.push_str(&caps[4]);

        last = whole.end();
        after_raw = true;
    }
    out.push_str(&minify_markup(
        &html[last..],
        flags.remove_comments,
        flags.remove_whitespace,
        after_raw,
        false,
    ));
    Ok(out)
}

fn is_inline_javascript(open_tag: &str) -> bool {
    let lower = open_tag.to_ascii_lowercase();
    if lower.contains("src=") {
        return false;
    }
    match lower.find("type=") {
        None => true,
        Some(_) => ["javascript", "module", "ecmascript"]
            .iter()
            .any(|t| lower.contains(t)),
    }
}

/// Minify markup between raw-text elements.
fn minify_markup(
    text: &str,
    remove_comments: bool,
    collapse: bool,
    after_raw: bool,
    before_raw: bool,
) -> String {
    let mut s = if remove_comments {
        COMMENT_RE.replace_all(text, "").into_owned()
    } else {
        text.to_string()
    };
    if collapse {
        s = BETWEEN_TAGS_RE.replace_all(&s, "><").into_owned();
        s = WHITESPACE_RE.replace_all(&s, " ").into_owned();
        // Raw elements always start with `<` and end with `>`.
        if before_raw && (s.trim_end().ends_with('>') || s.trim().is_empty()) {
            s.truncate(s.trim_end().len());
        }
        if after_raw && (s.trim_start().starts_with('<') || s.trim().is_empty()) {
            s = s.trim_start().to_string();
        }
    }
    s
}

// ============================================================================
// CSS
// ============================================================================

/// Compact a stylesheet, adding vendor prefixes when enabled.
pub fn optimize_css(source: &str, config: &GeneratorConfig) -> String {
    if !config.performance.optimization.minify_css {
        return source.to_string();
    }
    match optimize_css_strict(source, config) {
        Ok(out) => out,
        Err(e) => {
            debug!(error = %e, "CSS minification skipped");
            source.to_string()
        }
    }
}

fn optimize_css_strict(source: &str, config: &GeneratorConfig) -> Result<String, MinifyError> {
    let mut sheet = css::parse(source)?;
    if config.performance.styles.autoprefixer {
        sheet.add_vendor_prefixes();
    }
    Ok(sheet.to_css())
}

// ============================================================================
// JavaScript
// ============================================================================

/// Strip comments and whitespace; in production also drop debug calls.
pub fn optimize_js(source: &str, config: &GeneratorConfig) -> String {
    if !config.performance.optimization.minify_js {
        return source.to_string();
    }
    match minify_js(source, config.is_production()) {
        Ok(out) => out,
        Err(e) => {
            debug!(error = %e, "JS minification skipped");
            source.to_string()
        }
    }
}

const DEBUG_METHODS: &[&str] = &["log", "debug", "info", "trace"];

/// Minify `source`. With `strip_debug`, `console.log/debug/info/trace(…)`
/// calls and `debugger` statements are removed.
pub fn minify_js(source: &str, strip_debug: bool) -> Result<String, MinifyError> {
    JsMinifier {
        src: source.as_bytes(),
        pos: 0,
        out: Vec::with_capacity(source.len()),
        strip_debug,
    }
    .run()
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

/// `pos` is on an opening quote. Returns the index just past the closing one.
fn skip_js_string(src: &[u8], pos: usize) -> Result<usize, MinifyError> {
    let quote = src[pos];
    let mut i = pos + 1;
    while i < src.len() {
        match src[i] {
            b'\\' => i += 2,
            b'\n' if quote != b'`' => return Err(MinifyError::UnterminatedString(pos)),
            b if b == quote => return Ok(i + 1),
            _ => i += 1,
        }
    }
    Err(MinifyError::UnterminatedString(pos))
}

struct JsMinifier<'a> {
    src: &'a [u8],
    pos: usize,
    out: Vec<u8>,
    strip_debug: bool,
}

impl JsMinifier<'_> {
    fn run(mut self) -> Result<String, MinifyError> {
        let mut pending_space = false;
        let mut pending_newline = false;

        while self.pos < self.src.len() {
            let b = self.src[self.pos];
            let next = self.src.get(self.pos + 1).copied();
            match b {
                b' ' | b'\t' | b'\r' => {
                    pending_space = true;
                    self.pos += 1;
                }
                b'\n' => {
                    pending_space = true;
                    pending_newline = true;
                    self.pos += 1;
                }
                b'/' if next == Some(b'/') => {
                    while self.pos < self.src.len() && self.src[self.pos] != b'\n' {
                        self.pos += 1;
                    }
                    pending_space = true;
                }
                b'/' if next == Some(b'*') => {
                    let start = self.pos;
                    let rest = &self.src[self.pos + 2..];
                    let end = rest
                        .windows(2)
                        .position(|w| w == b"*/")
                        .ok_or(MinifyError::UnterminatedComment(start))?;
                    pending_newline |= rest[..end].contains(&b'\n');
                    pending_space = true;
                    self.pos += 2 + end + 2;
                }
                _ => {
                    if pending_space {
                        self.separator(pending_newline, b);
                        pending_space = false;
                        pending_newline = false;
                    }
                    self.token(b)?;
                }
            }
        }
        Ok(String::from_utf8_lossy(&self.out).into_owned())
    }

    fn last_significant(&self) -> Option<u8> {
        self.out.iter().rev().copied().find(|b| !b.is_ascii_whitespace())
    }

    /// Emit the minimum whitespace needed between the last output byte and
    /// `next`.
    fn separator(&mut self, had_newline: bool, next: u8) {
        let Some(prev) = self.out.last().copied() else {
            return;
        };
        if is_ident_byte(prev) && is_ident_byte(next) {
            self.out.push(if had_newline { b'\n' } else { b' ' });
        } else if prev == next && (prev == b'+' || prev == b'-') {
            self.out.push(b' ');
        } else if had_newline
            && !b"{([,;:=&|?!+-*/%<>^~.".contains(&prev)
            && !b"})],;:?.=&|+-*/%<>^".contains(&next)
        {
            // Keep line breaks where automatic semicolon insertion may apply.
            self.out.push(b'\n');
        }
    }

    fn regex_allowed(&self) -> bool {
        match self.last_significant() {
            None => true,
            Some(prev) => b"(,=:[!&|?{};+-*%<>~^".contains(&prev),
        }
    }

    fn token(&mut self, b: u8) -> Result<(), MinifyError> {
        match b {
            b'\'' | b'"' | b'`' => {
                let end = skip_js_string(self.src, self.pos)?;
                self.out.extend_from_slice(&self.src[self.pos..end]);
                self.pos = end;
            }
            b'/' if self.regex_allowed() => {
                let end = self.regex_end()?;
                self.out.extend_from_slice(&self.src[self.pos..end]);
                self.pos = end;
            }
            _ if is_ident_byte(b) => {
                let src = self.src;
                let start = self.pos;
                while self.pos < src.len() && is_ident_byte(src[self.pos]) {
                    self.pos += 1;
                }
                let ident = &src[start..self.pos];
                let stripped = self.strip_debug
                    && self.last_significant() != Some(b'.')
                    && match ident {
                        b"console" => self.strip_console_call()?,
                        b"debugger" => {
                            self.skip_statement_end();
                            self.replace_statement(true);
                            true
                        }
                        _ => false,
                    };
                if !stripped {
                    self.out.extend_from_slice(ident);
                }
            }
            _ => {
                self.out.push(b);
                self.pos += 1;
            }
        }
        Ok(())
    }

    /// `pos` is on the `/` opening a regex literal. Returns the index just
    /// past the closing `/` (flags are read as an identifier).
    fn regex_end(&self) -> Result<usize, MinifyError> {
        let start = self.pos;
        let mut i = self.pos + 1;
        let mut in_class = false;
        while i < self.src.len() {
            match self.src[i] {
                b'\\' => i += 2,
                b'\n' => break,
                b'[' => {
                    in_class = true;
                    i += 1;
                }
                b']' => {
                    in_class = false;
                    i += 1;
                }
                b'/' if !in_class => return Ok(i + 1),
                _ => i += 1,
            }
        }
        Err(MinifyError::UnterminatedRegex(start))
    }

    /// Called just past `console`. Consumes `.method(…);` when method is a
    /// debug method and returns whether anything was stripped.
    fn strip_console_call(&mut self) -> Result<bool, MinifyError> {
        let rest = &self.src[self.pos..];
        let Some(method) = DEBUG_METHODS.iter().find(|m| {
            rest.first() == Some(&b'.')
                && rest[1..].starts_with(m.as_bytes())
                && !rest.get(1 + m.len()).is_some_and(|&b| is_ident_byte(b))
        }) else {
            return Ok(false);
        };
        let mut i = self.pos + 1 + method.len();
        while i < self.src.len() && self.src[i].is_ascii_whitespace() {
            i += 1;
        }
        if self.src.get(i) != Some(&b'(') {
            return Ok(false);
        }

        let open = i;
        let mut depth = 0usize;
        loop {
            match self.src.get(i) {
                None => return Err(MinifyError::UnbalancedCall(open)),
                Some(b'\'' | b'"' | b'`') => {
                    i = skip_js_string(self.src, i)?;
                    continue;
                }
                Some(b'(') => depth += 1,
                Some(b')') => {
                    depth -= 1;
                    if depth == 0 {
                        i += 1;
                        break;
                    }
                }
                _ => {}
            }
            i += 1;
        }
        self.pos = i;
        let had_semicolon = self.skip_statement_end();
        self.replace_statement(had_semicolon);
        Ok(true)
    }

    /// Skip spaces and one `;` if present. Returns whether a `;` was eaten.
    fn skip_statement_end(&mut self) -> bool {
        let mut i = self.pos;
        while i < self.src.len() && matches!(self.src[i], b' ' | b'\t') {
            i += 1;
        }
        if self.src.get(i) == Some(&b';') {
            self.pos = i + 1;
            true
        } else {
            false
        }
    }

    /// A removed call in statement position vanishes. Elsewhere (`if (x)
    /// console.log(y)`, `a && console.log(b)`) it becomes `void 0`.
    fn replace_statement(&mut self, had_semicolon: bool) {
        let statement_position = match self.last_significant() {
            None => true,
            Some(prev) => matches!(prev, b';' | b'{' | b'}'),
        };
        if !statement_position {
            if self.out.last().is_some_and(|&b| is_ident_byte(b)) {
                self.out.push(b' ');
            }
            self.out.extend_from_slice(b"void 0");
            if had_semicolon {
                self.out.push(b';');
            }
        }
    }
}

// ============================================================================
// Headers and hints
// ============================================================================

/// Suggested response headers for static assets. Empty when caching is
/// disabled.
pub fn generate_cache_headers(policy: &CachingPolicy) -> BTreeMap<String, String> {
    cache_headers_at(policy, Utc::now().timestamp_millis())
}

fn cache_headers_at(policy: &CachingPolicy, timestamp: i64) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    if !policy.enabled {
        return headers;
    }

    let mut directives = vec![if policy.public { "public" } else { "private" }.to_string()];
    if policy.max_age > 0 {
        directives.push(format!("max-age={}", policy.max_age));
    }
    if let Some(swr) = policy.stale_while_revalidate {
        directives.push(format!("stale-while-revalidate={}", swr));
    }
    if policy.must_revalidate {
        directives.push("must-revalidate".to_string());
    }
    if policy.immutable {
        directives.push("immutable".to_string());
    }
    headers.insert("Cache-Control".to_string(), directives.join(", "));

    if !policy.vary_headers.is_empty() {
        headers.insert("Vary".to_string(), policy.vary_headers.join(", "));
    }
    headers.insert("ETag".to_string(), format!("\"{}\"", timestamp));
    headers
}

/// `dns-prefetch` then `preconnect` link tags for the configured origins.
pub fn generate_resource_hints(policy: &PreloadingPolicy) -> String {
    html! {
        @for domain in &policy.dns_prefetch {
            link rel="dns-prefetch" href=(domain);
        }
        @for domain in &policy.preconnect {
            link rel="preconnect" href=(domain) crossorigin;
        }
    }
    .into_string()
}

// ============================================================================
// Score and report
// ============================================================================

/// Good/poor thresholds and weight per metric, in FCP, LCP, FID, CLS, TTFB order.
const VITALS: [(f64, f64, f64); 5] = [
    (1800.0, 3000.0, 0.10),
    (2500.0, 4000.0, 0.25),
    (100.0, 300.0, 0.10),
    (0.1, 0.25, 0.15),
    (800.0, 1800.0, 0.40),
];

fn metric_score(value: f64, good: f64, poor: f64) -> f64 {
    if value <= good {
        1.0
    } else if value >= poor {
        0.0
    } else {
        (poor - value) / (poor - good)
    }
}

/// Weighted web-vitals score, 0–100.
pub fn calculate_performance_score(metrics: &TimingMetrics) -> u32 {
    let values = [metrics.fcp, metrics.lcp, metrics.fid, metrics.cls, metrics.ttfb];
    let total: f64 = values
        .iter()
        .zip(VITALS)
        .map(|(&v, (good, poor, weight))| metric_score(v, good, poor) * weight)
        .sum();
    (total * 100.0).round().clamp(0.0, 100.0) as u32
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnabledOptimizations {
    pub html: bool,
    pub css: bool,
    pub js: bool,
    pub images: bool,
    #[serde(rename = "criticalCSS")]
    pub critical_css: bool,
    pub lazy_loading: bool,
}

/// Contents of `performance-report.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReport {
    pub timestamp: String,
    pub project: String,
    pub metrics: GeneratorMetrics,
    pub recommendations: Vec<String>,
    pub optimizations: EnabledOptimizations,
    pub cache_headers: BTreeMap<String, String>,
}

const ONE_DAY_SECS: u64 = 86_400;

fn recommendations(config: &GeneratorConfig) -> Vec<String> {
    let perf = &config.performance;
    let checks = [
        (
            !perf.optimization.minify_html,
            "Enable HTML minification to reduce file size",
        ),
        (
            !perf.optimization.critical_css,
            "Enable critical CSS extraction to improve initial render",
        ),
        (
            perf.images.modern_format == ModernFormat::Original,
            "Enable modern image formats (WebP/AVIF) for better compression",
        ),
        (
            !perf.optimization.lazy_loading,
            "Enable lazy loading for images and videos",
        ),
        (
            perf.caching.max_age < ONE_DAY_SECS,
            "Increase cache duration for static assets",
        ),
    ];
    checks
        .into_iter()
        .filter(|(applies, _)| *applies)
        .map(|(_, text)| text.to_string())
        .collect()
}

pub fn generate_performance_report(
    project_name: &str,
    config: &GeneratorConfig,
    metrics: &GeneratorMetrics,
    now: DateTime<Utc>,
) -> PerformanceReport {
    let flags = &config.performance.optimization;
    PerformanceReport {
        timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        project: project_name.to_string(),
        metrics: metrics.clone(),
        recommendations: recommendations(config),
        optimizations: EnabledOptimizations {
            html: flags.minify_html,
            css: flags.minify_css,
            js: flags.minify_js,
            images: config.performance.images.modern_format != ModernFormat::Original,
            critical_css: flags.critical_css,
            lazy_loading: flags.lazy_loading,
        },
        cache_headers: cache_headers_at(&config.performance.caching, now.timestamp_millis()),
    }
}
