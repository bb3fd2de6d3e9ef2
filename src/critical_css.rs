//! Critical CSS extraction.
//!
//! Rewrites a composed page so that only above-the-fold rules are inlined
//! and the full stylesheet loads without blocking render.
//!
//! ## Steps
//!
//! 1. **Collect**: every inline `<style>` block is pulled out of the document
//!    and parsed as one stylesheet.
//! 2. **Purge** (when `styles.purge` is on): rules whose selectors match no
//!    element of the document are dropped. A compound selector matches when
//!    its tag, classes and ids all occur in the markup. Safelisted classes
//!    (state classes toggled by scripts, responsive prefixes) always match.
//!    `@media` blocks are purged recursively and dropped when empty.
//! 3. **Select**: a rule is critical when the leading compound of one of its
//!    selectors matches an allowlist token (`.hero`, `.nav-*`, `h1`, …).
//!    `:root`, `@font-face` and `prefers-reduced-motion` blocks are always
//!    critical; other `@media` blocks keep their critical children.
//! 4. **Budget**: when the selection exceeds [`CRITICAL_BUDGET`] bytes, whole
//!    top-level rules are taken greedily in priority-list order until the
//!    budget is full.
//! 5. **Inline + defer**: the result goes in `<style id="critical-css">`,
//!    the page stylesheet is preloaded with an onload swap, a `<noscript>`
//!    fallback and a media-swap loader cover the rest, and the trailing
//!    render-blocking `<link>` is removed.
//!
//! Any failure leaves the page exactly as it was.

use crate::context::GeneratorContext;
use crate::css::{self, AtRuleBlock, Compound, CssError, Node, Rule, Stylesheet};
use crate::types::Page;
use maud::{PreEscaped, html};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum CriticalCssError {
    #[error("CSS parse error: {0}")]
    Css(#[from] CssError),
    #[error("document has no </head>")]
    MissingHead,
}

/// Inline CSS budget in bytes: one TCP initial congestion window.
pub const CRITICAL_BUDGET: usize = 14_336;

const ALLOWLIST: &[&str] = &[
    "*",
    "html",
    "body",
    ".container",
    ".header",
    ".hero",
    ".nav-*",
    ".logo",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "p",
    "a",
    ".btn",
    ".btn-primary",
    ".btn-secondary",
    ".hero-*",
    ".header-*",
];

const PRIORITY: &[&str] = &[
    ":root",
    "html",
    "body",
    ".container",
    ".header",
    ".hero",
    "h1",
    "h2",
    ".btn-primary",
];

const SAFELIST_PREFIXES: &[&str] = &["animate-", "is-", "has-", "sm:", "md:", "lg:", "xl:"];
const SAFELIST_CLASSES: &[&str] = &["active", "disabled", "loading", "error", "success"];

static STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b[^>]*>(.*?)</style\s*>").unwrap());
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([a-zA-Z][a-zA-Z0-9-]*)").unwrap());
static CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\sclass\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap());
static ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\sid\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap());

/// Run critical CSS extraction on one page if enabled.
pub fn process(html: &str, page: &Page, ctx: &GeneratorContext<'_>) -> String {
    if !ctx.config.performance.optimization.critical_css {
        return html.to_string();
    }
    match extract(html, &page.id, ctx.config.performance.styles.purge) {
        Ok(out) => out,
        Err(e) => {
            warn!(page = %page.id, error = %e, "critical CSS extraction failed, page left unchanged");
            html.to_string()
        }
    }
}

/// Inline critical CSS for `page_id` and defer `/css/<page_id>.css`.
pub fn extract(html: &str, page_id: &str, purge: bool) -> Result<String, CriticalCssError> {
    if !html.contains("</head>") {
        return Err(CriticalCssError::MissingHead);
    }

    let collected: Vec<&str> = STYLE_RE
        .captures_iter(html)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    if collected.is_empty() {
        debug!(page = page_id, "no inline styles, nothing to extract");
        return Ok(html.to_string());
    }
    let mut sheet = css::parse(&collected.join("\n"))?;
    let document = STYLE_RE.replace_all(html, "").into_owned();

    if purge {
        let index = DocumentIndex::from_html(&document);
        let before = sheet.nodes.len();
        purge_unused(&mut sheet, &index);
        debug!(page = page_id, before, after = sheet.nodes.len(), "purged unused rules");
    }

    let critical = apply_budget(&select_critical(&sheet));
    debug!(page = page_id, bytes = critical.len(), "critical CSS selected");

    let href = format!("/css/{}.css", page_id);
    let document = remove_stylesheet_link(&document, &href);
    let injection = head_injection(&critical, &href);
    Ok(document.replacen("</head>", &format!("{}</head>", injection), 1))
}

fn head_injection(critical: &str, href: &str) -> String {
    let loader = format!(
        "(function(){{var d=document,t=d.createElement('link');if(t.relList&&t.relList.supports&&t.relList.supports('preload'))return;var l=d.createElement('link');l.rel='stylesheet';l.href='{}';l.media='print';l.onload=function(){{l.media='all'}};d.head.appendChild(l)}})();",
        href
    );
    html! {
        style id="critical-css" { (PreEscaped(critical)) }
        link rel="preload" href=(href) as="style" onload="this.onload=null;this.rel='stylesheet'";
        noscript { link rel="stylesheet" href=(href); }
        script { (PreEscaped(loader)) }
    }
    .into_string()
}

fn remove_stylesheet_link(document: &str, href: &str) -> String {
    let pattern = format!(
        r#"<link\b[^>]*\brel="stylesheet"[^>]*\bhref="{}"[^>]*>"#,
        regex::escape(href)
    );
    match Regex::new(&pattern) {
        Ok(re) => re.replace_all(document, "").into_owned(),
        Err(_) => document.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Purge
// ---------------------------------------------------------------------------

/// Tags, classes and ids present in a document.
#[derive(Debug, Default)]
pub struct DocumentIndex {
    tags: HashSet<String>,
    classes: HashSet<String>,
    ids: HashSet<String>,
}

impl DocumentIndex {
    pub fn from_html(html: &str) -> Self {
        let mut index = Self::default();
        index.tags.extend(["html".to_string(), "body".to_string()]);
        index.tags.extend(
            TAG_RE
                .captures_iter(html)
                .map(|c| c[1].to_ascii_lowercase()),
        );
        for caps in CLASS_RE.captures_iter(html) {
            if let Some(value) = caps.get(1).or_else(|| caps.get(2)) {
                index
                    .classes
                    .extend(value.as_str().split_whitespace().map(str::to_string));
            }
        }
        for caps in ID_RE.captures_iter(html) {
            if let Some(value) = caps.get(1).or_else(|| caps.get(2)) {
                index.ids.insert(value.as_str().trim().to_string());
            }
        }
        index
    }

    fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class) || is_safelisted(class)
    }

    fn compound_present(&self, compound: &Compound) -> bool {
        let tag_ok = match compound.tag.as_deref() {
            None | Some("*") => true,
            Some(tag) => self.tags.contains(tag),
        };
        tag_ok
            && compound.classes.iter().all(|c| self.has_class(c))
            && compound.ids.iter().all(|id| self.ids.contains(id))
    }

    /// True when every compound of `selector` occurs in the document.
    pub fn selector_matches(&self, selector: &str) -> bool {
        css::compound_parts(selector)
            .iter()
            .all(|c| self.compound_present(c))
    }
}

fn is_safelisted(class: &str) -> bool {
    SAFELIST_CLASSES.contains(&class) || SAFELIST_PREFIXES.iter().any(|p| class.starts_with(p))
}

fn purge_nodes(nodes: Vec<Node>, index: &DocumentIndex) -> Vec<Node> {
    nodes
        .into_iter()
        .filter_map(|node| match node {
            Node::Rule(rule) => rule
                .selectors
                .iter()
                .any(|s| index.selector_matches(s))
                .then_some(Node::Rule(rule)),
            Node::AtRule(mut at) if at.name == "media" => {
                if let Some(AtRuleBlock::Nodes(children)) = at.block.take() {
                    let kept = purge_nodes(children, index);
                    if kept.is_empty() {
                        return None;
                    }
                    at.block = Some(AtRuleBlock::Nodes(kept));
                }
                Some(Node::AtRule(at))
            }
            other => Some(other),
        })
        .collect()
}

/// Drop rules that match nothing in the document.
pub fn purge_unused(sheet: &mut Stylesheet, index: &DocumentIndex) {
    let nodes = std::mem::take(&mut sheet.nodes);
    sheet.nodes = purge_nodes(nodes, index);
}

// ---------------------------------------------------------------------------
// Select
// ---------------------------------------------------------------------------

/// Whether the leading compound of `selector` matches `token`.
///
/// Tokens are a tag (`h1`), a class (`.hero`), a class prefix (`.nav-*`),
/// `*`, or `:root`. Matching compares whole tokens, so `.hero` does not
/// match `.heroic`.
fn leads_with(selector: &str, token: &str) -> bool {
    if token == ":root" {
        return selector.trim_start().starts_with(":root");
    }
    let Some(first) = css::compound_parts(selector).into_iter().next() else {
        return false;
    };
    match token.strip_prefix('.') {
        Some(class) => match class.strip_suffix('*') {
            Some(prefix) => first.classes.iter().any(|c| c.starts_with(prefix)),
            None => first.classes.iter().any(|c| c == class),
        },
        None => first.tag.as_deref() == Some(token),
    }
}

fn rule_leads_with(rule: &Rule, token: &str) -> bool {
    rule.selectors.iter().any(|s| leads_with(s, token))
}

fn is_critical_rule(rule: &Rule) -> bool {
    rule_leads_with(rule, ":root") || ALLOWLIST.iter().any(|t| rule_leads_with(rule, t))
}

fn select_nodes(nodes: &[Node]) -> Vec<Node> {
    nodes
        .iter()
        .filter_map(|node| match node {
            Node::Rule(rule) => is_critical_rule(rule).then(|| node.clone()),
            Node::AtRule(at) if at.name == "font-face" => Some(node.clone()),
            Node::AtRule(at) if at.name == "media" && at.prelude.contains("prefers-reduced-motion") => {
                Some(node.clone())
            }
            Node::AtRule(at) if at.name == "media" => match &at.block {
                Some(AtRuleBlock::Nodes(children)) => {
                    let kept = select_nodes(children);
                    (!kept.is_empty()).then(|| {
                        let mut at = at.clone();
                        at.block = Some(AtRuleBlock::Nodes(kept));
                        Node::AtRule(at)
                    })
                }
                _ => None,
            },
            Node::AtRule(_) => None,
        })
        .collect()
}

/// The above-the-fold subset of `sheet`, in source order.
pub fn select_critical(sheet: &Stylesheet) -> Vec<Node> {
    select_nodes(&sheet.nodes)
}

// ---------------------------------------------------------------------------
// Budget
// ---------------------------------------------------------------------------

/// Serialize `nodes` one per line, or, when that exceeds the budget, the
/// greedy priority-ordered selection of whole top-level rules that fits.
pub fn apply_budget(nodes: &[Node]) -> String {
    let full = nodes.iter().map(Node::to_css).collect::<Vec<_>>().join("\n");
    if full.len() <= CRITICAL_BUDGET {
        return full;
    }

    let mut taken = vec![false; nodes.len()];
    let mut parts: Vec<String> = Vec::new();
    let mut size = 0;
    for token in PRIORITY {
        for (i, node) in nodes.iter().enumerate() {
            let Node::Rule(rule) = node else { continue };
            if taken[i] || !rule_leads_with(rule, token) {
                continue;
            }
            let css = node.to_css();
            let added = css.len() + usize::from(!parts.is_empty());
            if size + added <= CRITICAL_BUDGET {
                size += added;
                parts.push(css);
                taken[i] = true;
            }
        }
    }
    parts.join("\n")
}
