//! Block rendering and page composition.
//!
//! A page is an ordered list of [`BlockInstance`]s. Each instance is resolved
//! against the run's [`BlockCatalog`], its effective properties are merged,
//! and the renderer for the block's category produces HTML, CSS and
//! (for the header only) JS.
//!
//! ## Property merge order
//!
//! ```text
//! block.defaults ⊕ variant₁ ⊕ variant₂ ⊕ … ⊕ instance.props
//! ```
//!
//! Later values win on key collision. Variant ids the block does not define
//! are skipped.
//!
//! ## Page assembly
//!
//! The page stylesheet is the theme's `:root` block, the shared base rules,
//! then each distinct block stylesheet in page order. The page script is
//! each distinct block script in page order. The document inlines the whole
//! stylesheet in `<head>` and links `/css/<id>.css` and `/js/<id>.js` at the
//! end of `<body>`; the critical-CSS stage later rewrites that split.
//!
//! Rendered blocks are memoized in the run's
//! [`BuildCache`](crate::cache::BuildCache), so a header or footer repeated
//! on every page renders once.

mod catalog;
mod renderers;
mod theme;

pub use catalog::BlockCatalog;
pub use theme::{BASE_CSS, theme_css};

use crate::cache::block_key;
use crate::context::GeneratorContext;
use crate::optimize::generate_resource_hints;
use crate::types::{Block, BlockInstance, Category, Page, Project, Properties};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use renderers::BlockInput;
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("unknown block '{0}'")]
    UnknownBlock(String),
}

/// Output of one block.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedBlock {
    pub html: String,
    pub css: String,
    pub js: Option<String>,
    pub dependencies: Vec<String>,
}

/// A fully assembled page plus its external stylesheet and script.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedPage {
    pub html: String,
    pub css: String,
    /// Empty when no block emits script.
    pub js: String,
    /// Union of block dependencies, first-seen order.
    pub dependencies: Vec<String>,
}

/// Merge a block's defaults, the instance's variants and its overrides.
pub fn effective_properties(block: &Block, instance: &BlockInstance) -> Properties {
    let mut props = block.defaults.clone();
    for variant_id in &instance.variants {
        match block.variants.iter().find(|v| &v.id == variant_id) {
            Some(variant) => props.extend(variant.modifications.clone()),
            None => debug!(block = %block.id, variant = %variant_id, "unknown variant skipped"),
        }
    }
    props.extend(instance.props.clone());
    props
}

/// Render one block instance.
pub fn render_block(
    instance: &BlockInstance,
    project: &Project,
    ctx: &GeneratorContext<'_>,
) -> Result<RenderedBlock, RenderError> {
    let block = ctx
        .catalog
        .get(&instance.block_id)
        .ok_or_else(|| RenderError::UnknownBlock(instance.block_id.clone()))?;
    let props = effective_properties(block, instance);

    let key = block_key(&block.id, &props);
    if let Some(hit) = ctx.cache.get_block(&key) {
        return Ok(hit);
    }

    let input = BlockInput {
        id: &block.id,
        name: &block.name,
        props: &props,
        business: &project.business,
        year: ctx.year(),
    };
    let (markup, css, js) = match &block.category {
        Category::Hero => (renderers::hero(&input), renderers::HERO_CSS, None),
        Category::Header => (
            renderers::header(&input),
            renderers::HEADER_CSS,
            Some(renderers::HEADER_JS),
        ),
        Category::Features => (renderers::features_block(&input), renderers::FEATURES_CSS, None),
        Category::Cta => (renderers::cta(&input), renderers::CTA_CSS, None),
        Category::Footer => (renderers::footer(&input), renderers::FOOTER_CSS, None),
        Category::Content => (renderers::content(&input), renderers::CONTENT_CSS, None),
        Category::Other(_) => (renderers::placeholder(&input), "", None),
    };

    let rendered = RenderedBlock {
        html: markup.into_string(),
        css: css.to_string(),
        js: js.map(str::to_string),
        dependencies: block.dependencies.clone(),
    };
    ctx.cache.put_block(key, rendered.clone());
    Ok(rendered)
}

/// Render every block of `page` and assemble the document.
pub fn compose_page(
    page: &Page,
    project: &Project,
    ctx: &GeneratorContext<'_>,
) -> Result<ComposedPage, RenderError> {
    let blocks = page
        .blocks
        .iter()
        .map(|instance| render_block(instance, project, ctx))
        .collect::<Result<Vec<_>, _>>()?;

    let css = page_stylesheet(project, &blocks);
    let js = page_script(&blocks);
    let hints = generate_resource_hints(&ctx.config.performance.preloading);
    let html = document(page, &page_title(page, project), &hints, &css, &blocks, !js.is_empty());

    let mut seen = HashSet::new();
    let dependencies = blocks
        .iter()
        .flat_map(|b| b.dependencies.iter())
        .filter(|d| seen.insert(d.as_str()))
        .cloned()
        .collect();

    Ok(ComposedPage {
        html: html.into_string(),
        css,
        js,
        dependencies,
    })
}

/// The page document as a string.
pub fn render_page(
    page: &Page,
    project: &Project,
    ctx: &GeneratorContext<'_>,
) -> Result<String, RenderError> {
    Ok(compose_page(page, project, ctx)?.html)
}

/// `meta.title`, else the page title, else the company name.
pub fn page_title<'a>(page: &'a Page, project: &'a Project) -> &'a str {
    [
        page.meta.title.as_str(),
        page.title.as_str(),
        project.business.company_name.as_str(),
    ]
    .into_iter()
    .find(|t| !t.is_empty())
    .unwrap_or_default()
}

fn page_stylesheet(project: &Project, blocks: &[RenderedBlock]) -> String {
    let mut seen = HashSet::new();
    let mut parts = vec![
        theme_css(&project.template.customizations),
        BASE_CSS.to_string(),
    ];
    parts.extend(
        blocks
            .iter()
            .filter(|b| !b.css.is_empty() && seen.insert(b.css.as_str()))
            .map(|b| b.css.clone()),
    );
    parts.join("\n")
}

fn page_script(blocks: &[RenderedBlock]) -> String {
    let mut seen = HashSet::new();
    blocks
        .iter()
        .filter_map(|b| b.js.as_deref())
        .filter(|js| !js.is_empty() && seen.insert(*js))
        .collect::<Vec<_>>()
        .join("\n")
}

fn document(
    page: &Page,
    title: &str,
    hints: &str,
    css: &str,
    blocks: &[RenderedBlock],
    has_js: bool,
) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                (PreEscaped(hints))
                style { (PreEscaped(css)) }
            }
            body {
                @for block in blocks {
                    (PreEscaped(&block.html))
                }
                link rel="stylesheet" href={ "/css/" (page.id) ".css" };
                @if has_js {
                    script src={ "/js/" (page.id) ".js" } defer {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::BlockCatalog;
    use crate::config::GeneratorConfig;
    use crate::test_helpers::{count_occurrences, find_page, sample_project, test_context};
    use crate::types::BlockVariant;
    use serde_json::json;

    fn props(value: serde_json::Value) -> Properties {
        value.as_object().cloned().unwrap()
    }

    // =========================================================================
    // Effective properties
    // =========================================================================

    fn block_with_variants() -> Block {
        Block {
            id: "b".into(),
            name: "B".into(),
            category: Category::Cta,
            defaults: props(json!({ "title": "default", "subtitle": "sub", "x": 1 })),
            variants: vec![
                BlockVariant {
                    id: "v1".into(),
                    modifications: props(json!({ "title": "v1", "x": 2 })),
                },
                BlockVariant {
                    id: "v2".into(),
                    modifications: props(json!({ "title": "v2" })),
                },
            ],
            dependencies: vec![],
        }
    }

    #[test]
    fn later_layers_win() {
        let block = block_with_variants();
        let mut instance = BlockInstance::new("b");
        instance.variants = vec!["v1".into(), "v2".into()];
        instance.props = props(json!({ "subtitle": "mine" }));

        let effective = effective_properties(&block, &instance);
        assert_eq!(effective["title"], "v2");
        assert_eq!(effective["x"], 2);
        assert_eq!(effective["subtitle"], "mine");
    }

    #[test]
    fn variant_order_matters() {
        let block = block_with_variants();
        let mut instance = BlockInstance::new("b");
        instance.variants = vec!["v2".into(), "v1".into()];
        assert_eq!(effective_properties(&block, &instance)["title"], "v1");
    }

    #[test]
    fn instance_props_beat_variants() {
        let block = block_with_variants();
        let mut instance = BlockInstance::new("b");
        instance.variants = vec!["v1".into()];
        instance.props = props(json!({ "title": "mine" }));
        assert_eq!(effective_properties(&block, &instance)["title"], "mine");
    }

    #[test]
    fn unknown_variant_is_skipped() {
        let block = block_with_variants();
        let mut instance = BlockInstance::new("b");
        instance.variants = vec!["nope".into()];
        assert_eq!(effective_properties(&block, &instance)["title"], "default");
    }

    // =========================================================================
    // render_block
    // =========================================================================

    #[test]
    fn unknown_block_is_error() {
        let project = sample_project();
        let config = GeneratorConfig::default();
        let catalog = BlockCatalog::stock();
        let ctx = test_context(&config, &catalog);
        let err = render_block(&BlockInstance::new("carousel"), &project, &ctx).unwrap_err();
        assert!(matches!(err, RenderError::UnknownBlock(id) if id == "carousel"));
    }

    #[test]
    fn only_header_emits_js() {
        let project = sample_project();
        let config = GeneratorConfig::default();
        let catalog = BlockCatalog::stock();
        let ctx = test_context(&config, &catalog);
        for id in ["hero", "features", "cta", "footer", "content"] {
            let block = render_block(&BlockInstance::new(id), &project, &ctx).unwrap();
            assert!(block.js.is_none(), "{id}");
            assert!(!block.css.is_empty(), "{id}");
        }
        let header = render_block(&BlockInstance::new("header"), &project, &ctx).unwrap();
        assert!(header.js.unwrap().contains("mobile-menu-toggle"));
    }

    #[test]
    fn rendered_hero_title_follows_merge_order() {
        let project = sample_project();
        let config = GeneratorConfig::default();
        let mut catalog = BlockCatalog::empty();
        catalog.insert(Block {
            id: "banner".into(),
            name: "Banner".into(),
            category: Category::Hero,
            defaults: props(json!({ "title": "A" })),
            variants: vec![BlockVariant {
                id: "loud".into(),
                modifications: props(json!({ "title": "B" })),
            }],
            dependencies: vec![],
        });
        let ctx = test_context(&config, &catalog);

        let mut instance = BlockInstance::new("banner");
        let plain = render_block(&instance, &project, &ctx).unwrap();
        assert!(plain.html.contains(r#"<h1 class="hero-title">A</h1>"#), "{}", plain.html);

        instance.variants = vec!["loud".into()];
        let varied = render_block(&instance, &project, &ctx).unwrap();
        assert!(varied.html.contains(r#"<h1 class="hero-title">B</h1>"#), "{}", varied.html);

        instance.props = props(json!({ "title": "C" }));
        let overridden = render_block(&instance, &project, &ctx).unwrap();
        assert!(
            overridden.html.contains(r#"<h1 class="hero-title">C</h1>"#),
            "{}",
            overridden.html
        );
    }

    #[test]
    fn hero_variant_removes_cta() {
        let project = sample_project();
        let config = GeneratorConfig::default();
        let catalog = BlockCatalog::stock();
        let ctx = test_context(&config, &catalog);

        let plain = render_block(&BlockInstance::new("hero"), &project, &ctx).unwrap();
        assert!(plain.html.contains("hero-actions"));

        let mut instance = BlockInstance::new("hero");
        instance.variants = vec!["no-cta".into()];
        let trimmed = render_block(&instance, &project, &ctx).unwrap();
        assert!(!trimmed.html.contains("hero-actions"));
    }

    #[test]
    fn unknown_category_renders_placeholder() {
        let project = sample_project();
        let config = GeneratorConfig::default();
        let mut catalog = BlockCatalog::stock();
        catalog.insert(Block {
            id: "gallery".into(),
            name: "Gallery".into(),
            category: Category::Other("gallery".into()),
            defaults: Properties::new(),
            variants: vec![],
            dependencies: vec!["lightbox".into()],
        });
        let ctx = test_context(&config, &catalog);
        let block = render_block(&BlockInstance::new("gallery"), &project, &ctx).unwrap();
        assert_eq!(block.html, "<div class=\"block-gallery\">Block: Gallery</div>");
        assert!(block.css.is_empty());
        assert_eq!(block.dependencies, vec!["lightbox".to_string()]);
    }

    #[test]
    fn repeated_blocks_hit_cache() {
        let project = sample_project();
        let config = GeneratorConfig::default();
        let catalog = BlockCatalog::stock();
        let ctx = test_context(&config, &catalog);

        let a = render_block(&BlockInstance::new("footer"), &project, &ctx).unwrap();
        let b = render_block(&BlockInstance::new("footer"), &project, &ctx).unwrap();
        assert_eq!(a, b);
        let stats = ctx.cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    // =========================================================================
    // compose_page
    // =========================================================================

    #[test]
    fn page_document_structure() {
        let project = sample_project();
        let config = GeneratorConfig::default();
        let catalog = BlockCatalog::stock();
        let ctx = test_context(&config, &catalog);
        let page = compose_page(find_page(&project, "home"), &project, &ctx).unwrap();

        assert!(page.html.starts_with("<!DOCTYPE html>"));
        assert!(page.html.contains("<title>Acme Plumbing | Springfield Plumbers</title>"));
        assert!(page.html.contains("<link rel=\"stylesheet\" href=\"/css/home.css\">"));
        assert!(page.html.contains("src=\"/js/home.js\""));
        assert_eq!(count_occurrences(&page.html, "<style>"), 1);

        let header_at = page.html.find("class=\"header\"").unwrap();
        let hero_at = page.html.find("class=\"hero\"").unwrap();
        let footer_at = page.html.find("class=\"footer\"").unwrap();
        assert!(header_at < hero_at && hero_at < footer_at);
    }

    #[test]
    fn stylesheet_has_single_root_first() {
        let project = sample_project();
        let config = GeneratorConfig::default();
        let catalog = BlockCatalog::stock();
        let ctx = test_context(&config, &catalog);
        let page = compose_page(find_page(&project, "home"), &project, &ctx).unwrap();

        assert!(page.css.starts_with(":root {"));
        assert_eq!(count_occurrences(&page.css, ":root"), 1);
        assert!(page.css.contains("--primary: #0066cc;"));
        let hero_at = page.css.find(".hero {").unwrap();
        let footer_at = page.css.find(".footer {").unwrap();
        assert!(hero_at < footer_at);
    }

    #[test]
    fn duplicate_blocks_share_css() {
        let mut project = sample_project();
        project.pages[0].blocks.push(BlockInstance::new("cta"));
        let config = GeneratorConfig::default();
        let catalog = BlockCatalog::stock();
        let ctx = test_context(&config, &catalog);
        let page = compose_page(&project.pages[0], &project, &ctx).unwrap();
        assert_eq!(count_occurrences(&page.css, ".cta {"), 1);
        assert_eq!(count_occurrences(&page.html, "class=\"cta\""), 2);
    }

    #[test]
    fn page_without_header_has_no_script() {
        let project = sample_project();
        let config = GeneratorConfig::default();
        let catalog = BlockCatalog::stock();
        let ctx = test_context(&config, &catalog);
        let mut page = find_page(&project, "pricing").clone();
        page.blocks.retain(|b| b.block_id != "header");

        let composed = compose_page(&page, &project, &ctx).unwrap();
        assert!(composed.js.is_empty());
        assert!(!composed.html.contains("<script"));
    }

    #[test]
    fn resource_hints_in_head() {
        let project = sample_project();
        let mut config = GeneratorConfig::default();
        config.performance.preloading.preconnect = vec!["https://fonts.gstatic.com".into()];
        let catalog = BlockCatalog::stock();
        let ctx = test_context(&config, &catalog);
        let html = render_page(find_page(&project, "about"), &project, &ctx).unwrap();
        let head_end = html.find("</head>").unwrap();
        let hint_at = html.find("rel=\"preconnect\"").unwrap();
        assert!(hint_at < head_end);
    }

    #[test]
    fn page_title_fallbacks() {
        let project = sample_project();
        let mut page = find_page(&project, "pricing").clone();
        assert_eq!(page_title(&page, &project), "Pricing");
        page.title.clear();
        assert_eq!(page_title(&page, &project), "Acme Plumbing");
    }

    #[test]
    fn rendering_is_deterministic() {
        let project = sample_project();
        let config = GeneratorConfig::default();
        let catalog = BlockCatalog::stock();
        let a = render_page(
            find_page(&project, "home"),
            &project,
            &test_context(&config, &catalog),
        )
        .unwrap();
        let b = render_page(
            find_page(&project, "home"),
            &project,
            &test_context(&config, &catalog),
        )
        .unwrap();
        assert_eq!(a, b);
    }
}
