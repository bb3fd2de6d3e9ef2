//! Block definitions available to pages.
//!
//! The stock catalog ships one block per built-in renderer. A project can add
//! blocks or replace stock ones by id through `Project::blocks`; the overlay
//! is applied once per run with [`BlockCatalog::with_overlay`].

use crate::types::{Block, BlockVariant, Category, Project, Properties};
use serde_json::{Value, json};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct BlockCatalog {
    blocks: BTreeMap<String, Block>,
}

impl Default for BlockCatalog {
    fn default() -> Self {
        Self::stock()
    }
}

impl BlockCatalog {
    pub fn empty() -> Self {
        Self {
            blocks: BTreeMap::new(),
        }
    }

    /// The built-in blocks: `header`, `hero`, `features`, `cta`, `footer`
    /// and `content`.
    pub fn stock() -> Self {
        let mut catalog = Self::empty();
        catalog.insert(stock_block(
            "hero",
            "Hero Section",
            Category::Hero,
            json!({
                "title": "Welcome to Our Business",
                "subtitle": "We provide excellent services",
                "ctaText": "Get Started",
                "ctaLink": "#contact"
            }),
            vec![variant("no-cta", json!({ "ctaText": null }))],
        ));
        catalog.insert(stock_block(
            "header",
            "Header",
            Category::Header,
            json!({ "navItems": ["Home", "About", "Services", "Contact"] }),
            vec![],
        ));
        catalog.insert(stock_block(
            "features",
            "Features",
            Category::Features,
            json!({ "title": "Our Services" }),
            vec![],
        ));
        catalog.insert(stock_block(
            "cta",
            "Call to Action",
            Category::Cta,
            json!({
                "title": "Ready to Get Started?",
                "subtitle": "Contact us today",
                "primaryText": "Get Started",
                "primaryLink": "#contact"
            }),
            vec![variant(
                "with-secondary",
                json!({ "secondaryText": "Learn More", "secondaryLink": "#learn-more" }),
            )],
        ));
        catalog.insert(stock_block("footer", "Footer", Category::Footer, json!({}), vec![]));
        catalog.insert(stock_block(
            "content",
            "Content",
            Category::Content,
            json!({}),
            vec![],
        ));
        catalog
    }

    /// Add or replace a block. Returns the block previously stored under the
    /// same id.
    pub fn insert(&mut self, block: Block) -> Option<Block> {
        self.blocks.insert(block.id.clone(), block)
    }

    /// A copy of this catalog with `blocks` added on top.
    pub fn with_overlay(&self, blocks: &[Block]) -> Self {
        let mut catalog = self.clone();
        for block in blocks {
            catalog.insert(block.clone());
        }
        catalog
    }

    pub fn get(&self, id: &str) -> Option<&Block> {
        self.blocks.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.blocks.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// `(page id, block id)` for every block instance the catalog cannot
    /// resolve, in page order.
    pub fn unresolved(&self, project: &Project) -> Vec<(String, String)> {
        project
            .pages
            .iter()
            .flat_map(|page| {
                page.blocks
                    .iter()
                    .filter(|instance| self.get(&instance.block_id).is_none())
                    .map(|instance| (page.id.clone(), instance.block_id.clone()))
            })
            .collect()
    }
}

fn props(value: Value) -> Properties {
    match value {
        Value::Object(map) => map,
        _ => Properties::new(),
    }
}

fn variant(id: &str, modifications: Value) -> BlockVariant {
    BlockVariant {
        id: id.to_string(),
        modifications: props(modifications),
    }
}

fn stock_block(
    id: &str,
    name: &str,
    category: Category,
    defaults: Value,
    variants: Vec<BlockVariant>,
) -> Block {
    Block {
        id: id.to_string(),
        name: name.to_string(),
        category,
        defaults: props(defaults),
        variants,
        dependencies: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::sample_project;
    use crate::types::BlockInstance;

    #[test]
    fn stock_has_one_block_per_renderer() {
        let catalog = BlockCatalog::stock();
        let ids: Vec<&str> = catalog.ids().collect();
        assert_eq!(ids, vec!["content", "cta", "features", "footer", "header", "hero"]);
        assert_eq!(catalog.get("cta").unwrap().category, Category::Cta);
    }

    #[test]
    fn overlay_replaces_by_id_and_adds_new() {
        let stock = BlockCatalog::stock();
        let custom_hero = Block {
            name: "Custom Hero".into(),
            ..stock.get("hero").unwrap().clone()
        };
        let gallery = stock_block(
            "gallery",
            "Gallery",
            Category::Other("gallery".into()),
            json!({}),
            vec![],
        );

        let merged = stock.with_overlay(&[custom_hero, gallery]);
        assert_eq!(merged.get("hero").unwrap().name, "Custom Hero");
        assert!(merged.get("gallery").is_some());
        assert_eq!(merged.len(), stock.len() + 1);
        // Original untouched
        assert_eq!(stock.get("hero").unwrap().name, "Hero Section");
    }

    #[test]
    fn unresolved_lists_missing_instances() {
        let mut project = sample_project();
        project.pages[1].blocks.push(BlockInstance::new("carousel"));
        let missing = BlockCatalog::stock().unresolved(&project);
        assert_eq!(missing, vec![("about".to_string(), "carousel".to_string())]);
    }

    #[test]
    fn fixture_resolves_against_stock() {
        assert!(BlockCatalog::stock().unresolved(&sample_project()).is_empty());
    }
}
