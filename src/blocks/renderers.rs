//! One HTML renderer per block category.
//!
//! Each renderer is a pure function of the block's effective properties and
//! the project's business info. Property values are read leniently: a key
//! that is missing, `null`, an empty string or not a string counts as unset
//! and the renderer falls back to its default.

use crate::types::{BusinessInfo, Properties};
use maud::{Markup, PreEscaped, html};
use pulldown_cmark::{Options, Parser, html as md_html};
use serde_json::Value;

pub const HERO_CSS: &str = include_str!("../../static/blocks/hero.css");
pub const HEADER_CSS: &str = include_str!("../../static/blocks/header.css");
pub const FEATURES_CSS: &str = include_str!("../../static/blocks/features.css");
pub const CTA_CSS: &str = include_str!("../../static/blocks/cta.css");
pub const FOOTER_CSS: &str = include_str!("../../static/blocks/footer.css");
pub const CONTENT_CSS: &str = include_str!("../../static/blocks/content.css");
pub const HEADER_JS: &str = include_str!("../../static/header.js");

const DEFAULT_NAV: [&str; 4] = ["Home", "About", "Services", "Contact"];
const DEFAULT_FOOTER_LINKS: [&str; 3] = ["Privacy Policy", "Terms of Service", "Contact"];
const FEATURE_ICON: &str = "✓";

/// Everything a renderer may look at.
pub struct BlockInput<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub props: &'a Properties,
    pub business: &'a BusinessInfo,
    pub year: i32,
}

impl<'a> BlockInput<'a> {
    fn text(&self, key: &str) -> Option<&'a str> {
        text(self.props, key)
    }
}

fn text<'p>(props: &'p Properties, key: &str) -> Option<&'p str> {
    props
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn string_list(props: &Properties, key: &str) -> Option<Vec<String>> {
    let items = props.get(key)?.as_array()?;
    Some(
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
    )
}

/// `"Terms of Service"` → `"#terms-of-service"`.
fn anchor(label: &str) -> String {
    let slug = label
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-");
    format!("#{}", slug)
}

pub fn hero(input: &BlockInput) -> Markup {
    let business = input.business;
    let title = input.text("title").unwrap_or(&business.company_name);
    let subtitle = input.text("subtitle").unwrap_or(&business.description);

    html! {
        section.hero aria-label="Hero" {
            div.container {
                div.hero-content {
                    h1.hero-title { (title) }
                    p.hero-subtitle { (subtitle) }
                    @if let Some(cta) = input.text("ctaText") {
                        div.hero-actions {
                            a.btn.btn-primary href=(input.text("ctaLink").unwrap_or("#contact")) {
                                (cta)
                            }
                        }
                    }
                }
                @if let Some(src) = input.text("image") {
                    div.hero-image {
                        img src=(src) alt=(input.text("imageAlt").unwrap_or("")) loading="lazy";
                    }
                }
            }
        }
    }
}

pub fn header(input: &BlockInput) -> Markup {
    let business = input.business;
    let logo = input.text("logo").or(business.logo.as_deref());
    let nav_items = string_list(input.props, "navItems")
        .unwrap_or_else(|| DEFAULT_NAV.iter().map(|s| s.to_string()).collect());

    html! {
        header.header role="banner" {
            div.container {
                div.header-content {
                    div.logo {
                        @if let Some(src) = logo {
                            img src=(src) alt=(business.company_name);
                        } @else {
                            span.logo-text { (business.company_name) }
                        }
                    }
                    nav.navigation role="navigation" aria-label="Main navigation" {
                        ul.nav-list {
                            @for item in &nav_items {
                                li.nav-item {
                                    a.nav-link href=(anchor(item)) { (item) }
                                }
                            }
                        }
                    }
                    button.mobile-menu-toggle aria-label="Toggle mobile menu" {
                        span.hamburger {}
                    }
                }
            }
        }
    }
}

struct Feature {
    icon: String,
    title: String,
    description: String,
}

/// Explicit `features` objects, or the first three services.
fn features(input: &BlockInput) -> Vec<Feature> {
    match input.props.get("features").and_then(Value::as_array) {
        Some(items) => items
            .iter()
            .filter_map(Value::as_object)
            .map(|item| Feature {
                icon: text(item, "icon").unwrap_or(FEATURE_ICON).to_string(),
                title: text(item, "title").unwrap_or_default().to_string(),
                description: text(item, "description").unwrap_or_default().to_string(),
            })
            .collect(),
        None => input
            .business
            .services
            .iter()
            .take(3)
            .map(|service| Feature {
                icon: FEATURE_ICON.to_string(),
                title: service.name.clone(),
                description: service.description.clone(),
            })
            .collect(),
    }
}

pub fn features_block(input: &BlockInput) -> Markup {
    let items = features(input);
    html! {
        section.features aria-label="Features" {
            div.container {
                h2.features-title { (input.text("title").unwrap_or("Our Services")) }
                div.features-grid {
                    @for feature in &items {
                        div.feature {
                            div.feature-icon { (feature.icon) }
                            h3.feature-title { (feature.title) }
                            p.feature-description { (feature.description) }
                        }
                    }
                }
            }
        }
    }
}

pub fn cta(input: &BlockInput) -> Markup {
    html! {
        section.cta aria-label="Call to action" {
            div.container {
                div.cta-content {
                    h2.cta-title { (input.text("title").unwrap_or("Ready to Get Started?")) }
                    p.cta-subtitle {
                        (input.text("subtitle").unwrap_or("Contact us today for a free consultation"))
                    }
                    div.cta-actions {
                        a.btn.btn-primary href=(input.text("primaryLink").unwrap_or("#contact")) {
                            (input.text("primaryText").unwrap_or("Get Started"))
                        }
                        @if let Some(secondary) = input.text("secondaryText") {
                            a.btn.btn-secondary href=(input.text("secondaryLink").unwrap_or("#learn-more")) {
                                (secondary)
                            }
                        }
                    }
                }
            }
        }
    }
}

pub fn footer(input: &BlockInput) -> Markup {
    let business = input.business;
    let links = string_list(input.props, "links")
        .unwrap_or_else(|| DEFAULT_FOOTER_LINKS.iter().map(|s| s.to_string()).collect());
    let social: Vec<(&String, &String)> = business
        .social_media
        .iter()
        .filter(|(_, url)| !url.is_empty())
        .collect();

    html! {
        footer.footer role="contentinfo" {
            div.container {
                div.footer-content {
                    div.footer-info {
                        h3 { (business.company_name) }
                        p { (business.description) }
                        @if let Some(address) = &business.contact.address {
                            address {
                                (address.street) br;
                                (address.city) ", " (address.state) " " (address.postal_code)
                            }
                        }
                    }
                    div.footer-links {
                        h4 { "Quick Links" }
                        ul {
                            @for link in &links {
                                li { a href=(anchor(link)) { (link) } }
                            }
                        }
                    }
                    @if !social.is_empty() {
                        div.footer-social {
                            h4 { "Follow Us" }
                            div.social-links {
                                @for (platform, url) in &social {
                                    a href=(url) target="_blank" rel="noopener noreferrer" aria-label=(platform) {
                                        (platform)
                                    }
                                }
                            }
                        }
                    }
                }
                div.footer-bottom {
                    p { "© " (input.year) " " (business.company_name) ". All rights reserved." }
                }
            }
        }
    }
}

/// Markdown body (`markdown`, or `body`) with an optional `title`.
pub fn content(input: &BlockInput) -> Markup {
    let source = input
        .text("markdown")
        .or_else(|| input.text("body"))
        .unwrap_or("");
    let mut body_html = String::new();
    md_html::push_html(
        &mut body_html,
        Parser::new_ext(source, Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH),
    );
    let title = input.text("title");

    html! {
        section.content aria-label=(title.unwrap_or("Content")) {
            div.container {
                @if let Some(title) = title {
                    h2.content-title { (title) }
                }
                div.content-body {
                    (PreEscaped(body_html))
                }
            }
        }
    }
}

/// Fallback for categories without a renderer.
pub fn placeholder(input: &BlockInput) -> Markup {
    html! {
        div class={ "block-" (input.id) } { "Block: " (input.name) }
    }
}
