//! Search-engine metadata.
//!
//! [`optimize`] injects meta tags, social cards, favicon links and JSON-LD
//! structured data into a page's `<head>`. [`generate_robots_txt`] and
//! [`generate_sitemap`] produce the two site-level crawler files, and
//! [`calculate_seo_score`] grades the project's SEO configuration.
//!
//! ## Structured data
//!
//! | Document | When |
//! |----------|------|
//! | `Organization` | always; `LocalBusiness` with address, geo and hours when coordinates exist |
//! | `BreadcrumbList` | every page except the home page |
//! | `Service` + `OfferCatalog` | when the business lists services |
//! | custom | each entry of `seo.structured_data`, as-is |

use crate::blocks::page_title;
use crate::types::{BusinessInfo, OpeningHours, Page, Project};
use chrono::NaiveDate;
use maud::html;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum SeoError {
    #[error("document has no </head>")]
    MissingHead,
    #[error("JSON-LD serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

const HEAD_INDENT: &str = "\n    ";

/// Inject SEO elements before `</head>`. Returns the input unchanged, with
/// a warning, when that fails.
pub fn optimize(html: &str, page: &Page, project: &Project) -> String {
    match inject(html, page, project) {
        Ok(out) => out,
        Err(e) => {
            warn!(page = %page.id, error = %e, "SEO injection skipped");
            html.to_string()
        }
    }
}

/// Fallible form of [`optimize`].
pub fn inject(html: &str, page: &Page, project: &Project) -> Result<String, SeoError> {
    let head_end = html.find("</head>").ok_or(SeoError::MissingHead)?;

    let mut elements = meta_tags(page, project);
    for document in structured_data(page, project) {
        elements.push(ld_json_script(&document)?);
    }

    let mut out = String::with_capacity(html.len() + elements.iter().map(String::len).sum::<usize>());
    out.push_str(&html[..head_end]);
    out.push_str(HEAD_INDENT);
    out.push_str(&elements.join(HEAD_INDENT));
    out.push_str(HEAD_INDENT);
    out.push_str(&html[head_end..]);
    Ok(out)
}

// ============================================================================
// Meta tags
// ============================================================================

fn meta_name(name: &str, content: &str) -> String {
    html! { meta name=(name) content=(content); }.into_string()
}

fn meta_property(property: &str, content: &str) -> String {
    html! { meta property=(property) content=(content); }.into_string()
}

fn first_non_empty<'a>(candidates: &[&'a str]) -> &'a str {
    candidates
        .iter()
        .copied()
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

/// Combined robots directive, or `None` when nothing restricts crawling.
pub fn robots_directive(project: &Project) -> Option<String> {
    let robots = &project.seo.robots;
    let mut directives = Vec::new();
    if !robots.index {
        directives.push("noindex".to_string());
    }
    if !robots.follow {
        directives.push("nofollow".to_string());
    }
    if robots.noarchive {
        directives.push("noarchive".to_string());
    }
    if robots.nosnippet {
        directives.push("nosnippet".to_string());
    }
    if robots.noimageindex {
        directives.push("noimageindex".to_string());
    }
    if let Some(n) = robots.max_snippet {
        directives.push(format!("max-snippet:{}", n));
    }
    if let Some(preview) = robots.max_image_preview.as_deref() {
        directives.push(format!("max-image-preview:{}", preview));
    }
    if let Some(n) = robots.max_video_preview {
        directives.push(format!("max-video-preview:{}", n));
    }
    (!directives.is_empty()).then(|| directives.join(", "))
}

/// Meta and link tags for one page, in emission order.
pub fn meta_tags(page: &Page, project: &Project) -> Vec<String> {
    let seo = &project.seo;
    let business = &project.business;
    let og = &seo.open_graph;
    let title = page_title(page, project);
    let description = first_non_empty(&[page.meta.description.as_str(), business.description.as_str()]);
    let mut tags = Vec::new();

    tags.push(meta_name("description", description));
    if !page.meta.keywords.is_empty() {
        tags.push(meta_name("keywords", &page.meta.keywords.join(", ")));
    }
    tags.push(meta_name(
        "author",
        seo.author.as_deref().unwrap_or(&business.company_name),
    ));
    if let Some(directive) = robots_directive(project) {
        tags.push(meta_name("robots", &directive));
    }

    tags.push(meta_property("og:type", &og.kind));
    tags.push(meta_property("og:title", og.title.as_deref().unwrap_or(title)));
    tags.push(meta_property(
        "og:description",
        og.description.as_deref().unwrap_or(description),
    ));
    tags.push(meta_property("og:url", &format!("{}{}", og.url, page.path)));
    tags.push(meta_property("og:site_name", &og.site_name));
    tags.push(meta_property("og:locale", &og.locale));
    if let Some(image) = &og.image {
        tags.push(meta_property("og:image", &image.url));
        if let Some(width) = image.width {
            tags.push(meta_property("og:image:width", &width.to_string()));
        }
        if let Some(height) = image.height {
            tags.push(meta_property("og:image:height", &height.to_string()));
        }
        if let Some(alt) = &image.alt {
            tags.push(meta_property("og:image:alt", alt));
        }
    }

    let twitter = &seo.twitter;
    tags.push(meta_name("twitter:card", &twitter.card));
    tags.push(meta_name("twitter:title", twitter.title.as_deref().unwrap_or(title)));
    tags.push(meta_name(
        "twitter:description",
        twitter.description.as_deref().unwrap_or(description),
    ));
    if let Some(site) = &twitter.site {
        tags.push(meta_name("twitter:site", site));
    }
    if let Some(creator) = &twitter.creator {
        tags.push(meta_name("twitter:creator", creator));
    }
    if let Some(image) = &twitter.image {
        tags.push(meta_name("twitter:image", image));
        if let Some(alt) = &twitter.image_alt {
            tags.push(meta_name("twitter:image:alt", alt));
        }
    }

    if let Some(canonical) = &page.meta.canonical {
        tags.push(html! { link rel="canonical" href=(canonical); }.into_string());
    }

    if let Some(icons) = &seo.favicon {
        tags.push(html! { link rel="icon" type="image/x-icon" href=(icons.ico); }.into_string());
        tags.push(
            html! { link rel="icon" type="image/png" sizes="16x16" href=(icons.png16); }
                .into_string(),
        );
        tags.push(
            html! { link rel="icon" type="image/png" sizes="32x32" href=(icons.png32); }
                .into_string(),
        );
        if let Some(png192) = &icons.png192 {
            tags.push(
                html! { link rel="icon" type="image/png" sizes="192x192" href=(png192); }
                    .into_string(),
            );
        }
        if let Some(apple) = &icons.apple_touch_icon {
            tags.push(html! { link rel="apple-touch-icon" href=(apple); }.into_string());
        }
        if let Some(manifest) = &icons.manifest {
            tags.push(html! { link rel="manifest" href=(manifest); }.into_string());
        }
    }

    tags
}

// ============================================================================
// Structured data
// ============================================================================

fn business_type(business: &BusinessInfo) -> &'static str {
    if business.location.coordinates.is_some() {
        "LocalBusiness"
    } else {
        "Organization"
    }
}

fn area_served(business: &BusinessInfo) -> &str {
    business
        .location
        .service_area
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or("Global")
}

/// `Mo 08:00-17:00` per open day; closed or incomplete days are skipped.
pub fn format_opening_hours(hours: &[OpeningHours]) -> Vec<String> {
    hours
        .iter()
        .filter(|h| !h.closed && !h.open.is_empty() && !h.close.is_empty())
        .map(|h| format!("{} {}-{}", h.day.code(), h.open, h.close))
        .collect()
}

/// Drop `null` members recursively so absent optionals are omitted.
fn strip_nulls(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            map.values_mut().for_each(strip_nulls);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_nulls),
        _ => {}
    }
}

fn organization_schema(project: &Project) -> Value {
    let business = &project.business;
    let contact = &business.contact;
    let mut schema = json!({
        "@context": "https://schema.org",
        "@type": business_type(business),
        "name": business.company_name,
        "description": business.description,
        "url": project.seo.open_graph.url,
        "logo": business.logo,
        "contactPoint": {
            "@type": "ContactPoint",
            "telephone": contact.phone,
            "email": contact.email,
            "contactType": "customer service",
            "areaServed": area_served(business),
            "availableLanguage": project.seo.open_graph.locale,
        },
        "sameAs": business
            .social_media
            .values()
            .filter(|url| !url.is_empty())
            .collect::<Vec<_>>(),
    });

    if let (Some(coords), Value::Object(map)) = (business.location.coordinates, &mut schema) {
        if let Some(address) = &contact.address {
            map.insert(
                "address".into(),
                json!({
                    "@type": "PostalAddress",
                    "streetAddress": address.street,
                    "addressLocality": address.city,
                    "addressRegion": address.state,
                    "postalCode": address.postal_code,
                    "addressCountry": address.country,
                }),
            );
        }
        map.insert(
            "geo".into(),
            json!({
                "@type": "GeoCoordinates",
                "latitude": coords.latitude,
                "longitude": coords.longitude,
            }),
        );
        map.insert(
            "openingHours".into(),
            json!(format_opening_hours(&contact.hours)),
        );
    }
    schema
}

fn breadcrumb_schema(page: &Page, project: &Project) -> Value {
    let base = &project.seo.open_graph.url;
    json!({
        "@context": "https://schema.org",
        "@type": "BreadcrumbList",
        "itemListElement": [
            { "@type": "ListItem", "position": 1, "name": "Home", "item": base },
            {
                "@type": "ListItem",
                "position": 2,
                "name": page.title,
                "item": format!("{}{}", base, page.path),
            },
        ],
    })
}

fn service_schema(project: &Project) -> Value {
    let business = &project.business;
    let offers: Vec<Value> = business
        .services
        .iter()
        .map(|service| {
            json!({
                "@type": "Offer",
                "itemOffered": {
                    "@type": "Service",
                    "name": service.name,
                    "description": service.description,
                },
                "price": service.price.as_ref().map(|p| p.amount),
                "priceCurrency": service.price.as_ref().map(|p| p.currency.as_str()),
            })
        })
        .collect();
    json!({
        "@context": "https://schema.org",
        "@type": "Service",
        "serviceType": business.industry,
        "provider": {
            "@type": business_type(business),
            "name": business.company_name,
        },
        "areaServed": area_served(business),
        "hasOfferCatalog": {
            "@type": "OfferCatalog",
            "name": "Services",
            "itemListElement": offers,
        },
    })
}

/// JSON-LD documents for one page, in emission order.
pub fn structured_data(page: &Page, project: &Project) -> Vec<Value> {
    let mut documents = vec![organization_schema(project)];
    if !page.is_home_page() {
        documents.push(breadcrumb_schema(page, project));
    }
    if !project.business.services.is_empty() {
        documents.push(service_schema(project));
    }
    for document in &mut documents {
        strip_nulls(document);
    }
    documents.extend(project.seo.structured_data.iter().cloned());
    documents
}

fn ld_json_script(document: &Value) -> Result<String, SeoError> {
    let json = serde_json::to_string(document)?.replace("</", "<\\/");
    Ok(format!(r#"<script type="application/ld+json">{}</script>"#, json))
}

// ============================================================================
// Crawler files
// ============================================================================

/// `robots.txt` for the site. `base_url` is the same base the sitemap
/// locations use, without a trailing `/`.
pub fn generate_robots_txt(project: &Project, base_url: &str, crawl_delay: u32) -> String {
    let seo = &project.seo;
    let mut lines = vec!["User-agent: *".to_string()];
    if seo.robots.index {
        lines.push("Allow: /".to_string());
        lines.extend(
            seo.sitemap
                .exclude_paths
                .iter()
                .map(|path| format!("Disallow: {}", path)),
        );
    } else {
        lines.push("Disallow: /".to_string());
    }
    lines.push(String::new());
    lines.push(format!("Sitemap: {}/sitemap.xml", base_url.trim_end_matches('/')));
    lines.push(String::new());
    lines.push(format!("Crawl-delay: {}", crawl_delay));
    lines.join("\n")
}

/// Escape XML special characters.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// `sitemap.xml` listing every page not excluded.
///
/// `lastmod` is the page's `last_modified`, else the project's `updated_at`,
/// else `build_date`.
pub fn generate_sitemap(project: &Project, base_url: &str, build_date: NaiveDate) -> String {
    let sitemap = &project.seo.sitemap;
    let mut lines = vec![
        r#"<?xml version="1.0" encoding="UTF-8"?>"#.to_string(),
        r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#.to_string(),
    ];

    for page in &project.pages {
        if sitemap.exclude_paths.iter().any(|p| p == &page.path) {
            continue;
        }
        let path = if page.path == "/" { "" } else { page.path.as_str() };
        let lastmod = page
            .meta
            .last_modified
            .or(project.updated_at)
            .unwrap_or(build_date);
        let priority = if page.is_home_page() {
            "1.0".to_string()
        } else {
            format!("{:.1}", sitemap.priority)
        };

        lines.push("  <url>".to_string());
        lines.push(format!("    <loc>{}</loc>", escape_xml(&format!("{}{}", base_url, path))));
        lines.push(format!("    <lastmod>{}</lastmod>", lastmod.format("%Y-%m-%d")));
        lines.push(format!(
            "    <changefreq>{}</changefreq>",
            sitemap.change_frequency.as_str()
        ));
        lines.push(format!("    <priority>{}</priority>", priority));
        lines.push("  </url>".to_string());
    }

    lines.push("</urlset>".to_string());
    lines.join("\n")
}

// ============================================================================
// Score
// ============================================================================

/// Grade the project's SEO configuration, 0–100.
pub fn calculate_seo_score(project: &Project) -> u32 {
    let seo = &project.seo;
    let mut score: i32 = 100;
    if seo.title.is_empty() {
        score -= 10;
    }
    if seo.description.is_empty() {
        score -= 10;
    }
    if seo.open_graph.image.is_none() {
        score -= 5;
    }
    if seo.structured_data.is_empty() {
        score -= 10;
    }
    if !seo.sitemap.enabled {
        score -= 5;
    }
    if seo.favicon.is_none() {
        score -= 5;
    }
    for page in &project.pages {
        if page.meta.title.is_empty() {
            score -= 2;
        }
        if page.meta.description.is_empty() {
            score -= 2;
        }
    }
    score.max(0) as u32
}
