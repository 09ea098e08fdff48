//! HTML content extraction
//!
//! Parses fetched HTML and pulls out the pieces the document payload
//! carries: title, description, outbound links, images, a short visible-text
//! preview, and page metadata. Extraction never fails; unparseable input
//! degrades to an empty record.

use crate::url::{canonicalize, resolve};
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Tags whose contents never appear in the text preview
const SKIPPED_TAGS: &[&str] = &["script", "style", "header", "footer", "nav", "aside"];

/// Maximum preview length in characters
const PREVIEW_MAX_CHARS: usize = 500;

/// An image reference found on a page
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ImageInfo {
    pub src: String,
    pub alt: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
}

/// Everything extracted from one HTML page
#[derive(Debug, Clone, Default, Serialize)]
pub struct Extraction {
    /// First non-empty of `<title>`, og:title, first `<h1>`
    pub title: Option<String>,

    /// First non-empty of the description, og:description, twitter:description metas
    pub meta_description: Option<String>,

    /// Canonical absolute http(s) links in discovery order, deduplicated
    pub links: Vec<String>,

    /// Images with their alt/title attributes
    pub images: Vec<ImageInfo>,

    /// Visible text, boilerplate stripped, truncated on a word boundary
    pub text_preview: String,

    /// OpenGraph fields, canonical link, and document language
    pub metadata: HashMap<String, String>,
}

/// Extracts content from an HTML document
///
/// # Arguments
///
/// * `html` - Raw HTML
/// * `base_url` - URL the document was fetched from; relative links resolve
///   against it
pub fn extract(html: &str, base_url: &str) -> Extraction {
    let document = Html::parse_document(html);

    Extraction {
        title: extract_title(&document),
        meta_description: extract_meta_description(&document),
        links: extract_links(&document, base_url),
        images: extract_images(&document, base_url),
        text_preview: extract_text_preview(&document),
        metadata: extract_metadata(&document),
    }
}

fn select_first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn select_first_content(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_title(document: &Html) -> Option<String> {
    select_first_text(document, "title")
        .or_else(|| select_first_content(document, r#"meta[property="og:title"]"#))
        .or_else(|| select_first_text(document, "h1"))
}

fn extract_meta_description(document: &Html) -> Option<String> {
    select_first_content(document, r#"meta[name="description"]"#)
        .or_else(|| select_first_content(document, r#"meta[property="og:description"]"#))
        .or_else(|| select_first_content(document, r#"meta[name="twitter:description"]"#))
}

/// Collects outbound links, canonicalized and deduplicated in discovery order
fn extract_links(document: &Html, base_url: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    let Ok(selector) = Selector::parse("a[href]") else {
        return links;
    };

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
        {
            continue;
        }

        if let Some(absolute) = resolve(base_url, href) {
            if seen.insert(absolute.clone()) {
                links.push(absolute);
            }
        }
    }

    links
}

fn extract_images(document: &Html, base_url: &str) -> Vec<ImageInfo> {
    let mut images = Vec::new();

    let Ok(selector) = Selector::parse("img[src]") else {
        return images;
    };

    for element in document.select(&selector) {
        let Some(src) = element.value().attr("src") else {
            continue;
        };
        let src = src.trim();
        if src.is_empty() {
            continue;
        }
        let Some(absolute) = resolve(base_url, src) else {
            continue;
        };

        let attr = |name: &str| element.value().attr(name).unwrap_or("").trim().to_string();
        images.push(ImageInfo {
            src: absolute,
            alt: attr("alt"),
            title: attr("title"),
            width: element.value().attr("width").map(|s| s.to_string()),
            height: element.value().attr("height").map(|s| s.to_string()),
        });
    }

    images
}

/// Extracts visible text, preferring the main content region
fn extract_text_preview(document: &Html) -> String {
    let root = ["main", "article", "body"]
        .iter()
        .filter_map(|tag| Selector::parse(tag).ok())
        .filter_map(|sel| document.select(&sel).next())
        .next();

    let mut raw = String::new();
    collect_visible_text(root.unwrap_or_else(|| document.root_element()), &mut raw);

    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_on_word_boundary(&collapsed, PREVIEW_MAX_CHARS)
}

fn collect_visible_text(element: ElementRef, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
                out.push(' ');
            }
            Node::Element(el) => {
                if SKIPPED_TAGS.contains(&el.name()) {
                    continue;
                }
                if let Some(child_ref) = ElementRef::wrap(child) {
                    collect_visible_text(child_ref, out);
                }
            }
            _ => {}
        }
    }
}

fn truncate_on_word_boundary(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let cut: String = text.chars().take(max_chars).collect();
    let head = match cut.rsplit_once(' ') {
        Some((head, _)) => head,
        None => cut.as_str(),
    };
    format!("{}...", head)
}

fn extract_metadata(document: &Html) -> HashMap<String, String> {
    let mut metadata = HashMap::new();

    for property in ["og:type", "og:site_name", "og:image", "og:url"] {
        let selector = format!(r#"meta[property="{}"]"#, property);
        if let Some(content) = select_first_content(document, &selector) {
            metadata.insert(property.to_string(), content);
        }
    }

    if let Ok(selector) = Selector::parse(r#"link[rel="canonical"]"#) {
        if let Some(href) = document
            .select(&selector)
            .next()
            .and_then(|el| el.value().attr("href"))
            .and_then(|href| canonicalize(href.trim()))
        {
            metadata.insert("canonical_url".to_string(), href);
        }
    }

    if let Ok(selector) = Selector::parse("html") {
        if let Some(lang) = document
            .select(&selector)
            .next()
            .and_then(|el| el.value().attr("lang"))
            .filter(|lang| !lang.is_empty())
        {
            metadata.insert("language".to_string(), lang.to_string());
        }
    }

    metadata
}
