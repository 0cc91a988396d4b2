//! HTML parser for extracting crawlable links
//!
//! Only links that stay on the crawled site are returned, each paired with
//! its canonical key by the site's [`SiteScope`].

use crate::url::{ScopedUrl, SiteScope};
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// File extensions that never lead to an HTML page
const SKIPPED_EXTENSIONS: &[&str] = &[
    "7z", "avi", "bmp", "css", "csv", "doc", "docx", "dmg", "eot", "exe", "gif", "gz", "ico",
    "jpeg", "jpg", "js", "json", "mov", "mp3", "mp4", "pdf", "png", "ppt", "pptx", "rar", "svg",
    "tar", "ttf", "webm", "webp", "woff", "woff2", "xls", "xlsx", "xml", "zip",
];

/// Extracts the same-site links of an HTML page
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:`, `data:` links and fragment-only links
/// - links leaving the site scope
/// - links to non-page resources (images, archives, documents, ...)
///
/// Each canonical key appears once, in document order. `page_url` must be
/// the address the page was actually served from, so relative links resolve
/// against the right directory.
///
/// # Example
///
/// ```
/// use site_indexer::crawler::extract_links;
/// use site_indexer::url::SiteScope;
/// use url::Url;
///
/// let scope = SiteScope::new("https://example.com/").unwrap();
/// let page = Url::parse("https://example.com/").unwrap();
/// let html = r#"<a href="/about">About</a><a href="https://other.com/">Other</a>"#;
/// let links = extract_links(html, &page, &scope);
/// assert_eq!(links.len(), 1);
/// assert_eq!(links[0].key.as_str(), "https://example.com/about");
/// ```
pub fn extract_links(html: &str, page_url: &Url, scope: &SiteScope) -> Vec<ScopedUrl> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    let mut push = |href: &str| {
        if let Some(url) = resolve_link(href, page_url, scope) {
            if seen.insert(url.key.as_str().to_string()) {
                links.push(url);
            }
        }
    };

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    links
}

/// Resolves a link href to an in-scope URL
///
/// Returns None if the link should be excluded.
fn resolve_link(href: &str, page_url: &Url, scope: &SiteScope) -> Option<ScopedUrl> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    let url = scope.resolve(page_url, href)?;
    if has_skipped_extension(&url.key) {
        return None;
    }
    Some(url)
}

fn has_skipped_extension(url: &Url) -> bool {
    let last_segment = url.path().rsplit('/').next().unwrap_or("");
    match last_segment.rsplit_once('.') {
        Some((_, ext)) => SKIPPED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
        None => false,
    }
}
