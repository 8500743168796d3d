//! HTML parser for extracting page metadata and links
//!
//! This module handles parsing HTML content to extract:
//! - Page title (first `<title>`)
//! - Meta description (`<meta name="description">`)
//! - Links to follow (from `<a href>` tags, in document order)
//!
//! Parsing never fails: malformed markup yields whatever `scraper` recovers,
//! and missing fields fall back to sentinel values.

use scraper::{Html, Selector};
use url::Url;

/// Title recorded for pages without a usable `<title>`
pub const NO_TITLE: &str = "No title";

/// Description recorded for pages without a usable meta description
pub const NO_DESCRIPTION: &str = "No description";

/// Extracted information from an HTML page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPage {
    /// The page title, or `NO_TITLE`
    pub title: String,

    /// The meta description, or `NO_DESCRIPTION`
    pub description: String,

    /// All links found on the page (absolute URLs, document order)
    pub links: Vec<String>,
}

/// Turns a fetched body into a `ParsedPage`
pub trait PageParser: Send + Sync {
    fn parse(&self, html: &str, base_url: &Url) -> ParsedPage;
}

/// `scraper`-backed HTML parser
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlParser;

impl PageParser for HtmlParser {
    fn parse(&self, html: &str, base_url: &Url) -> ParsedPage {
        parse_html(html, base_url)
    }
}

/// Parses HTML content and extracts metadata and links
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links (same page anchors)
/// - Anything that does not resolve to http(s)
///
/// # Example
///
/// ```
/// use ripple_crawl::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.title, "Test");
/// assert_eq!(parsed.links, vec!["https://example.com/page".to_string()]);
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document).unwrap_or_else(|| NO_TITLE.to_string()),
        description: extract_description(&document)
            .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
        links: extract_links(&document, base_url),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Extracts the first non-empty `<meta name="description">` content
fn extract_description(document: &Html) -> Option<String> {
    let meta_selector = Selector::parse("meta[name][content]").ok()?;

    document
        .select(&meta_selector)
        .filter(|element| {
            element
                .value()
                .attr("name")
                .is_some_and(|name| name.eq_ignore_ascii_case("description"))
        })
        .filter_map(|element| element.value().attr("content"))
        .map(|content| content.trim().to_string())
        .find(|content| !content.is_empty())
}

/// Extracts all valid links from the HTML document
fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let Ok(a_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&a_selector)
        .filter(|element| element.value().attr("download").is_none())
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .collect()
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("data:")
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
        Some(absolute_url.to_string())
    } else {
        None
    }
}
