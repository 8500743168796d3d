use url::Url;

/// Extracts the domain from a URL
///
/// This is the key the per-domain throttle paces on: the lowercase host,
/// without port. Two servers on one host share a pacing slot.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use ripple_crawl::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("https://sub.example.com:8443/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("sub.example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Parses `url` and extracts its domain, or returns an empty string
///
/// Unparseable URLs all share the empty-string pacing slot.
pub fn domain_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .as_ref()
        .and_then(extract_domain)
        .unwrap_or_default()
}
