use crate::UrlError;
use url::Url;

/// Query parameters that only carry tracking data and never change the page
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid"];

/// Normalizes a URL into the form used as the crawl's dedup key
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed (dot segments are resolved and
///    the host is lowercased by the parser)
/// 2. Reject anything but http and https
/// 3. Reject URLs without a host
/// 4. Remove fragment (everything after #)
/// 5. Remove tracking query parameters (`utm_*`, `fbclid`, `gclid`, `mc_eid`)
/// 6. Remove empty query string (trailing ?)
///
/// Scheme, `www.` prefix, trailing slashes and parameter order are left alone:
/// they can select a different resource on some servers.
///
/// # Examples
///
/// ```
/// use ripple_crawl::url::normalize_url;
///
/// let url = normalize_url("https://EXAMPLE.com/a/../page?utm_source=x#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/page");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    url.set_fragment(None);

    let filtered = url.query().map(|query| {
        let kept = query
            .split('&')
            .filter(|pair| !is_tracking_param(pair_key(pair)))
            .collect::<Vec<_>>()
            .join("&");
        let changed = kept != query;
        (kept, changed)
    });

    // Untouched queries keep their original encoding
    match filtered {
        Some((kept, _)) if kept.is_empty() => url.set_query(None),
        Some((kept, true)) => url.set_query(Some(&kept)),
        _ => {}
    }

    Ok(url)
}

fn pair_key(pair: &str) -> &str {
    pair.split_once('=').map_or(pair, |(key, _)| key)
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}
