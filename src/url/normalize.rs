use crate::UrlError;
use url::Url;

/// Schemes the mirror knows how to fetch
const FETCHABLE_SCHEMES: &[&str] = &["http", "https", "file"];

/// Normalizes a URL string into the form used as a dedup key
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject schemes other than http, https and file
/// 3. Lowercase scheme and host, drop default ports, resolve dot segments
///    (all done by the URL parser for special schemes)
/// 4. Remove fragment (everything after #)
/// 5. Stable-sort query parameters by key, keeping their raw encoding
/// 6. Remove empty query string (trailing ?)
///
/// A trailing slash on the path is kept: `/docs` and `/docs/` are
/// different resources.
///
/// # Arguments
///
/// * `url_str` - The URL string to normalize
///
/// # Returns
///
/// * `Ok(Url)` - Normalized URL
/// * `Err(UrlError)` - Failed to parse the URL or unsupported scheme
///
/// # Examples
///
/// ```
/// use sumi_mirror::url::normalize_url;
///
/// let url = normalize_url("HTTP://Example.COM:80/a/../page?b=2&a=1#top").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/page?a=1&b=2");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize_parsed(url)
}

/// Normalizes an already parsed URL
pub fn normalize_parsed(mut url: Url) -> Result<Url, UrlError> {
    if !FETCHABLE_SCHEMES.contains(&url.scheme()) {
        return Err(UrlError::InvalidScheme(format!(
            "Only http, https and file schemes are supported, got: {}",
            url.scheme()
        )));
    }

    url.set_fragment(None);

    if let Some(query) = url.query() {
        let sorted = sort_query(query);
        if sorted.is_empty() {
            url.set_query(None);
        } else {
            url.set_query(Some(&sorted));
        }
    }

    Ok(url)
}

/// Returns the string key under which a URL is stored in the dedup index
pub fn dedup_key(url: &Url) -> Result<String, UrlError> {
    normalize_parsed(url.clone()).map(String::from)
}

/// Sorts `key=value` pairs by key without decoding them
///
/// The sort is stable so repeated keys keep their relative order.
fn sort_query(query: &str) -> String {
    let mut pairs: Vec<&str> = query.split('&').filter(|pair| !pair.is_empty()).collect();
    pairs.sort_by(|a, b| query_key(a).cmp(query_key(b)));
    pairs.join("&")
}

fn query_key(pair: &str) -> &str {
    pair.split_once('=').map_or(pair, |(key, _)| key)
}
