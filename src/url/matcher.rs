use std::fmt;
use std::sync::Arc;
use url::Url;

/// Checks if a host matches a wildcard pattern
///
/// This function supports two types of patterns:
/// 1. Exact match: "example.com" matches only "example.com"
/// 2. Wildcard match: "*.example.com" matches:
///    - "example.com" (the bare host)
///    - "cdn.example.com" (single subdomain)
///    - "img.cdn.example.com" (nested subdomains)
///
/// Comparison ignores ASCII case.
///
/// # Examples
///
/// ```
/// use sumi_mirror::url::matches_wildcard;
///
/// assert!(matches_wildcard("example.com", "EXAMPLE.com"));
/// assert!(matches_wildcard("*.example.com", "cdn.example.com"));
/// assert!(!matches_wildcard("*.example.com", "example.org"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    let candidate = candidate.to_ascii_lowercase();
    let pattern = pattern.to_ascii_lowercase();

    if let Some(base) = pattern.strip_prefix("*.") {
        candidate == base || candidate.ends_with(&format!(".{}", base))
    } else {
        candidate == pattern
    }
}

type FilterFn = dyn Fn(&Url) -> bool + Send + Sync;

/// Predicate deciding whether an absolute URL may be fetched
///
/// Rejected URLs are treated as missing references, never as errors.
#[derive(Clone)]
pub struct UrlFilter(Arc<FilterFn>);

impl UrlFilter {
    /// Wraps an arbitrary predicate
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&Url) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(predicate))
    }

    /// Accepts every URL
    pub fn allow_all() -> Self {
        Self::new(|_| true)
    }

    /// Accepts URLs whose host matches one of the patterns
    ///
    /// An empty pattern list accepts everything. URLs without a host
    /// (`file:`) are always accepted.
    pub fn hosts(patterns: Vec<String>) -> Self {
        if patterns.is_empty() {
            return Self::allow_all();
        }

        Self::new(move |url| match url.host_str() {
            Some(host) => patterns
                .iter()
                .any(|pattern| matches_wildcard(pattern, host)),
            None => true,
        })
    }

    pub fn allows(&self, url: &Url) -> bool {
        (self.0)(url)
    }
}

impl Default for UrlFilter {
    fn default() -> Self {
        Self::allow_all()
    }
}

impl fmt::Debug for UrlFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("UrlFilter(..)")
    }
}
