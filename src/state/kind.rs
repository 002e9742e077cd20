use std::fmt;
use url::Url;

/// Closed set of resource kinds, each with its own handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Html,
    Css,
    Opaque,
}

impl ResourceKind {
    /// Classifies a fetched resource
    ///
    /// The content type wins when it names HTML or CSS; otherwise the
    /// extension of the URL's last path segment decides.
    pub fn classify(content_type: Option<&str>, url: &Url) -> Self {
        content_type
            .and_then(Self::from_content_type)
            .or_else(|| url_extension(url).and_then(|ext| Self::from_extension(&ext)))
            .unwrap_or(Self::Opaque)
    }

    /// Maps a `Content-Type` header value, ignoring parameters and case
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match mime.as_str() {
            "text/html" | "application/xhtml+xml" => Some(Self::Html),
            "text/css" => Some(Self::Css),
            _ => None,
        }
    }

    /// Maps a file extension (with or without the leading dot)
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "html" | "htm" => Some(Self::Html),
            "css" => Some(Self::Css),
            _ => None,
        }
    }

    /// Extension given to files of this kind that have none
    pub fn default_extension(&self) -> Option<&'static str> {
        match self {
            Self::Html => Some(".html"),
            Self::Css => Some(".css"),
            Self::Opaque => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Css => "css",
            Self::Opaque => "opaque",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extension of the last path segment, without the dot
fn url_extension(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.next_back()?;
    let (stem, ext) = segment.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_string())
}
