use crate::filename::sanitize::{
    decode_segment, sanitize_component, shorten_component, split_extension,
};
use crate::filename::{FilenameGenerator, FilenameRequest, OccupiedNames};
use crate::state::ResourceKind;

/// Mirrors the URL's host and path under the output root
///
/// `https://example.com/docs/intro` (HTML) becomes
/// `example.com/docs/intro/index.html`.
#[derive(Debug, Clone)]
pub struct BySiteStructure {
    default_filename: String,
}

impl BySiteStructure {
    pub fn new(default_filename: impl Into<String>) -> Self {
        Self {
            default_filename: default_filename.into(),
        }
    }
}

impl FilenameGenerator for BySiteStructure {
    fn generate(&self, request: &FilenameRequest<'_>, _occupied: &OccupiedNames) -> String {
        let url = request.url;
        let mut components: Vec<String> = Vec::new();

        if let Some(host) = url.host_str() {
            let host = match url.port() {
                Some(port) => format!("{}_{}", host, port),
                None => host.to_string(),
            };
            components.push(shorten_component(&sanitize_component(&host)));
        }
        let host_components = components.len();

        // ".." and "." are dropped after decoding so encoded dots cannot
        // climb out of the output root
        components.extend(
            url.path_segments()
                .into_iter()
                .flatten()
                .map(decode_segment)
                .filter(|segment| !matches!(segment.as_str(), "" | "." | ".."))
                .map(|segment| shorten_component(&sanitize_component(&segment))),
        );

        let has_path = components.len() > host_components;
        let ends_with_slash = url.path().ends_with('/');
        let last_extension = components
            .last()
            .filter(|_| has_path && !ends_with_slash)
            .and_then(|last| split_extension(last).1.map(str::to_ascii_lowercase));

        match request.kind {
            ResourceKind::Html => {
                let is_html_file = matches!(last_extension.as_deref(), Some(".html" | ".htm"));
                if !is_html_file {
                    components.push(self.default_filename.clone());
                }
            }
            kind => {
                if !has_path {
                    components.push(self.default_filename.clone());
                } else if last_extension.is_none() && !ends_with_slash {
                    if let (Some(extension), Some(last)) =
                        (kind.default_extension(), components.last_mut())
                    {
                        last.push_str(extension);
                    }
                }
            }
        }

        components.join("/")
    }
}
