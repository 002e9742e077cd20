use crate::config::SubdirectoryRule;
use crate::filename::sanitize::{
    decode_segment, sanitize_component, shorten_component, split_extension,
};
use crate::filename::{FilenameGenerator, FilenameRequest, OccupiedNames};

/// Names files after their URL basename and groups them by extension
///
/// `https://example.com/img/logo.png` becomes `logo.png`, or
/// `images/logo.png` when a subdirectory rule lists `.png`.
#[derive(Debug, Clone)]
pub struct ByType {
    subdirectories: Vec<SubdirectoryRule>,
    default_filename: String,
}

impl ByType {
    pub fn new(subdirectories: Vec<SubdirectoryRule>, default_filename: impl Into<String>) -> Self {
        Self {
            subdirectories,
            default_filename: default_filename.into(),
        }
    }

    /// First subdirectory whose extension list contains `extension`
    fn directory_for(&self, extension: &str) -> Option<&str> {
        self.subdirectories
            .iter()
            .find(|rule| {
                rule.extensions
                    .iter()
                    .any(|candidate| candidate.eq_ignore_ascii_case(extension))
            })
            .map(|rule| rule.directory.trim_matches('/'))
    }
}

impl FilenameGenerator for ByType {
    fn generate(&self, request: &FilenameRequest<'_>, _occupied: &OccupiedNames) -> String {
        let basename = request
            .preferred
            .map(str::to_string)
            .or_else(|| {
                request
                    .url
                    .path_segments()
                    .and_then(|mut segments| segments.next_back())
                    .map(decode_segment)
                    .filter(|segment| !segment.is_empty())
            })
            .unwrap_or_else(|| self.default_filename.clone());

        let mut name = sanitize_component(&basename);
        if split_extension(&name).1.is_none() {
            if let Some(extension) = request.kind.default_extension() {
                name.push_str(extension);
            }
        }
        let name = shorten_component(&name);

        match split_extension(&name).1.and_then(|ext| self.directory_for(ext)) {
            Some(directory) if !directory.is_empty() => format!("{}/{}", directory, name),
            _ => name,
        }
    }
}
