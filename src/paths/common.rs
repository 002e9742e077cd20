use crate::paths::Replacement;
use crate::url::is_supported_reference;

/// An attribute value that is one whole reference (`href`, `src`, ...)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonTag {
    text: String,
}

impl CommonTag {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Zero or one reference; fragments and foreign schemes yield none
    pub fn paths(&self) -> Vec<String> {
        let value = self.text.trim();
        if is_supported_reference(value) {
            vec![value.to_string()]
        } else {
            Vec::new()
        }
    }

    /// Replaces the value when it equals a replacement's `old` path
    ///
    /// Whitespace around the value is kept.
    pub fn update_text(&self, replacements: &[Replacement]) -> String {
        let value = self.text.trim();
        match replacements.iter().find(|r| r.old == value) {
            Some(replacement) => {
                let leading = self.text.len() - self.text.trim_start().len();
                let trailing_start = leading + value.len();
                format!(
                    "{}{}{}",
                    &self.text[..leading],
                    replacement.new,
                    &self.text[trailing_start..]
                )
            }
            None => self.text.clone(),
        }
    }
}
