//! HTML documents that can be queried with CSS selectors and rewritten in place
//!
//! Selection goes through `scraper`, but edits are spliced into the original
//! source so that markup, entities and whitespace outside the rewritten
//! values survive byte for byte. To connect the two, every start tag in a
//! copy of the source gets a numbered marker attribute before parsing;
//! selector matches are mapped back to the scanned tags through that number.

mod scanner;

pub use scanner::{scan, AttributeSpan, StartTag, ValueSpan};

use crate::ConfigError;
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::ParseOpts;
use scraper::{Html, Selector};
use std::ops::Range;

const NODE_MARKER: &str = "data-sumi-node";

/// A text replacement at a byte range of the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub range: Range<usize>,
    pub text: String,
}

/// Parses with scripting disabled so `<noscript>` content becomes elements
fn parse_markup(markup: String) -> Html {
    let opts = ParseOpts {
        tree_builder: TreeBuilderOpts {
            scripting_enabled: false,
            ..Default::default()
        },
        ..Default::default()
    };
    html5ever::parse_document(Html::new_document(), opts).one(markup)
}

/// Parsed HTML source
pub struct SourceDocument<'a> {
    source: &'a str,
    tags: Vec<StartTag>,
    html: Html,
}

impl<'a> SourceDocument<'a> {
    pub fn parse(source: &'a str) -> Self {
        let tags = scan(source);
        let marked = mark_tags(source, &tags);
        let html = parse_markup(marked);
        Self { source, tags, html }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Start tags in document order
    pub fn tags(&self) -> &[StartTag] {
        &self.tags
    }

    /// Source text at `range`
    pub fn slice(&self, range: &Range<usize>) -> &'a str {
        &self.source[range.clone()]
    }

    /// Indices into [`tags`](Self::tags) of the elements matching `selector`
    ///
    /// Elements the parser synthesized (an implied `<body>`, for example)
    /// have no source tag and are never returned.
    pub fn select(&self, selector: &str) -> Result<Vec<usize>, ConfigError> {
        let parsed = Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
            selector: selector.to_string(),
            message: e.to_string(),
        })?;

        let mut indices: Vec<usize> = self
            .html
            .select(&parsed)
            .filter_map(|element| element.value().attr(NODE_MARKER))
            .filter_map(|marker| marker.parse::<usize>().ok())
            .filter(|&index| index < self.tags.len())
            .collect();
        indices.sort_unstable();
        indices.dedup();
        Ok(indices)
    }

    /// Raw value of the first `<base href>` in the document
    pub fn base_href(&self) -> Option<&'a str> {
        self.tags
            .iter()
            .filter(|tag| tag.name == "base")
            .find_map(|tag| tag.attribute("href"))
            .map(|value| self.slice(&value.range))
    }

    /// Ranges of every `<base>` tag
    pub fn base_tags(&self) -> Vec<Range<usize>> {
        self.tags
            .iter()
            .filter(|tag| tag.name == "base")
            .map(|tag| tag.range.clone())
            .collect()
    }
}

/// Copies `source` with a marker attribute after each tag name
fn mark_tags(source: &str, tags: &[StartTag]) -> String {
    let mut marked = String::with_capacity(source.len() + tags.len() * 24);
    let mut cursor = 0;
    for (index, tag) in tags.iter().enumerate() {
        marked.push_str(&source[cursor..tag.name_end]);
        marked.push_str(&format!(" {}=\"{}\"", NODE_MARKER, index));
        cursor = tag.name_end;
    }
    marked.push_str(&source[cursor..]);
    marked
}

/// Applies `edits` to `source`
///
/// Edits are applied in source order. An edit overlapping one already
/// applied is dropped.
pub fn splice(source: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by_key(|edit| (edit.range.start, edit.range.end));

    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    for edit in edits {
        if edit.range.start < cursor {
            continue;
        }
        out.push_str(&source[cursor..edit.range.start]);
        out.push_str(&edit.text);
        cursor = edit.range.end;
    }
    out.push_str(&source[cursor..]);
    out
}
