use crate::paths::{dedup_in_order, Replacement};
use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;

fn compile(pattern: &str, desc: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|err| panic!("invalid {desc} regex: {err}"))
}

fn comment_regex() -> &'static Regex {
    static COMMENT: OnceLock<Regex> = OnceLock::new();
    COMMENT.get_or_init(|| compile(r"/\*[\s\S]*?\*/", "css comment"))
}

fn reference_regex() -> &'static Regex {
    static REFERENCE: OnceLock<Regex> = OnceLock::new();
    REFERENCE.get_or_init(|| {
        compile(
            r#"(?i)(?:url\(\s*(?:"([^"]*)"|'([^']*)'|([^)"'\s]*))\s*\))|(?:@import\s+(?:"([^"]*)"|'([^']*)'))"#,
            "css reference",
        )
    })
}

/// A stylesheet, or the content of a `style` element or attribute
///
/// References are `url(...)` values (quoted or not) and `@import "..."`
/// strings. Anything inside `/* */` comments is ignored, and `data:` URIs
/// are never references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssText {
    text: String,
}

impl CssText {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn paths(&self) -> Vec<String> {
        let comments = comment_ranges(&self.text);
        let found = reference_regex()
            .captures_iter(&self.text)
            .filter(|caps| {
                caps.get(0)
                    .map_or(false, |m| !inside_any(m.start(), &comments))
            })
            .filter_map(|caps| (1..=5).find_map(|group| caps.get(group)))
            .map(|m| m.as_str().trim().to_string())
            .filter(|path| !path.is_empty() && !is_data_uri(path));

        dedup_in_order(found)
    }

    /// Rewrites every occurrence of each `old` path that is flanked by a
    /// quote, parenthesis or whitespace on both sides
    ///
    /// `style.css` is therefore never replaced inside `mystyle.css`, and
    /// occurrences inside comments are left alone.
    pub fn update_text(&self, replacements: &[Replacement]) -> String {
        let comments = comment_ranges(&self.text);
        let mut edits: Vec<(Range<usize>, &str)> = Vec::new();

        for replacement in replacements {
            if replacement.old.is_empty() {
                continue;
            }
            for (start, matched) in self.text.match_indices(replacement.old.as_str()) {
                let end = start + matched.len();
                if is_flanked(&self.text, start, end)
                    && !inside_any(start, &comments)
                    && !edits.iter().any(|(range, _)| range.start < end && start < range.end)
                {
                    edits.push((start..end, replacement.new.as_str()));
                }
            }
        }

        edits.sort_by_key(|(range, _)| range.start);

        let mut out = String::with_capacity(self.text.len());
        let mut cursor = 0;
        for (range, new) in edits {
            out.push_str(&self.text[cursor..range.start]);
            out.push_str(new);
            cursor = range.end;
        }
        out.push_str(&self.text[cursor..]);
        out
    }
}

fn is_boundary(c: char) -> bool {
    matches!(c, '\'' | '"' | '(' | ')') || c.is_whitespace()
}

fn is_flanked(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    matches!((before, after), (Some(b), Some(a)) if is_boundary(b) && is_boundary(a))
}

fn is_data_uri(path: &str) -> bool {
    path.get(..5)
        .map_or(false, |prefix| prefix.eq_ignore_ascii_case("data:"))
}

fn comment_ranges(text: &str) -> Vec<Range<usize>> {
    comment_regex().find_iter(text).map(|m| m.range()).collect()
}

fn inside_any(position: usize, ranges: &[Range<usize>]) -> bool {
    ranges.iter().any(|range| range.contains(&position))
}
