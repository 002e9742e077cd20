use crate::paths::{dedup_in_order, Replacement};
use crate::url::is_supported_reference;

/// One `url [descriptor]` entry of a `srcset`
#[derive(Debug, Clone, PartialEq, Eq)]
struct Candidate {
    url: String,
    descriptor: String,
}

/// A `srcset` attribute value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrcsetTag {
    text: String,
    candidates: Vec<Candidate>,
}

impl SrcsetTag {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let candidates = parse_srcset(&text);
        Self { text, candidates }
    }

    pub fn paths(&self) -> Vec<String> {
        dedup_in_order(
            self.candidates
                .iter()
                .map(|candidate| candidate.url.clone())
                .filter(|url| is_supported_reference(url)),
        )
    }

    /// Rewrites candidate URLs, keeping descriptors and order
    ///
    /// The value is re-serialized as `url descriptor, url descriptor` only
    /// when at least one candidate changed.
    pub fn update_text(&self, replacements: &[Replacement]) -> String {
        let mut changed = false;
        let rewritten: Vec<String> = self
            .candidates
            .iter()
            .map(|candidate| {
                let url = match replacements.iter().find(|r| r.old == candidate.url) {
                    Some(replacement) => {
                        changed = true;
                        replacement.new.as_str()
                    }
                    None => candidate.url.as_str(),
                };
                if candidate.descriptor.is_empty() {
                    url.to_string()
                } else {
                    format!("{} {}", url, candidate.descriptor)
                }
            })
            .collect();

        if changed {
            rewritten.join(", ")
        } else {
            self.text.clone()
        }
    }
}

/// Splits a `srcset` into candidates
///
/// URLs may contain commas; a candidate URL ends at whitespace, and a
/// trailing comma directly after a URL ends the candidate.
fn parse_srcset(input: &str) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    let mut rest = input;

    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
        if rest.is_empty() {
            break;
        }

        let url_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let raw_url = &rest[..url_end];
        rest = &rest[url_end..];

        let url = raw_url.trim_end_matches(',');
        if url.len() != raw_url.len() {
            candidates.push(Candidate {
                url: url.to_string(),
                descriptor: String::new(),
            });
            continue;
        }

        let (descriptor, remaining) = take_descriptor(rest);
        rest = remaining;
        candidates.push(Candidate {
            url: url.to_string(),
            descriptor: descriptor.trim().to_string(),
        });
    }

    candidates
}

/// Reads up to the next top-level comma (commas inside parentheses do not count)
fn take_descriptor(input: &str) -> (&str, &str) {
    let mut depth = 0usize;
    for (i, c) in input.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => return (&input[..i], &input[i + 1..]),
            _ => {}
        }
    }
    (input, "")
}
