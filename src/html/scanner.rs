//! Byte-span scanner over HTML source
//!
//! Records every start tag with the byte ranges of its attribute values and,
//! when the matching end tag is found, of its content. Comments, doctypes,
//! processing instructions and the bodies of raw-text elements are skipped
//! the way an HTML tokenizer skips them.

use std::ops::Range;

/// Elements whose content is text, never markup
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "textarea", "title", "xmp", "noembed", "noframes", "iframe", "plaintext",
];

/// Elements that never have an end tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// An attribute value location in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueSpan {
    /// Value bytes, without quotes
    pub range: Range<usize>,
    /// Quote character around the value, `None` when unquoted
    pub quote: Option<char>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSpan {
    /// Lowercased attribute name
    pub name: String,
    pub value: Option<ValueSpan>,
}

/// A start tag found in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTag {
    /// Lowercased element name
    pub name: String,
    /// The whole tag, `<` to `>` inclusive
    pub range: Range<usize>,
    /// Byte offset right after the element name
    pub name_end: usize,
    pub attributes: Vec<AttributeSpan>,
    /// Content between this tag and its end tag, once the end tag is seen
    pub content: Option<Range<usize>>,
}

impl StartTag {
    /// Location of the named attribute's value (first occurrence wins)
    pub fn attribute(&self, name: &str) -> Option<&ValueSpan> {
        self.attributes
            .iter()
            .find(|attr| attr.name.eq_ignore_ascii_case(name))
            .and_then(|attr| attr.value.as_ref())
    }
}

/// Scans `source` and returns its start tags in document order
pub fn scan(source: &str) -> Vec<StartTag> {
    Scanner::new(source).run()
}

struct Scanner<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    tags: Vec<StartTag>,
    open: Vec<usize>,
}

impl<'a> Scanner<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            tags: Vec::new(),
            open: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<StartTag> {
        while let Some(offset) = self.source[self.pos..].find('<') {
            let start = self.pos + offset;
            self.pos = start;
            let rest = &self.source[start..];

            if rest.starts_with("<!--") {
                self.pos = match rest[4..].find("-->") {
                    Some(end) => start + 4 + end + 3,
                    None => self.bytes.len(),
                };
            } else if rest.starts_with("</") {
                self.end_tag(start);
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                self.skip_past('>');
            } else if self.byte_at(start + 1).map_or(false, |b| b.is_ascii_alphabetic()) {
                self.start_tag(start);
            } else {
                self.pos = start + 1;
            }
        }
        self.tags
    }

    fn byte_at(&self, index: usize) -> Option<u8> {
        self.bytes.get(index).copied()
    }

    fn skip_past(&mut self, needle: char) {
        self.pos = match self.source[self.pos..].find(needle) {
            Some(offset) => self.pos + offset + needle.len_utf8(),
            None => self.bytes.len(),
        };
    }

    fn skip_whitespace(&mut self) {
        while self.byte_at(self.pos).map_or(false, |b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn read_name(&mut self) -> Range<usize> {
        let start = self.pos;
        while let Some(b) = self.byte_at(self.pos) {
            if b.is_ascii_whitespace() || b == b'/' || b == b'>' {
                break;
            }
            self.pos += 1;
        }
        start..self.pos
    }

    fn end_tag(&mut self, start: usize) {
        self.pos = start + 2;
        let name = self.read_name();
        let name = self.source[name].to_ascii_lowercase();
        self.skip_past('>');

        if let Some(depth) = self
            .open
            .iter()
            .rposition(|&index| self.tags[index].name == name)
        {
            let index = self.open[depth];
            let content_start = self.tags[index].range.end;
            self.tags[index].content = Some(content_start..start);
            self.open.truncate(depth);
        }
    }

    fn start_tag(&mut self, start: usize) {
        self.pos = start + 1;
        let name_range = self.read_name();
        let name_end = name_range.end;
        let name = self.source[name_range].to_ascii_lowercase();

        let mut attributes = Vec::new();
        loop {
            self.skip_whitespace();
            match self.byte_at(self.pos) {
                None => break,
                Some(b'>') => {
                    self.pos += 1;
                    break;
                }
                Some(b'/') => {
                    self.pos += 1;
                    continue;
                }
                Some(_) => {}
            }

            let attr_start = self.pos;
            // a leading '=' belongs to the attribute name
            self.pos += 1;
            while let Some(b) = self.byte_at(self.pos) {
                if b.is_ascii_whitespace() || matches!(b, b'/' | b'>' | b'=') {
                    break;
                }
                self.pos += 1;
            }
            let attr_name = self.source[attr_start..self.pos].to_ascii_lowercase();

            self.skip_whitespace();
            let value = if self.byte_at(self.pos) == Some(b'=') {
                self.pos += 1;
                self.skip_whitespace();
                Some(self.read_value())
            } else {
                None
            };

            attributes.push(AttributeSpan {
                name: attr_name,
                value,
            });
        }

        let index = self.tags.len();
        let tag_end = self.pos;
        self.tags.push(StartTag {
            name: name.clone(),
            range: start..tag_end,
            name_end,
            attributes,
            content: None,
        });

        if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
            self.raw_text(index, &name);
        } else if !VOID_ELEMENTS.contains(&name.as_str()) {
            self.open.push(index);
        }
    }

    fn read_value(&mut self) -> ValueSpan {
        match self.byte_at(self.pos) {
            Some(quote @ (b'"' | b'\'')) => {
                let value_start = self.pos + 1;
                let value_end = self.source[value_start..]
                    .find(quote as char)
                    .map_or(self.bytes.len(), |offset| value_start + offset);
                self.pos = (value_end + 1).min(self.bytes.len());
                ValueSpan {
                    range: value_start..value_end,
                    quote: Some(quote as char),
                }
            }
            _ => {
                let value_start = self.pos;
                while let Some(b) = self.byte_at(self.pos) {
                    if b.is_ascii_whitespace() || b == b'>' {
                        break;
                    }
                    self.pos += 1;
                }
                ValueSpan {
                    range: value_start..self.pos,
                    quote: None,
                }
            }
        }
    }

    /// Content of a raw-text element runs to the first matching end tag
    fn raw_text(&mut self, index: usize, name: &str) {
        let content_start = self.pos;
        let closing = format!("</{}", name);
        let found = find_ignore_ascii_case(&self.source[content_start..], &closing)
            .map(|offset| content_start + offset);

        match found {
            Some(end) => {
                self.tags[index].content = Some(content_start..end);
                self.pos = end;
                self.end_tag_raw(end);
            }
            None => {
                self.tags[index].content = Some(content_start..self.bytes.len());
                self.pos = self.bytes.len();
            }
        }
    }

    fn end_tag_raw(&mut self, start: usize) {
        self.pos = start + 2;
        self.skip_past('>');
    }
}

fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
}
