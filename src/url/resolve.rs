//! Turning raw references into absolute URLs and local paths into links

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::borrow::Cow;
use url::Url;

/// Characters escaped in a relative link component
///
/// Same set as JavaScript's `encodeURIComponent`, with `'`, `(` and `)`
/// escaped as well so links stay valid inside `url(...)` and quoted attributes.
const LINK_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*');

/// Returns true if a raw reference should be followed
///
/// Empty values, same-document fragments and any scheme other than
/// http/https are ignored. Schemeless and protocol-relative references
/// are supported.
pub fn is_supported_reference(raw: &str) -> bool {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with('#') {
        return false;
    }

    match scheme_of(raw) {
        Some(scheme) => scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https"),
        None => true,
    }
}

/// Extracts an RFC 3986 scheme prefix, if any
fn scheme_of(raw: &str) -> Option<&str> {
    let colon = raw.find(':')?;
    let candidate = &raw[..colon];
    let mut chars = candidate.chars();
    let first = chars.next()?;
    if first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    {
        Some(candidate)
    } else {
        None
    }
}

/// Resolves a raw reference against a base URL
///
/// Returns `None` when the reference cannot be joined or lands on a
/// scheme the mirror cannot fetch.
pub fn resolve_reference(base: &Url, raw: &str) -> Option<Url> {
    let resolved = base.join(raw.trim()).ok()?;
    match resolved.scheme() {
        "http" | "https" | "file" => Some(resolved),
        _ => None,
    }
}

/// Decodes the character references that commonly appear in attribute values
pub fn html_unescape(raw: &str) -> Cow<'_, str> {
    if !raw.contains('&') {
        return Cow::Borrowed(raw);
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest
            .find(';')
            .filter(|&end| end <= 10)
            .and_then(|end| decode_entity(&rest[1..end]).map(|c| (c, end)));

        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }

    out.push_str(rest);
    Cow::Owned(out)
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "lt" => Some('<'),
        "gt" => Some('>'),
        _ => {
            let number = name.strip_prefix('#')?;
            let code = match number.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Builds the link written into `from` so that it points at `to`
///
/// Both arguments are local paths relative to the output root, using `/`
/// as separator. Every component of the result is escaped. When
/// `prettify` carries the default file name, a trailing occurrence of it is
/// stripped (`page/index.html` becomes `page/`, `index.html` becomes `./`).
pub fn relative_link(from: &str, to: &str, prettify: Option<&str>) -> String {
    let from_dir: Vec<&str> = {
        let mut parts: Vec<&str> = from.split('/').collect();
        parts.pop();
        parts
    };
    let to_parts: Vec<&str> = to.split('/').collect();

    let max_common = from_dir.len().min(to_parts.len().saturating_sub(1));
    let common = from_dir
        .iter()
        .zip(to_parts.iter())
        .take(max_common)
        .take_while(|(a, b)| a == b)
        .count();

    let mut components: Vec<String> = vec!["..".to_string(); from_dir.len() - common];
    components.extend(
        to_parts[common..]
            .iter()
            .map(|part| utf8_percent_encode(part, LINK_COMPONENT).to_string()),
    );
    let link = components.join("/");

    match prettify {
        Some(default_filename) => prettify_link(&link, default_filename),
        None => link,
    }
}

fn prettify_link(link: &str, default_filename: &str) -> String {
    let encoded_default = utf8_percent_encode(default_filename, LINK_COMPONENT).to_string();

    if link == encoded_default {
        return "./".to_string();
    }

    match link.strip_suffix(&encoded_default) {
        Some(dir) if dir.ends_with('/') => dir.to_string(),
        _ => link.to_string(),
    }
}
