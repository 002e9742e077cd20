//! File name hygiene shared by the naming strategies

use percent_encoding::percent_decode_str;

/// Longest file name component most filesystems accept, in bytes
pub const MAX_COMPONENT_BYTES: usize = 255;

/// Bytes of the stem kept when a component is too long
const SHORTENED_STEM_BYTES: usize = 20;

/// Percent-decodes one URL path segment
pub fn decode_segment(segment: &str) -> String {
    percent_decode_str(segment).decode_utf8_lossy().into_owned()
}

/// Replaces characters that are illegal in file names with `_`
///
/// Path separators are replaced too, so the result is always a single
/// component. `.` and `..` become `_`.
pub fn sanitize_component(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    match cleaned.as_str() {
        "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}

/// Splits `name` into stem and extension (extension includes the dot)
///
/// Dotfiles such as `.htaccess` have no extension.
pub fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(0) | None => (name, None),
        Some(dot) if dot + 1 == name.len() => (name, None),
        Some(dot) => (&name[..dot], Some(&name[dot..])),
    }
}

/// Truncates a component longer than [`MAX_COMPONENT_BYTES`]
///
/// Keeps the first 20 bytes of the stem (never splitting a character)
/// followed by the original extension.
pub fn shorten_component(name: &str) -> String {
    if name.len() <= MAX_COMPONENT_BYTES {
        return name.to_string();
    }

    let (stem, extension) = split_extension(name);
    let extension = extension
        .filter(|ext| ext.len() < MAX_COMPONENT_BYTES - SHORTENED_STEM_BYTES)
        .unwrap_or("");

    let mut cut = SHORTENED_STEM_BYTES.min(stem.len());
    while !stem.is_char_boundary(cut) {
        cut -= 1;
    }

    format!("{}{}", &stem[..cut], extension)
}
