//! Filename derivation for rendered documents.

use std::sync::LazyLock;

use regex::Regex;

use tabledown_shared::NamingConfig;

/// Stem used when the name is empty after trimming.
const EMPTY_NAME: &str = "untitled";

/// Turn a title or identifier into a flat, filesystem-safe filename.
///
/// Path and wildcard characters become `_` and surrounding whitespace is
/// trimmed. A trailing extension already present (case-insensitive) is set
/// aside, the stem is cut to `max_len` characters, and the extension is put
/// back. Applying it to its own output returns the same string.
///
/// Distinct names can collapse to the same filename; the later document
/// then overwrites the earlier one.
pub fn derive_filename(name: &str, naming: &NamingConfig) -> String {
    static UNSAFE_CHARS_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r#"[\\/*?"<>|:]"#).expect("valid regex"));

    let trimmed = name.trim();
    let trimmed = if trimmed.is_empty() { EMPTY_NAME } else { trimmed };

    let sanitized = UNSAFE_CHARS_RE.replace_all(trimmed, "_");
    let (stem, extension) = split_extension(&sanitized, &naming.extension);

    let mut filename: String = stem.chars().take(naming.max_len).collect();
    filename.push_str(extension);
    filename
}

/// Split off a trailing `extension` (case-insensitive), keeping its original
/// spelling. Names without it get `extension` as given.
fn split_extension<'a>(name: &'a str, extension: &'a str) -> (&'a str, &'a str) {
    let ext_chars = extension.chars().count();
    let name_chars = name.chars().count();
    if ext_chars == 0 || name_chars < ext_chars {
        return (name, extension);
    }

    let split = name
        .char_indices()
        .nth(name_chars - ext_chars)
        .map_or(name.len(), |(idx, _)| idx);
    let (stem, tail) = name.split_at(split);
    if tail.to_lowercase() == extension.to_lowercase() {
        (stem, tail)
    } else {
        (name, extension)
    }
}
