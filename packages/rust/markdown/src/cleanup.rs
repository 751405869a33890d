//! Content cleanup for KB-style cells.
//!
//! A content cell holds HTML, either bare or wrapped in a JSON envelope.
//! [`extract_html`] unwraps the envelope, [`html_to_text`] reduces the HTML
//! to plain text through a sequence of `&str -> String` passes.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Node};
use serde_json::Value;
use tracing::trace;

/// Envelope keys holding the HTML payload, in lookup order.
const ENVELOPE_KEYS: [&str; 4] = ["body", "content", "text", "html"];

/// Elements whose text never reaches the output.
const SKIPPED_ELEMENTS: [&str; 2] = ["script", "style"];

// ---------------------------------------------------------------------------
// JSON envelope
// ---------------------------------------------------------------------------

/// Resolve the HTML held by a content cell.
///
/// - JSON object: the first of `body`, `content`, `text`, `html` present
/// - JSON array: every element stringified, newline-joined
/// - any other JSON value: stringified
/// - not JSON at all: the cell text unchanged
pub(crate) fn extract_html(cell: &str) -> String {
    if cell.is_empty() {
        return String::new();
    }

    let value: Value = match serde_json::from_str(cell) {
        Ok(value) => value,
        Err(e) => {
            trace!(error = %e, "content is not JSON, using raw cell text");
            return cell.to_string();
        }
    };

    match value {
        Value::Object(map) => ENVELOPE_KEYS
            .iter()
            .find_map(|key| map.get(*key))
            .map(stringify)
            .unwrap_or_else(|| Value::Object(map.clone()).to_string()),
        Value::Array(items) => items.iter().map(stringify).collect::<Vec<_>>().join("\n"),
        other => stringify(&other),
    }
}

/// Strings render bare; everything else renders as JSON text.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// HTML to text
// ---------------------------------------------------------------------------

/// Strip HTML down to plain text with at most one blank line between blocks.
pub(crate) fn html_to_text(html: &str) -> String {
    let mut result = collect_text(html);

    result = unescape_entities(&result);
    result = blank_whitespace_lines(&result);
    result = collapse_blank_lines(&result);

    result.trim().to_string()
}

/// Pass 1: join every text node with a newline, skipping script/style bodies.
fn collect_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);

    let parts: Vec<&str> = fragment
        .root_element()
        .descendants()
        .filter_map(|node| match node.value() {
            Node::Text(text) => {
                let hidden = node.ancestors().any(|ancestor| {
                    ancestor
                        .value()
                        .as_element()
                        .is_some_and(|el| SKIPPED_ELEMENTS.contains(&el.name()))
                });
                (!hidden).then_some(&**text)
            }
            _ => None,
        })
        .collect();

    parts.join("\n")
}

/// Pass 2: decode entities the parser left behind (double-escaped content).
fn unescape_entities(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

/// Pass 3: trailing whitespace off every line, so whitespace-only lines count as blank.
fn blank_whitespace_lines(text: &str) -> String {
    text.lines().map(str::trim_end).collect::<Vec<_>>().join("\n")
}

/// Pass 4: runs of blank lines become a single blank line.
fn collapse_blank_lines(text: &str) -> String {
    static MULTI_NEWLINE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{2,}").expect("valid regex"));

    MULTI_NEWLINE_RE.replace_all(text, "\n\n").to_string()
}
