//! Header-based schema classification.
//!
//! The decision depends on the header alone, never on row content, and
//! rules are tried in a fixed order with the first match winning.

use tracing::info;

use tabledown_shared::SchemaKind;

/// Column that marks an issue-tracker export; rows without it are skipped.
const REQUIRED_ID_COLUMN: &str = "mule jira issue";

/// Title column of a knowledge-base export.
const KB_TITLE_COLUMN: &str = "title";

/// Content columns of a knowledge-base export.
const KB_CONTENT_COLUMNS: [&str; 2] = ["contents", "content"];

/// Identifier-like columns, most specific first.
const ID_COLUMN_PRIORITY: [&str; 5] = ["issue", "id", "name", "subject", "title"];

/// Pick the renderer for an input from its header (case-insensitive).
pub fn classify(headers: &[String]) -> SchemaKind {
    let lowered: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();
    let find = |name: &str| lowered.iter().position(|h| h == name);

    if let Some(idx) = find(REQUIRED_ID_COLUMN) {
        info!(id_field = %headers[idx], "identifier column found, rows without it are skipped");
        return SchemaKind::Identified {
            id_field: headers[idx].clone(),
            required: true,
        };
    }

    let has_content = KB_CONTENT_COLUMNS.into_iter().any(|c| find(c).is_some());
    if find(KB_TITLE_COLUMN).is_some() && has_content {
        info!("title and content columns found, using knowledge-base renderer");
        return SchemaKind::KnowledgeBase;
    }

    for candidate in ID_COLUMN_PRIORITY {
        if let Some(idx) = find(candidate) {
            info!(id_field = %headers[idx], "using generic renderer with identifier column");
            return SchemaKind::Identified {
                id_field: headers[idx].clone(),
                required: false,
            };
        }
    }

    info!("no recognized schema detected, using positional fallback");
    SchemaKind::Positional
}
