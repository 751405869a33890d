//! Row-to-Markdown rendering.
//!
//! Each table row becomes one self-contained Markdown document. The
//! [`SchemaKind`] chosen for the input decides the document shape:
//!
//! - knowledge-base rows: title heading, fixed metadata block, and the
//!   HTML content cell reduced to plain text
//! - identified and positional rows: identifier heading followed by one
//!   `**column:** value` line per column

mod cleanup;
mod filename;

use tracing::{debug, instrument};

use tabledown_shared::{
    Metadata, NamingConfig, RawRecord, RenderedDocument, Result, SchemaKind, TabledownError,
};

pub use filename::derive_filename;

/// Heading used when a knowledge-base row has no title.
const UNTITLED: &str = "Untitled";

/// Identifier used when every cell of a row is empty.
const EMPTY_ROW_ID: &str = "row";

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Result of rendering one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The row produced a document.
    Document(RenderedDocument),
    /// The row lacks the identifying field its schema requires.
    Skip,
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Render one row with the renderer its schema selects.
///
/// `row` is the 1-based data row number, used for diagnostics only.
#[instrument(skip(record, schema, naming), fields(schema = %schema))]
pub fn render_row(
    row: usize,
    record: &RawRecord,
    schema: &SchemaKind,
    naming: &NamingConfig,
) -> Result<RenderOutcome> {
    let document = match schema {
        SchemaKind::KnowledgeBase => {
            if kb_title(record).is_none() {
                debug!(row, "no TITLE/Title, skipping row");
                return Ok(RenderOutcome::Skip);
            }
            render_knowledge_base(record, naming)
        }
        SchemaKind::Identified { id_field, required } => {
            if *required && record.get_non_empty(id_field).is_none() {
                debug!(row, id_field = %id_field, "identifier empty, skipping row");
                return Ok(RenderOutcome::Skip);
            }
            render_generic(record, Some(id_field.as_str()), naming)
        }
        SchemaKind::Positional => render_generic(record, None, naming),
    };

    if document.filename.contains('\0') {
        return Err(TabledownError::render(
            row,
            format!("derived filename {:?} contains a NUL byte", document.filename),
        ));
    }

    Ok(RenderOutcome::Document(document))
}

// ---------------------------------------------------------------------------
// Knowledge-base renderer
// ---------------------------------------------------------------------------

fn kb_title(record: &RawRecord) -> Option<&str> {
    record
        .get_non_empty("TITLE")
        .or_else(|| record.get_non_empty("Title"))
}

/// Render a knowledge-base row: title, metadata block, rule, cleaned content.
pub fn render_knowledge_base(record: &RawRecord, naming: &NamingConfig) -> RenderedDocument {
    let title = kb_title(record).unwrap_or(UNTITLED);

    let content = record
        .get_non_empty("CONTENTS")
        .or_else(|| record.get_non_empty("Content"))
        .unwrap_or_default();
    let body_text = cleanup::html_to_text(&cleanup::extract_html(content));

    let metadata = Metadata::from_record(record);

    let mut body = format!("# {title}\n\n## Metadata\n");
    for (key, value) in metadata.entries() {
        body.push_str(&format!("- **{key}**: {value}\n"));
    }
    body.push_str("\n---\n\n");
    body.push_str(&body_text);

    RenderedDocument {
        filename: derive_filename(title, naming),
        body,
    }
}

// ---------------------------------------------------------------------------
// Generic renderers
// ---------------------------------------------------------------------------

/// Render a row as an identifier heading plus one line per column.
///
/// The identifier is the `id_field` cell when present and non-empty, then
/// the first non-empty cell in column order, then the literal `row`.
pub fn render_generic(
    record: &RawRecord,
    id_field: Option<&str>,
    naming: &NamingConfig,
) -> RenderedDocument {
    let identifier = id_field
        .and_then(|field| record.get_non_empty(field))
        .or_else(|| record.first_non_empty())
        .unwrap_or(EMPTY_ROW_ID);

    let mut body = format!("# {identifier}\n\n");
    for (key, value) in record.iter() {
        if key.is_empty() {
            continue;
        }
        let value = value.unwrap_or_default().trim();
        body.push_str(&format!("**{}:** {value}\n\n", key.trim()));
    }

    RenderedDocument {
        filename: derive_filename(identifier, naming),
        body,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn record(headers: &[&str], cells: &[&str]) -> RawRecord {
        let headers: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        RawRecord::from_row(&headers, cells.iter().copied())
    }

    fn naming() -> NamingConfig {
        NamingConfig::default()
    }

    fn expect_document(outcome: RenderOutcome) -> RenderedDocument {
        match outcome {
            RenderOutcome::Document(doc) => doc,
            RenderOutcome::Skip => panic!("expected a document, row was skipped"),
        }
    }

    /// Parse the `## Metadata` bullets back out of a KB document.
    fn read_metadata(body: &str) -> Vec<(String, String)> {
        body.lines()
            .skip_while(|l| *l != "## Metadata")
            .skip(1)
            .take_while(|l| l.starts_with("- **"))
            .map(|l| {
                let rest = l.trim_start_matches("- **");
                let (key, value) = rest.split_once("**: ").expect("bullet shape");
                (key.to_string(), value.to_string())
            })
            .collect()
    }

    // --- Knowledge-base rows ---

    #[test]
    fn kb_row_with_json_wrapped_html() {
        let rec = record(
            &["ID", "TITLE", "CONTENTS", "CATEGORY"],
            &["1", "Setup Guide", r#"{"body":"<p>Hello</p>"}"#, "Docs"],
        );
        let outcome = render_row(1, &rec, &SchemaKind::KnowledgeBase, &naming()).unwrap();
        let doc = expect_document(outcome);

        assert_eq!(doc.filename, "Setup Guide.md");
        assert_eq!(
            doc.body,
            "# Setup Guide\n\n## Metadata\n\
             - **ID**: 1\n\
             - **CATEGORY**: Docs\n\
             - **FULL_PATH**: \n\
             - **LAST_UPDATED**: \n\
             - **SOURCE**: \n\
             \n---\n\nHello"
        );
    }

    #[test]
    fn kb_metadata_reads_back_in_fixed_order() {
        let rec = record(
            &["SOURCE", "LAST_UPDATED", "FULL_PATH", "CATEGORY", "ID", "Title", "Content"],
            &["wiki", "2024-05-01", "/a/b", "Ops", "77", "Runbook", "<p>x</p>\n\n\n\n<p>y</p>"],
        );
        let doc = render_knowledge_base(&rec, &naming());

        let meta = read_metadata(&doc.body);
        let expected = [
            ("ID", "77"),
            ("CATEGORY", "Ops"),
            ("FULL_PATH", "/a/b"),
            ("LAST_UPDATED", "2024-05-01"),
            ("SOURCE", "wiki"),
        ];
        assert_eq!(meta.len(), expected.len());
        for ((key, value), (ek, ev)) in meta.iter().zip(expected) {
            assert_eq!(key, ek);
            assert_eq!(value, ev);
        }

        let content = doc.body.split("\n---\n\n").nth(1).expect("content section");
        assert!(!content.contains("\n\n\n"));
        assert_eq!(content, "x\n\ny");
    }

    #[test]
    fn kb_row_without_title_is_skipped() {
        let rec = record(&["TITLE", "CONTENTS"], &["", "<p>orphan</p>"]);
        let outcome = render_row(4, &rec, &SchemaKind::KnowledgeBase, &naming()).unwrap();
        assert_eq!(outcome, RenderOutcome::Skip);
    }

    #[test]
    fn kb_title_lookup_is_case_exact() {
        // Lower-case headers classify as KB but carry no TITLE/Title cell.
        let rec = record(&["title", "content"], &["Lower", "<p>x</p>"]);
        let outcome = render_row(1, &rec, &SchemaKind::KnowledgeBase, &naming()).unwrap();
        assert_eq!(outcome, RenderOutcome::Skip);
    }

    #[test]
    fn kb_renderer_defaults_title() {
        let rec = record(&["CONTENTS"], &["plain text"]);
        let doc = render_knowledge_base(&rec, &naming());
        assert!(doc.body.starts_with("# Untitled\n"));
        assert_eq!(doc.filename, "Untitled.md");
        assert!(doc.body.ends_with("plain text"));
    }

    #[test]
    fn kb_content_falls_back_to_raw_text() {
        let rec = record(&["Title", "Content"], &["Raw", "{not json <b>bold</b>"]);
        let doc = render_knowledge_base(&rec, &naming());
        assert!(doc.body.ends_with("{not json\nbold"));
    }

    // --- Identified rows ---

    #[test]
    fn required_identifier_skips_empty_rows() {
        let schema = SchemaKind::Identified {
            id_field: "Mule Jira Issue".into(),
            required: true,
        };
        let headers = ["Mule Jira Issue", "Notes"];

        let rec = record(&headers, &["MULE-42", "fix bug"]);
        let doc = expect_document(render_row(1, &rec, &schema, &naming()).unwrap());
        assert_eq!(doc.filename, "MULE-42.md");
        assert_eq!(
            doc.body,
            "# MULE-42\n\n**Mule Jira Issue:** MULE-42\n\n**Notes:** fix bug\n\n"
        );

        let rec = record(&headers, &["", "ignored"]);
        let skipped = render_row(2, &rec, &schema, &naming()).unwrap();
        assert_eq!(skipped, RenderOutcome::Skip);
    }

    #[test]
    fn optional_identifier_falls_back_to_first_value() {
        let schema = SchemaKind::Identified {
            id_field: "ID".into(),
            required: false,
        };
        let rec = record(&["ID", "Name"], &["", "Alice"]);
        let doc = expect_document(render_row(1, &rec, &schema, &naming()).unwrap());
        assert!(doc.body.starts_with("# Alice\n\n"));
        assert!(doc.body.contains("**ID:** \n\n"));
    }

    #[test]
    fn generic_trims_keys_and_values_and_renders_absent_as_empty() {
        let rec = record(&[" Key ", "Missing", ""], &["  v  "]);
        let doc = render_generic(&rec, None, &naming());
        assert_eq!(doc.body, "#   v  \n\n**Key:** v\n\n**Missing:** \n\n");
    }

    // --- Positional rows ---

    #[test]
    fn positional_uses_first_non_empty_cell() {
        let rec = record(&["Foo", "Bar"], &["", "value2"]);
        let outcome = render_row(1, &rec, &SchemaKind::Positional, &naming()).unwrap();
        let doc = expect_document(outcome);
        assert_eq!(doc.filename, "value2.md");
        assert!(doc.body.starts_with("# value2\n\n"));
    }

    #[test]
    fn positional_all_empty_row_is_named_row() {
        let rec = record(&["Foo", "Bar"], &["", ""]);
        let doc = render_generic(&rec, None, &naming());
        assert_eq!(doc.filename, "row.md");
        assert!(doc.body.starts_with("# row\n\n"));
    }

    #[test]
    fn nul_in_identifier_is_a_render_error() {
        let rec = record(&["Foo"], &["bad\0name"]);
        let err = render_row(9, &rec, &SchemaKind::Positional, &naming()).unwrap_err();
        assert!(err.to_string().contains("row 9"));
    }
}
