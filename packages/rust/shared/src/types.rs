//! Core domain types: rows read from a table, the schema chosen for them,
//! and the Markdown documents they become.

use std::fmt;

// ---------------------------------------------------------------------------
// RawRecord
// ---------------------------------------------------------------------------

/// One data row keyed by header name, in header order.
///
/// A cell is `None` when the row was shorter than the header. Every record
/// of one input shares the same key set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    fields: Vec<(String, Option<String>)>,
}

impl RawRecord {
    /// Pair header names with the row's cells.
    ///
    /// Missing trailing cells become `None`; surplus cells are dropped since
    /// they have no column name. A repeated header keeps its first position
    /// and takes the value of its last occurrence.
    pub fn from_row<I, S>(headers: &[String], cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut cells = cells.into_iter();
        let mut fields: Vec<(String, Option<String>)> = Vec::with_capacity(headers.len());

        for header in headers {
            let value = cells.next().map(Into::into);
            match fields.iter_mut().find(|(key, _)| *key == *header) {
                Some(existing) => existing.1 = value,
                None => fields.push((header.clone(), value)),
            }
        }

        Self { fields }
    }

    /// Exact-key lookup. Returns `None` for unknown keys and absent cells.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_deref())
    }

    /// Exact-key lookup that treats an empty cell like an absent one.
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    /// First non-empty cell in column order.
    pub fn first_non_empty(&self) -> Option<&str> {
        self.fields
            .iter()
            .filter_map(|(_, v)| v.as_deref())
            .find(|v| !v.is_empty())
    }

    /// Iterate `(column, cell)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Fixed metadata block of a KB-style document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub id: String,
    pub category: String,
    pub full_path: String,
    pub last_updated: String,
    pub source: String,
}

impl Metadata {
    /// Copy the metadata cells out of a record; absent cells become empty strings.
    pub fn from_record(record: &RawRecord) -> Self {
        let field = |key: &str| record.get(key).unwrap_or_default().to_string();
        Self {
            id: field("ID"),
            category: field("CATEGORY"),
            full_path: field("FULL_PATH"),
            last_updated: field("LAST_UPDATED"),
            source: field("SOURCE"),
        }
    }

    /// Fields as `(label, value)` in their fixed rendering order.
    pub fn entries(&self) -> [(&'static str, &str); 5] {
        [
            ("ID", self.id.as_str()),
            ("CATEGORY", self.category.as_str()),
            ("FULL_PATH", self.full_path.as_str()),
            ("LAST_UPDATED", self.last_updated.as_str()),
            ("SOURCE", self.source.as_str()),
        ]
    }
}

// ---------------------------------------------------------------------------
// SchemaKind
// ---------------------------------------------------------------------------

/// Rendering strategy picked once per input from its header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaKind {
    /// Title + HTML content + fixed metadata.
    KnowledgeBase,
    /// One designated column names each document.
    ///
    /// When `required` is set, rows with an empty identifier are skipped
    /// instead of falling back to the first non-empty cell.
    Identified { id_field: String, required: bool },
    /// No usable column; the first non-empty cell names each document.
    Positional,
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KnowledgeBase => write!(f, "knowledge-base"),
            Self::Identified { id_field, .. } => write!(f, "identified ({id_field})"),
            Self::Positional => write!(f, "positional fallback"),
        }
    }
}

// ---------------------------------------------------------------------------
// RenderedDocument
// ---------------------------------------------------------------------------

/// A rendered Markdown document and the filename it is written under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub filename: String,
    pub body: String,
}
