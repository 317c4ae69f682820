//! Document text preprocessing for embedding generation.
//!
//! Builds one labeled text blob per document, in a fixed priority order:
//! 1. Title
//! 2. Summary
//! 3. Description (full description preferred over the short one)
//! 4. Authors
//! 5. Topics
//! 6. Status
//!
//! Empty fields are skipped entirely, so no bare labels reach the model.

use crate::documents::{non_empty, Document};

/// Separator between labeled segments
const SEGMENT_SEPARATOR: &str = " ";

/// Build the text that gets embedded for `doc`.
///
/// Returns an empty string when the document has no usable text; such a
/// document is still indexed, it just never ranks.
pub fn document_text(doc: &Document) -> String {
    let segments = [
        ("Title", non_empty(&doc.title)),
        ("Summary", non_empty(&doc.summary)),
        ("Description", doc.long_description()),
        ("Authors", non_empty(&doc.authors)),
        ("Topics", non_empty(&doc.topics)),
        ("Status", non_empty(&doc.status)),
    ];

    segments
        .into_iter()
        .filter_map(|(label, value)| value.map(|value| format!("{label}: {value}")))
        .collect::<Vec<_>>()
        .join(SEGMENT_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        Document {
            title: Some("Diabetes study".to_string()),
            summary: Some("Adherence to medication".to_string()),
            full_description: Some("A long description".to_string()),
            description: Some("short".to_string()),
            authors: Some("A. Author".to_string()),
            topics: Some("Diabetes".to_string()),
            status: Some("Completed".to_string()),
            date: Some("2023-01-01".to_string()),
            url: Some("https://example.org".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_full_document_order() {
        assert_eq!(
            document_text(&doc()),
            "Title: Diabetes study Summary: Adherence to medication \
             Description: A long description Authors: A. Author \
             Topics: Diabetes Status: Completed"
        );
    }

    #[test]
    fn test_short_description_fallback() {
        let doc = Document {
            title: Some("T".to_string()),
            description: Some("short".to_string()),
            ..Default::default()
        };
        assert_eq!(document_text(&doc), "Title: T Description: short");
    }

    #[test]
    fn test_missing_fields_leave_no_labels() {
        let doc = Document {
            summary: Some("only a summary".to_string()),
            authors: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(document_text(&doc), "Summary: only a summary");
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(document_text(&Document::default()), "");
    }

    #[test]
    fn test_date_and_url_are_not_embedded() {
        let text = document_text(&doc());
        assert!(!text.contains("2023-01-01"));
        assert!(!text.contains("example.org"));
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(document_text(&doc()), document_text(&doc()));
    }
}
