//! Project documents as produced by the upstream scraper.
//!
//! A document is a flat record of optional text fields. Nothing is required:
//! missing and `null` fields read as empty. Unknown keys are kept so a document
//! survives the index round-trip unchanged.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topics: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, alias = "id", skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,

    /// Fields this crate does not interpret (e.g. `raw_html`).
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Document {
    /// Title, or an empty string.
    pub fn title(&self) -> &str {
        non_empty(&self.title).unwrap_or_default()
    }

    /// The longer description when both are present: `full_description`
    /// wins over `description` whenever it is non-empty.
    pub fn long_description(&self) -> Option<&str> {
        non_empty(&self.full_description).or_else(|| non_empty(&self.description))
    }
}

/// Borrow the field if it holds any non-whitespace text.
pub(crate) fn non_empty(field: &Option<String>) -> Option<&str> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("documents file not found: {0}")]
    NotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed documents file: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Read a JSON array of documents.
pub fn load_documents(path: &Path) -> Result<Vec<Document>, DocumentError> {
    if !path.exists() {
        return Err(DocumentError::NotFound(path.display().to_string()));
    }

    let bytes = std::fs::read(path)?;
    let documents = parse_documents(&bytes)?;

    log::info!("read {} documents from {}", documents.len(), path.display());
    Ok(documents)
}

pub fn parse_documents(bytes: &[u8]) -> Result<Vec<Document>, DocumentError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Write documents as a pretty-printed JSON array, replacing `path` atomically.
pub fn save_documents(path: &Path, documents: &[Document]) -> Result<(), DocumentError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(&serde_json::to_vec_pretty(documents)?)?;
    tmp.persist(path).map_err(|err| err.error)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_and_null_fields_are_empty() {
        let docs = parse_documents(br#"[{"title": "A", "summary": null}, {}]"#).unwrap();

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].title(), "A");
        assert_eq!(docs[0].summary, None);
        assert_eq!(docs[1], Document::default());
        assert_eq!(docs[1].title(), "");
    }

    #[test]
    fn test_unknown_fields_are_preserved() {
        let docs = parse_documents(br#"[{"title": "A", "raw_html": "<p>x</p>", "id": "p-1"}]"#)
            .unwrap();

        assert_eq!(docs[0].identifier.as_deref(), Some("p-1"));
        assert_eq!(
            docs[0].extra.get("raw_html"),
            Some(&serde_json::Value::String("<p>x</p>".to_string()))
        );

        let json = serde_json::to_string(&docs[0]).unwrap();
        let back: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(back, docs[0]);
    }

    #[test]
    fn test_long_description_prefers_full() {
        let doc = Document {
            full_description: Some("long one".to_string()),
            description: Some("short".to_string()),
            ..Default::default()
        };
        assert_eq!(doc.long_description(), Some("long one"));

        let doc = Document {
            full_description: Some("   ".to_string()),
            description: Some("short".to_string()),
            ..Default::default()
        };
        assert_eq!(doc.long_description(), Some("short"));
    }

    #[test]
    fn test_not_an_array_is_malformed() {
        let result = parse_documents(br#"{"title": "A"}"#);
        assert!(matches!(result, Err(DocumentError::Malformed(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let result = load_documents(&tmp.path().join("nope.json"));
        assert!(matches!(result, Err(DocumentError::NotFound(_))));
    }

    #[test]
    fn test_save_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("projects.json");
        let docs = vec![
            Document {
                title: Some("First".to_string()),
                url: Some("https://example.org/1".to_string()),
                ..Default::default()
            },
            Document::default(),
        ];

        save_documents(&path, &docs).unwrap();
        assert_eq!(load_documents(&path).unwrap(), docs);
    }
}
