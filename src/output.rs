//! Output formatting for search results.
//!
//! Supports both human-readable terminal output and JSON for scripting.

use serde::Serialize;

use crate::documents::{non_empty, Document};
use crate::semantic::ScoredDocument;

/// Maximum characters to show of a summary
const SNIPPET_MAX_LEN: usize = 150;

/// JSON output structure for search results
#[derive(Serialize)]
pub struct JsonOutput<'a> {
    pub query: &'a str,
    pub results: Vec<JsonResult<'a>>,
}

#[derive(Serialize)]
pub struct JsonResult<'a> {
    pub rank: usize,
    pub score: f32,
    pub document: &'a Document,
}

/// Formats search results as JSON.
pub fn format_json(query: &str, results: &[ScoredDocument]) -> String {
    let output = JsonOutput {
        query,
        results: results
            .iter()
            .enumerate()
            .map(|(i, result)| JsonResult {
                rank: i + 1,
                score: result.score,
                document: &result.document,
            })
            .collect(),
    };
    serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
}

/// Formats search results for human-readable terminal output.
pub fn format_human(query: &str, results: &[ScoredDocument]) -> String {
    if results.is_empty() {
        return format!("No results found for \"{}\"", query);
    }

    let mut output = format!("Top {} results for \"{}\":\n\n", results.len(), query);

    for (i, result) in results.iter().enumerate() {
        output.push_str(&format!(
            "{}. [{:.3}] {}\n",
            i + 1,
            result.score,
            display_title(&result.document)
        ));
        push_details(&mut output, &result.document);
        output.push('\n');
    }

    output.trim_end().to_string()
}

/// Formats every indexed document, numbered in corpus order.
pub fn format_document_list(documents: &[Document]) -> String {
    if documents.is_empty() {
        return "No documents indexed".to_string();
    }

    let mut output = String::new();
    for (i, document) in documents.iter().enumerate() {
        output.push_str(&format!("{}. {}\n", i + 1, display_title(document)));
        push_details(&mut output, document);
    }

    output.trim_end().to_string()
}

fn display_title(document: &Document) -> &str {
    match document.title() {
        "" => "Untitled project",
        title => title,
    }
}

fn push_details(output: &mut String, document: &Document) {
    if let Some(summary) = non_empty(&document.summary) {
        output.push_str(&format!("   {}\n", truncate_text(summary, SNIPPET_MAX_LEN)));
    }
    if let Some(url) = non_empty(&document.url) {
        output.push_str(&format!("   URL: {}\n", url));
    }
}

/// Truncates text to a maximum number of characters, adding ellipsis if needed.
fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }

    let truncated: String = text.chars().take(max_len).collect();
    format!("{}...", truncated.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(title: &str, summary: &str, score: f32) -> ScoredDocument {
        ScoredDocument {
            document: Document {
                title: Some(title.to_string()),
                summary: Some(summary.to_string()),
                url: Some("https://example.org/p".to_string()),
                ..Default::default()
            },
            score,
        }
    }

    #[test]
    fn test_no_results() {
        assert_eq!(format_human("asthma", &[]), "No results found for \"asthma\"");
    }

    #[test]
    fn test_human_format() {
        let results = vec![scored("Diabetes", "About diabetes", 0.91234), scored("Heart", "", 0.5)];
        let output = format_human("diabetes", &results);

        assert!(output.starts_with("Top 2 results for \"diabetes\""));
        assert!(output.contains("1. [0.912] Diabetes"));
        assert!(output.contains("   About diabetes"));
        assert!(output.contains("2. [0.500] Heart"));
        assert!(output.contains("URL: https://example.org/p"));
    }

    #[test]
    fn test_long_summary_is_truncated() {
        let summary = "é".repeat(400);
        let output = format_human("q", &[scored("T", &summary, 0.1)]);
        assert!(output.contains(&format!("{}...", "é".repeat(SNIPPET_MAX_LEN))));
    }

    #[test]
    fn test_json_format() {
        let results = vec![scored("Diabetes", "About diabetes", 0.75)];
        let output = format_json("diabetes", &results);
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["query"], "diabetes");
        assert_eq!(value["results"][0]["rank"], 1);
        assert_eq!(value["results"][0]["score"], 0.75);
        assert_eq!(value["results"][0]["document"]["title"], "Diabetes");
    }

    #[test]
    fn test_untitled_document_in_list() {
        let output = format_document_list(&[Document::default()]);
        assert_eq!(output, "1. Untitled project");
    }
}
