//! Premium Payload
//!
//! The bundle of partner media and documents attached to a premium answer.
//! One payload is produced per completed status-channel exchange.

use serde::{Deserialize, Serialize};

/// Placeholder shown when a document carries no snippets
pub const NO_SNIPPET: &str = "No snippet available.";

/// A partner video reference
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRef {
    /// Target URL
    pub link: String,
    /// Human-readable file name
    pub display_name: String,
    /// Thumbnail image URL
    pub thumbnail_link: String,
    /// Partner that owns the content
    pub partner_name: String,
}

/// A partner PDF document
///
/// Field names match the `pdf_documents` entries pushed by the status channel.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfDocument {
    /// Document URL
    pub link: String,
    /// Document title
    pub title: String,
    /// Extracted snippets, in relevance order
    pub snippets: Vec<String>,
    /// Page the best match was found on
    pub page_number: u32,
    /// URL that opens the document at `page_number`
    pub link_with_page: String,
}

impl PdfDocument {
    /// Snippets joined for display, or [`NO_SNIPPET`]
    #[must_use]
    pub fn snippet_text(&self) -> String {
        if self.snippets.is_empty() {
            NO_SNIPPET.to_string()
        } else {
            self.snippets.join(" ")
        }
    }
}

/// Answer text plus ordered video and document references
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremiumPayload {
    /// The premium answer text
    pub answer_text: String,
    /// Videos in the order the backend sent them
    pub video_refs: Vec<VideoRef>,
    /// Documents in the order the backend sent them
    pub pdf_documents: Vec<PdfDocument>,
}

impl PremiumPayload {
    /// Whether there is anything to show beyond the answer text
    #[must_use]
    pub fn has_cards(&self) -> bool {
        !self.video_refs.is_empty() || !self.pdf_documents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snippet_text_joins() {
        let doc = PdfDocument {
            snippets: vec!["first.".into(), "second.".into()],
            ..Default::default()
        };
        assert_eq!(doc.snippet_text(), "first. second.");
    }

    #[test]
    fn test_snippet_text_placeholder() {
        assert_eq!(PdfDocument::default().snippet_text(), NO_SNIPPET);
    }

    #[test]
    fn test_pdf_document_wire_fields() {
        let doc: PdfDocument = serde_json::from_str(
            r#"{"link":"https://x/a.pdf","title":"A","snippets":["s"],"page_number":4,"link_with_page":"https://x/a.pdf#page=4"}"#,
        )
        .unwrap();
        assert_eq!(doc.page_number, 4);
        assert_eq!(doc.link_with_page, "https://x/a.pdf#page=4");
    }

    #[test]
    fn test_pdf_document_missing_fields_default() {
        let doc: PdfDocument = serde_json::from_str(r#"{"link":"https://x/b.pdf"}"#).unwrap();
        assert_eq!(doc.title, "");
        assert!(doc.snippets.is_empty());
    }
}
