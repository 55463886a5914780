//! PDF text extraction.
//!
//! Converts raw PDF bytes into an ordered sequence of page segments.

use crate::error::{LesaError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// A page of extracted text.
///
/// Page numbers are 1-based and strictly increasing within a document.
/// The text is never empty; pages without extractable text are skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    /// 1-based page number in the source document.
    pub page_number: u32,
    /// Extracted text content.
    pub text: String,
}

impl Segment {
    pub fn new(page_number: u32, text: String) -> Self {
        Self { page_number, text }
    }
}

/// Extract text from a PDF document as ordered page segments.
///
/// Pages yielding no extractable text are skipped rather than inserted as
/// empty segments. Fails when the document cannot be parsed at all, or when
/// it parses but yields zero non-empty segments.
#[instrument(skip(bytes), fields(filename = %filename, size = bytes.len()))]
pub fn extract_pdf(filename: &str, bytes: &[u8]) -> Result<Vec<Segment>> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| LesaError::Extraction(format!("could not parse '{}': {}", filename, e)))?;

    let segments = segments_from_pages(filename, pages)?;
    info!("Extracted {} pages from '{}'", segments.len(), filename);
    Ok(segments)
}

/// Turn per-page text into non-empty, ordered segments.
fn segments_from_pages(filename: &str, pages: Vec<String>) -> Result<Vec<Segment>> {
    let segments: Vec<Segment> = pages
        .into_iter()
        .enumerate()
        .filter_map(|(idx, text)| {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                debug!("Skipping empty page {} of '{}'", idx + 1, filename);
                None
            } else {
                Some(Segment::new(idx as u32 + 1, trimmed.to_string()))
            }
        })
        .collect();

    if segments.is_empty() {
        return Err(LesaError::Extraction(format!(
            "'{}' contains no extractable text",
            filename
        )));
    }

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unparseable_bytes_fail() {
        let err = extract_pdf("garbage.pdf", b"not a pdf at all").unwrap_err();
        assert!(matches!(err, LesaError::Extraction(_)));
        assert!(err.to_string().contains("could not parse"));
    }

    #[test]
    fn test_empty_pages_are_skipped() {
        let pages = vec![
            "Page one text".to_string(),
            "   \n".to_string(),
            "Page three text".to_string(),
        ];

        let segments = segments_from_pages("doc.pdf", pages).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].page_number, 1);
        assert_eq!(segments[1].page_number, 3);
    }

    #[test]
    fn test_page_numbers_strictly_increase() {
        let pages: Vec<String> = (1..=4).map(|i| format!("page {}", i)).collect();
        let segments = segments_from_pages("doc.pdf", pages).unwrap();

        let numbers: Vec<u32> = segments.iter().map(|s| s.page_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_zero_nonempty_pages_is_an_error() {
        // Structurally valid but content-free: every page parses empty
        let pages = vec!["".to_string(), "  ".to_string()];
        let err = segments_from_pages("scanned.pdf", pages).unwrap_err();
        assert!(matches!(err, LesaError::Extraction(_)));
        assert!(err.to_string().contains("no extractable text"));
    }
}
