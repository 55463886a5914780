//! Deterministic text chunking for embedding and retrieval.
//!
//! Splits extracted page segments into bounded, overlapping chunks. Splitting
//! prefers paragraph boundaries, then sentence boundaries, then falls back to
//! hard character-count boundaries. Identical input always produces identical
//! chunk boundaries.

use crate::extract::Segment;
use serde::{Deserialize, Serialize};

/// Separator hierarchy tried in order before hard character splitting.
const SEPARATORS: [&str; 5] = ["\n\n", ". ", "! ", "? ", " "];

/// A chunk of document text ready for embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextChunk {
    /// Text content of this chunk.
    pub content: String,
    /// 1-based page number this chunk was extracted from.
    pub page_number: u32,
    /// Order of this chunk within the document.
    pub order: i32,
}

impl TextChunk {
    pub fn new(content: String, page_number: u32, order: i32) -> Self {
        Self {
            content,
            page_number,
            order,
        }
    }
}

/// Configuration for chunking.
#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Overlap between adjacent chunks in characters.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Recursive splitter with fixed size and overlap.
///
/// Each segment is split independently so every chunk keeps an exact page
/// provenance.
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    config: ChunkingConfig,
}

impl RecursiveChunker {
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    /// Split a sequence of page segments into ordered chunks.
    ///
    /// A segment shorter than the overlap still yields exactly one chunk.
    pub fn chunk_segments(&self, segments: &[Segment]) -> Vec<TextChunk> {
        let mut chunks = Vec::new();
        let mut order = 0;

        for segment in segments {
            for content in self.split_text(&segment.text) {
                chunks.push(TextChunk::new(content, segment.page_number, order));
                order += 1;
            }
        }

        chunks
    }

    /// Split a single text into bounded, overlapping pieces.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }
        split_and_merge(
            text,
            self.config.chunk_size,
            self.config.chunk_overlap,
            &SEPARATORS,
        )
    }
}

impl Default for RecursiveChunker {
    fn default() -> Self {
        Self::new(ChunkingConfig::default())
    }
}

/// Split text by a separator, then greedily merge pieces into chunks that
/// respect `chunk_size`. Oversized pieces are split further with the
/// next-level separator; overlap is carried from each emitted chunk into the
/// start of the next.
fn split_and_merge(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
    separators: &[&str],
) -> Vec<String> {
    if text.len() <= chunk_size {
        return vec![text.to_string()];
    }
    if separators.is_empty() {
        return split_by_size(text, chunk_size, chunk_overlap);
    }

    let separator = separators[0];
    let remaining_separators = &separators[1..];

    let pieces = split_keeping_separator(text, separator);
    if pieces.len() <= 1 {
        // Separator not present at this level, try the next one
        return split_and_merge(text, chunk_size, chunk_overlap, remaining_separators);
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for piece in pieces {
        if !current.is_empty() && current.len() + piece.len() > chunk_size {
            let tail = overlap_tail(&current, chunk_overlap).to_string();
            if current.len() > chunk_size {
                chunks.extend(split_and_merge(
                    &current,
                    chunk_size,
                    chunk_overlap,
                    remaining_separators,
                ));
            } else {
                chunks.push(current);
            }
            current = tail;
        }
        current.push_str(piece);
    }

    if !current.is_empty() {
        if current.len() > chunk_size {
            chunks.extend(split_and_merge(
                &current,
                chunk_size,
                chunk_overlap,
                remaining_separators,
            ));
        } else {
            chunks.push(current);
        }
    }

    chunks
}

/// Split text at a separator while keeping the separator attached to the
/// preceding piece.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut result = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        result.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        result.push(&text[start..]);
    }

    result
}

/// Hard character-based splitting with overlap, snapped to char boundaries.
fn split_by_size(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let step = chunk_size.saturating_sub(chunk_overlap);
    if step == 0 {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let end = floor_char_boundary(text, (start + chunk_size).min(text.len()));
        chunks.push(text[start..end].to_string());
        if end == text.len() {
            break;
        }
        let next = floor_char_boundary(text, start + step);
        if next <= start {
            break;
        }
        start = next;
    }

    chunks
}

/// The trailing `overlap` characters of `text`, snapped to a char boundary.
fn overlap_tail(text: &str, overlap: usize) -> &str {
    if overlap == 0 {
        return "";
    }
    if text.len() <= overlap {
        return text;
    }
    let mut idx = text.len() - overlap;
    while !text.is_char_boundary(idx) {
        idx += 1;
    }
    &text[idx..]
}

/// Largest char-boundary index not exceeding `idx`.
fn floor_char_boundary(text: &str, idx: usize) -> usize {
    let mut idx = idx.min(text.len());
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker() -> RecursiveChunker {
        RecursiveChunker::default()
    }

    #[test]
    fn test_short_segment_yields_one_chunk() {
        // Shorter than the overlap, still exactly one chunk
        let segments = vec![Segment::new(1, "tiny".to_string())];
        let chunks = chunker().chunk_segments(&segments);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "tiny");
        assert_eq!(chunks[0].page_number, 1);
        assert_eq!(chunks[0].order, 0);
    }

    #[test]
    fn test_scenario_long_and_short_page() {
        // Page 1: 1500 chars, page 2: 300 chars, size 1000 / overlap 200
        // -> 2 chunks from page 1 with 200-char overlap, 1 chunk from page 2
        let segments = vec![
            Segment::new(1, "x".repeat(1500)),
            Segment::new(2, "y".repeat(300)),
        ];
        let chunks = chunker().chunk_segments(&segments);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].content.len(), 1000);
        assert_eq!(chunks[1].content.len(), 700);
        assert_eq!(chunks[0].page_number, 1);
        assert_eq!(chunks[1].page_number, 1);
        assert_eq!(chunks[2].page_number, 2);
        assert_eq!(
            chunks.iter().map(|c| c.order).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );

        // The second chunk repeats the last 200 chars of the first
        assert_eq!(&chunks[0].content[800..], &chunks[1].content[..200]);
    }

    #[test]
    fn test_deterministic_boundaries() {
        let segments = vec![Segment::new(
            1,
            "First sentence. Second sentence. ".repeat(60),
        )];
        let a = chunker().chunk_segments(&segments);
        let b = chunker().chunk_segments(&segments);

        let a_contents: Vec<&str> = a.iter().map(|c| c.content.as_str()).collect();
        let b_contents: Vec<&str> = b.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(a_contents, b_contents);
    }

    #[test]
    fn test_prefers_paragraph_boundaries() {
        let para1 = "a".repeat(600);
        let para2 = "b".repeat(600);
        let text = format!("{}\n\n{}", para1, para2);

        let chunks = chunker().split_text(&text);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].ends_with("\n\n"));
        // Overlap carries the end of the first paragraph into the second chunk
        assert!(chunks[1].starts_with('a'));
        assert!(chunks[1].ends_with('b'));
    }

    #[test]
    fn test_all_chunks_within_size() {
        let text = "word ".repeat(2000);
        let chunks = chunker().split_text(&text);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= 1000, "chunk of {} bytes", chunk.len());
        }
    }

    #[test]
    fn test_multibyte_text_does_not_panic() {
        let text = "ø".repeat(1500);
        let chunks = chunker().split_text(&text);
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.len() <= 1000);
        }
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        assert!(chunker().split_text("").is_empty());
    }
}
