//! RAG (Retrieval-Augmented Generation) for question answering with sources.
//!
//! Provides the ability to ask questions and get answers from the document
//! knowledge base, with page-level citations.

mod answer;
pub mod retriever;

pub use answer::{RagAnswer, RagEngine};
pub use retriever::Retriever;

use crate::vector_store::SearchResult;
use serde::{Deserialize, Serialize};

/// A retrieved chunk with citation metadata for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextChunk {
    /// Source document filename.
    pub filename: String,
    /// 1-based page number in the source document.
    pub page_number: u32,
    /// Text content.
    pub content: String,
    /// Similarity score.
    pub score: f32,
}

impl From<SearchResult> for ContextChunk {
    fn from(result: SearchResult) -> Self {
        Self {
            filename: result.record.filename.clone(),
            page_number: result.record.page_number,
            content: result.record.content.clone(),
            score: result.score,
        }
    }
}
