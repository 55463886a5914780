//! Vector store abstraction for Lesa.
//!
//! Provides a trait-based interface for different vector database backends.
//! Records are immutable once written: the store supports adding and
//! querying, never updating.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A chunk stored in the vector database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Unique record ID.
    pub id: Uuid,
    /// Text content of this chunk.
    pub content: String,
    /// Embedding vector.
    pub embedding: Vec<f32>,
    /// Source document filename.
    pub filename: String,
    /// 1-based page number in the source document.
    pub page_number: u32,
    /// Order of this chunk within the document.
    pub chunk_order: i32,
    /// When this record was indexed.
    pub indexed_at: DateTime<Utc>,
}

impl StoredRecord {
    /// Create a new record with a generated ID.
    pub fn new(
        content: String,
        embedding: Vec<f32>,
        filename: String,
        page_number: u32,
        chunk_order: i32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            content,
            embedding,
            filename,
            page_number,
            chunk_order,
            indexed_at: Utc::now(),
        }
    }
}

/// A search result with score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The matched record.
    pub record: StoredRecord,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// Summary information about an indexed document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedDocument {
    /// Source filename.
    pub filename: String,
    /// Number of indexed chunks.
    pub chunk_count: u32,
    /// When the document was indexed.
    pub indexed_at: DateTime<Utc>,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Store a batch of records atomically: either all records are stored,
    /// or none are. Fails if any record's embedding dimensionality does not
    /// match the store's configured dimensionality.
    async fn add(&self, records: &[StoredRecord]) -> Result<usize>;

    /// Search for similar records. Read-only; returns fewer than `limit`
    /// results if fewer records exist, and an empty result on an empty store.
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>>;

    /// Search with a minimum similarity threshold.
    async fn search_with_threshold(
        &self,
        query_embedding: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>>;

    /// List all indexed documents.
    async fn list_documents(&self) -> Result<Vec<IndexedDocument>>;

    /// Get total record count.
    async fn record_count(&self) -> Result<usize>;

    /// The embedding dimensionality this store was opened with.
    fn dimensions(&self) -> usize;
}

/// Compute cosine similarity between two vectors.
///
/// The single similarity function used by every backend, so the metric
/// cannot diverge between write and read paths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_cosine_similarity_length_mismatch() {
        let a = vec![1.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_record_ids_are_unique() {
        let a = StoredRecord::new("a".to_string(), vec![1.0], "f.pdf".to_string(), 1, 0);
        let b = StoredRecord::new("a".to_string(), vec![1.0], "f.pdf".to_string(), 1, 0);
        assert_ne!(a.id, b.id);
    }
}
