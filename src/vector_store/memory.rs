//! In-memory vector store implementation.
//!
//! Useful for testing and small datasets.

use super::{cosine_similarity, IndexedDocument, SearchResult, StoredRecord, VectorStore};
use crate::error::{LesaError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory vector store.
pub struct MemoryVectorStore {
    records: RwLock<HashMap<String, StoredRecord>>,
    dimensions: usize,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new(dimensions: usize) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            dimensions,
        }
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn add(&self, records: &[StoredRecord]) -> Result<usize> {
        for record in records {
            if record.embedding.len() != self.dimensions {
                return Err(LesaError::StoreWrite(format!(
                    "record {} has embedding of {} dims, store expects {}",
                    record.id,
                    record.embedding.len(),
                    self.dimensions
                )));
            }
        }

        let mut store = self
            .records
            .write()
            .map_err(|e| LesaError::StoreWrite(format!("Failed to acquire lock: {}", e)))?;
        for record in records {
            store.insert(record.id.to_string(), record.clone());
        }
        Ok(records.len())
    }

    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        self.search_with_threshold(query_embedding, limit, 0.0).await
    }

    async fn search_with_threshold(
        &self,
        query_embedding: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>> {
        let records = self
            .records
            .read()
            .map_err(|e| LesaError::StoreRead(format!("Failed to acquire lock: {}", e)))?;

        let mut results: Vec<SearchResult> = records
            .values()
            .map(|record| {
                let score = cosine_similarity(query_embedding, &record.embedding);
                SearchResult {
                    record: record.clone(),
                    score,
                }
            })
            .filter(|r| r.score >= min_score)
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);

        Ok(results)
    }

    async fn list_documents(&self) -> Result<Vec<IndexedDocument>> {
        let records = self
            .records
            .read()
            .map_err(|e| LesaError::StoreRead(format!("Failed to acquire lock: {}", e)))?;

        let mut doc_map: HashMap<String, IndexedDocument> = HashMap::new();

        for record in records.values() {
            let entry = doc_map
                .entry(record.filename.clone())
                .or_insert_with(|| IndexedDocument {
                    filename: record.filename.clone(),
                    chunk_count: 0,
                    indexed_at: record.indexed_at,
                });

            entry.chunk_count += 1;
            if record.indexed_at > entry.indexed_at {
                entry.indexed_at = record.indexed_at;
            }
        }

        let mut documents: Vec<IndexedDocument> = doc_map.into_values().collect();
        documents.sort_by(|a, b| b.indexed_at.cmp(&a.indexed_at));

        Ok(documents)
    }

    async fn record_count(&self) -> Result<usize> {
        let records = self
            .records
            .read()
            .map_err(|e| LesaError::StoreRead(format!("Failed to acquire lock: {}", e)))?;
        Ok(records.len())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_vector_store() {
        let store = MemoryVectorStore::new(3);

        let rec1 = StoredRecord::new(
            "Hello world".to_string(),
            vec![1.0, 0.0, 0.0],
            "doc.pdf".to_string(),
            1,
            0,
        );
        let rec2 = StoredRecord::new(
            "Goodbye world".to_string(),
            vec![0.0, 1.0, 0.0],
            "doc.pdf".to_string(),
            2,
            1,
        );

        store.add(&[rec1, rec2]).await.unwrap();

        assert_eq!(store.record_count().await.unwrap(), 2);

        let results = store.search(&[1.0, 0.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].score > results[1].score);
        assert_eq!(results[0].record.content, "Hello world");

        let documents = store.list_documents().await.unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].chunk_count, 2);
    }

    #[tokio::test]
    async fn test_round_trip_top_result() {
        let store = MemoryVectorStore::new(3);

        let embedding = vec![0.6, 0.8, 0.0];
        let rec = StoredRecord::new(
            "the refund policy allows returns within 30 days".to_string(),
            embedding.clone(),
            "policy.pdf".to_string(),
            4,
            0,
        );
        store.add(std::slice::from_ref(&rec)).await.unwrap();
        store
            .add(&[StoredRecord::new(
                "unrelated".to_string(),
                vec![0.0, 0.0, 1.0],
                "other.pdf".to_string(),
                1,
                0,
            )])
            .await
            .unwrap();

        // Querying with a record's own embedding returns it first
        let results = store.search(&embedding, 2).await.unwrap();
        assert_eq!(results[0].record.id, rec.id);
        assert!(results[0].score > 0.99);
    }

    #[tokio::test]
    async fn test_dimension_check() {
        let store = MemoryVectorStore::new(3);
        let bad = StoredRecord::new("x".to_string(), vec![1.0], "a.pdf".to_string(), 1, 0);
        assert!(store.add(&[bad]).await.is_err());
        assert_eq!(store.record_count().await.unwrap(), 0);
    }
}
