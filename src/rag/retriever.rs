//! Query-time retrieval against the vector store.

use super::ContextChunk;
use crate::embedding::Embedder;
use crate::error::{LesaError, Result};
use crate::vector_store::VectorStore;
use std::sync::Arc;
use tracing::debug;

/// Retrieves the most relevant stored chunks for a query.
pub struct Retriever {
    vector_store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
    min_score: f32,
}

impl Retriever {
    /// Create a new retriever with default limits.
    pub fn new(vector_store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            vector_store,
            embedder,
            top_k: 5,
            min_score: 0.0,
        }
    }

    /// Set the number of chunks to retrieve.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set the minimum similarity score threshold.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    /// Retrieve the top-K chunks for a query, ordered by descending
    /// similarity.
    ///
    /// An empty result means nothing matched; dependency failures propagate
    /// as errors and are never collapsed into "no results."
    pub async fn retrieve(&self, query: &str) -> Result<Vec<ContextChunk>> {
        if query.trim().is_empty() {
            return Err(LesaError::Validation("query must not be empty".to_string()));
        }

        let query_embedding = self.embedder.embed(query).await?;

        let results = self
            .vector_store
            .search_with_threshold(&query_embedding, self.top_k, self.min_score)
            .await?;

        debug!("Retrieved {} chunks for query", results.len());

        Ok(results.into_iter().map(ContextChunk::from).collect())
    }
}

/// Format context chunks for inclusion in a prompt, in the given order.
pub fn format_context_for_prompt(chunks: &[ContextChunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            format!(
                "---\n[{}] {} (page {})\n{}\n---",
                i + 1,
                chunk.filename,
                chunk.page_number,
                chunk.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::{MemoryVectorStore, StoredRecord};
    use async_trait::async_trait;

    /// Deterministic embedder for tests: maps known texts to fixed vectors.
    struct StubEmbedder;

    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if text.contains("refund") {
                Ok(vec![1.0, 0.0, 0.0])
            } else {
                Ok(vec![0.0, 0.0, 1.0])
            }
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let mut out = Vec::new();
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }

        fn dimensions(&self) -> usize {
            3
        }
    }

    #[tokio::test]
    async fn test_retrieve_returns_most_similar_first() {
        let store = Arc::new(MemoryVectorStore::new(3));
        store
            .add(&[
                StoredRecord::new(
                    "Refunds are accepted within 30 days.".to_string(),
                    vec![1.0, 0.0, 0.0],
                    "policy.pdf".to_string(),
                    2,
                    0,
                ),
                StoredRecord::new(
                    "Our office is in Oslo.".to_string(),
                    vec![0.0, 1.0, 0.0],
                    "about.pdf".to_string(),
                    1,
                    0,
                ),
            ])
            .await
            .unwrap();

        let retriever = Retriever::new(store, Arc::new(StubEmbedder));
        let chunks = retriever.retrieve("What is the refund policy?").await.unwrap();

        assert!(!chunks.is_empty());
        assert_eq!(chunks[0].filename, "policy.pdf");
        assert_eq!(chunks[0].page_number, 2);
    }

    #[tokio::test]
    async fn test_empty_query_is_rejected() {
        let store = Arc::new(MemoryVectorStore::new(3));
        let retriever = Retriever::new(store, Arc::new(StubEmbedder));

        let err = retriever.retrieve("   ").await.unwrap_err();
        assert!(matches!(err, LesaError::Validation(_)));
    }

    #[tokio::test]
    async fn test_empty_store_yields_no_results_not_error() {
        let store = Arc::new(MemoryVectorStore::new(3));
        let retriever = Retriever::new(store, Arc::new(StubEmbedder));

        let chunks = retriever.retrieve("anything at all").await.unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_format_context_numbers_chunks() {
        let chunks = vec![
            ContextChunk {
                filename: "a.pdf".to_string(),
                page_number: 1,
                content: "first".to_string(),
                score: 0.9,
            },
            ContextChunk {
                filename: "b.pdf".to_string(),
                page_number: 3,
                content: "second".to_string(),
                score: 0.5,
            },
        ];

        let formatted = format_context_for_prompt(&chunks);
        assert!(formatted.contains("[1] a.pdf (page 1)"));
        assert!(formatted.contains("[2] b.pdf (page 3)"));
    }
}
