//! Ingest pipeline for Lesa.
//!
//! Coordinates the entire process from PDF bytes to indexed chunks.

use crate::chunking::{ChunkingConfig, RecursiveChunker, TextChunk};
use crate::config::{Prompts, Settings};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{LesaError, Result};
use crate::extract::extract_pdf;
use crate::questions::QuestionGenerator;
use crate::vector_store::{SqliteVectorStore, StoredRecord, VectorStore};
use std::sync::Arc;
use tracing::{info, instrument};

/// Media type accepted by the ingest entrypoint.
const PDF_MEDIA_TYPE: &str = "application/pdf";

/// The main pipeline for Lesa.
///
/// Owns the explicitly constructed store and embedder handles; the store is
/// opened (or created) once here and passed to every consumer, never held as
/// process-wide state.
pub struct Pipeline {
    settings: Settings,
    prompts: Prompts,
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
}

impl Pipeline {
    /// Create a new pipeline with default components.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let embedder = Arc::new(OpenAIEmbedder::with_config(
            &settings.embedding.model,
            settings.embedding.dimensions as usize,
        ));

        let vector_store = Arc::new(SqliteVectorStore::open(
            &settings.data_dir(),
            &settings.vector_store.collection,
            settings.embedding.dimensions as usize,
        )?);

        Ok(Self {
            settings,
            prompts,
            embedder,
            vector_store,
        })
    }

    /// Create a pipeline with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            settings,
            prompts,
            embedder,
            vector_store,
        }
    }

    /// Get a reference to the vector store.
    pub fn vector_store(&self) -> Arc<dyn VectorStore> {
        self.vector_store.clone()
    }

    /// Get a reference to the embedder.
    pub fn embedder(&self) -> Arc<dyn Embedder> {
        self.embedder.clone()
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get the loaded prompts.
    pub fn prompts(&self) -> &Prompts {
        &self.prompts
    }

    /// Ingest a document: validate, extract, chunk, embed, store, and
    /// generate questions from the new content.
    ///
    /// The media type is checked before any extraction is attempted. A
    /// document's chunks are embedded in production order and stored as one
    /// atomic batch; an ingest that fails midway leaves no partial records.
    #[instrument(skip(self, bytes), fields(filename = %filename, size = bytes.len()))]
    pub async fn ingest(
        &self,
        filename: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<IngestResult> {
        if content_type != PDF_MEDIA_TYPE {
            return Err(LesaError::Validation(format!(
                "file must be a PDF, got '{}'",
                content_type
            )));
        }

        // Extract
        let segments = extract_pdf(filename, bytes)?;

        // Chunk
        let chunker = RecursiveChunker::new(ChunkingConfig {
            chunk_size: self.settings.chunking.chunk_size,
            chunk_overlap: self.settings.chunking.chunk_overlap,
        });
        let chunks = chunker.chunk_segments(&segments);
        info!("Split '{}' into {} chunks", filename, chunks.len());

        // Embed and store
        let stored = self.index_chunks(filename, &chunks).await?;

        // Generate questions from the chunked content, bypassing the store
        let full_content = chunks
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let generator = QuestionGenerator::new(
            &self.settings.questions.model,
            self.settings.questions.max_questions,
            self.settings.questions.max_content_tokens,
        )
        .with_prompts(self.prompts.clone());

        let questions = generator.generate(&full_content).await?;

        Ok(IngestResult {
            filename: filename.to_string(),
            questions,
            chunks_stored: stored,
        })
    }

    /// Generate embeddings and store chunks as one atomic batch.
    async fn index_chunks(&self, filename: &str, chunks: &[TextChunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let records: Vec<StoredRecord> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| {
                StoredRecord::new(
                    chunk.content.clone(),
                    embedding,
                    filename.to_string(),
                    chunk.page_number,
                    chunk.order,
                )
            })
            .collect();

        self.vector_store.add(&records).await
    }
}

/// Result of ingesting a document.
#[derive(Debug)]
pub struct IngestResult {
    /// Source filename.
    pub filename: String,
    /// Questions generated from the ingested content.
    pub questions: Vec<String>,
    /// Number of chunks stored.
    pub chunks_stored: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::MemoryVectorStore;
    use async_trait::async_trait;

    struct StubEmbedder;

    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0, 0.0])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0, 0.0]).collect())
        }

        fn dimensions(&self) -> usize {
            3
        }
    }

    fn pipeline_with_memory_store() -> Pipeline {
        let mut settings = Settings::default();
        settings.embedding.dimensions = 3;
        Pipeline::with_components(
            settings,
            Prompts::default(),
            Arc::new(StubEmbedder),
            Arc::new(MemoryVectorStore::new(3)),
        )
    }

    #[tokio::test]
    async fn test_non_pdf_media_type_rejected_before_extraction() {
        let pipeline = pipeline_with_memory_store();

        // Bytes are valid UTF-8 text, but the media type alone must reject it
        let err = pipeline
            .ingest("notes.txt", "text/plain", b"plain text")
            .await
            .unwrap_err();

        assert!(matches!(err, LesaError::Validation(_)));
        assert_eq!(pipeline.vector_store().record_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unparseable_pdf_fails_with_extraction_error() {
        let pipeline = pipeline_with_memory_store();

        let err = pipeline
            .ingest("bad.pdf", "application/pdf", b"not really a pdf")
            .await
            .unwrap_err();

        assert!(matches!(err, LesaError::Extraction(_)));
        assert_eq!(pipeline.vector_store().record_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_index_chunks_stores_in_production_order() {
        let pipeline = pipeline_with_memory_store();

        let chunks = vec![
            TextChunk::new("first".to_string(), 1, 0),
            TextChunk::new("second".to_string(), 1, 1),
            TextChunk::new("third".to_string(), 2, 2),
        ];

        let stored = pipeline.index_chunks("doc.pdf", &chunks).await.unwrap();
        assert_eq!(stored, 3);
        assert_eq!(pipeline.vector_store().record_count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_index_no_chunks_is_a_noop() {
        let pipeline = pipeline_with_memory_store();
        assert_eq!(pipeline.index_chunks("doc.pdf", &[]).await.unwrap(), 0);
    }
}
