//! SQLite-based vector store implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust for simplicity.
//! For production use cases with large datasets, consider using sqlite-vec
//! extension or a dedicated vector database.

use super::{cosine_similarity, IndexedDocument, SearchResult, StoredRecord, VectorStore};
use crate::error::{LesaError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS store_meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS records (
        id TEXT PRIMARY KEY,
        content TEXT NOT NULL,
        embedding BLOB NOT NULL,
        filename TEXT NOT NULL,
        page_number INTEGER NOT NULL,
        chunk_order INTEGER NOT NULL,
        indexed_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_records_filename ON records(filename);
"#;

/// SQLite-based vector store.
///
/// One collection maps to one database file. Opening is a single atomic
/// open-or-create: `Connection::open` plus idempotent DDL, serialized by
/// SQLite's own file locking, so concurrent startups cannot race to create
/// the same collection.
#[derive(Debug)]
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
    dimensions: usize,
}

impl SqliteVectorStore {
    /// Open or create the store for `collection` under `dir`.
    ///
    /// The configured embedding dimensionality is pinned into the database
    /// on first creation; reopening with a different dimensionality fails.
    /// There is no migration path — changing dimensions means rebuilding the
    /// index from source documents.
    #[instrument(skip_all, fields(collection = %collection))]
    pub fn open(dir: &Path, collection: &str, dimensions: usize) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.db", collection));

        let conn = Connection::open(&path).map_err(store_read)?;
        Self::init(conn, dimensions, &path.display().to_string())
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory(dimensions: usize) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(store_read)?;
        Self::init(conn, dimensions, ":memory:")
    }

    fn init(conn: Connection, dimensions: usize, location: &str) -> Result<Self> {
        // WAL mode for better concurrent read performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(store_write)?;
        conn.execute_batch(SCHEMA).map_err(store_write)?;

        // Pin the dimensionality on first create, verify it on every open
        conn.execute(
            "INSERT OR IGNORE INTO store_meta (key, value) VALUES ('dimensions', ?1)",
            params![dimensions.to_string()],
        )
        .map_err(store_write)?;

        let stored: String = conn
            .query_row(
                "SELECT value FROM store_meta WHERE key = 'dimensions'",
                [],
                |row| row.get(0),
            )
            .map_err(store_read)?;

        if stored != dimensions.to_string() {
            return Err(LesaError::StoreRead(format!(
                "store at {} was created with {} dimensions, configured {}; \
                 rebuild the index to change dimensionality",
                location, stored, dimensions
            )));
        }

        info!("Opened vector store at {} ({} dims)", location, dimensions);

        Ok(Self {
            conn: Mutex::new(conn),
            dimensions,
        })
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredRecord> {
        let id_str: String = row.get(0)?;
        let embedding_bytes: Vec<u8> = row.get(2)?;
        let page_number: i64 = row.get(4)?;
        let indexed_at_str: String = row.get(6)?;

        Ok(StoredRecord {
            id: uuid::Uuid::parse_str(&id_str).unwrap_or_default(),
            content: row.get(1)?,
            embedding: Self::bytes_to_embedding(&embedding_bytes),
            filename: row.get(3)?,
            page_number: page_number as u32,
            chunk_order: row.get(5)?,
            indexed_at: DateTime::parse_from_rfc3339(&indexed_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}

fn store_write(e: rusqlite::Error) -> LesaError {
    LesaError::StoreWrite(e.to_string())
}

fn store_read(e: rusqlite::Error) -> LesaError {
    LesaError::StoreRead(e.to_string())
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn add(&self, records: &[StoredRecord]) -> Result<usize> {
        // Reject the whole batch before touching the database
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

        let conn = self
            .conn
            .lock()
            .map_err(|e| LesaError::StoreWrite(format!("Failed to acquire lock: {}", e)))?;

        // Single transaction: the batch commits durably or not at all
        let tx = conn.unchecked_transaction().map_err(store_write)?;

        for record in records {
            let embedding_bytes = Self::embedding_to_bytes(&record.embedding);

            tx.execute(
                r#"
                INSERT INTO records
                (id, content, embedding, filename, page_number, chunk_order, indexed_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    record.id.to_string(),
                    record.content,
                    embedding_bytes,
                    record.filename,
                    record.page_number,
                    record.chunk_order,
                    record.indexed_at.to_rfc3339(),
                ],
            )
            .map_err(store_write)?;
        }

        tx.commit().map_err(store_write)?;
        info!("Stored batch of {} records", records.len());
        Ok(records.len())
    }

    #[instrument(skip(self, query_embedding))]
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        self.search_with_threshold(query_embedding, limit, 0.0).await
    }

    #[instrument(skip(self, query_embedding))]
    async fn search_with_threshold(
        &self,
        query_embedding: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| LesaError::StoreRead(format!("Failed to acquire lock: {}", e)))?;

        let mut stmt = conn
            .prepare(
                r#"
                SELECT id, content, embedding, filename, page_number, chunk_order, indexed_at
                FROM records
                "#,
            )
            .map_err(store_read)?;

        let records = stmt
            .query_map([], Self::row_to_record)
            .map_err(store_read)?;

        let mut results: Vec<SearchResult> = records
            .filter_map(|record| record.ok())
            .map(|record| {
                let score = cosine_similarity(query_embedding, &record.embedding);
                SearchResult { record, score }
            })
            .filter(|r| r.score >= min_score)
            .collect();

        // Sort by score descending
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);

        debug!("Found {} matching records", results.len());
        Ok(results)
    }

    #[instrument(skip(self))]
    async fn list_documents(&self) -> Result<Vec<IndexedDocument>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| LesaError::StoreRead(format!("Failed to acquire lock: {}", e)))?;

        let mut stmt = conn
            .prepare(
                r#"
                SELECT filename, COUNT(*) as chunk_count, MAX(indexed_at) as indexed_at
                FROM records
                GROUP BY filename
                ORDER BY indexed_at DESC
                "#,
            )
            .map_err(store_read)?;

        let documents = stmt
            .query_map([], |row| {
                let indexed_at_str: String = row.get(2)?;
                Ok(IndexedDocument {
                    filename: row.get(0)?,
                    chunk_count: row.get(1)?,
                    indexed_at: DateTime::parse_from_rfc3339(&indexed_at_str)
                        .map(|dt| dt.with_timezone(&Utc))
                        .unwrap_or_else(|_| Utc::now()),
                })
            })
            .map_err(store_read)?;

        let result: Vec<IndexedDocument> = documents.filter_map(|d| d.ok()).collect();
        Ok(result)
    }

    async fn record_count(&self) -> Result<usize> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| LesaError::StoreRead(format!("Failed to acquire lock: {}", e)))?;

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))
            .map_err(store_read)?;
        Ok(count as usize)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(content: &str, embedding: Vec<f32>, filename: &str, page: u32) -> StoredRecord {
        StoredRecord::new(content.to_string(), embedding, filename.to_string(), page, 0)
    }

    #[tokio::test]
    async fn test_add_and_search() {
        let store = SqliteVectorStore::in_memory(3).unwrap();

        let records = vec![
            record("refund policy text", vec![1.0, 0.0, 0.0], "policy.pdf", 1),
            record("shipping details", vec![0.0, 1.0, 0.0], "policy.pdf", 2),
        ];
        store.add(&records).await.unwrap();

        let results = store.search(&[1.0, 0.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].record.content, "refund policy text");
        assert!((results[0].score - 1.0).abs() < 0.001);
        assert!(results[0].score > results[1].score);
    }

    #[tokio::test]
    async fn test_empty_store_returns_empty_result() {
        let store = SqliteVectorStore::in_memory(3).unwrap();
        let results = store.search(&[1.0, 0.0, 0.0], 5).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_limit_larger_than_store_returns_all() {
        let store = SqliteVectorStore::in_memory(3).unwrap();
        store
            .add(&[record("only one", vec![1.0, 0.0, 0.0], "a.pdf", 1)])
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0, 0.0], 100).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_wrong_dimensionality_rejects_whole_batch() {
        let store = SqliteVectorStore::in_memory(3).unwrap();

        let records = vec![
            record("good", vec![1.0, 0.0, 0.0], "a.pdf", 1),
            record("bad", vec![1.0, 0.0], "a.pdf", 2),
        ];

        let err = store.add(&records).await.unwrap_err();
        assert!(matches!(err, LesaError::StoreWrite(_)));
        // Atomic batch: nothing was written
        assert_eq!(store.record_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();

        {
            let store = SqliteVectorStore::open(dir.path(), "pdf_chunks", 3).unwrap();
            store
                .add(&[record("persisted", vec![1.0, 0.0, 0.0], "a.pdf", 1)])
                .await
                .unwrap();
        }

        // Reopening an existing store appends, it does not recreate
        let store = SqliteVectorStore::open(dir.path(), "pdf_chunks", 3).unwrap();
        assert_eq!(store.record_count().await.unwrap(), 1);

        store
            .add(&[record("second", vec![0.0, 1.0, 0.0], "b.pdf", 1)])
            .await
            .unwrap();
        assert_eq!(store.record_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_on_reopen_fails() {
        let dir = tempfile::tempdir().unwrap();
        {
            SqliteVectorStore::open(dir.path(), "pdf_chunks", 3).unwrap();
        }

        let err = SqliteVectorStore::open(dir.path(), "pdf_chunks", 4).unwrap_err();
        assert!(matches!(err, LesaError::StoreRead(_)));
    }

    #[tokio::test]
    async fn test_list_documents_groups_by_filename() {
        let store = SqliteVectorStore::in_memory(3).unwrap();

        store
            .add(&[
                record("a1", vec![1.0, 0.0, 0.0], "a.pdf", 1),
                record("a2", vec![0.0, 1.0, 0.0], "a.pdf", 2),
                record("b1", vec![0.0, 0.0, 1.0], "b.pdf", 1),
            ])
            .await
            .unwrap();

        let docs = store.list_documents().await.unwrap();
        assert_eq!(docs.len(), 2);
        let a = docs.iter().find(|d| d.filename == "a.pdf").unwrap();
        assert_eq!(a.chunk_count, 2);
    }
}
