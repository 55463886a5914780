//! Lesa - PDF Indexing and RAG
//!
//! A local-first CLI tool for indexing PDF documents and asking questions
//! about their content.
//!
//! The name "Lesa" comes from the Old Norse word for "read."
//!
//! # Overview
//!
//! Lesa allows you to:
//! - Ingest PDF documents into a searchable vector database
//! - Ask questions and get AI-powered answers with page-level citations
//! - Search through your document library semantically
//! - Generate study questions from newly ingested content
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `extract` - PDF text extraction
//! - `chunking` - Deterministic text chunking
//! - `embedding` - Embedding generation
//! - `vector_store` - Vector database abstraction
//! - `rag` - Retrieval and answer synthesis
//! - `questions` - Question generation from ingested content
//! - `pipeline` - Ingest pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use lesa::config::Settings;
//! use lesa::pipeline::Pipeline;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let pipeline = Pipeline::new(settings)?;
//!
//!     let bytes = std::fs::read("handbook.pdf")?;
//!     let result = pipeline
//!         .ingest("handbook.pdf", "application/pdf", &bytes)
//!         .await?;
//!     println!("Stored {} chunks", result.chunks_stored);
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod openai;
pub mod pipeline;
pub mod questions;
pub mod rag;
pub mod vector_store;

pub use error::{LesaError, Result};
