//! Error types for Lesa.

use thiserror::Error;

/// Library-level error type for Lesa operations.
#[derive(Error, Debug)]
pub enum LesaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("PDF extraction failed: {0}")]
    Extraction(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector store write failed: {0}")]
    StoreWrite(String),

    #[error("Vector store read failed: {0}")]
    StoreRead(String),

    #[error("Question generation failed: {0}")]
    Generation(String),

    #[error("RAG error: {0}")]
    Rag(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),
}

/// Result type alias for Lesa operations.
pub type Result<T> = std::result::Result<T, LesaError>;
