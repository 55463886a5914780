//! CLI module for Lesa.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Lesa - PDF Indexing and RAG
///
/// A local-first CLI tool for indexing PDF documents and asking questions
/// about their content. The name "Lesa" comes from the Old Norse word for
/// "read."
#[derive(Parser, Debug)]
#[command(name = "lesa")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Override the data directory
    #[arg(long, global = true, env = "LESA_DATA_DIR")]
    pub data_dir: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize Lesa and verify system requirements
    Init,

    /// Ingest a PDF document into the knowledge base
    Ingest {
        /// Path to the PDF file
        file: String,
    },

    /// Ask a question and get an answer from your document library
    Ask {
        /// The question to ask
        question: String,

        /// LLM model to use for response generation
        #[arg(short, long)]
        model: Option<String>,

        /// Number of context chunks to retrieve
        #[arg(short = 'k', long, default_value = "5")]
        top_k: usize,
    },

    /// Search for relevant document chunks
    Search {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value = "5")]
        limit: usize,

        /// Minimum similarity score (0.0-1.0)
        #[arg(short, long, default_value = "0.0")]
        min_score: f32,
    },

    /// List indexed documents
    List,

    /// Start HTTP API server for integration with other systems
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "rag.model")
        key: String,
        /// Configuration value
        value: String,
    },

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
