//! Pre-flight checks before expensive operations.
//!
//! Validates that required configuration is available before starting
//! operations that would otherwise fail midway.

use crate::error::Result;
use crate::openai::ensure_api_key;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Ingestion requires the embedding/generation API key.
    Ingest,
    /// Asking questions requires the API key.
    Ask,
    /// Search requires the API key (query embedding).
    Search,
    /// Serving requires the API key up front; a missing key is a fatal
    /// startup error rather than a per-request surprise.
    Serve,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation) -> Result<()> {
    match operation {
        Operation::Ingest | Operation::Ask | Operation::Search | Operation::Serve => {
            ensure_api_key()?;
        }
    }
    Ok(())
}
