//! List command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::Pipeline;
use anyhow::Result;

/// Run the list command.
pub async fn run_list(settings: Settings) -> Result<()> {
    let pipeline = Pipeline::new(settings)?;

    match pipeline.vector_store().list_documents().await {
        Ok(documents) => {
            if documents.is_empty() {
                Output::info("No documents indexed yet. Use 'lesa ingest <file.pdf>' to add content.");
            } else {
                Output::header(&format!("Indexed Documents ({})", documents.len()));
                println!();

                for doc in &documents {
                    Output::document_info(&doc.filename, doc.chunk_count);
                }

                let total_chunks: u32 = documents.iter().map(|d| d.chunk_count).sum();
                println!();
                Output::kv("Total documents", &documents.len().to_string());
                Output::kv("Total chunks", &total_chunks.to_string());
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to list documents: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
