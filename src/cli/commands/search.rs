//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::Pipeline;
use crate::rag::Retriever;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(
    query: &str,
    limit: usize,
    min_score: f32,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Search) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let pipeline = Pipeline::new(settings)?;

    let retriever = Retriever::new(pipeline.vector_store(), pipeline.embedder())
        .with_top_k(limit)
        .with_min_score(min_score);

    let spinner = Output::spinner("Searching...");
    let results = retriever.retrieve(query).await;
    spinner.finish_and_clear();

    match results {
        Ok(chunks) => {
            if chunks.is_empty() {
                Output::warning("No results found matching your query.");
            } else {
                Output::success(&format!("Found {} results", chunks.len()));

                for chunk in &chunks {
                    Output::search_result(
                        &chunk.filename,
                        chunk.page_number,
                        chunk.score,
                        &chunk.content,
                    );
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(anyhow::anyhow!("{}", e));
        }
    }

    Ok(())
}
