//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::Pipeline;
use crate::rag::RagEngine;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    model: Option<String>,
    top_k: usize,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let pipeline = Pipeline::new(settings.clone())?;

    let model = model.unwrap_or_else(|| settings.rag.model.clone());

    let engine = RagEngine::new(
        pipeline.vector_store(),
        pipeline.embedder(),
        &model,
        top_k,
        settings.rag.min_score,
    )
    .with_prompts(pipeline.prompts().clone());

    let spinner = Output::spinner("Searching knowledge base...");

    match engine.answer(question).await {
        Ok(response) => {
            spinner.finish_and_clear();

            println!("\n{}\n", response.answer);

            if !response.sources.is_empty() {
                Output::header("Sources");
                for source in &response.sources {
                    Output::search_result(
                        &source.filename,
                        source.page_number,
                        source.score,
                        &source.content,
                    );
                }
            }
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
