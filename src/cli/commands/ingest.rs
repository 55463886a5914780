//! Ingest command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::Pipeline;
use anyhow::Result;
use std::path::Path;

/// Run the ingest command.
pub async fn run_ingest(file: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ingest) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let path = Path::new(file);
    if !path.exists() {
        Output::error(&format!("File not found: {}", file));
        anyhow::bail!("File not found: {}", file);
    }

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| file.to_string());

    let bytes = std::fs::read(path)?;

    let pipeline = Pipeline::new(settings)?;

    let spinner = Output::spinner(&format!("Ingesting {}...", filename));
    let result = pipeline
        .ingest(&filename, "application/pdf", &bytes)
        .await;
    spinner.finish_and_clear();

    match result {
        Ok(result) => {
            Output::success(&format!(
                "Ingested '{}' ({} chunks stored)",
                result.filename, result.chunks_stored
            ));

            if !result.questions.is_empty() {
                Output::header("Generated questions");
                for question in &result.questions {
                    Output::list_item(question);
                }
            }
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Ingest failed: {}", e));
            Err(e.into())
        }
    }
}
