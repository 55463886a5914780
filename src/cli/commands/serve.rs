//! HTTP API server for integration with other systems.
//!
//! Provides REST endpoints for document upload, search, and RAG queries.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::LesaError;
use crate::pipeline::Pipeline;
use crate::rag::{RagEngine, Retriever};
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

/// Shared application state.
struct AppState {
    pipeline: Pipeline,
    settings: Settings,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    // A missing API key is a fatal startup error, not a per-request surprise
    preflight::check(Operation::Serve)?;

    let pipeline = Pipeline::new(settings.clone())?;

    let state = Arc::new(AppState { pipeline, settings });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/upload", post(upload))
        .route("/query", post(query))
        .route("/search", post(search))
        .route("/documents", get(list_documents))
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Lesa API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Upload", "POST /upload");
    Output::kv("Query (RAG)", "POST /query");
    Output::kv("Search", "POST /search");
    Output::kv("List Documents", "GET  /documents");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

// === Request/Response Types ===

#[derive(Serialize)]
struct UploadResponse {
    message: String,
    questions: Vec<String>,
    chunks_stored: usize,
}

#[derive(Deserialize)]
struct QueryRequest {
    query: String,
    #[serde(default)]
    model: Option<String>,
    #[serde(default = "default_top_k")]
    top_k: usize,
}

fn default_top_k() -> usize {
    5
}

#[derive(Serialize)]
struct QueryResponse {
    answer: String,
    sources: Vec<SourceInfo>,
}

#[derive(Serialize)]
struct SourceInfo {
    content: String,
    filename: String,
    page_number: u32,
    score: f32,
}

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default)]
    min_score: f32,
}

fn default_limit() -> usize {
    5
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<SourceInfo>,
}

#[derive(Serialize)]
struct DocumentListResponse {
    documents: Vec<DocumentInfo>,
    total: usize,
}

#[derive(Serialize)]
struct DocumentInfo {
    filename: String,
    chunk_count: u32,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Map an error to a distinct client-visible status and message.
///
/// Classified failures keep their message so a client can tell a bad file
/// from a provider outage from storage trouble; anything unclassified
/// becomes a generic internal error without internal detail.
fn error_response(operation: &str, context: &str, err: LesaError) -> axum::response::Response {
    error!("{} failed for '{}': {}", operation, context, err);

    let (status, message) = match &err {
        LesaError::Validation(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        LesaError::Extraction(_) => (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
        LesaError::Embedding(_) | LesaError::OpenAI(_) | LesaError::Generation(_) => {
            (StatusCode::BAD_GATEWAY, err.to_string())
        }
        LesaError::StoreWrite(_) | LesaError::StoreRead(_) | LesaError::Database(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Storage failure".to_string(),
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        ),
    };

    (status, Json(ErrorResponse { error: message })).into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> axum::response::Response {
    // Pull the first "file" field out of the multipart body
    let mut upload: Option<(String, String, Vec<u8>)> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return error_response(
                    "upload",
                    "multipart",
                    LesaError::Validation(format!("invalid multipart body: {}", e)),
                );
            }
        };

        if field.name() == Some("file") {
            let filename = field
                .file_name()
                .unwrap_or("upload.pdf")
                .to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            match field.bytes().await {
                Ok(bytes) => {
                    upload = Some((filename, content_type, bytes.to_vec()));
                    break;
                }
                Err(e) => {
                    return error_response(
                        "upload",
                        "multipart",
                        LesaError::Validation(format!("failed to read upload: {}", e)),
                    );
                }
            }
        }
    }

    let Some((filename, content_type, bytes)) = upload else {
        return error_response(
            "upload",
            "multipart",
            LesaError::Validation("missing 'file' field".to_string()),
        );
    };

    match state.pipeline.ingest(&filename, &content_type, &bytes).await {
        Ok(result) => Json(UploadResponse {
            message: "File processed successfully".to_string(),
            questions: result.questions,
            chunks_stored: result.chunks_stored,
        })
        .into_response(),
        Err(e) => error_response("upload", &filename, e),
    }
}

async fn query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryRequest>,
) -> axum::response::Response {
    let model = req
        .model
        .unwrap_or_else(|| state.settings.rag.model.clone());

    let engine = RagEngine::new(
        state.pipeline.vector_store(),
        state.pipeline.embedder(),
        &model,
        req.top_k,
        state.settings.rag.min_score,
    )
    .with_prompts(state.pipeline.prompts().clone());

    match engine.answer(&req.query).await {
        Ok(response) => Json(QueryResponse {
            answer: response.answer,
            sources: response
                .sources
                .into_iter()
                .map(|s| SourceInfo {
                    content: s.content,
                    filename: s.filename,
                    page_number: s.page_number,
                    score: s.score,
                })
                .collect(),
        })
        .into_response(),
        Err(e) => error_response("query", &req.query, e),
    }
}

async fn search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> axum::response::Response {
    let retriever = Retriever::new(state.pipeline.vector_store(), state.pipeline.embedder())
        .with_top_k(req.limit)
        .with_min_score(req.min_score);

    match retriever.retrieve(&req.query).await {
        Ok(chunks) => Json(SearchResponse {
            results: chunks
                .into_iter()
                .map(|c| SourceInfo {
                    content: c.content,
                    filename: c.filename,
                    page_number: c.page_number,
                    score: c.score,
                })
                .collect(),
        })
        .into_response(),
        Err(e) => error_response("search", &req.query, e),
    }
}

async fn list_documents(State(state): State<Arc<AppState>>) -> axum::response::Response {
    match state.pipeline.vector_store().list_documents().await {
        Ok(documents) => Json(DocumentListResponse {
            total: documents.len(),
            documents: documents
                .into_iter()
                .map(|d| DocumentInfo {
                    filename: d.filename,
                    chunk_count: d.chunk_count,
                })
                .collect(),
        })
        .into_response(),
        Err(e) => error_response("list_documents", "all", e),
    }
}
