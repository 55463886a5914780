//! RAG answer synthesis.

use super::{retriever::format_context_for_prompt, ContextChunk, Retriever};
use crate::config::Prompts;
use crate::embedding::Embedder;
use crate::error::{LesaError, Result};
use crate::openai::create_client;
use crate::vector_store::VectorStore;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Answer shown when retrieval produced no usable context.
const NO_CONTEXT_ANSWER: &str =
    "I couldn't find any relevant information in your document library for this question.";

/// RAG engine for question answering.
pub struct RagEngine {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    retriever: Retriever,
    prompts: Prompts,
}

impl RagEngine {
    /// Create a new RAG engine.
    pub fn new(
        vector_store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        model: &str,
        top_k: usize,
        min_score: f32,
    ) -> Self {
        let retriever = Retriever::new(vector_store, embedder)
            .with_top_k(top_k)
            .with_min_score(min_score);

        Self {
            client: create_client(),
            model: model.to_string(),
            retriever,
            prompts: Prompts::default(),
        }
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Answer a question from the indexed documents.
    #[instrument(skip(self), fields(question = %question))]
    pub async fn answer(&self, question: &str) -> Result<RagAnswer> {
        info!("Processing question: {}", question);

        let context_chunks = self.retriever.retrieve(question).await?;

        // Without context there is nothing to cite; answer honestly instead
        // of calling the model with an empty prompt.
        if context_chunks.is_empty() {
            return Ok(RagAnswer {
                answer: NO_CONTEXT_ANSWER.to_string(),
                sources: Vec::new(),
            });
        }

        let answer = self
            .synthesize(question, &context_chunks)
            .await?;

        debug!("Generated answer with {} sources", context_chunks.len());

        Ok(RagAnswer {
            answer,
            sources: context_chunks,
        })
    }

    /// Build the bounded prompt and call the model.
    async fn synthesize(&self, question: &str, chunks: &[ContextChunk]) -> Result<String> {
        let context_text = format_context_for_prompt(chunks);

        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        vars.insert("context".to_string(), context_text);

        let user_prompt = self.prompts.render_with_custom(&self.prompts.rag.user, &vars);

        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(self.prompts.rag.system.clone())
                .build()
                .map_err(|e| LesaError::Rag(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_prompt)
                .build()
                .map_err(|e| LesaError::Rag(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(0.7)
            .build()
            .map_err(|e| LesaError::Rag(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| LesaError::OpenAI(format!("Failed to generate response: {}", e)))?;

        response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .cloned()
            .ok_or_else(|| LesaError::Rag("Empty response from LLM".to_string()))
    }
}

/// A RAG answer with its sources.
#[derive(Debug, Clone)]
pub struct RagAnswer {
    /// The generated answer.
    pub answer: String,
    /// Source chunks used for the answer, in descending-similarity order.
    pub sources: Vec<ContextChunk>,
}

impl RagAnswer {
    /// Format the answer for display.
    pub fn format_for_display(&self) -> String {
        let mut output = self.answer.clone();

        if !self.sources.is_empty() {
            output.push_str("\n\n--- Sources ---\n");
            for source in &self.sources {
                output.push_str(&format!(
                    "\n{} (page {}, score: {:.2})",
                    source.filename, source.page_number, source.score
                ));
            }
        }

        output
    }
}
