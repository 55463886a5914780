//! Question generation from ingested content.
//!
//! A secondary consumer of the chunker output: given newly ingested text,
//! produces a small set of insightful questions. Content longer than the
//! generation model's usable budget is head-truncated before the call;
//! truncation is an event, not an error.

use crate::config::Prompts;
use crate::error::{LesaError, Result};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use regex::Regex;
use std::collections::HashMap;
use std::collections::HashSet;
use tracing::{info, instrument, warn};

/// Rough characters-per-token estimate for English prose. Deterministic by
/// construction; good enough to keep requests under the model context.
const CHARS_PER_TOKEN: usize = 4;

/// Response budget passed to the model.
const MAX_RESPONSE_TOKENS: u32 = 500;

/// Generates questions from document content.
pub struct QuestionGenerator {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    max_questions: usize,
    max_content_tokens: usize,
    prompts: Prompts,
}

impl QuestionGenerator {
    /// Create a new question generator.
    pub fn new(model: &str, max_questions: usize, max_content_tokens: usize) -> Self {
        Self {
            client: create_client(),
            model: model.to_string(),
            max_questions,
            max_content_tokens,
            prompts: Prompts::default(),
        }
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Generate up to `max_questions` deduplicated questions from content.
    ///
    /// Fails with a generation error when the model response parses to an
    /// empty list — distinct from a provider-level transport failure.
    #[instrument(skip(self, content), fields(content_len = content.len()))]
    pub async fn generate(&self, content: &str) -> Result<Vec<String>> {
        let content = self.fit_to_budget(content);

        let mut vars = HashMap::new();
        vars.insert("content".to_string(), content.to_string());
        let user_prompt = self
            .prompts
            .render_with_custom(&self.prompts.questions.user, &vars);

        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(self.prompts.questions.system.clone())
                .build()
                .map_err(|e| LesaError::Generation(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_prompt)
                .build()
                .map_err(|e| LesaError::Generation(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .max_tokens(MAX_RESPONSE_TOKENS)
            .temperature(0.7)
            .build()
            .map_err(|e| LesaError::Generation(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| LesaError::OpenAI(format!("Question generation API error: {}", e)))?;

        let raw = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .cloned()
            .unwrap_or_default();

        let mut questions = parse_questions(&raw);
        questions.truncate(self.max_questions);

        if questions.is_empty() {
            return Err(LesaError::Generation(
                "model response contained no parseable questions".to_string(),
            ));
        }

        info!("Generated {} questions", questions.len());
        Ok(questions)
    }

    /// Head-truncate content to the configured token budget.
    fn fit_to_budget<'a>(&self, content: &'a str) -> &'a str {
        if estimate_tokens(content) <= self.max_content_tokens {
            return content;
        }

        let budget_chars = self.max_content_tokens * CHARS_PER_TOKEN;
        let mut end = budget_chars.min(content.len());
        while !content.is_char_boundary(end) {
            end -= 1;
        }

        warn!(
            "Content of ~{} tokens exceeds budget of {}, truncating to leading {} chars",
            estimate_tokens(content),
            self.max_content_tokens,
            end
        );
        &content[..end]
    }
}

/// Rough token count estimate for a text.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(CHARS_PER_TOKEN)
}

/// Parse a model response into discrete questions.
///
/// Two ordered strategies: a numbered-list pattern (`1. text` / `1) text`)
/// first; if no line matches, fall back to splitting on line breaks and
/// stripping leading bullet characters. Duplicates are removed preserving
/// first-seen order.
pub fn parse_questions(raw: &str) -> Vec<String> {
    let numbered = Regex::new(r"^\s*\d+[.)]\s+(.*\S)").expect("Invalid regex");

    let mut questions: Vec<String> = raw
        .lines()
        .filter_map(|line| {
            numbered
                .captures(line)
                .map(|caps| caps[1].trim().to_string())
        })
        .collect();

    if questions.is_empty() {
        // No numbering present; take each non-empty line, minus bullets
        questions = raw
            .lines()
            .map(|line| line.trim().trim_start_matches(['-', '*', '•']).trim())
            .filter(|line| !line.is_empty())
            .map(|line| line.to_string())
            .collect();
    }

    dedup_preserving_order(questions)
}

/// Remove duplicates while preserving first-seen order.
fn dedup_preserving_order(questions: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    questions
        .into_iter()
        .filter(|q| seen.insert(q.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numbered_list() {
        let raw = "1. What is a refund?\n2. How long do returns take?\n3) Who pays shipping?";
        let questions = parse_questions(raw);
        assert_eq!(
            questions,
            vec![
                "What is a refund?",
                "How long do returns take?",
                "Who pays shipping?"
            ]
        );
    }

    #[test]
    fn test_parse_numbered_ignores_surrounding_prose() {
        let raw = "Here are some questions:\n1. First question?\n2. Second question?\nHope that helps!";
        let questions = parse_questions(raw);
        assert_eq!(questions, vec!["First question?", "Second question?"]);
    }

    #[test]
    fn test_parse_falls_back_to_lines_with_bullets() {
        let raw = "- What is chunking?\n* Why overlap chunks?\n• How are vectors stored?";
        let questions = parse_questions(raw);
        assert_eq!(
            questions,
            vec![
                "What is chunking?",
                "Why overlap chunks?",
                "How are vectors stored?"
            ]
        );
    }

    #[test]
    fn test_parse_deduplicates_preserving_order() {
        let raw = "1. Same question?\n2. Other question?\n3. Same question?";
        let questions = parse_questions(raw);
        assert_eq!(questions, vec!["Same question?", "Other question?"]);
    }

    #[test]
    fn test_parse_empty_response() {
        assert!(parse_questions("").is_empty());
        assert!(parse_questions("\n  \n").is_empty());
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn test_fit_to_budget_truncates_head() {
        let generator = QuestionGenerator::new("gpt-4o-mini", 5, 10);
        let content = "a".repeat(100);

        // 100 chars is ~25 tokens, budget is 10 -> keep leading 40 chars
        let fitted = generator.fit_to_budget(&content);
        assert_eq!(fitted.len(), 40);
        assert_eq!(fitted, &content[..40]);
    }

    #[test]
    fn test_fit_to_budget_keeps_short_content() {
        let generator = QuestionGenerator::new("gpt-4o-mini", 5, 10);
        let content = "short text";
        assert_eq!(generator.fit_to_budget(content), content);
    }

    #[test]
    fn test_fit_to_budget_respects_char_boundaries() {
        let generator = QuestionGenerator::new("gpt-4o-mini", 5, 10);
        let content = "ø".repeat(100);
        // Must not panic on a multibyte boundary
        let fitted = generator.fit_to_budget(&content);
        assert!(fitted.len() <= 40);
    }
}
