//! Prompt templates for Lesa.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub rag: RagPrompts,
    pub questions: QuestionPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: std::collections::HashMap<String, String>,
}

/// Prompts for RAG answer synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagPrompts {
    pub system: String,
    pub user: String,
}

impl Default for RagPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a helpful assistant that answers questions based on document content from the user's library.

Guidelines:
- Answer questions using only the provided context from the documents
- Always cite your sources with document names and page numbers
- Use the format [filename, p. N] for citations
- If the context doesn't contain relevant information, say so clearly
- Be concise but thorough in your responses
- When multiple sources are relevant, synthesize information across them"#
                .to_string(),

            user: r#"Question: {{question}}

Relevant excerpts from your document library:

{{context}}

Please answer the question based on the above context."#
                .to_string(),
        }
    }
}

/// Prompts for question generation from ingested content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionPrompts {
    pub system: String,
    pub user: String,
}

impl Default for QuestionPrompts {
    fn default() -> Self {
        Self {
            system: "You are an assistant that generates insightful questions based on provided content."
                .to_string(),
            user: r#"Read the following text and create five insightful questions based on the content. Number each question.

{{content}}"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&std::collections::HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            // Load RAG prompts if file exists
            let rag_path = custom_path.join("rag.toml");
            if rag_path.exists() {
                let content = std::fs::read_to_string(&rag_path)?;
                prompts.rag = toml::from_str(&content)?;
            }

            // Load question generation prompts if file exists
            let questions_path = custom_path.join("questions.toml");
            if questions_path.exists() {
                let content = std::fs::read_to_string(&questions_path)?;
                prompts.questions = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(
        &self,
        template: &str,
        vars: &std::collections::HashMap<String, String>,
    ) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(!prompts.rag.system.is_empty());
        assert!(!prompts.questions.system.is_empty());
    }

    #[test]
    fn test_render_template() {
        let template = "Hello {{name}}, you have {{count}} messages.";
        let mut vars = std::collections::HashMap::new();
        vars.insert("name".to_string(), "Alice".to_string());
        vars.insert("count".to_string(), "5".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Hello Alice, you have 5 messages.");
    }
}
