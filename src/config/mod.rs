//! Configuration module for Lesa.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, QuestionPrompts, RagPrompts};
pub use settings::{
    ChunkingSettings, EmbeddingSettings, GeneralSettings, PromptSettings, QuestionSettings,
    RagSettings, Settings, VectorStoreSettings,
};
