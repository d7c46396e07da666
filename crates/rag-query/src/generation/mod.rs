//! Answer generation: Ollama client, prompt templates and context assembly

pub mod context;
pub mod ollama;
pub mod prompt;

pub use context::{build_blocks, render_context, truncate_snippet, ContextBlock};
pub use ollama::OllamaClient;
pub use prompt::PromptTemplates;
