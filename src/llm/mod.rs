//! Language model provider boundary.
//!
//! The agent only needs plain text completion: it sends one prompt and
//! receives the model's raw text, which the decision parser interprets.

mod groq;

use async_trait::async_trait;

use crate::error::ProviderError;

pub use groq::GroqClient;

/// Fixed per-call options for the model provider.
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    /// Model identifier understood by the provider
    pub model: String,

    /// Controls decision variability
    pub temperature: f32,

    /// Upper bound on response length
    pub max_tokens: u32,

    /// Additional attempts on transient provider failures
    pub max_retries: u32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            model: crate::config::DEFAULT_MODEL.to_string(),
            temperature: 0.3,
            max_tokens: 1024,
            max_retries: 2,
        }
    }
}

/// Trait for language model clients.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Complete `prompt` and return the model's raw text.
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, ProviderError>;
}
