//! Errors raised by the external providers (language model and web search).

use thiserror::Error;

/// Failure at the transport or quota level of a provider.
///
/// The agent loop never retries these itself; retrying transient failures is
/// the provider client's job (see [`crate::llm::GroqClient`]).
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("provider returned an empty response")]
    EmptyResponse,

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Whether a retry at the provider boundary could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::EmptyResponse | Self::InvalidResponse(_) => false,
        }
    }
}
