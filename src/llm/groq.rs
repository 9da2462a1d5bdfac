//! OpenAI-compatible chat completions client (Groq by default).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{CompletionOptions, LlmClient};
use crate::error::ProviderError;

/// Delay before the first retry.
const BASE_DELAY: Duration = Duration::from_millis(500);
/// Maximum backoff cap.
const MAX_DELAY: Duration = Duration::from_secs(8);

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct GroqClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GroqClient {
    pub fn new(api_key: String, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            base_url: base_url.into(),
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    async fn complete_once(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, ProviderError> {
        let body = ChatCompletionRequest {
            model: &options.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        let response = self
            .http
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        extract_content(parsed)
    }
}

#[async_trait]
impl LlmClient for GroqClient {
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, ProviderError> {
        let mut attempt = 0;
        loop {
            match self.complete_once(prompt, options).await {
                Ok(content) => return Ok(content),
                Err(e) if e.is_transient() && attempt < options.max_retries => {
                    let delay = backoff_delay(attempt);
                    tracing::warn!(
                        "Model call failed ({}), retrying in {:?} (attempt {}/{})",
                        e,
                        delay,
                        attempt + 1,
                        options.max_retries
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Exponential backoff: base delay doubled per attempt, capped.
fn backoff_delay(attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt);
    BASE_DELAY.saturating_mul(factor).min(MAX_DELAY)
}

fn extract_content(response: ChatCompletionResponse) -> Result<String, ProviderError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(ProviderError::EmptyResponse)
}
