//! Configuration management for the search agent.
//!
//! Configuration can be set via environment variables (a `.env` file in the
//! working directory is loaded first by the binary):
//! - `GROQ_API_KEY` - Required. API key for the language model provider.
//! - `TAVILY_API_KEY` - Required. API key for the web search provider.
//! - `MODEL` - Optional. Model identifier. Defaults to `qwen-qwq-32b`.
//! - `LLM_BASE_URL` - Optional. OpenAI-compatible base URL. Defaults to Groq.
//! - `TEMPERATURE` - Optional. Sampling temperature. Defaults to `0.3`.
//! - `MAX_TOKENS` - Optional. Maximum response tokens. Defaults to `1024`.
//! - `MAX_RETRIES` - Optional. Provider-level retries. Defaults to `2`.
//! - `MAX_HISTORY_TURNS` - Optional. Turns shown to the model. Defaults to `10`.
//! - `MAX_LOOP_ITERATIONS` - Optional. Model rounds per turn. Defaults to `5`.
//! - `MODEL_TIMEOUT_SECS` - Optional. Model call timeout. Defaults to `60`.
//! - `TOOL_TIMEOUT_SECS` - Optional. Tool call timeout. Defaults to `30`.
//! - `SEARCH_MAX_RESULTS` - Optional. Results requested per search. Defaults to `5`.
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `3000`.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::llm::CompletionOptions;

pub const DEFAULT_MODEL: &str = "qwen-qwq-32b";
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.groq.com/openai/v1";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Configuration of the agent core, passed in at construction time.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Number of most recent history turns rendered into each prompt
    pub max_history_turns: usize,

    /// Maximum number of model rounds per user turn
    pub max_loop_iterations: usize,

    /// Options forwarded to the model provider on every call
    pub completion: CompletionOptions,

    /// Upper bound on a single model call
    pub model_timeout: Duration,

    /// Upper bound on a single tool call
    pub tool_timeout: Duration,

    /// Results requested from the search provider per query
    pub search_max_results: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_history_turns: 10,
            max_loop_iterations: 5,
            completion: CompletionOptions::default(),
            model_timeout: Duration::from_secs(60),
            tool_timeout: Duration::from_secs(30),
            search_max_results: 5,
        }
    }
}

/// Host configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Language model provider API key
    pub llm_api_key: String,

    /// OpenAI-compatible base URL of the model provider
    pub llm_base_url: String,

    /// Search provider API key
    pub search_api_key: String,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Agent core configuration
    pub agent: AgentConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if either API key is not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
        };

        let llm_api_key = required("GROQ_API_KEY")?;
        let search_api_key = required("TAVILY_API_KEY")?;

        let defaults = AgentConfig::default();
        let completion = CompletionOptions {
            model: lookup("MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: parse_or(&lookup, "TEMPERATURE", defaults.completion.temperature)?,
            max_tokens: parse_or(&lookup, "MAX_TOKENS", defaults.completion.max_tokens)?,
            max_retries: parse_or(&lookup, "MAX_RETRIES", defaults.completion.max_retries)?,
        };

        let max_loop_iterations =
            parse_positive(&lookup, "MAX_LOOP_ITERATIONS", defaults.max_loop_iterations as u64)?
                as usize;

        let agent = AgentConfig {
            max_history_turns: parse_or(&lookup, "MAX_HISTORY_TURNS", defaults.max_history_turns)?,
            max_loop_iterations,
            completion,
            model_timeout: Duration::from_secs(parse_positive(
                &lookup,
                "MODEL_TIMEOUT_SECS",
                defaults.model_timeout.as_secs(),
            )?),
            tool_timeout: Duration::from_secs(parse_positive(
                &lookup,
                "TOOL_TIMEOUT_SECS",
                defaults.tool_timeout.as_secs(),
            )?),
            search_max_results: parse_or(
                &lookup,
                "SEARCH_MAX_RESULTS",
                defaults.search_max_results,
            )?,
        };

        Ok(Self {
            llm_api_key,
            llm_base_url: lookup("LLM_BASE_URL")
                .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
            search_api_key,
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_or(&lookup, "PORT", 3000)?,
            agent,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

/// Like [`parse_or`], but zero is rejected.
fn parse_positive<F>(lookup: &F, key: &str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match parse_or(lookup, key, default)? {
        0 => Err(ConfigError::InvalidValue(
            key.to_string(),
            "must be at least 1".to_string(),
        )),
        value => Ok(value),
    }
}
