//! Tool dispatch for the agent.
//!
//! The model can request exactly one tool per round. The dispatcher maps the
//! requested name to its execution, validating arguments against the tool's
//! typed schema first. Dispatch never fails: every failure is captured in the
//! returned [`ToolResult`] so the agent loop can show it to the model.

mod web;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::error::ProviderError;

pub use web::TavilySearch;

/// Name the model uses to request a web search.
pub const SEARCH_TOOL: &str = "tavily_search";

/// Trait for web search providers.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run `query` and return provider-specific result data.
    async fn search(&self, query: &str) -> Result<Value, ProviderError>;
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool_name: String,
    pub args: Value,
}

/// Arguments accepted by the search tool.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchArgs {
    pub query: String,
}

#[derive(Debug, Error)]
pub enum ToolDispatchError {
    #[error("tool not recognized: {0}")]
    UnknownTool(String),

    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArgs { tool: String, reason: String },

    #[error("{tool} failed: {source}")]
    Provider {
        tool: String,
        #[source]
        source: ProviderError,
    },

    #[error("{tool} timed out after {secs}s")]
    Timeout { tool: String, secs: u64 },
}

/// Outcome of a dispatch.
#[derive(Debug)]
pub enum ToolResult {
    Success(Value),
    Failure(ToolDispatchError),
}

impl ToolResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// JSON recorded as the step's tool output.
    pub fn into_payload(self) -> Value {
        match self {
            Self::Success(value) => value,
            Self::Failure(e) => json!({ "error": e.to_string() }),
        }
    }
}

/// Routes tool calls to their providers.
#[derive(Clone)]
pub struct ToolDispatcher {
    search: Arc<dyn SearchProvider>,
    timeout: Duration,
}

impl ToolDispatcher {
    pub fn new(search: Arc<dyn SearchProvider>, timeout: Duration) -> Self {
        Self { search, timeout }
    }

    pub async fn dispatch(&self, call: &ToolCall) -> ToolResult {
        match self.try_dispatch(call).await {
            Ok(value) => ToolResult::Success(value),
            Err(e) => ToolResult::Failure(e),
        }
    }

    async fn try_dispatch(&self, call: &ToolCall) -> Result<Value, ToolDispatchError> {
        match call.tool_name.as_str() {
            SEARCH_TOOL => {
                let args = parse_search_args(&call.args)?;
                tracing::debug!("Searching the web for: {}", args.query);
                match tokio::time::timeout(self.timeout, self.search.search(&args.query)).await {
                    Ok(result) => result.map_err(|source| ToolDispatchError::Provider {
                        tool: SEARCH_TOOL.to_string(),
                        source,
                    }),
                    Err(_) => Err(ToolDispatchError::Timeout {
                        tool: SEARCH_TOOL.to_string(),
                        secs: self.timeout.as_secs(),
                    }),
                }
            }
            other => Err(ToolDispatchError::UnknownTool(other.to_string())),
        }
    }
}

fn parse_search_args(args: &Value) -> Result<SearchArgs, ToolDispatchError> {
    let invalid = |reason: String| ToolDispatchError::InvalidArgs {
        tool: SEARCH_TOOL.to_string(),
        reason,
    };

    let args: SearchArgs =
        serde_json::from_value(args.clone()).map_err(|e| invalid(e.to_string()))?;
    if args.query.trim().is_empty() {
        return Err(invalid("query must not be empty".to_string()));
    }
    Ok(args)
}
