//! API request and response types.

use serde::{Deserialize, Serialize};

/// Request to run one conversational turn.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    /// The user message
    pub message: String,

    /// Session to continue (a new session is created if not specified)
    pub session_id: Option<String>,
}

/// Response after a turn completes.
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    /// Session the turn ran in
    pub session_id: String,

    /// Final answer or fixed failure message
    pub answer: String,

    /// Number of model rounds used
    pub rounds: usize,

    /// Detailed execution log
    pub log: Vec<TurnLogEntry>,
}

/// A single entry in the turn execution log.
#[derive(Debug, Clone, Serialize)]
pub struct TurnLogEntry {
    /// Timestamp (RFC 3339)
    pub timestamp: String,

    /// Entry type
    pub entry_type: LogEntryType,

    /// Content of the entry
    pub content: String,
}

/// Types of log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogEntryType {
    /// Model asked for a tool
    ToolCall,
    /// Tool returned a result
    ToolResult,
    /// Model produced the final answer
    Response,
    /// The turn failed
    Error,
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}
