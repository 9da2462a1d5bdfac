//! Per-turn state threaded through the agent loop.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::ToolCall;

/// A tool invocation and its output, scoped to the current turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntermediateStep {
    pub tool_used: String,
    pub tool_output: Value,
}

/// Next state of the loop.
///
/// A pending tool call and a final result are carried by their variants, so
/// they can never both be pending.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Ask the model for a decision.
    Chatbot,
    /// Execute the requested tool.
    Tools(ToolCall),
    /// The turn is complete.
    Terminal { result: String },
}

#[derive(Debug, Clone)]
pub struct AgentState {
    pub input: String,
    pub intermediate_steps: Vec<IntermediateStep>,
    pub next: Node,
}

impl AgentState {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            intermediate_steps: Vec::new(),
            next: Node::Chatbot,
        }
    }

    pub fn result(&self) -> Option<&str> {
        match &self.next {
            Node::Terminal { result } => Some(result),
            _ => None,
        }
    }
}
