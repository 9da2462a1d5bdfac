//! Agent module - the conversational agent core.
//!
//! One user turn runs as a small state machine:
//! 1. `Chatbot`: build the prompt (instructions, recent history, question,
//!    tool evidence so far) and ask the model for a decision
//! 2. `Tools`: if the model asked for a tool, run it and record the output
//! 3. Back to `Chatbot` with the extra evidence, until the model answers,
//!    fails, or the round budget is spent

mod agent_loop;
mod history;
mod parser;
mod prompt;
mod state;

pub use agent_loop::{
    Agent, TurnError, TurnOutput, INVOCATION_ERROR_MESSAGE, LOOP_EXCEEDED_MESSAGE,
    MALFORMED_DECISION_MESSAGE,
};
pub use history::{ConversationHistory, Role, Turn};
pub use parser::{extract_json_block, parse_decision, Decision, MalformedDecision};
pub use prompt::{build_prompt, build_system_prompt};
pub use state::{AgentState, IntermediateStep, Node};
