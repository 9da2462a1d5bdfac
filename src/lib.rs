//! # Search Agent
//!
//! A conversational agent that answers directly or consults web search.
//!
//! This library provides:
//! - An agent loop that lets the model choose, in a strict JSON protocol,
//!   between a final answer and one web search per round
//! - A tolerant parser for the model's decisions
//! - Bounded per-session conversation memory
//! - HTTP and command-line hosts
//!
//! ## Architecture
//!
//! Each user turn runs as a state machine:
//! 1. Build the prompt from instructions, recent history and the question
//! 2. Call the LLM and parse its decision
//! 3. If it asks for a search, run it and feed the output back
//! 4. Repeat until it answers, fails, or the round budget is spent
//!
//! ## Example
//!
//! ```rust,ignore
//! use search_agent::{agent::{Agent, ConversationHistory}, config::Config};
//!
//! let config = Config::from_env()?;
//! let agent = Agent::new(&config);
//! let mut history = ConversationHistory::new();
//! let output = agent.run_turn(&mut history, "What is the weather in Valencia today?").await;
//! println!("{}", output.answer);
//! ```

pub mod agent;
pub mod api;
pub mod config;
pub mod error;
pub mod llm;
pub mod repl;
pub mod session;
pub mod tools;

pub use config::Config;
