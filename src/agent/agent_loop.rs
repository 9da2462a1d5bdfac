//! Core agent loop implementation.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::api::types::{LogEntryType, TurnLogEntry};
use crate::config::{AgentConfig, Config};
use crate::error::ProviderError;
use crate::llm::{GroqClient, LlmClient};
use crate::session::SessionStore;
use crate::tools::{
    SearchProvider, TavilySearch, ToolCall, ToolDispatcher, ToolResult, SEARCH_TOOL,
};

use super::history::{ConversationHistory, Turn};
use super::parser::{parse_decision, Decision, MalformedDecision};
use super::prompt::{build_prompt, build_system_prompt};
use super::state::{AgentState, IntermediateStep, Node};

pub const INVOCATION_ERROR_MESSAGE: &str = "Error: the language model could not be invoked.";
pub const MALFORMED_DECISION_MESSAGE: &str = "Sorry, I could not understand the model's response. The conversation has been reset, please try again.";
pub const LOOP_EXCEEDED_MESSAGE: &str =
    "Sorry, I was unable to complete the request within the allowed number of steps.";

/// Reasons a turn ends without a model-provided answer.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("model invocation failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("model invocation timed out after {0}s")]
    ModelTimeout(u64),

    #[error(transparent)]
    Malformed(#[from] MalformedDecision),

    #[error("no final answer after {0} rounds")]
    LoopExceeded(usize),
}

impl TurnError {
    /// Fixed message returned to the caller in place of an answer.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Provider(_) | Self::ModelTimeout(_) => INVOCATION_ERROR_MESSAGE,
            Self::Malformed(_) => MALFORMED_DECISION_MESSAGE,
            Self::LoopExceeded(_) => LOOP_EXCEEDED_MESSAGE,
        }
    }
}

/// Result of one user turn.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutput {
    /// Final answer, or a fixed message when the turn failed
    pub answer: String,

    /// Number of model rounds used
    pub rounds: usize,

    /// Execution log of the turn
    pub log: Vec<TurnLogEntry>,
}

/// The conversational agent.
pub struct Agent {
    config: AgentConfig,
    llm: Arc<dyn LlmClient>,
    tools: ToolDispatcher,
    system_prompt: String,
}

impl Agent {
    /// Create an agent backed by the configured model and search providers.
    pub fn new(config: &Config) -> Self {
        let llm = Arc::new(GroqClient::new(
            config.llm_api_key.clone(),
            config.llm_base_url.clone(),
        ));
        let search = Arc::new(TavilySearch::new(
            config.search_api_key.clone(),
            config.agent.search_max_results,
        ));

        Self::with_clients(config.agent.clone(), llm, search)
    }

    /// Create an agent with explicit provider implementations.
    pub fn with_clients(
        config: AgentConfig,
        llm: Arc<dyn LlmClient>,
        search: Arc<dyn SearchProvider>,
    ) -> Self {
        let tools = ToolDispatcher::new(search, config.tool_timeout);
        let system_prompt = build_system_prompt(SEARCH_TOOL);

        Self {
            config,
            llm,
            tools,
            system_prompt,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Drive one user turn to completion against `history`.
    ///
    /// Never fails: provider errors, malformed decisions and loop exhaustion
    /// all resolve to a fixed answer.
    pub async fn run_turn(&self, history: &mut ConversationHistory, input: &str) -> TurnOutput {
        tracing::info!("Starting turn: {}", truncate_for_log(input, 200));

        let mut state = AgentState::new(input);
        let mut log = Vec::new();
        let mut rounds = 0;

        while state.result().is_none() {
            let node = std::mem::replace(&mut state.next, Node::Chatbot);
            let next = match node {
                Node::Chatbot if rounds >= self.config.max_loop_iterations => {
                    fail(TurnError::LoopExceeded(rounds), &mut log)
                }
                Node::Chatbot => {
                    rounds += 1;
                    tracing::debug!("Agent round {}", rounds);
                    self.chatbot(&state, history, &mut log).await
                }
                Node::Tools(call) if rounds >= self.config.max_loop_iterations => {
                    tracing::debug!("Skipping {}: no rounds left to use its output", call.tool_name);
                    fail(TurnError::LoopExceeded(rounds), &mut log)
                }
                Node::Tools(call) => {
                    self.run_tool(&mut state, call, &mut log).await;
                    Node::Chatbot
                }
                terminal @ Node::Terminal { .. } => terminal,
            };
            state.next = next;
        }

        let answer = state.result().unwrap_or(LOOP_EXCEEDED_MESSAGE).to_string();
        tracing::info!("Turn finished after {} round(s)", rounds);

        TurnOutput {
            answer,
            rounds,
            log,
        }
    }

    /// Run a turn against the history of `session_id`.
    ///
    /// Turns on the same session are serialized by the session's lock.
    pub async fn run_session_turn(
        &self,
        sessions: &SessionStore,
        session_id: &str,
        input: &str,
    ) -> TurnOutput {
        let history = sessions.get_or_create(session_id).await;
        let mut history = history.lock().await;
        self.run_turn(&mut history, input).await
    }

    /// Ask the model for a decision and pick the next node.
    async fn chatbot(
        &self,
        state: &AgentState,
        history: &mut ConversationHistory,
        log: &mut Vec<TurnLogEntry>,
    ) -> Node {
        let prompt = build_prompt(
            &self.system_prompt,
            &history.render_context(self.config.max_history_turns),
            &state.input,
            &state.intermediate_steps,
        );

        let raw = match self.invoke_model(&prompt).await {
            Ok(raw) => raw,
            Err(e) => return fail(e, log),
        };
        tracing::debug!("Raw model output: {}", truncate_for_log(&raw, 2000));

        match parse_decision(&raw) {
            Ok(Decision::UseTool { tool, input }) => {
                tracing::debug!("Model requested tool: {}", tool);
                log.push(log_entry(
                    LogEntryType::ToolCall,
                    format!("Calling tool: {} with args: {}", tool, input),
                ));
                Node::Tools(ToolCall {
                    tool_name: tool,
                    args: input,
                })
            }
            Ok(Decision::Finish { answer }) => {
                tracing::debug!("Model produced a final answer");
                history.append(Turn::user(state.input.clone()));
                history.append(Turn::assistant(answer.clone()));
                log.push(log_entry(
                    LogEntryType::Response,
                    truncate_for_log(&answer, 2000),
                ));
                Node::Terminal { result: answer }
            }
            Err(e) => {
                history.reset();
                fail(TurnError::Malformed(e), log)
            }
        }
    }

    async fn invoke_model(&self, prompt: &str) -> Result<String, TurnError> {
        let call = self.llm.complete(prompt, &self.config.completion);
        match tokio::time::timeout(self.config.model_timeout, call).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(TurnError::ModelTimeout(self.config.model_timeout.as_secs())),
        }
    }

    /// Execute the pending tool call and record it as an intermediate step.
    async fn run_tool(&self, state: &mut AgentState, call: ToolCall, log: &mut Vec<TurnLogEntry>) {
        let result = self.tools.dispatch(&call).await;
        if let ToolResult::Failure(e) = &result {
            tracing::warn!("Tool {} failed: {}", call.tool_name, e);
        }

        let output = result.into_payload();
        log.push(log_entry(
            LogEntryType::ToolResult,
            truncate_for_log(&output.to_string(), 1000),
        ));

        state.intermediate_steps.push(IntermediateStep {
            tool_used: call.tool_name,
            tool_output: output,
        });
    }
}

/// Terminate the turn with the fixed message for `error`.
fn fail(error: TurnError, log: &mut Vec<TurnLogEntry>) -> Node {
    match &error {
        TurnError::Provider(_) | TurnError::ModelTimeout(_) => {
            tracing::error!("Error invoking the model: {}", error)
        }
        TurnError::Malformed(_) => {
            tracing::warn!("{}; conversation history reset", error)
        }
        TurnError::LoopExceeded(_) => tracing::warn!("{}", error),
    }

    log.push(log_entry(LogEntryType::Error, error.to_string()));
    Node::Terminal {
        result: error.user_message().to_string(),
    }
}

fn log_entry(entry_type: LogEntryType, content: String) -> TurnLogEntry {
    TurnLogEntry {
        timestamp: chrono::Utc::now().to_rfc3339(),
        entry_type,
        content,
    }
}

/// Truncate a string for logging purposes.
fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [truncated]", &s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use crate::llm::CompletionOptions;

    /// Replays canned responses, then repeats `fallback` (if any).
    #[derive(Default)]
    struct ScriptedLlm {
        responses: Mutex<VecDeque<Result<String, ProviderError>>>,
        fallback: Option<String>,
        delay: Option<Duration>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedLlm {
        fn new(responses: Vec<Result<String, ProviderError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                ..Default::default()
            }
        }

        fn replying(texts: &[&str]) -> Self {
            Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(
            &self,
            prompt: &str,
            _options: &CompletionOptions,
        ) -> Result<String, ProviderError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let next = self.responses.lock().unwrap().pop_front();
            match (next, &self.fallback) {
                (Some(response), _) => response,
                (None, Some(fallback)) => Ok(fallback.clone()),
                (None, None) => Err(ProviderError::EmptyResponse),
            }
        }
    }

    #[derive(Default)]
    struct MockSearch {
        queries: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SearchProvider for MockSearch {
        async fn search(&self, query: &str) -> Result<Value, ProviderError> {
            self.queries.lock().unwrap().push(query.to_string());
            Ok(json!("Sunny, 24°C in Valencia. Source: https://weather.example.com/valencia"))
        }
    }

    fn agent(llm: Arc<ScriptedLlm>, search: Arc<MockSearch>) -> Agent {
        Agent::with_clients(AgentConfig::default(), llm, search)
    }

    const SEARCH_WEATHER: &str = r#"{"action":"use_tool","tool":"tavily_search","tool_input":{"query":"weather Valencia today"}}"#;

    #[tokio::test]
    async fn weather_question_searches_then_answers() {
        let llm = Arc::new(ScriptedLlm::replying(&[
            SEARCH_WEATHER,
            r#"<think>the search says sunny</think>{"action":"finish","answer":"It is sunny and 24°C in Valencia today (https://weather.example.com/valencia)."}"#,
        ]));
        let search = Arc::new(MockSearch::default());
        let agent = agent(llm.clone(), search.clone());
        let mut history = ConversationHistory::new();

        let output = agent
            .run_turn(&mut history, "What is the weather in Valencia today?")
            .await;

        assert_eq!(
            output.answer,
            "It is sunny and 24°C in Valencia today (https://weather.example.com/valencia)."
        );
        assert_eq!(output.rounds, 2);
        assert_eq!(*search.queries.lock().unwrap(), vec!["weather Valencia today"]);
        assert_eq!(
            history.turns(),
            &[
                Turn::user("What is the weather in Valencia today?"),
                Turn::assistant(output.answer.clone()),
            ]
        );

        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(!prompts[0].contains("Information gathered with tools"));
        assert!(prompts[1].contains("\"tool_used\": \"tavily_search\""));
        assert!(prompts[1].contains("Sunny, 24°C in Valencia"));
        assert!(prompts[1].contains("User question: What is the weather in Valencia today?"));
    }

    #[tokio::test]
    async fn direct_answer_skips_tools() {
        let llm = Arc::new(ScriptedLlm::replying(&[
            r#"{"action":"finish","answer":"The capital of Spain is Madrid."}"#,
        ]));
        let search = Arc::new(MockSearch::default());
        let mut history = ConversationHistory::new();

        let output = agent(llm, search.clone())
            .run_turn(&mut history, "What is the capital of Spain?")
            .await;

        assert_eq!(output.answer, "The capital of Spain is Madrid.");
        assert_eq!(output.rounds, 1);
        assert!(search.queries.lock().unwrap().is_empty());
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn malformed_decision_resets_history() {
        let llm = Arc::new(ScriptedLlm::replying(&["I would rather chat in prose."]));
        let mut history = ConversationHistory::new();
        history.append(Turn::user("Earlier question"));
        history.append(Turn::assistant("Earlier answer"));

        let output = agent(llm, Arc::new(MockSearch::default()))
            .run_turn(&mut history, "Tell me something")
            .await;

        assert_eq!(output.answer, MALFORMED_DECISION_MESSAGE);
        assert_eq!(history.render_context(10), "");
        assert!(output
            .log
            .iter()
            .any(|entry| matches!(entry.entry_type, LogEntryType::Error)));
    }

    #[tokio::test]
    async fn provider_failure_ends_turn_and_keeps_history() {
        let llm = Arc::new(ScriptedLlm::new(vec![Err(ProviderError::Status {
            status: 401,
            body: "invalid api key".to_string(),
        })]));
        let mut history = ConversationHistory::new();
        history.append(Turn::user("Earlier question"));

        let output = agent(llm, Arc::new(MockSearch::default()))
            .run_turn(&mut history, "Hello?")
            .await;

        assert_eq!(output.answer, INVOCATION_ERROR_MESSAGE);
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn slow_model_times_out() {
        let llm = Arc::new(ScriptedLlm {
            delay: Some(Duration::from_secs(2)),
            fallback: Some(r#"{"action":"finish","answer":"too late"}"#.to_string()),
            ..Default::default()
        });
        let config = AgentConfig {
            model_timeout: Duration::from_millis(20),
            ..AgentConfig::default()
        };
        let agent = Agent::with_clients(config, llm, Arc::new(MockSearch::default()));
        let mut history = ConversationHistory::new();

        let output = agent.run_turn(&mut history, "Hello?").await;

        assert_eq!(output.answer, INVOCATION_ERROR_MESSAGE);
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn endless_tool_use_is_bounded() {
        let llm = Arc::new(ScriptedLlm {
            fallback: Some(SEARCH_WEATHER.to_string()),
            ..Default::default()
        });
        let search = Arc::new(MockSearch::default());
        let config = AgentConfig {
            max_loop_iterations: 3,
            ..AgentConfig::default()
        };
        let agent = Agent::with_clients(config, llm.clone(), search.clone());
        let mut history = ConversationHistory::new();

        let output = agent.run_turn(&mut history, "Weather?").await;

        assert_eq!(output.answer, LOOP_EXCEEDED_MESSAGE);
        assert_eq!(output.rounds, 3);
        assert_eq!(llm.prompts().len(), 3);
        // The final round's search request is not executed.
        assert_eq!(search.queries.lock().unwrap().len(), 2);
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn unknown_tool_is_reported_back_to_the_model() {
        let llm = Arc::new(ScriptedLlm::replying(&[
            r#"{"action":"use_tool","tool":"calculator","tool_input":{"expression":"2+2"}}"#,
            r#"{"action":"finish","answer":"2 + 2 = 4"}"#,
        ]));
        let search = Arc::new(MockSearch::default());
        let mut history = ConversationHistory::new();

        let output = agent(llm.clone(), search.clone())
            .run_turn(&mut history, "What is 2 + 2?")
            .await;

        assert_eq!(output.answer, "2 + 2 = 4");
        assert!(search.queries.lock().unwrap().is_empty());
        let prompts = llm.prompts();
        assert!(prompts[1].contains("tool not recognized: calculator"));
    }

    #[tokio::test]
    async fn earlier_turns_appear_in_later_prompts() {
        let llm = Arc::new(ScriptedLlm::replying(&[
            r#"{"action":"finish","answer":"Nice to meet you, Ana."}"#,
            r#"{"action":"finish","answer":"Your name is Ana."}"#,
        ]));
        let agent = agent(llm.clone(), Arc::new(MockSearch::default()));
        let mut history = ConversationHistory::new();

        agent.run_turn(&mut history, "My name is Ana").await;
        let output = agent.run_turn(&mut history, "What is my name?").await;

        assert_eq!(output.answer, "Your name is Ana.");
        assert!(llm.prompts()[1]
            .contains("User: My name is Ana\nAssistant: Nice to meet you, Ana."));
        assert_eq!(history.len(), 4);
    }

    #[tokio::test]
    async fn session_turns_do_not_share_history() {
        let llm = Arc::new(ScriptedLlm::replying(&[
            r#"{"action":"finish","answer":"Hi Ana"}"#,
            r#"{"action":"finish","answer":"Hi Luis"}"#,
        ]));
        let agent = agent(llm.clone(), Arc::new(MockSearch::default()));
        let sessions = SessionStore::new();

        agent.run_session_turn(&sessions, "ana", "I am Ana").await;
        agent.run_session_turn(&sessions, "luis", "I am Luis").await;

        assert!(!llm.prompts()[1].contains("I am Ana"));
        let ana = sessions.get("ana").await.expect("session exists");
        let luis = sessions.get("luis").await.expect("session exists");
        assert_eq!(ana.lock().await.len(), 2);
        assert_eq!(luis.lock().await.turns()[1], Turn::assistant("Hi Luis"));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_for_log("short", 10), "short");
        assert_eq!(truncate_for_log("ñandú", 1), "... [truncated]");
        assert_eq!(truncate_for_log("abcdef", 3), "abc... [truncated]");
    }
}
