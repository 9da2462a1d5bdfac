//! Extraction of the model's structured decision from raw output text.
//!
//! Model output is noisy: the JSON payload may be wrapped in prose, markdown
//! fences or `<think>` reasoning sections. The parser tolerates the noise
//! around the payload but never repairs the payload itself.

use serde_json::{Map, Value};
use thiserror::Error;

const ACTION_FINISH: &str = "finish";
const ACTION_USE_TOOL: &str = "use_tool";

/// The model's choice for one round.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Finish { answer: String },
    UseTool { tool: String, input: Value },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed decision: {reason}")]
pub struct MalformedDecision {
    pub reason: String,
}

impl MalformedDecision {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Parse raw model output into a [`Decision`].
///
/// The raw text is scanned first. Only when that yields no valid decision is
/// the text retried with closed `<think>...</think>` sections removed.
pub fn parse_decision(raw: &str) -> Result<Decision, MalformedDecision> {
    if let Ok(value) = serde_json::from_str::<Value>(raw.trim()) {
        return interpret(value);
    }

    let first = decide_from_block(raw);
    if first.is_ok() {
        return first;
    }

    let cleaned = strip_think_sections(raw);
    if cleaned != raw {
        if let Ok(decision) = decide_from_block(&cleaned) {
            return Ok(decision);
        }
    }
    first
}

fn decide_from_block(text: &str) -> Result<Decision, MalformedDecision> {
    let block = extract_json_block(text)
        .ok_or_else(|| MalformedDecision::new("no structured block present"))?;
    let value = serde_json::from_str::<Value>(block)
        .map_err(|_| MalformedDecision::new("invalid content inside detected block"))?;
    interpret(value)
}

/// Return the first balanced `{...}` block in `text`.
///
/// Braces inside JSON string literals (including escaped quotes) do not
/// affect the depth count. An opening brace that never closes is skipped and
/// the scan resumes at the next one.
pub fn extract_json_block(text: &str) -> Option<&str> {
    let mut from = 0;
    while let Some(found) = text[from..].find('{') {
        let start = from + found;
        if let Some(len) = balanced_len(&text[start..]) {
            return Some(&text[start..start + len]);
        }
        from = start + 1;
    }
    None
}

/// Byte length of the balanced block opening at the start of `candidate`.
fn balanced_len(candidate: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in candidate.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(offset + 1);
                }
            }
            _ => {}
        }
    }

    None
}

/// Drop closed `<think>...</think>` sections. An unclosed tag is kept as text.
fn strip_think_sections(text: &str) -> String {
    const OPEN: &str = "<think>";
    const CLOSE: &str = "</think>";

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find(OPEN) {
        let Some(close) = rest[open..].find(CLOSE) else {
            break;
        };
        out.push_str(&rest[..open]);
        rest = &rest[open + close + CLOSE.len()..];
    }
    out.push_str(rest);
    out
}

fn interpret(value: Value) -> Result<Decision, MalformedDecision> {
    let Value::Object(map) = value else {
        return Err(MalformedDecision::new("unrecognized or missing action"));
    };

    match map.get("action").and_then(Value::as_str) {
        Some(ACTION_FINISH) => {
            let answer = string_field(&map, "answer")
                .ok_or_else(|| MalformedDecision::new("finish decision missing answer"))?;
            Ok(Decision::Finish { answer })
        }
        Some(ACTION_USE_TOOL) => {
            let tool = string_field(&map, "tool")
                .ok_or_else(|| MalformedDecision::new("use_tool decision missing tool"))?;
            let input = match map.get("tool_input") {
                None | Some(Value::Null) => Value::Object(Map::new()),
                Some(Value::Object(obj)) => Value::Object(obj.clone()),
                Some(_) => {
                    return Err(MalformedDecision::new(
                        "use_tool decision has non-object tool_input",
                    ))
                }
            };
            Ok(Decision::UseTool { tool, input })
        }
        _ => Err(MalformedDecision::new("unrecognized or missing action")),
    }
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}
