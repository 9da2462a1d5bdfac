//! Prompt templates for the agent.

use super::state::IntermediateStep;

/// Build the fixed system instructions describing the decision protocol.
pub fn build_system_prompt(search_tool: &str) -> String {
    format!(
        r#"You are a careful, well-organized assistant. Your goal is to help the user accurately and safely.

## Response Format

1. **Always reply with valid JSON** - Your whole reply must be a single JSON object.

2. **Nothing outside the JSON** - No explanations, no comments, no tags such as <think>.

3. **Answer directly when you are sure** - If you know the answer with certainty, reply:

{{"action":"finish","answer":"...answer..."}}

4. **Search when in doubt** - If you are not completely sure, or the question needs up-to-date information, use the {search_tool} tool by replying:

{{"action":"use_tool","tool":"{search_tool}","tool_input":{{"query":"...text to search..."}}}}

5. **Cite your source** - If you used {search_tool}, include the URL of the main source you relied on in your final answer.

## Examples

Direct answer:

{{"action":"finish","answer":"The capital of Spain is Madrid."}}

Search request:

{{"action":"use_tool","tool":"{search_tool}","tool_input":{{"query":"latest Real Madrid result"}}}}"#
    )
}

/// Assemble the prompt for one model round.
pub fn build_prompt(
    system_prompt: &str,
    history_context: &str,
    input: &str,
    steps: &[IntermediateStep],
) -> String {
    let mut prompt = system_prompt.to_string();

    if !history_context.is_empty() {
        prompt.push_str("\n\nConversation so far:\n");
        prompt.push_str(history_context);
    }

    prompt.push_str("\n\nUser question: ");
    prompt.push_str(input);

    if !steps.is_empty() {
        let dump = serde_json::to_string_pretty(steps).unwrap_or_else(|_| "[]".to_string());
        prompt.push_str("\n\nInformation gathered with tools:\n");
        prompt.push_str(&dump);
    }

    prompt
}
