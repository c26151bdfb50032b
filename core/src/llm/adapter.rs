use serde_json::{json, Value};

use super::model::{ModelReply, Role, ToolInvocation, ToolSpec, Turn};

/// Convert a transcript into OpenAI-style chat messages
pub fn transcript_to_messages(transcript: &[Turn]) -> Vec<Value> {
    transcript
        .iter()
        .map(|turn| match turn.role {
            Role::System => json!({"role": "system", "content": turn.content}),
            Role::User => json!({"role": "user", "content": turn.content}),
            Role::Assistant => match &turn.tool_call {
                Some(call) => json!({
                    "role": "assistant",
                    "content": turn.content,
                    "tool_calls": [{
                        "id": call.id.clone().unwrap_or_default(),
                        "type": "function",
                        "function": {
                            "name": call.name,
                            // Chat Completions carries arguments as an encoded string
                            "arguments": call.arguments.to_string(),
                        }
                    }]
                }),
                None => json!({"role": "assistant", "content": turn.content}),
            },
            Role::ToolResult => json!({
                "role": "tool",
                "tool_call_id": turn.tool_call_id.clone().unwrap_or_default(),
                "content": turn.content,
            }),
        })
        .collect()
}

/// Build the `tools` array for a chat request
pub fn tools_to_chat(tools: &[ToolSpec]) -> Vec<Value> {
    tools
        .iter()
        .map(|t| {
            json!({
                "type": "function",
                "function": {
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters,
                }
            })
        })
        .collect()
}

// Parsing helpers (public for testing)
pub fn parse_tool_calls_from_chat(v: &Value) -> Vec<ToolInvocation> {
    let mut calls = Vec::new();
    let Some(tc_arr) = v
        .get("choices")
        .and_then(|x| x.get(0))
        .and_then(|first| first.get("message"))
        .and_then(|m| m.get("tool_calls"))
        .and_then(|x| x.as_array())
    else {
        return calls;
    };

    for tc in tc_arr {
        let id = tc.get("id").and_then(|x| x.as_str()).map(|s| s.to_string());
        let Some(func) = tc.get("function") else {
            continue;
        };
        let name = func
            .get("name")
            .and_then(|n| n.as_str())
            .unwrap_or("")
            .to_string();
        let arguments = match func.get("arguments") {
            Some(Value::String(s)) => serde_json::from_str::<Value>(s).unwrap_or(json!({})),
            Some(v) => v.clone(),
            None => json!({}),
        };
        if !name.is_empty() {
            calls.push(ToolInvocation {
                id,
                name,
                arguments,
            });
        }
    }
    calls
}

pub fn extract_text_from_chat(v: &Value) -> Option<String> {
    v.get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .map(|s| s.to_string())
}

/// Interpret a chat completion: the first tool call wins, otherwise the text.
pub fn parse_reply(v: &Value) -> Option<ModelReply> {
    if let Some(call) = parse_tool_calls_from_chat(v).into_iter().next() {
        return Some(ModelReply::ToolCall(call));
    }
    extract_text_from_chat(v).map(ModelReply::Message)
}
