//! Request mapping from turnwise types to the Anthropic Messages API format.
//!
//! Reference: <https://docs.anthropic.com/en/api/messages>

use turnwise_types::{ContentBlock, Message, ProviderRequest, Role, ToolSchema};

/// Convert a [`ProviderRequest`] into the Anthropic Messages API JSON body.
///
/// The returned value does **not** include `"stream"`; the client adds it.
#[must_use]
pub fn to_api_request(req: &ProviderRequest, default_model: &str) -> serde_json::Value {
    let model = if req.model.is_empty() {
        default_model
    } else {
        req.model.as_str()
    };

    let mut body = serde_json::json!({
        "model": model,
        "messages": map_messages(&req.messages),
        "max_tokens": req.max_tokens,
    });

    // The system prompt is identical on every round-trip of a turn, so it is
    // marked as a prompt-cache breakpoint.
    if let Some(system) = req.system.as_deref().filter(|s| !s.is_empty()) {
        body["system"] = serde_json::json!([{
            "type": "text",
            "text": system,
            "cache_control": { "type": "ephemeral" },
        }]);
    }

    match req.reasoning_budget_tokens {
        Some(budget) => {
            // The API rejects a custom temperature while thinking is enabled.
            body["thinking"] = serde_json::json!({
                "type": "enabled",
                "budget_tokens": budget,
            });
        }
        None => {
            if let Some(temp) = req.temperature {
                body["temperature"] = serde_json::Value::from(temp);
            }
        }
    }

    if !req.tools.is_empty() {
        body["tools"] = serde_json::Value::Array(req.tools.iter().map(map_tool).collect());
    }

    body
}

fn map_messages(messages: &[Message]) -> serde_json::Value {
    let arr: Vec<serde_json::Value> = messages
        .iter()
        .map(|msg| {
            let role = match msg.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            let content: Vec<serde_json::Value> =
                msg.content.iter().filter_map(map_content_block).collect();
            serde_json::json!({ "role": role, "content": content })
        })
        .collect();
    serde_json::Value::Array(arr)
}

/// Map one block. Returns `None` for blocks the API would reject on
/// resubmission: empty text, and reasoning that never received a signature.
pub(crate) fn map_content_block(block: &ContentBlock) -> Option<serde_json::Value> {
    let value = match block {
        ContentBlock::Text { text } => {
            if text.is_empty() {
                return None;
            }
            serde_json::json!({ "type": "text", "text": text })
        }
        ContentBlock::Reasoning { text, signature } => serde_json::json!({
            "type": "thinking",
            "thinking": text,
            "signature": signature.as_ref()?,
        }),
        ContentBlock::RedactedReasoning { data } => serde_json::json!({
            "type": "redacted_thinking",
            "data": data,
        }),
        ContentBlock::ToolInvocation { id, name, input } => serde_json::json!({
            "type": "tool_use",
            "id": id,
            "name": name,
            "input": input,
        }),
        ContentBlock::RemoteToolInvocation { id, name, input } => serde_json::json!({
            "type": "server_tool_use",
            "id": id,
            "name": name,
            "input": input,
        }),
        ContentBlock::ToolResult {
            tool_use_id,
            content,
            is_error,
        } => serde_json::json!({
            "type": "tool_result",
            "tool_use_id": tool_use_id,
            "content": content.to_string(),
            "is_error": is_error,
        }),
        ContentBlock::RemoteToolResult {
            tool_use_id,
            content,
        } => serde_json::json!({
            "type": "web_search_tool_result",
            "tool_use_id": tool_use_id,
            "content": content,
        }),
    };
    Some(value)
}

fn map_tool(tool: &ToolSchema) -> serde_json::Value {
    match tool {
        ToolSchema::Local {
            name,
            description,
            input_schema,
        } => serde_json::json!({
            "name": name,
            "description": description,
            "input_schema": input_schema,
        }),
        ToolSchema::Remote { spec, .. } => spec.clone(),
    }
}
