//! Shared test helpers: canned YtoAI payloads and quick retry policies.

#![allow(dead_code)]

use std::time::Duration;

use serde_json::{json, Value};
use wiremock::MockServer;

use ytoai::api::{YtoAiApi, YtoAiImageApi};
use ytoai::provider::{YtoAiChatModel, YtoAiEmbeddingModel, YtoAiImageModel};
use ytoai::util::retry::RetryPolicy;

pub const CHAT_PATH: &str = "/v4/chat/completions";
pub const EMBEDDINGS_PATH: &str = "/v4/embeddings";
pub const IMAGES_PATH: &str = "/v4/images/generations";

/// Three attempts with a 1ms backoff.
pub fn quick_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(1), 1.0)
}

pub fn chat_model(server: &MockServer) -> YtoAiChatModel {
    YtoAiChatModel::new(YtoAiApi::new(server.uri(), "test-key")).with_retry_policy(quick_retry())
}

pub fn embedding_model(server: &MockServer) -> YtoAiEmbeddingModel {
    YtoAiEmbeddingModel::new(YtoAiApi::new(server.uri(), "test-key"))
        .with_retry_policy(quick_retry())
}

pub fn image_model(server: &MockServer) -> YtoAiImageModel {
    YtoAiImageModel::new(YtoAiImageApi::new(server.uri(), "test-key"))
        .with_retry_policy(quick_retry())
}

/// A non-streaming completion with one text choice.
pub fn text_completion(id: &str, text: &str) -> Value {
    json!({
        "id": id,
        "created": 1_700_000_000,
        "model": "glm-4-air",
        "choices": [{
            "index": 0,
            "finish_reason": "stop",
            "message": {"role": "assistant", "content": text}
        }],
        "usage": {"prompt_tokens": 12, "completion_tokens": 5, "total_tokens": 17}
    })
}

/// A non-streaming completion that asks for one function call.
pub fn tool_call_completion(id: &str, call_id: &str, name: &str, arguments: &str) -> Value {
    json!({
        "id": id,
        "model": "glm-4-air",
        "choices": [{
            "index": 0,
            "finish_reason": "tool_calls",
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [{
                    "id": call_id,
                    "type": "function",
                    "function": {"name": name, "arguments": arguments}
                }]
            }
        }],
        "usage": {"prompt_tokens": 20, "completion_tokens": 8, "total_tokens": 28}
    })
}

/// A streamed text delta frame.
pub fn text_chunk(id: &str, role: Option<&str>, text: &str, finish_reason: Option<&str>) -> Value {
    let mut delta = json!({"content": text});
    if let Some(role) = role {
        delta["role"] = json!(role);
    }
    json!({
        "id": id,
        "model": "glm-4-air",
        "choices": [{"index": 0, "delta": delta, "finish_reason": finish_reason}]
    })
}

/// A streamed tool-call delta frame. `call_id` is only set on the first
/// frame of a call.
pub fn tool_chunk(
    id: &str,
    call_id: Option<&str>,
    name: Option<&str>,
    arguments: &str,
    finish_reason: Option<&str>,
) -> Value {
    let mut function = json!({"arguments": arguments});
    if let Some(name) = name {
        function["name"] = json!(name);
    }
    let mut call = json!({"index": 0, "type": "function", "function": function});
    if let Some(call_id) = call_id {
        call["id"] = json!(call_id);
    }
    json!({
        "id": id,
        "model": "glm-4-air",
        "choices": [{
            "index": 0,
            "delta": {"role": "assistant", "tool_calls": [call]},
            "finish_reason": finish_reason
        }]
    })
}

/// Server-sent-event body for `frames`, terminated by `[DONE]`.
pub fn sse_body(frames: &[Value]) -> String {
    let mut body = String::new();
    for frame in frames {
        body.push_str("data: ");
        body.push_str(&frame.to_string());
        body.push_str("\n\n");
    }
    body.push_str("data: [DONE]\n\n");
    body
}
