//! Wire types for the YtoAI chat, embedding and function-calling endpoints.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Log probability payload, passed through untouched.
pub type LogProbs = serde_json::Value;

/// Role of a chat message on the wire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// Message content: plain text or a list of multimodal parts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<MediaContent>),
}

impl MessageContent {
    /// Text content, joining the text parts of multimodal content.
    pub fn text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    MediaContent::Text { text } => Some(text.as_str()),
                    MediaContent::ImageUrl { .. } => None,
                })
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// One part of multimodal content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MediaContent {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

/// Image reference: an http(s) URL or a base64 `data:` URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageUrl {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// A chat message as sent to and received from the API.
///
/// Every field is optional because streamed deltas carry only the parts
/// that changed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ChatCompletionMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<MessageContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl ChatCompletionMessage {
    /// A text message with the given role.
    pub fn new(content: impl Into<MessageContent>, role: Role) -> Self {
        Self {
            content: Some(content.into()),
            role: Some(role),
            ..Default::default()
        }
    }

    /// Text of the message, if it has content.
    pub fn text(&self) -> Option<String> {
        self.content.as_ref().map(MessageContent::text)
    }
}

/// A tool call issued by the model, possibly partial while streaming.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ToolCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<ChatCompletionFunction>,
}

impl ToolCall {
    /// A complete function tool call.
    pub fn function(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            index: None,
            id: Some(id.into()),
            kind: Some("function".to_string()),
            function: Some(ChatCompletionFunction {
                name: Some(name.into()),
                arguments: Some(arguments.into()),
            }),
        }
    }
}

/// Function name and JSON-encoded arguments of a tool call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ChatCompletionFunction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChatCompletionFinishReason {
    Stop,
    Length,
    ContentFilter,
    ToolCalls,
    Sensitive,
    NetworkError,
    #[serde(other)]
    Unknown,
}

/// Token usage reported on non-chunked responses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// A complete (non-streamed) chat completion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ChatCompletion {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub created: Option<i64>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub system_fingerprint: Option<String>,
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

/// One choice of a complete chat completion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Choice {
    #[serde(default)]
    pub finish_reason: Option<ChatCompletionFinishReason>,
    #[serde(default)]
    pub index: Option<u32>,
    #[serde(default)]
    pub message: ChatCompletionMessage,
    #[serde(default)]
    pub logprobs: Option<LogProbs>,
}

/// One streamed frame of a chat completion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    #[serde(default)]
    pub created: Option<i64>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub system_fingerprint: Option<String>,
    #[serde(default)]
    pub object: Option<String>,
}

/// One choice of a streamed frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ChunkChoice {
    #[serde(default)]
    pub finish_reason: Option<ChatCompletionFinishReason>,
    #[serde(default)]
    pub index: Option<u32>,
    #[serde(default)]
    pub delta: Option<ChatCompletionMessage>,
    #[serde(default)]
    pub logprobs: Option<LogProbs>,
}

/// Request body for `/v4/chat/completions`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ChatCompletionRequest {
    pub messages: Vec<ChatCompletionMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    #[serde(default)]
    pub stream: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<FunctionTool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<String>,
    #[serde(rename = "user_id", default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub do_sample: Option<bool>,
}

impl ChatCompletionRequest {
    /// A request with only messages and the stream flag set.
    pub fn new(messages: Vec<ChatCompletionMessage>, stream: bool) -> Self {
        Self {
            messages,
            stream,
            ..Default::default()
        }
    }
}

/// Tool definition sent with a chat request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionTool {
    #[serde(rename = "type")]
    pub kind: ToolType,
    pub function: FunctionDefinition,
}

impl FunctionTool {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            kind: ToolType::Function,
            function: FunctionDefinition {
                description: description.into(),
                name: name.into(),
                parameters,
            },
        }
    }
}

/// Tool kind. The API only knows functions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ToolType {
    Function,
}

/// Function signature of a tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionDefinition {
    pub description: String,
    pub name: String,
    pub parameters: serde_json::Value,
}

/// Request body for `/v4/embeddings`. The API embeds one input per call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingRequest {
    pub input: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<u32>,
}

/// Response body of `/v4/embeddings`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EmbeddingList {
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub data: Vec<Embedding>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

/// A single embedding vector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Embedding {
    #[serde(default)]
    pub index: u32,
    pub embedding: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_skips_absent_fields_and_renames_user() {
        let mut request =
            ChatCompletionRequest::new(vec![ChatCompletionMessage::new("hi", Role::User)], false);
        request.user = Some("user-123".to_string());

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "messages": [{"content": "hi", "role": "user"}],
                "stream": false,
                "user_id": "user-123",
            })
        );
    }

    #[test]
    fn unknown_finish_reason_is_tolerated() {
        let choice: ChunkChoice =
            serde_json::from_value(json!({"finish_reason": "something_new", "index": 0})).unwrap();
        assert_eq!(choice.finish_reason, Some(ChatCompletionFinishReason::Unknown));
        assert!(choice.delta.is_none());
    }

    #[test]
    fn multimodal_content_round_trips_through_text() {
        let content = MessageContent::Parts(vec![
            MediaContent::Text {
                text: "look".to_string(),
            },
            MediaContent::ImageUrl {
                image_url: ImageUrl {
                    url: "https://example.com/cat.png".to_string(),
                    detail: None,
                },
            },
        ]);
        assert_eq!(content.text(), "look");

        let value = serde_json::to_value(&content).unwrap();
        assert_eq!(value[1]["type"], "image_url");
        assert_eq!(value[1]["image_url"]["url"], "https://example.com/cat.png");
    }
}
