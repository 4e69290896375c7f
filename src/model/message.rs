//! Conversation messages, one variant per role.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    System(SystemMessage),
    User(UserMessage),
    Assistant(AssistantMessage),
    Tool(ToolResponseMessage),
}

impl Message {
    /// Create a system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self::System(SystemMessage {
            content: text.into(),
        })
    }

    /// Create a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::User(UserMessage {
            content: text.into(),
            media: Vec::new(),
        })
    }

    /// Create a user message with attached media.
    pub fn user_with_media(text: impl Into<String>, media: Vec<Media>) -> Self {
        Self::User(UserMessage {
            content: text.into(),
            media,
        })
    }

    /// Create a plain assistant message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::Assistant(AssistantMessage::new(text))
    }

    /// Create a tool response message.
    pub fn tool(responses: Vec<ToolResponse>) -> Self {
        Self::Tool(ToolResponseMessage { responses })
    }

    /// Text content of the message. Tool messages join their response data.
    pub fn text(&self) -> String {
        match self {
            Self::System(m) => m.content.clone(),
            Self::User(m) => m.content.clone(),
            Self::Assistant(m) => m.content.clone(),
            Self::Tool(m) => m
                .responses
                .iter()
                .map(|r| r.response_data.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemMessage {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserMessage {
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<Media>,
}

/// A message produced by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AssistantMessage {
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl AssistantMessage {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    /// JSON-encoded arguments, as produced by the model.
    pub arguments: String,
}

/// Results of executed tool calls, sent back to the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResponseMessage {
    pub responses: Vec<ToolResponse>,
}

/// The result of one tool call. `id` links it to the originating call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResponse {
    pub id: String,
    pub name: String,
    pub response_data: String,
}

/// Media attached to a user message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Media {
    pub mime_type: String,
    pub data: MediaData,
}

impl Media {
    pub fn bytes(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: MediaData::Bytes(data),
        }
    }

    pub fn url(mime_type: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: MediaData::Url(url.into()),
        }
    }
}

/// Raw bytes, or a URL / pre-encoded `data:` URL supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum MediaData {
    Bytes(Vec<u8>),
    Url(String),
}
