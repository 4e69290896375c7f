//! Chat prompts, portable options and responses.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::message::{AssistantMessage, Message};
use super::tool::FunctionCallback;

/// Messages plus optional request-scoped options.
#[derive(Debug, Clone, Default)]
pub struct Prompt {
    pub messages: Vec<Message>,
    pub options: Option<ChatOptions>,
}

impl Prompt {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            options: None,
        }
    }

    /// A single user message.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new(vec![Message::user(text)])
    }

    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Text of the last message, or `""` when there are none.
    pub fn contents(&self) -> String {
        self.messages.last().map(Message::text).unwrap_or_default()
    }
}

/// Provider-neutral chat options.
#[derive(Clone, Default, Builder)]
pub struct ChatOptions {
    #[builder(into)]
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub stop_sequences: Option<Vec<String>>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    /// Names of registered functions to enable for this request.
    #[builder(default)]
    pub functions: BTreeSet<String>,
    /// Callbacks supplied with the request; registered and enabled on use.
    #[builder(default)]
    pub function_callbacks: Vec<Arc<dyn FunctionCallback>>,
    /// Return tool calls to the caller instead of executing them.
    pub proxy_tool_calls: Option<bool>,
}

impl std::fmt::Debug for ChatOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatOptions")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("stop_sequences", &self.stop_sequences)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("functions", &self.functions)
            .field(
                "function_callbacks",
                &self.function_callbacks.iter().map(|c| c.name()).collect::<Vec<_>>(),
            )
            .field("proxy_tool_calls", &self.proxy_tool_calls)
            .finish()
    }
}

/// Token usage of one call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub generation_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub fn new(prompt_tokens: u32, generation_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            generation_tokens,
            total_tokens: prompt_tokens + generation_tokens,
        }
    }

    /// Accumulate another usage into this one.
    pub fn merge(&mut self, other: &Usage) {
        self.prompt_tokens += other.prompt_tokens;
        self.generation_tokens += other.generation_tokens;
        self.total_tokens += other.total_tokens;
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Per-generation metadata.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ChatGenerationMetadata {
    pub finish_reason: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ChatGenerationMetadata {
    pub fn from_finish_reason(reason: impl Into<String>) -> Self {
        Self {
            finish_reason: Some(reason.into()),
            extra: BTreeMap::new(),
        }
    }
}

/// One candidate output.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Generation {
    pub output: AssistantMessage,
    pub metadata: ChatGenerationMetadata,
}

impl Generation {
    pub fn new(output: AssistantMessage) -> Self {
        Self {
            output,
            metadata: ChatGenerationMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: ChatGenerationMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Response-level metadata.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ChatResponseMetadata {
    pub id: String,
    pub model: String,
    pub usage: Usage,
    /// When the completion was created, from the epoch seconds on the wire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_fingerprint: Option<String>,
}

impl ChatResponseMetadata {
    pub fn is_empty(&self) -> bool {
        self.id.is_empty() && self.model.is_empty() && self.usage.is_empty()
    }
}

/// Result of a chat call, or one partial response of a stream.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ChatResponse {
    pub generations: Vec<Generation>,
    pub metadata: ChatResponseMetadata,
}

impl ChatResponse {
    pub fn new(generations: Vec<Generation>) -> Self {
        Self {
            generations,
            metadata: ChatResponseMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: ChatResponseMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// First generation, if any.
    pub fn result(&self) -> Option<&Generation> {
        self.generations.first()
    }

    /// Text of the first generation, or `""`.
    pub fn text(&self) -> String {
        self.result()
            .map(|g| g.output.content.clone())
            .unwrap_or_default()
    }

    pub fn has_tool_calls(&self) -> bool {
        self.generations.iter().any(|g| g.output.has_tool_calls())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_response_has_empty_text() {
        let response = ChatResponse::default();
        assert_eq!(response.text(), "");
        assert!(response.result().is_none());
        assert!(response.metadata.is_empty());
    }

    #[test]
    fn options_builder_defaults_collections() {
        let options = ChatOptions::builder().model("glm-4").temperature(0.2).build();
        assert_eq!(options.model.as_deref(), Some("glm-4"));
        assert!(options.functions.is_empty());
        assert!(options.function_callbacks.is_empty());
        assert_eq!(options.proxy_tool_calls, None);
    }

    #[test]
    fn usage_merge_accumulates() {
        let mut usage = Usage::new(3, 4);
        usage.merge(&Usage::new(1, 1));
        assert_eq!(usage, Usage { prompt_tokens: 4, generation_tokens: 5, total_tokens: 9 });
    }
}
