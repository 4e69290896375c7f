//! Provider-neutral model abstraction.

pub mod aggregator;
pub mod chat;
pub mod embedding;
pub mod image;
pub mod message;
pub mod tool;

pub use aggregator::MessageAggregator;
pub use chat::{
    ChatGenerationMetadata, ChatOptions, ChatResponse, ChatResponseMetadata, Generation, Prompt,
    Usage,
};
pub use embedding::{
    Document, Embedding, EmbeddingOptions, EmbeddingRequest, EmbeddingResponse,
    EmbeddingResponseMetadata, MetadataMode,
};
pub use image::{Image, ImageGeneration, ImageMessage, ImageOptions, ImagePrompt, ImageResponse};
pub use message::{
    AssistantMessage, Media, MediaData, Message, SystemMessage, ToolCall, ToolResponse,
    ToolResponseMessage, UserMessage,
};
pub use tool::{FunctionCallback, FunctionCallbackRegistry, FunctionTool};

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::YtoAiError;

/// Blocking-style chat: one prompt in, one response out.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn call(&self, prompt: Prompt) -> Result<ChatResponse, YtoAiError>;

    /// Options used where a prompt leaves a field unset.
    fn default_options(&self) -> ChatOptions {
        ChatOptions::default()
    }
}

/// Streaming chat.
pub trait StreamingChatModel: Send + Sync {
    /// Partial responses, in arrival order. Nothing is sent until the
    /// stream is polled.
    fn stream(&self, prompt: Prompt) -> BoxStream<'static, Result<ChatResponse, YtoAiError>>;
}

#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    async fn call(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, YtoAiError>;

    /// Embed one text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, YtoAiError> {
        let response = self.call(EmbeddingRequest::new(vec![text.to_string()])).await?;
        Ok(response.output())
    }

    /// Embed a document's formatted content.
    async fn embed_document(&self, document: &Document) -> Result<Vec<f32>, YtoAiError>;
}

#[async_trait]
pub trait ImageModel: Send + Sync {
    async fn call(&self, prompt: ImagePrompt) -> Result<ImageResponse, YtoAiError>;
}
