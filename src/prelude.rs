//! Convenience re-exports for common use.

pub use crate::config::{YtoAiConfig, YtoAiModels};
pub use crate::error::{Result, YtoAiError};
pub use crate::model::{
    ChatModel, ChatOptions, ChatResponse, Document, EmbeddingModel, EmbeddingRequest,
    FunctionCallback, FunctionTool, ImageModel, ImagePrompt, Media, Message, MetadataMode, Prompt,
    StreamingChatModel, Usage,
};
pub use crate::observation::{ObservationHandler, ObservationRegistry};
pub use crate::options::{YtoAiChatOptions, YtoAiEmbeddingOptions, YtoAiImageOptions};
pub use crate::provider::{YtoAiChatModel, YtoAiEmbeddingModel, YtoAiImageModel};
pub use crate::util::retry::RetryPolicy;
