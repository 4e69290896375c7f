//! YtoAI implementations of the model traits.

pub mod chat;
pub mod embedding;
pub mod image;

pub use chat::YtoAiChatModel;
pub use embedding::YtoAiEmbeddingModel;
pub use image::YtoAiImageModel;

use crate::api::types;
use crate::model::{ChatResponse, Usage};
use crate::observation::ResponseSummary;

impl From<types::Usage> for Usage {
    fn from(usage: types::Usage) -> Self {
        Self {
            prompt_tokens: usage.prompt_tokens,
            generation_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        }
    }
}

pub(crate) fn summarize_chat(response: &ChatResponse) -> ResponseSummary {
    let metadata = &response.metadata;
    ResponseSummary {
        id: (!metadata.id.is_empty()).then(|| metadata.id.clone()),
        model: (!metadata.model.is_empty()).then(|| metadata.model.clone()),
        usage: Some(metadata.usage),
        finish_reasons: response
            .generations
            .iter()
            .filter_map(|g| g.metadata.finish_reason.clone())
            .collect(),
    }
}
