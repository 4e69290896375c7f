use serde::{Deserialize, Serialize};

use crate::api::types::EmbeddingRequest;
use crate::api::DEFAULT_EMBEDDING_MODEL;
use crate::model::EmbeddingOptions;

/// Embedding options for the YtoAI API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct YtoAiEmbeddingOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Only honoured by `embedding-3`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<u32>,
}

impl Default for YtoAiEmbeddingOptions {
    fn default() -> Self {
        Self {
            model: Some(DEFAULT_EMBEDDING_MODEL.to_string()),
            dimensions: None,
        }
    }
}

impl YtoAiEmbeddingOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: Some(model.into()),
            dimensions: None,
        }
    }

    pub fn with_dimensions(mut self, dimensions: u32) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    /// Runtime values win over `defaults`.
    pub fn merge(runtime: Option<&EmbeddingOptions>, defaults: &YtoAiEmbeddingOptions) -> Self {
        let Some(runtime) = runtime else {
            return defaults.clone();
        };
        Self {
            model: runtime.model.clone().or_else(|| defaults.model.clone()),
            dimensions: runtime.dimensions.or(defaults.dimensions),
        }
    }

    /// Wire request for one input.
    pub fn to_request(&self, input: impl Into<String>) -> EmbeddingRequest {
        EmbeddingRequest {
            input: input.into(),
            model: self.model.clone(),
            dimensions: self.dimensions,
        }
    }
}
