//! Embedding requests, responses and documents.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::chat::Usage;

/// Provider-neutral embedding options.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct EmbeddingOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<u32>,
}

/// Texts to embed plus optional runtime options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddingRequest {
    pub inputs: Vec<String>,
    pub options: Option<EmbeddingOptions>,
}

impl EmbeddingRequest {
    pub fn new(inputs: Vec<String>) -> Self {
        Self {
            inputs,
            options: None,
        }
    }

    pub fn with_options(mut self, options: EmbeddingOptions) -> Self {
        self.options = Some(options);
        self
    }
}

/// One embedding vector and its position in the request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Embedding {
    pub output: Vec<f32>,
    pub index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct EmbeddingResponseMetadata {
    pub model: String,
    pub usage: Usage,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct EmbeddingResponse {
    pub embeddings: Vec<Embedding>,
    pub metadata: EmbeddingResponseMetadata,
}

impl EmbeddingResponse {
    /// First embedding vector, or empty.
    pub fn output(&self) -> Vec<f32> {
        self.embeddings
            .first()
            .map(|e| e.output.clone())
            .unwrap_or_default()
    }
}

/// Which metadata is rendered into a document's formatted content.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MetadataMode {
    All,
    #[default]
    Embed,
    Inference,
    None,
}

/// A piece of text with metadata.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Document {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// Metadata keys hidden in [`MetadataMode::Embed`].
    #[serde(default)]
    pub excluded_embed_metadata_keys: BTreeSet<String>,
    /// Metadata keys hidden in [`MetadataMode::Inference`].
    #[serde(default)]
    pub excluded_inference_metadata_keys: BTreeSet<String>,
}

impl Document {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Content prefixed by `key: value` lines for the metadata visible in
    /// `mode`, separated from the content by a blank line.
    pub fn formatted_content(&self, mode: MetadataMode) -> String {
        let excluded = match mode {
            MetadataMode::All => None,
            MetadataMode::Embed => Some(&self.excluded_embed_metadata_keys),
            MetadataMode::Inference => Some(&self.excluded_inference_metadata_keys),
            MetadataMode::None => return self.content.clone(),
        };

        let lines: Vec<String> = self
            .metadata
            .iter()
            .filter(|(key, _)| excluded.map_or(true, |keys| !keys.contains(*key)))
            .map(|(key, value)| match value {
                serde_json::Value::String(s) => format!("{key}: {s}"),
                other => format!("{key}: {other}"),
            })
            .collect();

        if lines.is_empty() {
            self.content.clone()
        } else {
            format!("{}\n\n{}", lines.join("\n"), self.content)
        }
    }
}
