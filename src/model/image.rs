//! Image generation prompts and responses.

use serde::{Deserialize, Serialize};

/// One instruction of an image prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageMessage {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f32>,
}

impl ImageMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            weight: None,
        }
    }
}

/// Provider-neutral image options. Providers ignore what they don't support.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ImageOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    /// End-user identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImagePrompt {
    pub messages: Vec<ImageMessage>,
    pub options: Option<ImageOptions>,
}

impl ImagePrompt {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            messages: vec![ImageMessage::new(text)],
            options: None,
        }
    }

    pub fn with_options(mut self, options: ImageOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Text of the first instruction.
    pub fn instructions(&self) -> Option<&str> {
        self.messages.first().map(|m| m.text.as_str())
    }
}

/// A generated image, by URL or inline base64.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Image {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b64_json: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ImageGeneration {
    pub output: Image,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ImageResponse {
    pub generations: Vec<ImageGeneration>,
}

impl ImageResponse {
    pub fn new(generations: Vec<ImageGeneration>) -> Self {
        Self { generations }
    }

    pub fn result(&self) -> Option<&ImageGeneration> {
        self.generations.first()
    }
}
