//! Client for the image generation endpoint.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use tracing::debug;

use super::http::{bearer_headers, endpoint, read_json_body, shared_client};
use super::DEFAULT_BASE_URL;
use crate::error::YtoAiError;
use crate::util::timeout::with_timeout;

const IMAGE_GENERATIONS_PATH: &str = "/v4/images/generations";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Image models served by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
pub enum ImageModelName {
    #[strum(serialize = "cogview-3")]
    CogView3,
}

pub const DEFAULT_IMAGE_MODEL: ImageModelName = ImageModelName::CogView3;

/// Request body for `/v4/images/generations`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct YtoAiImageRequest {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// End-user id, 6 to 128 characters.
    #[serde(rename = "user_id", default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl YtoAiImageRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: Some(model.into()),
            user: None,
        }
    }
}

/// Response body of `/v4/images/generations`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct YtoAiImageResponse {
    #[serde(default)]
    pub created: Option<i64>,
    #[serde(default)]
    pub data: Vec<ImageData>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageData {
    pub url: String,
}

/// Client for image generation.
#[derive(Debug, Clone)]
pub struct YtoAiImageApi {
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl YtoAiImageApi {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self::new(DEFAULT_BASE_URL, api_key)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Generate images. Returns `None` when the body is empty.
    pub async fn create_image(
        &self,
        request: &YtoAiImageRequest,
    ) -> Result<Option<YtoAiImageResponse>, YtoAiError> {
        if request.prompt.is_empty() {
            return Err(YtoAiError::InvalidArgument("Prompt cannot be empty".into()));
        }

        let url = endpoint(&self.base_url, IMAGE_GENERATIONS_PATH);
        debug!(model = ?request.model, "YtoAI create_image");

        with_timeout(self.timeout, async {
            let response = shared_client()
                .post(&url)
                .headers(bearer_headers(&self.api_key))
                .json(request)
                .send()
                .await?;
            read_json_body(response).await
        })
        .await
    }
}
