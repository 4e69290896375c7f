//! Low-level client for the YtoAI HTTP API.

pub mod http;
pub mod image;
pub mod stream_merge;
pub mod types;

pub use image::{ImageModelName, YtoAiImageApi, YtoAiImageRequest, YtoAiImageResponse};
pub use stream_merge::StreamFunctionCallingHelper;

use std::time::Duration;

use futures::stream::BoxStream;
use futures::StreamExt;
use strum::{AsRefStr, Display, EnumString};
use tracing::{debug, warn};

use crate::error::YtoAiError;
use crate::util::timeout::with_timeout;
use http::{
    bearer_headers, endpoint, parse_sse_data, read_json_body, shared_client, sse_lines,
    status_to_error,
};
use types::{ChatCompletion, ChatCompletionChunk, ChatCompletionRequest, EmbeddingList, EmbeddingRequest};

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://yto.bigmodel.cn/api/paas";

/// Provider name reported to observation handlers.
pub const PROVIDER_NAME: &str = "ytoai";

const CHAT_COMPLETIONS_PATH: &str = "/v4/chat/completions";
const EMBEDDINGS_PATH: &str = "/v4/embeddings";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Chat models served by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
pub enum ChatModelName {
    #[strum(serialize = "glm-4")]
    Glm4,
    #[strum(serialize = "glm-4-air")]
    Glm4Air,
    #[strum(serialize = "glm-4-flash")]
    Glm4Flash,
    #[strum(serialize = "glm-3-turbo")]
    Glm3Turbo,
}

/// Embedding models served by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
pub enum EmbeddingModelName {
    #[strum(serialize = "embedding-2")]
    Embedding2,
    #[strum(serialize = "embedding-3")]
    Embedding3,
}

pub const DEFAULT_CHAT_MODEL: ChatModelName = ChatModelName::Glm4Air;
pub const DEFAULT_EMBEDDING_MODEL: EmbeddingModelName = EmbeddingModelName::Embedding2;

/// Client for the chat and embedding endpoints.
#[derive(Debug, Clone)]
pub struct YtoAiApi {
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl YtoAiApi {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Client against [`DEFAULT_BASE_URL`].
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self::new(DEFAULT_BASE_URL, api_key)
    }

    /// Timeout for non-streaming calls.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create a chat completion. Returns `None` when the body is empty.
    pub async fn chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<Option<ChatCompletion>, YtoAiError> {
        if request.stream {
            return Err(YtoAiError::InvalidArgument(
                "Request must set the stream property to false".into(),
            ));
        }

        let url = endpoint(&self.base_url, CHAT_COMPLETIONS_PATH);
        debug!(model = ?request.model, "YtoAI chat_completion");

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

    /// Stream a chat completion.
    ///
    /// Text frames are yielded as they arrive. Frames that belong to a
    /// tool call are folded with [`StreamFunctionCallingHelper`] and
    /// yielded once as a single merged chunk when the call window closes
    /// (a finish reason arrives or the stream ends).
    pub async fn chat_completion_stream(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<BoxStream<'static, Result<ChatCompletionChunk, YtoAiError>>, YtoAiError> {
        if !request.stream {
            return Err(YtoAiError::InvalidArgument(
                "Request must set the stream property to true".into(),
            ));
        }

        let url = endpoint(&self.base_url, CHAT_COMPLETIONS_PATH);
        debug!(model = ?request.model, "YtoAI chat_completion_stream");

        let resp = shared_client()
            .post(&url)
            .headers(bearer_headers(&self.api_key))
            .json(request)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body_text));
        }

        let lines = sse_lines(resp.bytes_stream());
        let helper = StreamFunctionCallingHelper::new();

        let stream = async_stream::stream! {
            let mut window: Option<ChatCompletionChunk> = None;
            futures::pin_mut!(lines);

            while let Some(line) = lines.next().await {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };

                if line.is_empty() || line.starts_with(':') {
                    continue;
                }
                let Some(data) = parse_sse_data(&line) else {
                    continue;
                };

                let chunk = match serde_json::from_str::<ChatCompletionChunk>(data) {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        warn!(error = %e, "Skipping unparseable YtoAI stream frame");
                        continue;
                    }
                };

                if window.is_none() && !helper.is_streaming_tool_call(&chunk) {
                    yield Ok(chunk);
                    continue;
                }

                let closes_window = helper.is_streaming_tool_call_finished(&chunk)
                    || chunk.choices.first().is_some_and(|c| c.finish_reason.is_some());
                match helper.merge(window.take(), chunk) {
                    Ok(merged) if closes_window => {
                        yield Ok(merged);
                    }
                    Ok(merged) => {
                        window = Some(merged);
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }

            if let Some(merged) = window.take() {
                yield Ok(merged);
            }
        };

        Ok(Box::pin(stream))
    }

    /// Embed a single input. Returns `None` when the body is empty.
    pub async fn embeddings(
        &self,
        request: &EmbeddingRequest,
    ) -> Result<Option<EmbeddingList>, YtoAiError> {
        if request.input.is_empty() {
            return Err(YtoAiError::InvalidArgument(
                "Embedding input must not be empty".into(),
            ));
        }

        let url = endpoint(&self.base_url, EMBEDDINGS_PATH);
        debug!(model = ?request.model, "YtoAI embeddings");

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
