//! Embedding model backed by `/v4/embeddings`.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::api::{YtoAiApi, PROVIDER_NAME};
use crate::error::YtoAiError;
use crate::model::{
    Document, Embedding, EmbeddingModel, EmbeddingRequest, EmbeddingResponse,
    EmbeddingResponseMetadata, MetadataMode, Usage,
};
use crate::observation::{
    observe, DefaultObservationConvention, ObservationContext, ObservationConvention,
    ObservationRegistry, Operation, ResponseSummary,
};
use crate::options::YtoAiEmbeddingOptions;
use crate::util::retry::RetryPolicy;

/// YtoAI embedding model.
///
/// The API embeds one text per request, so a batch becomes one call per
/// input.
#[derive(Clone)]
pub struct YtoAiEmbeddingModel {
    api: Arc<YtoAiApi>,
    metadata_mode: MetadataMode,
    default_options: YtoAiEmbeddingOptions,
    retry_policy: RetryPolicy,
    observation_registry: ObservationRegistry,
    convention: Arc<dyn ObservationConvention>,
}

impl std::fmt::Debug for YtoAiEmbeddingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YtoAiEmbeddingModel")
            .field("base_url", &self.api.base_url())
            .field("metadata_mode", &self.metadata_mode)
            .field("default_options", &self.default_options)
            .finish()
    }
}

impl YtoAiEmbeddingModel {
    pub fn new(api: YtoAiApi) -> Self {
        Self {
            api: Arc::new(api),
            metadata_mode: MetadataMode::Embed,
            default_options: YtoAiEmbeddingOptions::default(),
            retry_policy: RetryPolicy::default(),
            observation_registry: ObservationRegistry::noop(),
            convention: Arc::new(DefaultObservationConvention),
        }
    }

    pub fn with_metadata_mode(mut self, mode: MetadataMode) -> Self {
        self.metadata_mode = mode;
        self
    }

    pub fn with_options(mut self, options: YtoAiEmbeddingOptions) -> Self {
        self.default_options = options;
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn with_observation_registry(mut self, registry: ObservationRegistry) -> Self {
        self.observation_registry = registry;
        self
    }

    pub fn with_observation_convention(mut self, convention: Arc<dyn ObservationConvention>) -> Self {
        self.convention = convention;
        self
    }

    pub fn default_options(&self) -> &YtoAiEmbeddingOptions {
        &self.default_options
    }

    async fn embed_all(
        &self,
        inputs: &[String],
        options: &YtoAiEmbeddingOptions,
    ) -> Result<EmbeddingResponse, YtoAiError> {
        let mut vectors = Vec::with_capacity(inputs.len());
        let mut usage = Usage::default();

        for input in inputs {
            let request = options.to_request(input.as_str());
            let list = self
                .retry_policy
                .execute(|| self.api.embeddings(&request))
                .await?;

            match list {
                Some(list) if !list.data.is_empty() => {
                    if let Some(u) = list.usage {
                        usage.merge(&u.into());
                    }
                    vectors.push(list.data.into_iter().next().map(|e| e.embedding).unwrap_or_default());
                }
                _ => {
                    warn!(input = %input, "No embeddings returned for input");
                    vectors.push(Vec::new());
                }
            }
        }

        let embeddings = vectors
            .into_iter()
            .enumerate()
            .map(|(index, output)| Embedding { output, index })
            .collect();

        Ok(EmbeddingResponse {
            embeddings,
            metadata: EmbeddingResponseMetadata {
                model: options.model.clone().unwrap_or_else(|| "unknown".to_string()),
                usage,
            },
        })
    }
}

#[async_trait]
impl EmbeddingModel for YtoAiEmbeddingModel {
    async fn call(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, YtoAiError> {
        if request.inputs.is_empty() {
            return Err(YtoAiError::InvalidArgument("At least one text is required".into()));
        }
        if request.inputs.len() != 1 {
            warn!(
                inputs = request.inputs.len(),
                "YtoAI embedding does not support batch embedding, making one API call per input"
            );
        }

        let options = YtoAiEmbeddingOptions::merge(request.options.as_ref(), &self.default_options);
        let context = ObservationContext::new(Operation::Embedding, PROVIDER_NAME)
            .with_request_options(&options);

        observe(
            &self.observation_registry,
            self.convention.as_ref(),
            context,
            self.embed_all(&request.inputs, &options),
            |response| ResponseSummary {
                model: Some(response.metadata.model.clone()),
                usage: Some(response.metadata.usage),
                ..Default::default()
            },
        )
        .await
    }

    async fn embed_document(&self, document: &Document) -> Result<Vec<f32>, YtoAiError> {
        self.embed(&document.formatted_content(self.metadata_mode)).await
    }
}
