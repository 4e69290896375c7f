//! Image model backed by `/v4/images/generations`.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::api::image::{YtoAiImageApi, YtoAiImageRequest, DEFAULT_IMAGE_MODEL};
use crate::api::PROVIDER_NAME;
use crate::error::YtoAiError;
use crate::model::{Image, ImageGeneration, ImageModel, ImagePrompt, ImageResponse};
use crate::observation::{
    observe, DefaultObservationConvention, ObservationContext, ObservationConvention,
    ObservationRegistry, Operation, ResponseSummary,
};
use crate::options::YtoAiImageOptions;
use crate::util::retry::RetryPolicy;

#[derive(Clone)]
pub struct YtoAiImageModel {
    api: Arc<YtoAiImageApi>,
    default_options: YtoAiImageOptions,
    retry_policy: RetryPolicy,
    observation_registry: ObservationRegistry,
    convention: Arc<dyn ObservationConvention>,
}

impl std::fmt::Debug for YtoAiImageModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YtoAiImageModel")
            .field("default_options", &self.default_options)
            .field("retry_policy", &self.retry_policy)
            .finish()
    }
}

impl YtoAiImageModel {
    pub fn new(api: YtoAiImageApi) -> Self {
        Self {
            api: Arc::new(api),
            default_options: YtoAiImageOptions::default(),
            retry_policy: RetryPolicy::default(),
            observation_registry: ObservationRegistry::noop(),
            convention: Arc::new(DefaultObservationConvention),
        }
    }

    pub fn with_options(mut self, options: YtoAiImageOptions) -> Self {
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

    pub fn default_options(&self) -> &YtoAiImageOptions {
        &self.default_options
    }

    /// Wire request: the default model, then the default options, then
    /// the prompt's options.
    pub fn create_request(&self, prompt: &ImagePrompt) -> Result<YtoAiImageRequest, YtoAiError> {
        let instructions = prompt
            .instructions()
            .ok_or_else(|| YtoAiError::InvalidArgument("Image prompt has no instructions".into()))?;

        let mut request = YtoAiImageRequest::new(instructions, DEFAULT_IMAGE_MODEL.to_string());
        self.default_options
            .merge(prompt.options.as_ref())
            .apply_to(&mut request);
        Ok(request)
    }

    async fn generate(&self, prompt: &ImagePrompt) -> Result<ImageResponse, YtoAiError> {
        self.retry_policy
            .execute(|| async move {
                let request = self.create_request(prompt)?;
                let Some(response) = self.api.create_image(&request).await? else {
                    warn!(model = ?request.model, "No image response returned");
                    return Ok(ImageResponse::default());
                };

                let generations = response
                    .data
                    .into_iter()
                    .map(|data| ImageGeneration {
                        output: Image {
                            url: Some(data.url),
                            b64_json: None,
                        },
                    })
                    .collect();
                Ok(ImageResponse::new(generations))
            })
            .await
    }
}

#[async_trait]
impl ImageModel for YtoAiImageModel {
    async fn call(&self, prompt: ImagePrompt) -> Result<ImageResponse, YtoAiError> {
        let options = self.default_options.merge(prompt.options.as_ref());
        let context =
            ObservationContext::new(Operation::Image, PROVIDER_NAME).with_request_options(&options);

        observe(
            &self.observation_registry,
            self.convention.as_ref(),
            context,
            self.generate(&prompt),
            |_| ResponseSummary {
                model: options.model.clone(),
                ..Default::default()
            },
        )
        .await
    }
}
