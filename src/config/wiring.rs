//! Building models from [`YtoAiConfig`].

use std::sync::Arc;

use super::YtoAiConfig;
use crate::api::{YtoAiApi, YtoAiImageApi};
use crate::error::YtoAiError;
use crate::model::FunctionCallback;
use crate::observation::{ObservationConvention, ObservationRegistry};
use crate::provider::{YtoAiChatModel, YtoAiEmbeddingModel, YtoAiImageModel};
use crate::util::retry::RetryPolicy;

/// The models of every enabled section. Disabled sections are `None`.
#[derive(Debug, Clone, Default)]
pub struct YtoAiModels {
    pub chat: Option<YtoAiChatModel>,
    pub embedding: Option<YtoAiEmbeddingModel>,
    pub image: Option<YtoAiImageModel>,
}

impl YtoAiModels {
    pub fn from_config(config: &YtoAiConfig) -> YtoAiModelsBuilder<'_> {
        YtoAiModelsBuilder {
            config,
            function_callbacks: Vec::new(),
            observation_registry: ObservationRegistry::noop(),
            convention: None,
            retry_policy: None,
        }
    }
}

/// Collects what the configuration file cannot express.
pub struct YtoAiModelsBuilder<'a> {
    config: &'a YtoAiConfig,
    function_callbacks: Vec<Arc<dyn FunctionCallback>>,
    observation_registry: ObservationRegistry,
    convention: Option<Arc<dyn ObservationConvention>>,
    retry_policy: Option<RetryPolicy>,
}

impl<'a> YtoAiModelsBuilder<'a> {
    /// Callbacks registered with the chat model; requests enable them by
    /// name.
    pub fn function_callbacks<I>(mut self, callbacks: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn FunctionCallback>>,
    {
        self.function_callbacks.extend(callbacks);
        self
    }

    pub fn observation_registry(mut self, registry: ObservationRegistry) -> Self {
        self.observation_registry = registry;
        self
    }

    pub fn observation_convention(mut self, convention: Arc<dyn ObservationConvention>) -> Self {
        self.convention = Some(convention);
        self
    }

    /// Replaces the configured retry policy, e.g. to attach listeners.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    pub fn build(self) -> Result<YtoAiModels, YtoAiError> {
        let config = self.config;
        let retry = self.retry_policy.unwrap_or_else(|| config.retry.clone());
        let mut models = YtoAiModels::default();

        if config.chat.enabled {
            let (base_url, api_key) = resolve_connection(
                config.chat.base_url.as_deref(),
                &config.base_url,
                config.chat.api_key.as_deref(),
                &config.api_key,
            )?;
            let mut chat = YtoAiChatModel::new(YtoAiApi::new(base_url, api_key))
                .with_options(config.chat.options.clone())
                .with_function_callbacks(self.function_callbacks.iter().cloned())
                .with_retry_policy(retry.clone())
                .with_observation_registry(self.observation_registry.clone());
            if let Some(convention) = &self.convention {
                chat = chat.with_observation_convention(convention.clone());
            }
            models.chat = Some(chat);
        }

        if config.embedding.enabled {
            let (base_url, api_key) = resolve_connection(
                config.embedding.base_url.as_deref(),
                &config.base_url,
                config.embedding.api_key.as_deref(),
                &config.api_key,
            )?;
            let mut embedding = YtoAiEmbeddingModel::new(YtoAiApi::new(base_url, api_key))
                .with_metadata_mode(config.embedding.metadata_mode)
                .with_options(config.embedding.options.clone())
                .with_retry_policy(retry.clone())
                .with_observation_registry(self.observation_registry.clone());
            if let Some(convention) = &self.convention {
                embedding = embedding.with_observation_convention(convention.clone());
            }
            models.embedding = Some(embedding);
        }

        if config.image.enabled {
            let (base_url, api_key) = resolve_connection(
                config.image.base_url.as_deref(),
                &config.base_url,
                config.image.api_key.as_deref(),
                &config.api_key,
            )?;
            let mut image = YtoAiImageModel::new(YtoAiImageApi::new(base_url, api_key))
                .with_options(config.image.options.clone())
                .with_retry_policy(retry)
                .with_observation_registry(self.observation_registry.clone());
            if let Some(convention) = &self.convention {
                image = image.with_observation_convention(convention.clone());
            }
            models.image = Some(image);
        }

        Ok(models)
    }
}

/// Per-model values win when non-blank; otherwise the connection values.
/// Both results must be non-blank.
pub fn resolve_connection(
    base_url: Option<&str>,
    common_base_url: &str,
    api_key: Option<&str>,
    common_api_key: &str,
) -> Result<(String, String), YtoAiError> {
    let has_text = |s: &&str| !s.trim().is_empty();

    let base_url = base_url.filter(has_text).unwrap_or(common_base_url);
    if base_url.trim().is_empty() {
        return Err(YtoAiError::Configuration("YtoAI base URL must be set".into()));
    }

    let api_key = api_key.filter(has_text).unwrap_or(common_api_key);
    if api_key.trim().is_empty() {
        return Err(YtoAiError::Configuration("YtoAI API key must be set".into()));
    }

    Ok((base_url.to_string(), api_key.to_string()))
}
