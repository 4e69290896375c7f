//! Chat model backed by `/v4/chat/completions`.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use futures::StreamExt;
use tracing::{error, warn, Instrument};

use super::summarize_chat;
use crate::api::types::{
    self, ChatCompletion, ChatCompletionChunk, ChatCompletionMessage, ChatCompletionRequest, Choice, ImageUrl,
    MediaContent, MessageContent, Role,
};
use crate::api::{StreamFunctionCallingHelper, YtoAiApi, DEFAULT_CHAT_MODEL, PROVIDER_NAME};
use crate::error::YtoAiError;
use crate::model::tool::{handle_tool_calls, is_proxy_tool_calls, is_tool_call};
use crate::model::{
    AssistantMessage, ChatGenerationMetadata, ChatModel, ChatOptions, ChatResponse,
    ChatResponseMetadata, FunctionCallback, FunctionCallbackRegistry, Generation, MediaData,
    Message, MessageAggregator, Prompt, StreamingChatModel, ToolCall,
};
use crate::observation::{
    observe, DefaultObservationConvention, Observation, ObservationContext,
    ObservationConvention, ObservationRegistry, Operation,
};
use crate::options::YtoAiChatOptions;
use crate::util::retry::RetryPolicy;

/// Finish reasons after which requested tool calls are executed.
const TOOL_CALL_FINISH_REASONS: [&str; 2] = ["tool_calls", "stop"];

/// Upper bound on tool-call round trips for one prompt.
const MAX_TOOL_ROUNDS: usize = 20;

/// Default temperature when no options are given.
const DEFAULT_TEMPERATURE: f64 = 0.7;

/// A request ready to send, with the function callbacks it may need.
struct PreparedRequest {
    request: ChatCompletionRequest,
    options: YtoAiChatOptions,
    registry: FunctionCallbackRegistry,
    proxy_tool_calls: bool,
}

/// YtoAI chat model.
///
/// Function callbacks added with [`with_function_callbacks`] are only
/// registered: a request enables them by name through
/// [`ChatOptions::functions`](crate::model::ChatOptions::functions).
/// Callbacks carried by the default or prompt options are registered and
/// enabled.
///
/// [`with_function_callbacks`]: YtoAiChatModel::with_function_callbacks
#[derive(Clone)]
pub struct YtoAiChatModel {
    api: Arc<YtoAiApi>,
    default_options: YtoAiChatOptions,
    registry: FunctionCallbackRegistry,
    retry_policy: RetryPolicy,
    observation_registry: ObservationRegistry,
    convention: Arc<dyn ObservationConvention>,
}

impl std::fmt::Debug for YtoAiChatModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YtoAiChatModel")
            .field("base_url", &self.api.base_url())
            .field("default_options", &self.default_options)
            .field("registry", &self.registry)
            .field("retry_policy", &self.retry_policy)
            .finish()
    }
}

impl YtoAiChatModel {
    /// Model with `glm-4-air` at temperature 0.7.
    pub fn new(api: YtoAiApi) -> Self {
        let defaults = YtoAiChatOptions::builder()
            .model(DEFAULT_CHAT_MODEL.to_string())
            .temperature(DEFAULT_TEMPERATURE)
            .build();
        Self {
            api: Arc::new(api),
            default_options: YtoAiChatOptions::default(),
            registry: FunctionCallbackRegistry::new(),
            retry_policy: RetryPolicy::default(),
            observation_registry: ObservationRegistry::noop(),
            convention: Arc::new(DefaultObservationConvention),
        }
        .with_options(defaults)
    }

    /// Replace the default options.
    pub fn with_options(mut self, mut options: YtoAiChatOptions) -> Self {
        for callback in std::mem::take(&mut options.function_callbacks) {
            options.functions.insert(callback.name().to_string());
            self.registry.register(callback);
        }
        self.default_options = options;
        self
    }

    /// Register callbacks without enabling them.
    pub fn with_function_callbacks<I>(mut self, callbacks: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn FunctionCallback>>,
    {
        self.registry.register_all(callbacks);
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

    /// Build the wire request for `prompt`.
    pub fn create_request(
        &self,
        prompt: &Prompt,
        stream: bool,
    ) -> Result<ChatCompletionRequest, YtoAiError> {
        self.prepare(prompt, stream).map(|prepared| prepared.request)
    }

    fn prepare(&self, prompt: &Prompt, stream: bool) -> Result<PreparedRequest, YtoAiError> {
        let mut messages = Vec::with_capacity(prompt.messages.len());
        for message in &prompt.messages {
            messages.extend(to_wire_messages(message)?);
        }

        let request_options = prompt.options.as_ref().map(YtoAiChatOptions::from);

        let mut registry = self.registry.clone();
        let mut enabled = BTreeSet::new();
        if let Some(options) = &request_options {
            enabled.extend(options.functions.iter().cloned());
            for callback in &options.function_callbacks {
                enabled.insert(callback.name().to_string());
                registry.register(callback.clone());
            }
        }
        enabled.extend(self.default_options.functions.iter().cloned());

        let tool_options = if enabled.is_empty() {
            None
        } else {
            let tools = registry
                .resolve(&enabled)?
                .iter()
                .map(|callback| {
                    types::FunctionTool::new(
                        callback.name(),
                        callback.description(),
                        callback.input_schema().clone(),
                    )
                })
                .collect();
            Some(YtoAiChatOptions::builder().tools(tools).build())
        };

        let options = YtoAiChatOptions::resolve(
            tool_options.as_ref(),
            request_options.as_ref(),
            &self.default_options,
        );

        let mut request = ChatCompletionRequest::new(messages, stream);
        options.apply_to(&mut request);

        let proxy_tool_calls = is_proxy_tool_calls(
            request_options.as_ref().and_then(|o| o.proxy_tool_calls),
            self.default_options.proxy_tool_calls,
        );

        Ok(PreparedRequest {
            request,
            options,
            registry,
            proxy_tool_calls,
        })
    }

    fn observation_context(&self, options: &YtoAiChatOptions) -> ObservationContext {
        ObservationContext::new(Operation::Chat, PROVIDER_NAME).with_request_options(options)
    }

    async fn call_once(&self, prepared: &PreparedRequest) -> Result<ChatResponse, YtoAiError> {
        let api = self.api.clone();
        let request = &prepared.request;

        observe(
            &self.observation_registry,
            self.convention.as_ref(),
            self.observation_context(&prepared.options),
            async {
                let completion = self
                    .retry_policy
                    .execute(|| api.chat_completion(request))
                    .await?;

                let Some(completion) = completion else {
                    warn!(model = ?request.model, "No chat completion returned");
                    return Ok(ChatResponse::default());
                };

                let id = completion.id.clone().unwrap_or_default();
                let generations = completion
                    .choices
                    .iter()
                    .map(|choice| {
                        let role = choice.message.role.map(|r| r.to_string()).unwrap_or_default();
                        build_generation(choice, &id, &role)
                    })
                    .collect();

                Ok(ChatResponse::new(generations).with_metadata(response_metadata(&completion)))
            },
            summarize_chat,
        )
        .await
    }

    fn stream_rounds(
        &self,
        prompt: Prompt,
        round: usize,
    ) -> BoxStream<'static, Result<ChatResponse, YtoAiError>> {
        let model = self.clone();

        let responses = async_stream::stream! {
            if round >= MAX_TOOL_ROUNDS {
                yield Err(YtoAiError::InvalidState(format!(
                    "Tool calls did not settle after {MAX_TOOL_ROUNDS} rounds"
                )));
                return;
            }

            let prepared = match model.prepare(&prompt, true) {
                Ok(prepared) => prepared,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            let observation = Arc::new(Observation::start(
                &model.observation_registry,
                model.convention.as_ref(),
                model.observation_context(&prepared.options),
            ));

            let api = model.api.clone();
            let request = prepared.request.clone();
            let setup = model
                .retry_policy
                .execute(|| api.chat_completion_stream(&request))
                .instrument(observation.span().clone())
                .await;
            let chunks = match setup {
                Ok(chunks) => chunks,
                Err(e) => {
                    observation.error(&e);
                    observation.stop();
                    yield Err(e);
                    return;
                }
            };

            let on_complete = observation.clone();
            let inner = model.round_responses(prompt, prepared, chunks, round);
            let mut aggregated = MessageAggregator::aggregate(inner, move |response| {
                on_complete.set_response(summarize_chat(&response));
                on_complete.stop();
            });

            while let Some(item) = aggregated.next().await {
                if let Err(e) = &item {
                    observation.error(e);
                    observation.stop();
                }
                yield item;
            }
        };

        Box::pin(responses)
    }

    /// Partial responses of one round. A tool-calling response is not
    /// yielded: its calls are executed and the next round is streamed in
    /// its place.
    fn round_responses(
        &self,
        prompt: Prompt,
        prepared: PreparedRequest,
        mut chunks: BoxStream<'static, Result<ChatCompletionChunk, YtoAiError>>,
        round: usize,
    ) -> BoxStream<'static, Result<ChatResponse, YtoAiError>> {
        let model = self.clone();
        let helper = StreamFunctionCallingHelper::new();

        let responses = async_stream::stream! {
            // Only the first chunk of a completion carries the role.
            let mut roles: HashMap<String, Role> = HashMap::new();

            while let Some(chunk) = chunks.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        error!(error = %e, "Error processing chat completion stream");
                        yield Err(e);
                        return;
                    }
                };

                let completion = helper.chunk_to_completion(chunk);
                let response = stream_response(&completion, &mut roles);

                if prepared.proxy_tool_calls || !is_tool_call(&response, &TOOL_CALL_FINISH_REASONS) {
                    yield Ok(response);
                    continue;
                }

                let messages = match handle_tool_calls(&prompt, &response, &prepared.registry).await {
                    Ok(messages) => messages,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };
                let next = Prompt {
                    messages,
                    options: prompt.options.clone(),
                };
                let mut follow_up = model.stream_rounds(next, round + 1);
                while let Some(item) = follow_up.next().await {
                    yield item;
                }
            }
        };

        Box::pin(responses)
    }
}

#[async_trait]
impl ChatModel for YtoAiChatModel {
    async fn call(&self, prompt: Prompt) -> Result<ChatResponse, YtoAiError> {
        let mut prompt = prompt;
        for _ in 0..MAX_TOOL_ROUNDS {
            let prepared = self.prepare(&prompt, false)?;
            let response = self.call_once(&prepared).await?;

            if prepared.proxy_tool_calls || !is_tool_call(&response, &TOOL_CALL_FINISH_REASONS) {
                return Ok(response);
            }

            let messages = handle_tool_calls(&prompt, &response, &prepared.registry).await?;
            prompt = Prompt {
                messages,
                options: prompt.options,
            };
        }

        Err(YtoAiError::InvalidState(format!(
            "Tool calls did not settle after {MAX_TOOL_ROUNDS} rounds"
        )))
    }

    fn default_options(&self) -> ChatOptions {
        self.default_options.to_chat_options()
    }
}

impl StreamingChatModel for YtoAiChatModel {
    fn stream(&self, prompt: Prompt) -> BoxStream<'static, Result<ChatResponse, YtoAiError>> {
        self.stream_rounds(prompt, 0)
    }
}

/// One or more wire messages for a conversation message. Tool messages
/// expand to one wire message per response.
fn to_wire_messages(message: &Message) -> Result<Vec<ChatCompletionMessage>, YtoAiError> {
    let wire = match message {
        Message::System(system) => {
            vec![ChatCompletionMessage::new(system.content.as_str(), Role::System)]
        }
        Message::User(user) if user.media.is_empty() => {
            vec![ChatCompletionMessage::new(user.content.as_str(), Role::User)]
        }
        Message::User(user) => {
            let mut parts = vec![MediaContent::Text {
                text: user.content.clone(),
            }];
            parts.extend(user.media.iter().map(|media| MediaContent::ImageUrl {
                image_url: ImageUrl {
                    url: media_url(&media.mime_type, &media.data),
                    detail: None,
                },
            }));
            vec![ChatCompletionMessage::new(MessageContent::Parts(parts), Role::User)]
        }
        Message::Assistant(assistant) => {
            let tool_calls = (!assistant.tool_calls.is_empty()).then(|| {
                assistant
                    .tool_calls
                    .iter()
                    .map(|call| types::ToolCall {
                        index: None,
                        id: Some(call.id.clone()),
                        kind: Some(call.kind.clone()),
                        function: Some(types::ChatCompletionFunction {
                            name: Some(call.name.clone()),
                            arguments: Some(call.arguments.clone()),
                        }),
                    })
                    .collect()
            });
            vec![ChatCompletionMessage {
                tool_calls,
                ..ChatCompletionMessage::new(assistant.content.as_str(), Role::Assistant)
            }]
        }
        Message::Tool(tool) => {
            if tool.responses.iter().any(|r| r.id.is_empty()) {
                return Err(YtoAiError::InvalidArgument(
                    "ToolResponseMessage must have an id".into(),
                ));
            }
            tool.responses
                .iter()
                .map(|response| ChatCompletionMessage {
                    name: Some(response.name.clone()),
                    tool_call_id: Some(response.id.clone()),
                    ..ChatCompletionMessage::new(response.response_data.as_str(), Role::Tool)
                })
                .collect()
        }
    };
    Ok(wire)
}

/// Bytes become a base64 `data:` URL; strings are passed through as
/// either a URL or a caller-encoded data URL.
fn media_url(mime_type: &str, data: &MediaData) -> String {
    match data {
        MediaData::Bytes(bytes) => format!(
            "data:{mime_type};base64,{}",
            base64::engine::general_purpose::STANDARD.encode(bytes)
        ),
        MediaData::Url(url) => url.clone(),
    }
}

fn build_generation(choice: &Choice, id: &str, role: &str) -> Generation {
    let tool_calls = choice
        .message
        .tool_calls
        .iter()
        .flatten()
        .map(|call| {
            let function = call.function.clone().unwrap_or_default();
            ToolCall {
                id: call.id.clone().unwrap_or_default(),
                kind: "function".to_string(),
                name: function.name.unwrap_or_default(),
                arguments: function.arguments.unwrap_or_default(),
            }
        })
        .collect();

    let finish_reason = choice
        .finish_reason
        .map(|r| r.to_string())
        .unwrap_or_default();

    let output = AssistantMessage {
        content: choice.message.text().unwrap_or_default(),
        tool_calls,
        metadata: BTreeMap::from([
            ("id".to_string(), id.into()),
            ("role".to_string(), role.into()),
            ("finishReason".to_string(), finish_reason.clone().into()),
        ]),
    };

    let metadata = if finish_reason.is_empty() {
        ChatGenerationMetadata::default()
    } else {
        ChatGenerationMetadata::from_finish_reason(finish_reason)
    };
    Generation::new(output).with_metadata(metadata)
}

fn response_metadata(completion: &ChatCompletion) -> ChatResponseMetadata {
    ChatResponseMetadata {
        id: completion.id.clone().unwrap_or_default(),
        model: completion.model.clone().unwrap_or_default(),
        usage: completion.usage.map(Into::into).unwrap_or_default(),
        created: completion.created.and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
        system_fingerprint: completion.system_fingerprint.clone(),
    }
}

/// Partial response for one streamed completion. The role is remembered
/// per completion id.
fn stream_response(completion: &ChatCompletion, roles: &mut HashMap<String, Role>) -> ChatResponse {
    let id = completion.id.clone().unwrap_or_default();
    let generations = completion
        .choices
        .iter()
        .map(|choice| {
            if let Some(role) = choice.message.role {
                roles.entry(id.clone()).or_insert(role);
            }
            let role = roles.get(&id).map(|r| r.to_string()).unwrap_or_default();
            build_generation(choice, &id, &role)
        })
        .collect();
    ChatResponse::new(generations).with_metadata(response_metadata(completion))
}
