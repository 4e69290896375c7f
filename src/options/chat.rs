//! Chat options for the YtoAI API.

use std::collections::BTreeSet;
use std::sync::Arc;

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::api::types::{ChatCompletionRequest, FunctionTool};
use crate::model::{ChatOptions, FunctionCallback};

/// Every request knob the chat endpoint understands, plus function-calling
/// settings that stay on the client.
#[derive(Clone, Default, Builder, Serialize, Deserialize)]
#[serde(default)]
pub struct YtoAiChatOptions {
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<FunctionTool>>,
    /// Only `"auto"` is accepted by the API.
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<String>,
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub do_sample: Option<bool>,
    /// Names of registered functions to enable.
    #[builder(default)]
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub functions: BTreeSet<String>,
    #[builder(default)]
    #[serde(skip)]
    pub function_callbacks: Vec<Arc<dyn FunctionCallback>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_tool_calls: Option<bool>,
}

impl std::fmt::Debug for YtoAiChatOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YtoAiChatOptions")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("stop", &self.stop)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("tools", &self.tools.as_ref().map(Vec::len))
            .field("tool_choice", &self.tool_choice)
            .field("user", &self.user)
            .field("request_id", &self.request_id)
            .field("do_sample", &self.do_sample)
            .field("functions", &self.functions)
            .field(
                "function_callbacks",
                &self.function_callbacks.iter().map(|c| c.name()).collect::<Vec<_>>(),
            )
            .field("proxy_tool_calls", &self.proxy_tool_calls)
            .finish()
    }
}

impl From<&ChatOptions> for YtoAiChatOptions {
    fn from(options: &ChatOptions) -> Self {
        Self {
            model: options.model.clone(),
            max_tokens: options.max_tokens,
            stop: options.stop_sequences.clone(),
            temperature: options.temperature,
            top_p: options.top_p,
            functions: options.functions.clone(),
            function_callbacks: options.function_callbacks.clone(),
            proxy_tool_calls: options.proxy_tool_calls,
            ..Default::default()
        }
    }
}

fn pick<T: Clone>(
    runtime: Option<&YtoAiChatOptions>,
    request: Option<&YtoAiChatOptions>,
    defaults: &YtoAiChatOptions,
    field: impl Fn(&YtoAiChatOptions) -> &Option<T>,
) -> Option<T> {
    runtime
        .and_then(|o| field(o).clone())
        .or_else(|| request.and_then(|o| field(o).clone()))
        .or_else(|| field(defaults).clone())
}

impl YtoAiChatOptions {
    /// Coalesce three option layers field by field. A field set on
    /// `runtime` wins over `request`, which wins over `defaults`.
    /// Function names are unioned across all layers; function callbacks
    /// are concatenated in the same precedence order.
    pub fn resolve(
        runtime: Option<&YtoAiChatOptions>,
        request: Option<&YtoAiChatOptions>,
        defaults: &YtoAiChatOptions,
    ) -> Self {
        let layers = [runtime, request, Some(defaults)];

        let functions = layers
            .iter()
            .flatten()
            .flat_map(|o| o.functions.iter().cloned())
            .collect();
        let function_callbacks = layers
            .iter()
            .flatten()
            .flat_map(|o| o.function_callbacks.iter().cloned())
            .collect();

        Self {
            model: pick(runtime, request, defaults, |o| &o.model),
            max_tokens: pick(runtime, request, defaults, |o| &o.max_tokens),
            stop: pick(runtime, request, defaults, |o| &o.stop),
            temperature: pick(runtime, request, defaults, |o| &o.temperature),
            top_p: pick(runtime, request, defaults, |o| &o.top_p),
            tools: pick(runtime, request, defaults, |o| &o.tools),
            tool_choice: pick(runtime, request, defaults, |o| &o.tool_choice),
            user: pick(runtime, request, defaults, |o| &o.user),
            request_id: pick(runtime, request, defaults, |o| &o.request_id),
            do_sample: pick(runtime, request, defaults, |o| &o.do_sample),
            functions,
            function_callbacks,
            proxy_tool_calls: pick(runtime, request, defaults, |o| &o.proxy_tool_calls),
        }
    }

    /// Copy the wire fields onto `request`.
    pub fn apply_to(&self, request: &mut ChatCompletionRequest) {
        request.model = self.model.clone();
        request.max_tokens = self.max_tokens;
        request.stop = self.stop.clone();
        request.temperature = self.temperature;
        request.top_p = self.top_p;
        request.tools = self.tools.clone();
        request.tool_choice = self.tool_choice.clone();
        request.user = self.user.clone();
        request.request_id = self.request_id.clone();
        request.do_sample = self.do_sample;
    }

    /// The portable view of these options.
    pub fn to_chat_options(&self) -> ChatOptions {
        ChatOptions {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            stop_sequences: self.stop.clone(),
            temperature: self.temperature,
            top_p: self.top_p,
            functions: self.functions.clone(),
            function_callbacks: self.function_callbacks.clone(),
            proxy_tool_calls: self.proxy_tool_calls,
        }
    }
}
