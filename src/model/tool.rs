//! Function callbacks and the tool-call round trip.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::chat::{ChatResponse, Prompt};
use super::message::{AssistantMessage, Message, ToolResponse};
use crate::error::YtoAiError;

/// A function the model may call.
#[async_trait]
pub trait FunctionCallback: Send + Sync {
    /// Function name (must match what the model calls).
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema of the arguments object.
    fn input_schema(&self) -> &serde_json::Value;

    /// Execute with the JSON-encoded arguments produced by the model.
    async fn call(&self, arguments: &str) -> Result<String, YtoAiError>;
}

type FunctionHandler = dyn Fn(serde_json::Value) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, YtoAiError>> + Send>>
    + Send
    + Sync;

/// Closure-based function callback.
///
/// Arguments are parsed to JSON before the handler runs; the handler's
/// result is serialized back to a string for the model.
pub struct FunctionTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
    handler: Arc<FunctionHandler>,
}

impl FunctionTool {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: serde_json::Value,
        handler: F,
    ) -> Self
    where
        F: Fn(serde_json::Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<serde_json::Value, YtoAiError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            handler: Arc::new(move |args| Box::pin(handler(args))),
        }
    }
}

#[async_trait]
impl FunctionCallback for FunctionTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> &serde_json::Value {
        &self.input_schema
    }

    async fn call(&self, arguments: &str) -> Result<String, YtoAiError> {
        let args = if arguments.trim().is_empty() {
            serde_json::Value::Object(Default::default())
        } else {
            serde_json::from_str(arguments).map_err(|e| YtoAiError::ToolExecution {
                tool_name: self.name.clone(),
                message: format!("invalid arguments: {e}"),
            })?
        };
        let result = (self.handler)(args).await?;
        Ok(match result {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        })
    }
}

impl std::fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

/// Function callbacks known to a model, keyed by name.
#[derive(Clone, Default)]
pub struct FunctionCallbackRegistry {
    callbacks: BTreeMap<String, Arc<dyn FunctionCallback>>,
}

impl FunctionCallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback, replacing any callback with the same name.
    pub fn register(&mut self, callback: Arc<dyn FunctionCallback>) {
        self.callbacks.insert(callback.name().to_string(), callback);
    }

    pub fn register_all<I>(&mut self, callbacks: I)
    where
        I: IntoIterator<Item = Arc<dyn FunctionCallback>>,
    {
        for callback in callbacks {
            self.register(callback);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn FunctionCallback>> {
        self.callbacks.get(name)
    }

    pub fn names(&self) -> BTreeSet<String> {
        self.callbacks.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// Callbacks for the given names, in name order. Unknown names fail.
    pub fn resolve(
        &self,
        names: &BTreeSet<String>,
    ) -> Result<Vec<Arc<dyn FunctionCallback>>, YtoAiError> {
        names
            .iter()
            .map(|name| {
                self.get(name).cloned().ok_or_else(|| {
                    YtoAiError::InvalidArgument(format!("No function callback found for name: {name}"))
                })
            })
            .collect()
    }
}

impl std::fmt::Debug for FunctionCallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.callbacks.keys()).finish()
    }
}

/// Whether any generation requests tool calls and stopped for one of
/// `finish_reasons`.
pub fn is_tool_call(response: &ChatResponse, finish_reasons: &[&str]) -> bool {
    response.generations.iter().any(|generation| {
        generation.output.has_tool_calls()
            && generation
                .metadata
                .finish_reason
                .as_deref()
                .is_some_and(|reason| finish_reasons.iter().any(|r| r.eq_ignore_ascii_case(reason)))
    })
}

/// Whether the caller asked to receive tool calls instead of having them
/// executed.
pub fn is_proxy_tool_calls(request_proxy: Option<bool>, default_proxy: Option<bool>) -> bool {
    request_proxy.or(default_proxy).unwrap_or(false)
}

/// Execute the tool calls of the first tool-calling generation.
///
/// Returns the conversation to send next: the prompt messages, the
/// assistant message carrying the calls, and one tool message with a
/// response per call.
pub async fn handle_tool_calls(
    prompt: &Prompt,
    response: &ChatResponse,
    registry: &FunctionCallbackRegistry,
) -> Result<Vec<Message>, YtoAiError> {
    let assistant = response
        .generations
        .iter()
        .map(|g| &g.output)
        .find(|output| output.has_tool_calls())
        .ok_or_else(|| YtoAiError::InvalidState("No tool call requested by the chat model".into()))?;

    let responses = execute_tool_calls(assistant, registry).await?;

    let mut messages = prompt.messages.clone();
    messages.push(Message::Assistant(assistant.clone()));
    messages.push(Message::tool(responses));
    Ok(messages)
}

async fn execute_tool_calls(
    assistant: &AssistantMessage,
    registry: &FunctionCallbackRegistry,
) -> Result<Vec<ToolResponse>, YtoAiError> {
    let mut responses = Vec::with_capacity(assistant.tool_calls.len());
    for call in &assistant.tool_calls {
        let callback = registry.get(&call.name).ok_or_else(|| {
            YtoAiError::InvalidState(format!("No function callback found for function name: {}", call.name))
        })?;
        debug!(tool = %call.name, id = %call.id, "Executing tool call");
        let data = callback.call(&call.arguments).await?;
        responses.push(ToolResponse {
            id: call.id.clone(),
            name: call.name.clone(),
            response_data: data,
        });
    }
    Ok(responses)
}
