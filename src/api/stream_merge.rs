//! Folding of streamed chat completion chunks that carry tool-call deltas.
//!
//! While a tool call streams, the server sends its arguments split across
//! several frames. Only the first frame of a call carries the call id; the
//! frames after it carry argument fragments with no id. Folding the frames
//! left to right with [`StreamFunctionCallingHelper::merge`] rebuilds the
//! complete calls:
//!
//! - the last tool call of the accumulator is the *active* call, any
//!   earlier ones are finalized;
//! - a frame whose call has an id finalizes the active call and starts a
//!   new one;
//! - a frame whose call has no id appends its argument fragment to the
//!   active call.
//!
//! Scalar fields take the most recent non-null value.

use super::types::{
    ChatCompletion, ChatCompletionChunk, ChatCompletionFinishReason, ChatCompletionFunction,
    ChatCompletionMessage, Choice, ChunkChoice, MessageContent, Role, ToolCall,
};
use crate::error::YtoAiError;

/// Merges streamed chunks that carry tool-call deltas.
///
/// The helper is stateless: the caller owns one accumulator per stream and
/// feeds chunks to [`merge`](Self::merge) in arrival order.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamFunctionCallingHelper;

impl StreamFunctionCallingHelper {
    pub fn new() -> Self {
        Self
    }

    /// Merge `current` into the accumulated `previous` chunk.
    ///
    /// Returns `current` unchanged when there is no accumulator yet. Fails
    /// with [`YtoAiError::ToolCallProtocol`] when `current` reports more than
    /// one tool call.
    pub fn merge(
        &self,
        previous: Option<ChatCompletionChunk>,
        current: ChatCompletionChunk,
    ) -> Result<ChatCompletionChunk, YtoAiError> {
        let Some(previous) = previous else {
            return Ok(current);
        };

        let choice = merge_choice(
            previous.choices.into_iter().next(),
            current.choices.into_iter().next(),
        )?;

        Ok(ChatCompletionChunk {
            id: current.id.or(previous.id),
            choices: choice.into_iter().collect(),
            created: current.created.or(previous.created),
            model: current.model.or(previous.model),
            system_fingerprint: current.system_fingerprint.or(previous.system_fingerprint),
            object: current.object.or(previous.object),
        })
    }

    /// Whether the chunk's first choice carries at least one tool call.
    pub fn is_streaming_tool_call(&self, chunk: &ChatCompletionChunk) -> bool {
        chunk
            .choices
            .first()
            .and_then(|choice| choice.delta.as_ref())
            .and_then(|delta| delta.tool_calls.as_ref())
            .is_some_and(|calls| !calls.is_empty())
    }

    /// Whether the chunk terminates a tool-call stream.
    pub fn is_streaming_tool_call_finished(&self, chunk: &ChatCompletionChunk) -> bool {
        chunk
            .choices
            .first()
            .filter(|choice| choice.delta.is_some())
            .is_some_and(|choice| choice.finish_reason == Some(ChatCompletionFinishReason::ToolCalls))
    }

    /// Project a chunk onto a completion. Usage is only reported on
    /// non-chunked responses, so it is left empty.
    pub fn chunk_to_completion(&self, chunk: ChatCompletionChunk) -> ChatCompletion {
        let choices = chunk
            .choices
            .into_iter()
            .map(|choice| Choice {
                finish_reason: choice.finish_reason,
                index: choice.index,
                message: choice
                    .delta
                    .unwrap_or_else(|| ChatCompletionMessage::new("", Role::Assistant)),
                logprobs: choice.logprobs,
            })
            .collect();

        ChatCompletion {
            id: chunk.id,
            choices,
            created: chunk.created,
            model: chunk.model,
            system_fingerprint: chunk.system_fingerprint,
            object: Some("chat.completion".to_string()),
            usage: None,
        }
    }
}

fn merge_choice(
    previous: Option<ChunkChoice>,
    current: Option<ChunkChoice>,
) -> Result<Option<ChunkChoice>, YtoAiError> {
    let (previous, current) = match (previous, current) {
        (None, current) => return Ok(current),
        (previous, None) => return Ok(previous),
        (Some(previous), Some(current)) => (previous, current),
    };

    Ok(Some(ChunkChoice {
        finish_reason: current.finish_reason.or(previous.finish_reason),
        index: current.index.or(previous.index),
        delta: merge_delta(previous.delta, current.delta)?,
        logprobs: current.logprobs.or(previous.logprobs),
    }))
}

fn merge_delta(
    previous: Option<ChatCompletionMessage>,
    current: Option<ChatCompletionMessage>,
) -> Result<Option<ChatCompletionMessage>, YtoAiError> {
    match (previous, current) {
        (None, current) => Ok(current),
        (previous, None) => Ok(previous),
        (Some(previous), Some(current)) => merge_message(previous, current).map(Some),
    }
}

fn merge_message(
    previous: ChatCompletionMessage,
    current: ChatCompletionMessage,
) -> Result<ChatCompletionMessage, YtoAiError> {
    let content = current
        .content
        .or(previous.content)
        .unwrap_or_else(|| MessageContent::Text(String::new()));
    let role = current.role.or(previous.role).unwrap_or(Role::Assistant);

    let mut tool_calls = Vec::new();
    let mut active = None;
    if let Some(mut previous_calls) = previous.tool_calls {
        active = previous_calls.pop();
        tool_calls.extend(previous_calls);
    }

    match current.tool_calls {
        Some(current_calls) if current_calls.len() > 1 => {
            return Err(YtoAiError::ToolCallProtocol(format!(
                "only one tool call is supported per chunk, got {}",
                current_calls.len()
            )));
        }
        Some(current_calls) => match current_calls.into_iter().next() {
            Some(call) if call.id.is_some() => {
                tool_calls.extend(active);
                tool_calls.push(call);
            }
            Some(call) => tool_calls.push(merge_tool_call(active, call)),
            None => tool_calls.extend(active),
        },
        None => tool_calls.extend(active),
    }

    Ok(ChatCompletionMessage {
        content: Some(content),
        role: Some(role),
        name: current.name.or(previous.name),
        tool_call_id: current.tool_call_id.or(previous.tool_call_id),
        tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
    })
}

fn merge_tool_call(previous: Option<ToolCall>, current: ToolCall) -> ToolCall {
    let Some(previous) = previous else {
        return current;
    };
    ToolCall {
        index: current.index.or(previous.index),
        id: current.id.or(previous.id),
        kind: current.kind.or(previous.kind),
        function: merge_function(previous.function, current.function),
    }
}

fn merge_function(
    previous: Option<ChatCompletionFunction>,
    current: Option<ChatCompletionFunction>,
) -> Option<ChatCompletionFunction> {
    match (previous, current) {
        (None, current) => current,
        (previous, None) => previous,
        (Some(previous), Some(current)) => {
            let mut arguments = previous.arguments.unwrap_or_default();
            if let Some(fragment) = current.arguments {
                arguments.push_str(&fragment);
            }
            Some(ChatCompletionFunction {
                name: current.name.or(previous.name),
                arguments: Some(arguments),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn chunk(delta: ChatCompletionMessage, finish: Option<ChatCompletionFinishReason>) -> ChatCompletionChunk {
        ChatCompletionChunk {
            id: Some("chatcmpl-1".to_string()),
            choices: vec![ChunkChoice {
                finish_reason: finish,
                index: Some(0),
                delta: Some(delta),
                logprobs: None,
            }],
            created: Some(1_700_000_000),
            model: Some("glm-4-air".to_string()),
            system_fingerprint: None,
            object: Some("chat.completion.chunk".to_string()),
        }
    }

    fn text_chunk(text: &str) -> ChatCompletionChunk {
        chunk(ChatCompletionMessage::new(text, Role::Assistant), None)
    }

    fn call_chunk(id: Option<&str>, name: Option<&str>, arguments: &str) -> ChatCompletionChunk {
        chunk(
            ChatCompletionMessage {
                tool_calls: Some(vec![ToolCall {
                    index: Some(0),
                    id: id.map(str::to_string),
                    kind: id.map(|_| "function".to_string()),
                    function: Some(ChatCompletionFunction {
                        name: name.map(str::to_string),
                        arguments: Some(arguments.to_string()),
                    }),
                }]),
                ..Default::default()
            },
            None,
        )
    }

    fn fold(chunks: Vec<ChatCompletionChunk>) -> ChatCompletionChunk {
        let helper = StreamFunctionCallingHelper::new();
        let mut acc = None;
        for c in chunks {
            acc = Some(helper.merge(acc, c).unwrap());
        }
        acc.unwrap()
    }

    fn calls(chunk: &ChatCompletionChunk) -> Vec<(Option<String>, Option<String>, Option<String>)> {
        chunk.choices[0]
            .delta
            .as_ref()
            .and_then(|d| d.tool_calls.clone())
            .unwrap_or_default()
            .into_iter()
            .map(|c| {
                let f = c.function.unwrap_or_default();
                (c.id, f.name, f.arguments)
            })
            .collect()
    }

    #[test]
    fn merge_without_accumulator_returns_current() {
        let helper = StreamFunctionCallingHelper::new();
        let current = call_chunk(Some("t1"), Some("lookup"), "{");
        assert_eq!(helper.merge(None, current.clone()).unwrap(), current);
    }

    #[test]
    fn current_content_overrides_previous() {
        let merged = fold(vec![text_chunk("Hel"), text_chunk("lo")]);
        let delta = merged.choices[0].delta.as_ref().unwrap();
        assert_eq!(delta.text().as_deref(), Some("lo"));
    }

    #[test]
    fn absent_content_on_both_sides_becomes_empty_string() {
        let empty = chunk(ChatCompletionMessage::default(), None);
        let merged = fold(vec![empty.clone(), empty]);
        let delta = merged.choices[0].delta.as_ref().unwrap();
        assert_eq!(delta.text().as_deref(), Some(""));
        assert_eq!(delta.role, Some(Role::Assistant));
    }

    #[test]
    fn continuation_fragment_appends_to_active_call() {
        let merged = fold(vec![
            call_chunk(Some("t1"), Some("lookup"), "{\"q\":"),
            call_chunk(None, None, "\"x\"}"),
        ]);
        assert_eq!(
            calls(&merged),
            vec![(
                Some("t1".to_string()),
                Some("lookup".to_string()),
                Some("{\"q\":\"x\"}".to_string())
            )]
        );
    }

    #[test]
    fn new_call_id_finalizes_active_call() {
        let merged = fold(vec![
            call_chunk(Some("t1"), Some("lookup"), "{\"q\":"),
            call_chunk(None, None, "\"x\"}"),
            call_chunk(Some("t2"), Some("weather"), "{\"city\":"),
            call_chunk(None, None, "\"Paris\"}"),
        ]);
        assert_eq!(
            calls(&merged),
            vec![
                (
                    Some("t1".to_string()),
                    Some("lookup".to_string()),
                    Some("{\"q\":\"x\"}".to_string())
                ),
                (
                    Some("t2".to_string()),
                    Some("weather".to_string()),
                    Some("{\"city\":\"Paris\"}".to_string())
                ),
            ]
        );
    }

    #[test]
    fn text_chunk_keeps_accumulated_calls() {
        let merged = fold(vec![
            call_chunk(Some("t1"), Some("lookup"), "{}"),
            text_chunk(""),
        ]);
        assert_eq!(calls(&merged).len(), 1);
    }

    #[test]
    fn two_calls_in_one_chunk_is_a_protocol_error() {
        let helper = StreamFunctionCallingHelper::new();
        let previous = call_chunk(Some("t1"), Some("lookup"), "{}");
        let current = chunk(
            ChatCompletionMessage {
                tool_calls: Some(vec![
                    ToolCall::function("a", "f", "{}"),
                    ToolCall::function("b", "g", "{}"),
                ]),
                ..Default::default()
            },
            None,
        );

        let err = helper.merge(Some(previous), current).unwrap_err();
        assert!(matches!(err, YtoAiError::ToolCallProtocol(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn missing_delta_is_treated_as_no_signal() {
        let helper = StreamFunctionCallingHelper::new();
        let mut finish = text_chunk("");
        finish.choices[0].delta = None;
        finish.choices[0].finish_reason = Some(ChatCompletionFinishReason::ToolCalls);

        let merged = helper
            .merge(Some(call_chunk(Some("t1"), Some("lookup"), "{}")), finish)
            .unwrap();
        assert_eq!(calls(&merged).len(), 1);
        assert_eq!(
            merged.choices[0].finish_reason,
            Some(ChatCompletionFinishReason::ToolCalls)
        );
    }

    #[test]
    fn predicates_short_circuit_on_empty_choices() {
        let helper = StreamFunctionCallingHelper::new();
        let empty = ChatCompletionChunk::default();
        assert!(!helper.is_streaming_tool_call(&empty));
        assert!(!helper.is_streaming_tool_call_finished(&empty));
    }

    #[test]
    fn predicates_read_first_choice() {
        let helper = StreamFunctionCallingHelper::new();
        assert!(helper.is_streaming_tool_call(&call_chunk(Some("t1"), None, "")));
        assert!(!helper.is_streaming_tool_call(&text_chunk("hi")));

        let finished = chunk(ChatCompletionMessage::default(), Some(ChatCompletionFinishReason::ToolCalls));
        assert!(helper.is_streaming_tool_call_finished(&finished));
        let stopped = chunk(ChatCompletionMessage::default(), Some(ChatCompletionFinishReason::Stop));
        assert!(!helper.is_streaming_tool_call_finished(&stopped));
    }

    #[test]
    fn chunk_to_completion_fills_missing_delta() {
        let helper = StreamFunctionCallingHelper::new();
        let mut c = text_chunk("hi");
        c.choices.push(ChunkChoice::default());

        let completion = helper.chunk_to_completion(c);
        assert_eq!(completion.object.as_deref(), Some("chat.completion"));
        assert_eq!(completion.usage, None);
        assert_eq!(completion.choices.len(), 2);
        assert_eq!(completion.choices[1].message.text().as_deref(), Some(""));
        assert_eq!(completion.choices[1].message.role, Some(Role::Assistant));
    }
}
