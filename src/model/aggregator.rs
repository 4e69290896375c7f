//! Folding a stream of partial chat responses into one.

use futures::stream::BoxStream;
use futures::StreamExt;

use super::chat::{ChatGenerationMetadata, ChatResponse, ChatResponseMetadata, Generation};
use super::message::AssistantMessage;
use crate::error::YtoAiError;

/// Accumulates partial responses: text is concatenated, tool calls are
/// collected in order, and the last non-empty metadata wins.
#[derive(Debug, Default)]
pub struct MessageAggregator {
    output: AssistantMessage,
    generation_metadata: ChatGenerationMetadata,
    metadata: ChatResponseMetadata,
}

impl MessageAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one partial response into the aggregate.
    pub fn push(&mut self, response: &ChatResponse) {
        if !response.metadata.is_empty() {
            self.metadata = response.metadata.clone();
        }

        let Some(generation) = response.result() else {
            return;
        };

        self.output.content.push_str(&generation.output.content);
        self.output
            .tool_calls
            .extend(generation.output.tool_calls.iter().cloned());
        for (key, value) in &generation.output.metadata {
            self.output.metadata.insert(key.clone(), value.clone());
        }

        if generation.metadata.finish_reason.is_some() {
            self.generation_metadata.finish_reason = generation.metadata.finish_reason.clone();
        }
        for (key, value) in &generation.metadata.extra {
            self.generation_metadata.extra.insert(key.clone(), value.clone());
        }
    }

    /// The aggregated response.
    pub fn finish(self) -> ChatResponse {
        ChatResponse::new(vec![
            Generation::new(self.output).with_metadata(self.generation_metadata)
        ])
        .with_metadata(self.metadata)
    }

    /// Pass `stream` through unchanged and hand the aggregate to
    /// `on_complete` once it ends without error.
    pub fn aggregate<F>(
        stream: BoxStream<'static, Result<ChatResponse, YtoAiError>>,
        on_complete: F,
    ) -> BoxStream<'static, Result<ChatResponse, YtoAiError>>
    where
        F: FnOnce(ChatResponse) + Send + 'static,
    {
        let aggregated = async_stream::stream! {
            let mut aggregator = MessageAggregator::new();
            let mut failed = false;
            futures::pin_mut!(stream);

            while let Some(item) = stream.next().await {
                match &item {
                    Ok(response) => aggregator.push(response),
                    Err(_) => failed = true,
                }
                yield item;
            }

            if !failed {
                on_complete(aggregator.finish());
            }
        };
        Box::pin(aggregated)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::model::chat::Usage;
    use crate::model::message::ToolCall;

    fn partial(text: &str) -> ChatResponse {
        ChatResponse::new(vec![Generation::new(AssistantMessage::new(text))])
    }

    #[test]
    fn push_concatenates_text_and_keeps_last_metadata() {
        let mut aggregator = MessageAggregator::new();
        aggregator.push(&partial("Hel"));

        let mut last = partial("lo");
        last.generations[0].metadata = ChatGenerationMetadata::from_finish_reason("stop");
        last.metadata = ChatResponseMetadata {
            id: "c1".into(),
            model: "glm-4".into(),
            usage: Usage::new(2, 3),
            ..Default::default()
        };
        aggregator.push(&last);

        let response = aggregator.finish();
        assert_eq!(response.text(), "Hello");
        assert_eq!(response.metadata.id, "c1");
        assert_eq!(
            response.generations[0].metadata.finish_reason.as_deref(),
            Some("stop")
        );
    }

    #[test]
    fn push_collects_tool_calls() {
        let mut aggregator = MessageAggregator::new();
        let mut with_call = partial("");
        with_call.generations[0].output.tool_calls.push(ToolCall {
            id: "t1".into(),
            kind: "function".into(),
            name: "f".into(),
            arguments: "{}".into(),
        });
        aggregator.push(&with_call);
        aggregator.push(&ChatResponse::default());

        let response = aggregator.finish();
        assert!(response.has_tool_calls());
    }

    #[tokio::test]
    async fn aggregate_reports_on_completion() {
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        let source = futures::stream::iter(vec![Ok(partial("a")), Ok(partial("b"))]).boxed();

        let items: Vec<_> = MessageAggregator::aggregate(source, move |r| {
            *sink.lock().unwrap() = Some(r);
        })
        .collect()
        .await;

        assert_eq!(items.len(), 2);
        let aggregated = seen.lock().unwrap().take().unwrap();
        assert_eq!(aggregated.text(), "ab");
    }

    #[tokio::test]
    async fn aggregate_skips_callback_on_error() {
        let called = Arc::new(Mutex::new(false));
        let flag = called.clone();
        let source = futures::stream::iter(vec![
            Ok(partial("a")),
            Err(YtoAiError::Stream("boom".into())),
        ])
        .boxed();

        let _: Vec<_> = MessageAggregator::aggregate(source, move |_| {
            *flag.lock().unwrap() = true;
        })
        .collect()
        .await;

        assert!(!*called.lock().unwrap());
    }
}
