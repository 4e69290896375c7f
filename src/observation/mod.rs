//! Observation hooks around model calls.
//!
//! A model call is wrapped with [`observe`] (or, for streams, an explicit
//! [`Observation`]): it runs inside a `tracing` span named by the
//! [`ObservationConvention`] and every registered [`ObservationHandler`] is
//! told when the call starts, stops and fails. The default registry has no
//! handlers, so the only cost is the span.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};
use tracing::{debug, Instrument, Span};

use crate::error::YtoAiError;
use crate::model::Usage;

/// Kind of model operation being observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Operation {
    Chat,
    Embedding,
    Image,
}

/// What the handlers learn about a response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseSummary {
    pub id: Option<String>,
    pub model: Option<String>,
    pub usage: Option<Usage>,
    #[serde(default)]
    pub finish_reasons: Vec<String>,
}

/// Everything known about one observed call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationContext {
    pub operation: Operation,
    pub provider: String,
    /// Resolved request options, as sent.
    pub request_options: serde_json::Value,
    pub response: Option<ResponseSummary>,
}

impl ObservationContext {
    pub fn new(operation: Operation, provider: impl Into<String>) -> Self {
        Self {
            operation,
            provider: provider.into(),
            request_options: serde_json::Value::Null,
            response: None,
        }
    }

    pub fn with_request_options<T: Serialize>(mut self, options: &T) -> Self {
        self.request_options = serde_json::to_value(options).unwrap_or(serde_json::Value::Null);
        self
    }

    /// Requested model, from the request options.
    pub fn request_model(&self) -> Option<&str> {
        self.request_options.get("model").and_then(|m| m.as_str())
    }
}

/// Receives lifecycle callbacks for observed calls.
pub trait ObservationHandler: Send + Sync {
    fn on_start(&self, _name: &str, _context: &ObservationContext) {}

    fn on_stop(&self, _name: &str, _context: &ObservationContext) {}

    fn on_error(&self, _name: &str, _context: &ObservationContext, _error: &YtoAiError) {}
}

/// Names observations.
pub trait ObservationConvention: Send + Sync {
    fn name(&self, context: &ObservationContext) -> String;
}

/// `"{operation} {model}"`, or just the operation when no model is known.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultObservationConvention;

impl ObservationConvention for DefaultObservationConvention {
    fn name(&self, context: &ObservationContext) -> String {
        match context.request_model() {
            Some(model) if !model.is_empty() => format!("{} {}", context.operation, model),
            _ => context.operation.to_string(),
        }
    }
}

/// The set of handlers notified for every observation.
#[derive(Clone, Default)]
pub struct ObservationRegistry {
    handlers: Vec<Arc<dyn ObservationHandler>>,
}

impl ObservationRegistry {
    /// A registry with no handlers.
    pub fn noop() -> Self {
        Self::default()
    }

    pub fn with_handler(mut self, handler: Arc<dyn ObservationHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn is_noop(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for ObservationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservationRegistry")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// A started observation. Used directly for streams, where the call
/// outlives a single future.
///
/// Dropping an observation stops it, so a stream the caller abandons
/// early still reaches `on_stop`.
pub struct Observation {
    name: String,
    context: Mutex<ObservationContext>,
    registry: ObservationRegistry,
    span: Span,
    started: Instant,
    stopped: AtomicBool,
}

impl Observation {
    /// Open the span and notify `on_start`.
    pub fn start(
        registry: &ObservationRegistry,
        convention: &dyn ObservationConvention,
        context: ObservationContext,
    ) -> Self {
        let name = convention.name(&context);
        let span = tracing::info_span!(
            "ytoai.observation",
            otel.name = %name,
            operation = %context.operation,
            provider = %context.provider,
        );
        for handler in &registry.handlers {
            handler.on_start(&name, &context);
        }
        Self {
            name,
            context: Mutex::new(context),
            registry: registry.clone(),
            span,
            started: Instant::now(),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Record the response summary reported to `on_stop`.
    pub fn set_response(&self, response: ResponseSummary) {
        if let Ok(mut context) = self.context.lock() {
            context.response = Some(response);
        }
    }

    fn snapshot(&self) -> Option<ObservationContext> {
        self.context.lock().ok().map(|c| c.clone())
    }

    pub fn error(&self, error: &YtoAiError) {
        let Some(context) = self.snapshot() else {
            return;
        };
        self.span.in_scope(|| {
            debug!(name = %self.name, error = %error, "Observation failed");
        });
        for handler in &self.registry.handlers {
            handler.on_error(&self.name, &context, error);
        }
    }

    /// Notify `on_stop`. Only the first call has an effect.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        let Some(context) = self.snapshot() else {
            return;
        };
        self.span.in_scope(|| {
            debug!(
                name = %self.name,
                elapsed_ms = self.started.elapsed().as_millis() as u64,
                "Observation stopped"
            );
        });
        for handler in &self.registry.handlers {
            handler.on_stop(&self.name, &context);
        }
    }
}

impl Drop for Observation {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Run `call` as an observation. On success `summarize` turns the result
/// into the response summary handed to `on_stop`.
pub async fn observe<T, Fut, S>(
    registry: &ObservationRegistry,
    convention: &dyn ObservationConvention,
    context: ObservationContext,
    call: Fut,
    summarize: S,
) -> Result<T, YtoAiError>
where
    Fut: Future<Output = Result<T, YtoAiError>>,
    S: FnOnce(&T) -> ResponseSummary,
{
    let observation = Observation::start(registry, convention, context);
    let span = observation.span().clone();
    match call.instrument(span).await {
        Ok(value) => {
            observation.set_response(summarize(&value));
            observation.stop();
            Ok(value)
        }
        Err(e) => {
            observation.error(&e);
            observation.stop();
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl ObservationHandler for Recorder {
        fn on_start(&self, name: &str, _context: &ObservationContext) {
            self.events.lock().unwrap().push(format!("start:{name}"));
        }

        fn on_stop(&self, name: &str, context: &ObservationContext) {
            let id = context
                .response
                .as_ref()
                .and_then(|r| r.id.clone())
                .unwrap_or_default();
            self.events.lock().unwrap().push(format!("stop:{name}:{id}"));
        }

        fn on_error(&self, name: &str, _context: &ObservationContext, _error: &YtoAiError) {
            self.events.lock().unwrap().push(format!("error:{name}"));
        }
    }

    fn context() -> ObservationContext {
        ObservationContext::new(Operation::Chat, "ytoai")
            .with_request_options(&serde_json::json!({"model": "glm-4"}))
    }

    #[test]
    fn default_convention_names_by_operation_and_model() {
        assert_eq!(DefaultObservationConvention.name(&context()), "chat glm-4");
        let bare = ObservationContext::new(Operation::Image, "ytoai");
        assert_eq!(DefaultObservationConvention.name(&bare), "image");
    }

    #[tokio::test]
    async fn observe_reports_start_and_stop() {
        let recorder = Arc::new(Recorder::default());
        let registry = ObservationRegistry::noop().with_handler(recorder.clone());

        let value = observe(
            &registry,
            &DefaultObservationConvention,
            context(),
            async { Ok::<_, YtoAiError>(7) },
            |_| ResponseSummary {
                id: Some("r1".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(value, 7);
        assert_eq!(
            *recorder.events.lock().unwrap(),
            vec!["start:chat glm-4".to_string(), "stop:chat glm-4:r1".to_string()]
        );
    }

    #[test]
    fn dropped_observation_stops_exactly_once() {
        let recorder = Arc::new(Recorder::default());
        let registry = ObservationRegistry::noop().with_handler(recorder.clone());

        let stopped = Observation::start(&registry, &DefaultObservationConvention, context());
        stopped.stop();
        drop(stopped);
        drop(Observation::start(&registry, &DefaultObservationConvention, context()));

        assert_eq!(
            *recorder.events.lock().unwrap(),
            vec![
                "start:chat glm-4".to_string(),
                "stop:chat glm-4:".to_string(),
                "start:chat glm-4".to_string(),
                "stop:chat glm-4:".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn observe_reports_errors() {
        let recorder = Arc::new(Recorder::default());
        let registry = ObservationRegistry::noop().with_handler(recorder.clone());

        let result: Result<(), _> = observe(
            &registry,
            &DefaultObservationConvention,
            context(),
            async { Err(YtoAiError::Timeout(10)) },
            |_| ResponseSummary::default(),
        )
        .await;

        assert!(result.is_err());
        let events = recorder.events.lock().unwrap();
        assert_eq!(events[1], "error:chat glm-4");
        assert_eq!(events[2], "stop:chat glm-4:");
    }
}
