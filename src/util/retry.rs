//! Retry with exponential backoff and jitter.
//!
//! [`RetryPolicy::execute`] wraps a single transport call. Only errors that
//! report [`YtoAiError::is_retryable`] are retried; everything else is
//! returned to the caller on the first failure.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::YtoAiError;

/// Callbacks fired by [`RetryPolicy::execute`].
pub trait RetryListener: Send + Sync {
    /// A retryable attempt failed and will be retried. `attempt` is 1-based.
    fn on_retry(&self, _attempt: u32, _error: &YtoAiError) {}

    /// The operation succeeded after `retries` failed attempts.
    fn on_success(&self, _retries: u32) {}
}

/// Retry policy configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Initial backoff duration.
    #[serde(with = "duration_millis")]
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    #[serde(with = "duration_millis")]
    pub max_backoff: Duration,
    /// Backoff multiplier.
    pub multiplier: f64,
    #[serde(skip)]
    listeners: Vec<Arc<dyn RetryListener>>,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("initial_backoff", &self.initial_backoff)
            .field("max_backoff", &self.max_backoff)
            .field("multiplier", &self.multiplier)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500), Duration::from_secs(30), 2.0)
    }
}

impl RetryPolicy {
    pub fn new(
        max_attempts: u32,
        initial_backoff: Duration,
        max_backoff: Duration,
        multiplier: f64,
    ) -> Self {
        Self {
            max_attempts,
            initial_backoff,
            max_backoff,
            multiplier,
            listeners: Vec::new(),
        }
    }

    /// Many attempts with a fixed 100ms backoff.
    pub fn short() -> Self {
        Self::new(10, Duration::from_millis(100), Duration::from_millis(100), 1.0)
    }

    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO, 1.0)
    }

    /// Register a listener.
    pub fn with_listener(mut self, listener: Arc<dyn RetryListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Execute an async operation with retry.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, YtoAiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, YtoAiError>>,
    {
        let mut backoff = self.initial_backoff;
        let mut last_error = None;

        for attempt in 0..self.max_attempts {
            match operation().await {
                Ok(value) => {
                    for listener in &self.listeners {
                        listener.on_success(attempt);
                    }
                    return Ok(value);
                }
                Err(e) => {
                    if !e.is_retryable() || attempt + 1 >= self.max_attempts {
                        return Err(e);
                    }

                    tracing::warn!(
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "Retrying after error"
                    );
                    for listener in &self.listeners {
                        listener.on_retry(attempt + 1, &e);
                    }

                    // Jitter: 75%-125% of backoff, never shorter than the server's retry-after
                    let jitter_factor = 0.75 + (rand_factor() * 0.5);
                    let mut sleep_duration =
                        Duration::from_secs_f64(backoff.as_secs_f64() * jitter_factor);
                    if let YtoAiError::RateLimited {
                        retry_after_ms: Some(retry_after_ms),
                    } = &e
                    {
                        sleep_duration = sleep_duration.max(Duration::from_millis(*retry_after_ms));
                    }
                    tokio::time::sleep(sleep_duration).await;

                    backoff = Duration::from_secs_f64(
                        (backoff.as_secs_f64() * self.multiplier)
                            .min(self.max_backoff.as_secs_f64()),
                    );

                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            YtoAiError::InvalidState("retry policy allows zero attempts".into())
        }))
    }
}

/// Simple pseudo-random factor [0, 1) without pulling in rand crate.
fn rand_factor() -> f64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos()
        .hash(&mut hasher);
    std::thread::current().id().hash(&mut hasher);

    let hash = hasher.finish();
    (hash % 10000) as f64 / 10000.0
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
