//! Deadline for a single transport call.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::YtoAiError;

/// Run `future`, failing with [`YtoAiError::Timeout`] once `duration`
/// elapses. A timeout is transient, so the retry policy around the call
/// will try again.
pub async fn with_timeout<T>(
    duration: Duration,
    future: impl Future<Output = Result<T, YtoAiError>>,
) -> Result<T, YtoAiError> {
    let timeout_ms = duration.as_millis() as u64;
    tokio::time::timeout(duration, future).await.unwrap_or_else(|_| {
        warn!(timeout_ms, "YtoAI request timed out");
        Err(YtoAiError::Timeout(timeout_ms))
    })
}
