//! Shared HTTP client, SSE parsing, and status mapping.

use std::sync::OnceLock;

use futures::{Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;

use crate::error::{ErrorCode, ErrorDetails, YtoAiError};

static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Get (or create) the shared reqwest client.
pub fn shared_client() -> &'static reqwest::Client {
    SHARED_CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .build()
            .expect("Failed to build HTTP client")
    })
}

/// Build default headers for a Bearer-token API.
pub fn bearer_headers(api_key: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Ok(val) = HeaderValue::from_str(&format!("Bearer {api_key}")) {
        headers.insert(AUTHORIZATION, val);
    }
    headers
}

/// Join a base URL and an absolute API path without doubling slashes.
pub fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

/// Parse an SSE "data:" line, returning None for "[DONE]".
pub fn parse_sse_data(line: &str) -> Option<&str> {
    let data = line.strip_prefix("data:")?.trim_start();
    if data == "[DONE]" {
        return None;
    }
    Some(data)
}

/// Split a response body into trimmed SSE lines.
///
/// Bytes are buffered until a whole line has arrived, so a multi-byte
/// character split across network chunks decodes intact. A trailing line
/// without a newline is flushed when the body ends.
pub fn sse_lines<S, B, E>(bytes: S) -> impl Stream<Item = Result<String, YtoAiError>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<YtoAiError>,
{
    async_stream::stream! {
        let mut buffer: Vec<u8> = Vec::new();
        futures::pin_mut!(bytes);

        while let Some(chunk) = bytes.next().await {
            match chunk {
                Ok(chunk) => buffer.extend_from_slice(chunk.as_ref()),
                Err(e) => {
                    yield Err(e.into());
                    return;
                }
            }

            while let Some(end) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=end).collect();
                yield Ok(String::from_utf8_lossy(&line).trim().to_string());
            }
        }

        if !buffer.is_empty() {
            yield Ok(String::from_utf8_lossy(&buffer).trim().to_string());
        }
    }
}

/// Map a non-success HTTP status to an error.
pub fn status_to_error(status: u16, body: &str) -> YtoAiError {
    match status {
        401 | 403 => YtoAiError::Authentication(error_message(body)),
        429 => YtoAiError::RateLimited {
            retry_after_ms: extract_retry_after(body),
        },
        _ => match extract_details(status, body) {
            Some(details) => YtoAiError::api_with_details(status, error_message(body), details),
            None => YtoAiError::api(status, body),
        },
    }
}

/// Turn a response into `T`, mapping error statuses and treating an empty
/// body as absent.
pub async fn read_json_body<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<Option<T>, YtoAiError> {
    let status = response.status().as_u16();
    if !response.status().is_success() {
        let body_text = response.text().await.unwrap_or_default();
        return Err(status_to_error(status, &body_text));
    }

    let bytes = response.bytes().await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    Ok(Some(serde_json::from_slice(&bytes)?))
}

fn error_envelope(body: &str) -> Option<serde_json::Value> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").cloned())
}

fn error_message(body: &str) -> String {
    error_envelope(body)
        .and_then(|e| e.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

fn extract_details(status: u16, body: &str) -> Option<ErrorDetails> {
    let envelope = error_envelope(body)?;
    let provider_code = envelope.get("code").and_then(|c| match c {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    });
    let request_id = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("request_id").and_then(|r| r.as_str()).map(str::to_string));
    Some(ErrorDetails {
        code: Some(ErrorCode::from_status(status)),
        provider_code,
        request_id,
    })
}

fn extract_retry_after(body: &str) -> Option<u64> {
    error_envelope(body)
        .and_then(|e| e.get("retry_after").and_then(|r| r.as_f64()))
        .map(|s| (s * 1000.0) as u64)
}
