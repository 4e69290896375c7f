//! Unified error classification and recovery.

use serde::{Deserialize, Serialize};

/// Machine-readable error code, derived from the vendor error envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidApiKey,
    InsufficientQuota,
    RateLimitExceeded,
    ModelNotFound,
    InvalidRequest,
    ContentFiltered,
    ContextLengthExceeded,
    ServerError,
    ServiceUnavailable,
    Unknown,
}

impl ErrorCode {
    /// Map an HTTP status to the closest code.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => Self::InvalidRequest,
            401 | 403 => Self::InvalidApiKey,
            402 => Self::InsufficientQuota,
            404 => Self::ModelNotFound,
            413 => Self::ContextLengthExceeded,
            429 => Self::RateLimitExceeded,
            451 => Self::ContentFiltered,
            503 => Self::ServiceUnavailable,
            500..=599 => Self::ServerError,
            _ => Self::Unknown,
        }
    }
}

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authentication,
    RateLimit,
    Network,
    Timeout,
    Server,
    Api,
    Configuration,
    Serialization,
    Protocol,
    ToolExecution,
    Unknown,
}

/// Structured details returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorDetails {
    pub code: Option<ErrorCode>,
    pub provider_code: Option<String>,
    pub request_id: Option<String>,
}

/// Suggested recovery action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    RetryWithBackoff,
    CheckCredentials,
    CheckConfiguration,
    IncreaseTimeout,
    CheckToolImplementation,
    ReportUnsupportedResponse,
    ContactSupport,
}
