//! Classification of YtoAI errors.

use ytoai::error::*;

#[test]
fn api_error_display() {
    let err = YtoAiError::api(404, "model not found");
    assert!(matches!(&err, YtoAiError::Api { status: 404, .. }));
    assert_eq!(err.to_string(), "API error (status 404): model not found");
}

#[test]
fn categories_drive_retry_and_recovery() {
    struct Case {
        error: YtoAiError,
        category: ErrorCategory,
        retryable: bool,
        recovery: RecoverySuggestion,
    }

    let serde_error = serde_json::from_str::<serde_json::Value>("{broken").unwrap_err();

    let cases = vec![
        Case {
            error: YtoAiError::Authentication("invalid api key".into()),
            category: ErrorCategory::Authentication,
            retryable: false,
            recovery: RecoverySuggestion::CheckCredentials,
        },
        Case {
            error: YtoAiError::RateLimited {
                retry_after_ms: Some(2000),
            },
            category: ErrorCategory::RateLimit,
            retryable: true,
            recovery: RecoverySuggestion::RetryWithBackoff,
        },
        Case {
            error: YtoAiError::Timeout(120_000),
            category: ErrorCategory::Timeout,
            retryable: true,
            recovery: RecoverySuggestion::IncreaseTimeout,
        },
        Case {
            error: YtoAiError::api(500, "internal"),
            category: ErrorCategory::Server,
            retryable: true,
            recovery: RecoverySuggestion::RetryWithBackoff,
        },
        Case {
            error: YtoAiError::api(429, "slow down"),
            category: ErrorCategory::RateLimit,
            retryable: true,
            recovery: RecoverySuggestion::RetryWithBackoff,
        },
        Case {
            error: YtoAiError::api(403, "forbidden"),
            category: ErrorCategory::Authentication,
            retryable: false,
            recovery: RecoverySuggestion::CheckCredentials,
        },
        Case {
            error: YtoAiError::api(400, "bad request"),
            category: ErrorCategory::Api,
            retryable: false,
            recovery: RecoverySuggestion::ContactSupport,
        },
        Case {
            error: YtoAiError::Configuration("YtoAI API key must be set".into()),
            category: ErrorCategory::Configuration,
            retryable: false,
            recovery: RecoverySuggestion::CheckConfiguration,
        },
        Case {
            error: YtoAiError::Serialization(serde_error),
            category: ErrorCategory::Serialization,
            retryable: false,
            recovery: RecoverySuggestion::ContactSupport,
        },
        Case {
            error: YtoAiError::ToolCallProtocol("two calls in one chunk".into()),
            category: ErrorCategory::Protocol,
            retryable: false,
            recovery: RecoverySuggestion::ReportUnsupportedResponse,
        },
        Case {
            error: YtoAiError::ToolExecution {
                tool_name: "get_weather".into(),
                message: "city missing".into(),
            },
            category: ErrorCategory::ToolExecution,
            retryable: false,
            recovery: RecoverySuggestion::CheckToolImplementation,
        },
        Case {
            error: YtoAiError::InvalidState("no tool call".into()),
            category: ErrorCategory::Unknown,
            retryable: false,
            recovery: RecoverySuggestion::ContactSupport,
        },
        Case {
            error: YtoAiError::InvalidArgument("empty prompt".into()),
            category: ErrorCategory::Unknown,
            retryable: false,
            recovery: RecoverySuggestion::ContactSupport,
        },
    ];

    for case in cases {
        assert_eq!(case.error.category(), case.category, "{}", case.error);
        assert_eq!(case.error.is_retryable(), case.retryable, "{}", case.error);
        assert_eq!(case.error.recovery_suggestion(), case.recovery, "{}", case.error);
    }
}

#[test]
fn api_with_details_keeps_vendor_fields() {
    let details = ErrorDetails {
        code: Some(ErrorCode::ContentFiltered),
        provider_code: Some("1301".into()),
        request_id: Some("req-42".into()),
    };
    let err = YtoAiError::api_with_details(451, "content rejected", details);

    match err {
        YtoAiError::Api {
            status,
            message,
            details: Some(details),
            ..
        } => {
            assert_eq!(status, 451);
            assert_eq!(message, "content rejected");
            assert_eq!(details.code, Some(ErrorCode::ContentFiltered));
            assert_eq!(details.provider_code.as_deref(), Some("1301"));
            assert_eq!(details.request_id.as_deref(), Some("req-42"));
        }
        other => panic!("expected api error with details, got {other:?}"),
    }
}

#[test]
fn error_codes_follow_http_status() {
    assert_eq!(ErrorCode::from_status(401), ErrorCode::InvalidApiKey);
    assert_eq!(ErrorCode::from_status(429), ErrorCode::RateLimitExceeded);
    assert_eq!(ErrorCode::from_status(503), ErrorCode::ServiceUnavailable);
    assert_eq!(ErrorCode::from_status(502), ErrorCode::ServerError);
    assert_eq!(ErrorCode::from_status(302), ErrorCode::Unknown);
}
