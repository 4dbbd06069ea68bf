//! Unified Error Type System
//!
//! Centralized error types for the provider layer.
//! Backend failures are classified into a small set of portable kinds so
//! calling code never depends on one vendor's error shapes.
//!
//! ## Error Kinds
//!
//! - **BadRequest**: malformed request or unknown vendor error (client-correctable)
//! - **AuthorizationFailure**: credentials rejected (client-correctable)
//! - **RateLimited**: quota or rate limit hit (transient)
//! - **ConnectionFailure**: transport failure (transient)
//! - **ServiceUnavailable**: vendor down, API error or timeout (transient)
//!
//! ## Design Principles
//!
//! - Single error type (ModelError) for the whole crate
//! - The model adapter is the only boundary that classifies backend errors
//! - Errors outside the known backend taxonomy pass through unchanged

use thiserror::Error;
use tracing::warn;

use crate::types::model::ModelType;

// =============================================================================
// Error Kinds
// =============================================================================

/// Portable, provider-agnostic failure classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid request payload - fix the request, don't retry
    BadRequest,
    /// Credentials rejected - fix the key, don't retry
    AuthorizationFailure,
    /// Rate limited - caller may retry later
    RateLimited,
    /// Could not reach the backend - caller may retry
    ConnectionFailure,
    /// Backend error, timeout or outage - caller may retry
    ServiceUnavailable,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::AuthorizationFailure => write!(f, "AUTHORIZATION_FAILURE"),
            Self::RateLimited => write!(f, "RATE_LIMITED"),
            Self::ConnectionFailure => write!(f, "CONNECTION_FAILURE"),
            Self::ServiceUnavailable => write!(f, "SERVICE_UNAVAILABLE"),
        }
    }
}

impl ErrorKind {
    /// Transient failures the caller may retry (this layer never does)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::ConnectionFailure | Self::ServiceUnavailable
        )
    }

    /// Failures the user can fix by changing the request or credentials
    pub fn is_client_correctable(&self) -> bool {
        matches!(self, Self::BadRequest | Self::AuthorizationFailure)
    }
}

// =============================================================================
// LLM Error
// =============================================================================

/// Classified LLM error. Built once at the failure boundary, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmError {
    /// Portable error kind
    pub kind: ErrorKind,
    /// Original message (prefixed with the upstream class where the kind is lossy)
    pub message: String,
    /// Upstream error class name, for diagnostics
    pub upstream: Option<String>,
    /// Provider that produced the error
    pub provider: Option<String>,
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(provider) = &self.provider {
            write!(f, "[{}:{}] {}", provider, self.kind, self.message)
        } else {
            write!(f, "[{}] {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for LlmError {}

impl LlmError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            upstream: None,
            provider: None,
        }
    }

    /// Create error with provider context
    pub fn with_provider(
        kind: ErrorKind,
        message: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            upstream: None,
            provider: Some(provider.into()),
        }
    }

    /// Attach the upstream error class name
    pub fn upstream(mut self, class: impl Into<String>) -> Self {
        self.upstream = Some(class.into());
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    pub fn is_client_correctable(&self) -> bool {
        self.kind.is_client_correctable()
    }
}

// =============================================================================
// Backend Error
// =============================================================================

/// Raw failure reported by a backend client, before classification
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    ApiConnection(String),

    #[error("{0}")]
    Api(String),

    #[error("{0}")]
    Timeout(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("{0}")]
    RateLimit(String),

    #[error("{0}")]
    Authentication(String),

    /// Any other error the backend declares, tagged with its class name
    #[error("{message}")]
    Vendor { class: String, message: String },

    /// Error outside the backend's taxonomy (never classified)
    #[error(transparent)]
    Foreign(Box<dyn std::error::Error + Send + Sync>),
}

impl BackendError {
    /// Upstream class name used to tag lossy classifications
    pub fn class_name(&self) -> &str {
        match self {
            Self::InvalidRequest(_) => "InvalidRequestError",
            Self::ApiConnection(_) => "APIConnectionError",
            Self::Api(_) => "APIError",
            Self::Timeout(_) => "Timeout",
            Self::ServiceUnavailable(_) => "ServiceUnavailableError",
            Self::RateLimit(_) => "RateLimitError",
            Self::Authentication(_) => "AuthenticationError",
            Self::Vendor { class, .. } => class.as_str(),
            Self::Foreign(_) => "ForeignError",
        }
    }

    /// Map a non-success Gemini REST response into the backend taxonomy.
    ///
    /// Gemini error bodies look like
    /// `{"error": {"code": 400, "message": "...", "status": "INVALID_ARGUMENT", "details": [...]}}`.
    pub fn from_http(status: u16, body: &str) -> Self {
        let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
        let error = parsed.as_ref().and_then(|v| v.get("error"));

        let message = error
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| {
                if body.is_empty() {
                    format!("HTTP {}", status)
                } else {
                    body.to_string()
                }
            });
        let status_name = error
            .and_then(|e| e.get("status"))
            .and_then(|s| s.as_str())
            .unwrap_or("");

        // Gemini reports a bad key as 400 INVALID_ARGUMENT with an API_KEY_INVALID reason
        let key_invalid = error
            .and_then(|e| e.get("details"))
            .and_then(|d| d.as_array())
            .is_some_and(|details| {
                details
                    .iter()
                    .any(|d| d.get("reason").and_then(|r| r.as_str()) == Some("API_KEY_INVALID"))
            });

        match (status, status_name) {
            _ if key_invalid => Self::Authentication(message),
            (401 | 403, _) | (_, "UNAUTHENTICATED" | "PERMISSION_DENIED") => {
                Self::Authentication(message)
            }
            (429, _) | (_, "RESOURCE_EXHAUSTED") => Self::RateLimit(message),
            (400, _) | (_, "INVALID_ARGUMENT" | "FAILED_PRECONDITION") => {
                Self::InvalidRequest(message)
            }
            (503, _) | (_, "UNAVAILABLE") => Self::ServiceUnavailable(message),
            (504, _) | (_, "DEADLINE_EXCEEDED") => Self::Timeout(message),
            (500..=599, _) => Self::Api(message),
            (_, "") => Self::Vendor {
                class: format!("HTTP{}", status),
                message,
            },
            (_, name) => Self::Vendor {
                class: name.to_string(),
                message,
            },
        }
    }

    /// Map a transport-level reqwest failure into the backend taxonomy
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() || err.is_request() {
            Self::ApiConnection(err.to_string())
        } else if err.is_decode() || err.is_body() {
            Self::Api(err.to_string())
        } else {
            Self::Foreign(Box::new(err))
        }
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Maps raw backend failures into portable error kinds
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify a backend failure.
    ///
    /// Total over the backend taxonomy; `BackendError::Foreign` is returned
    /// unchanged. Only logs, never retries.
    pub fn classify(err: BackendError, provider: &str) -> ModelError {
        let class = err.class_name().to_string();
        let tagged = format!("{}:{}", class, err);

        let llm_error = match err {
            BackendError::InvalidRequest(message) => {
                warn!("Invalid request to {} API", provider);
                LlmError::with_provider(ErrorKind::BadRequest, message, provider)
            }
            BackendError::ApiConnection(_) => {
                warn!("Failed to connect to {} API", provider);
                LlmError::with_provider(ErrorKind::ConnectionFailure, tagged, provider)
            }
            BackendError::Api(_)
            | BackendError::ServiceUnavailable(_)
            | BackendError::Timeout(_) => {
                warn!("{} service unavailable", provider);
                LlmError::with_provider(ErrorKind::ServiceUnavailable, tagged, provider)
            }
            BackendError::RateLimit(message) => {
                LlmError::with_provider(ErrorKind::RateLimited, message, provider)
            }
            BackendError::Authentication(message) => {
                LlmError::with_provider(ErrorKind::AuthorizationFailure, message, provider)
            }
            BackendError::Vendor { .. } => {
                LlmError::with_provider(ErrorKind::BadRequest, tagged, provider)
            }
            BackendError::Foreign(_) => return ModelError::Backend(err),
        };

        ModelError::Llm(llm_error.upstream(class))
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum ModelError {
    // -------------------------------------------------------------------------
    // Backend Errors
    // -------------------------------------------------------------------------
    /// Classified backend failure
    #[error("LLM error: {0}")]
    Llm(LlmError),

    /// Unrecognized backend failure, passed through as-is
    #[error(transparent)]
    Backend(BackendError),

    /// Provider credential probe failed; `source` keeps the raw root cause
    #[error("Credentials validation failed: {message}")]
    CredentialsValidation {
        message: String,
        #[source]
        source: Option<BackendError>,
    },

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    // -------------------------------------------------------------------------
    // Vault Errors
    // -------------------------------------------------------------------------
    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),

    // -------------------------------------------------------------------------
    // Registry Errors
    // -------------------------------------------------------------------------
    #[error("Provider {provider} does not support model type {model_type}")]
    UnsupportedModelType {
        provider: String,
        model_type: ModelType,
    },

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<LlmError> for ModelError {
    fn from(err: LlmError) -> Self {
        ModelError::Llm(err)
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;

impl ModelError {
    /// Create a credentials validation error without an underlying backend cause
    pub fn credentials(message: impl Into<String>) -> Self {
        Self::CredentialsValidation {
            message: message.into(),
            source: None,
        }
    }

    /// Portable kind, if this error was classified
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Llm(e) => Some(e.kind),
            _ => None,
        }
    }

    /// Check if the caller may retry this error
    pub fn is_retryable(&self) -> bool {
        self.kind().is_some_and(|k| k.is_retryable())
    }

    /// Check if the user can correct this error
    pub fn is_client_correctable(&self) -> bool {
        match self {
            Self::Llm(e) => e.is_client_correctable(),
            Self::CredentialsValidation { .. } => true,
            _ => false,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn known_errors() -> Vec<BackendError> {
        vec![
            BackendError::InvalidRequest("bad payload".into()),
            BackendError::ApiConnection("connection reset".into()),
            BackendError::Api("internal".into()),
            BackendError::Timeout("deadline".into()),
            BackendError::ServiceUnavailable("down".into()),
            BackendError::RateLimit("slow down".into()),
            BackendError::Authentication("bad key".into()),
            BackendError::Vendor {
                class: "NOT_FOUND".into(),
                message: "no such model".into(),
            },
        ]
    }

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::RateLimited.to_string(), "RATE_LIMITED");
        assert_eq!(
            ErrorKind::AuthorizationFailure.to_string(),
            "AUTHORIZATION_FAILURE"
        );
    }

    #[test]
    fn test_error_kind_retryable() {
        assert!(ErrorKind::RateLimited.is_retryable());
        assert!(ErrorKind::ConnectionFailure.is_retryable());
        assert!(ErrorKind::ServiceUnavailable.is_retryable());
        assert!(!ErrorKind::BadRequest.is_retryable());
        assert!(!ErrorKind::AuthorizationFailure.is_retryable());

        assert!(ErrorKind::BadRequest.is_client_correctable());
        assert!(ErrorKind::AuthorizationFailure.is_client_correctable());
        assert!(!ErrorKind::RateLimited.is_client_correctable());
    }

    #[test]
    fn test_classify_table() {
        let expected = [
            ErrorKind::BadRequest,
            ErrorKind::ConnectionFailure,
            ErrorKind::ServiceUnavailable,
            ErrorKind::ServiceUnavailable,
            ErrorKind::ServiceUnavailable,
            ErrorKind::RateLimited,
            ErrorKind::AuthorizationFailure,
            ErrorKind::BadRequest,
        ];

        for (err, kind) in known_errors().into_iter().zip(expected) {
            let classified = ErrorClassifier::classify(err, "gemini");
            assert_eq!(classified.kind(), Some(kind));
        }
    }

    #[test]
    fn test_classify_tags_upstream_class() {
        let err = ErrorClassifier::classify(BackendError::Api("boom".into()), "gemini");
        match err {
            ModelError::Llm(e) => {
                assert_eq!(e.message, "APIError:boom");
                assert_eq!(e.upstream.as_deref(), Some("APIError"));
                assert_eq!(e.provider.as_deref(), Some("gemini"));
            }
            other => panic!("unexpected: {other:?}"),
        }

        let vendor = ErrorClassifier::classify(
            BackendError::Vendor {
                class: "NOT_FOUND".into(),
                message: "no such model".into(),
            },
            "gemini",
        );
        match vendor {
            ModelError::Llm(e) => {
                assert_eq!(e.kind, ErrorKind::BadRequest);
                assert_eq!(e.message, "NOT_FOUND:no such model");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_classify_keeps_plain_messages() {
        let err = ErrorClassifier::classify(BackendError::Authentication("bad key".into()), "gemini");
        match err {
            ModelError::Llm(e) => assert_eq!(e.message, "bad key"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_classify_foreign_passes_through() {
        let io = std::io::Error::other("disk on fire");
        let err = ErrorClassifier::classify(BackendError::Foreign(Box::new(io)), "gemini");
        assert!(err.kind().is_none());
        match err {
            ModelError::Backend(BackendError::Foreign(inner)) => {
                assert_eq!(inner.to_string(), "disk on fire");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_from_http_status_codes() {
        assert!(matches!(
            BackendError::from_http(401, ""),
            BackendError::Authentication(_)
        ));
        assert!(matches!(
            BackendError::from_http(429, "{}"),
            BackendError::RateLimit(_)
        ));
        assert!(matches!(
            BackendError::from_http(400, "oops"),
            BackendError::InvalidRequest(_)
        ));
        assert!(matches!(
            BackendError::from_http(503, ""),
            BackendError::ServiceUnavailable(_)
        ));
        assert!(matches!(
            BackendError::from_http(504, ""),
            BackendError::Timeout(_)
        ));
        assert!(matches!(BackendError::from_http(500, ""), BackendError::Api(_)));
        assert!(matches!(
            BackendError::from_http(418, ""),
            BackendError::Vendor { .. }
        ));
    }

    #[test]
    fn test_from_http_gemini_body() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid. Please pass a valid API key.", "status": "INVALID_ARGUMENT", "details": [{"@type": "type.googleapis.com/google.rpc.ErrorInfo", "reason": "API_KEY_INVALID"}]}}"#;
        match BackendError::from_http(400, body) {
            BackendError::Authentication(message) => {
                assert!(message.starts_with("API key not valid"));
            }
            other => panic!("unexpected: {other:?}"),
        }

        let not_found = r#"{"error": {"code": 404, "message": "models/nope is not found", "status": "NOT_FOUND"}}"#;
        match BackendError::from_http(404, not_found) {
            BackendError::Vendor { class, message } => {
                assert_eq!(class, "NOT_FOUND");
                assert_eq!(message, "models/nope is not found");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_llm_error_display() {
        let err = LlmError::with_provider(ErrorKind::RateLimited, "Too many requests", "gemini");
        assert_eq!(err.to_string(), "[gemini:RATE_LIMITED] Too many requests");

        let err_no_provider = LlmError::new(ErrorKind::ConnectionFailure, "Connection failed");
        assert_eq!(err_no_provider.to_string(), "[CONNECTION_FAILURE] Connection failed");
    }

    #[test]
    fn test_model_error_helpers() {
        let err = ModelError::from(LlmError::new(ErrorKind::RateLimited, "later"));
        assert!(err.is_retryable());
        assert!(!err.is_client_correctable());

        let creds = ModelError::credentials("Gemini API key is required");
        assert!(creds.kind().is_none());
        assert!(creds.is_client_correctable());
    }
}
