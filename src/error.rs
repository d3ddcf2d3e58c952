//! Error Taxonomy
//!
//! Typed failures for the remote-store layer. Only [`DriveError::Transient`]
//! is ever retried.

use serde::Deserialize;

pub type DriveResult<T> = std::result::Result<T, DriveError>;

/// Guidance attached to intercepted not-found failures
pub const SEARCH_GUIDANCE: &str = "Use 'search_files' to find the new ID.";

/// Remote-store failures
///
/// `Clone` so one failed fetch can be handed to every caller waiting on the
/// same cache key.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DriveError {
    /// Rate limiting, 5xx, dropped connections
    #[error("Transient service error: {message}")]
    Transient { status: Option<u16>, message: String },

    /// Remote object does not exist
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// A not-found failure annotated with guidance toward name-based search
    #[error("Autonomous Recovery: File ID '{id}' not found. Suggesting search recovery. {guidance}")]
    RecoveryAdvised { id: String, guidance: String },

    /// Credentials missing, rejected or unrefreshable
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Non-retryable API failure
    #[error("Drive API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Response body could not be decoded
    #[error("Invalid response: {0}")]
    Decode(String),

    /// Request URL could not be built from the configured base
    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),
}

impl DriveError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            status: None,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Whether a retry may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Classify an HTTP failure from its status and (Google-formatted) body
    pub fn from_status(status: u16, body: &str) -> Self {
        let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok();
        let message = parsed
            .as_ref()
            .map(|e| e.error.message.clone())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| body.trim().to_string());
        let rate_limited = parsed
            .as_ref()
            .map(|e| {
                e.error
                    .errors
                    .iter()
                    .any(|d| d.reason == "rateLimitExceeded" || d.reason == "userRateLimitExceeded")
            })
            .unwrap_or(false);

        match status {
            404 => Self::NotFound { message },
            429 | 500 | 502 | 503 | 504 => Self::Transient {
                status: Some(status),
                message,
            },
            403 if rate_limited => Self::Transient {
                status: Some(status),
                message,
            },
            401 => Self::Auth(message),
            _ => Self::Api { status, message },
        }
    }
}

impl From<reqwest::Error> for DriveError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() || e.is_request() || e.is_body() {
            return Self::transient(e.to_string());
        }
        if e.is_decode() {
            return Self::Decode(e.to_string());
        }
        match e.status() {
            Some(status) => Self::from_status(status.as_u16(), &e.to_string()),
            None => Self::transient(e.to_string()),
        }
    }
}

/// Google API error body: `{"error": {"code", "message", "errors": [{"reason"}]}}`
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    reason: String,
}
