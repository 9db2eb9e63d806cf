//! Provider failure classification
//!
//! Every external-call failure is classified into one of the variants below.
//! The classification feeds the retry policy: transient network faults and
//! rate limits are retried, authentication and client errors fail fast.

use serde_json::Value;
use thiserror::Error;

/// Classified failure from one generation call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Invalid or missing API key; never retried
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Per-credential quota exhausted; retried with backoff
    #[error("rate limited: {message}")]
    RateLimited {
        /// Provider message
        message: String,
        /// Server-suggested delay in seconds, honored when present
        retry_after: Option<u64>,
    },

    /// Timeout, connection failure, 5xx, or an ambiguous empty response
    #[error("transient network error: {0}")]
    TransientNetwork(String),

    /// The provider answered but the artifact is missing under both
    /// documented response shapes; never retried
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    /// Client-side validation failure (bad prompt, oversized input)
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Any other provider status
    #[error("provider error (status {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Provider message
        message: String,
    },
}

impl ProviderError {
    /// Whether the retry policy may attempt this failure again
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            ProviderError::TransientNetwork(_) | ProviderError::RateLimited { .. }
        )
    }

    /// Classify a non-success HTTP response
    pub fn from_http_status(status: u16, body: &str) -> Self {
        match status {
            400 => ProviderError::InvalidRequest(short_message(body)),
            401 | 403 => ProviderError::Authentication("invalid or missing API key".to_string()),
            404 => ProviderError::InvalidRequest("model or endpoint not found".to_string()),
            408 => ProviderError::TransientNetwork("request timed out".to_string()),
            429 => ProviderError::RateLimited {
                message: short_message(body),
                retry_after: extract_retry_after(body),
            },
            500..=599 => {
                ProviderError::TransientNetwork(format!("server error (status {})", status))
            }
            _ => ProviderError::Api {
                status,
                message: short_message(body),
            },
        }
    }

    /// Classify an error object embedded in a 200-level response body.
    /// Follows the documented Google error contract (`status` strings).
    pub fn from_api_response(response: &Value) -> Self {
        let Some(error) = response.get("error") else {
            return ProviderError::MalformedResponse("unrecognized error body".to_string());
        };

        let code = error.get("code").and_then(|c| c.as_u64()).unwrap_or(500) as u16;
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("unknown provider error")
            .to_string();
        let status = error.get("status").and_then(|s| s.as_str()).unwrap_or("");

        match (code, status) {
            (401, _) | (403, _) | (_, "UNAUTHENTICATED") | (_, "PERMISSION_DENIED") => {
                ProviderError::Authentication(message)
            }
            (400, _) | (_, "INVALID_ARGUMENT") | (_, "FAILED_PRECONDITION") => {
                ProviderError::InvalidRequest(message)
            }
            (429, _) | (_, "RESOURCE_EXHAUSTED") => ProviderError::RateLimited {
                retry_after: retry_after_from_error(error),
                message,
            },
            (503, _) | (_, "UNAVAILABLE") | (_, "INTERNAL") => {
                ProviderError::TransientNetwork(message)
            }
            _ => ProviderError::Api {
                status: code,
                message,
            },
        }
    }
}

/// First line of a (possibly JSON) error body, bounded; raw bodies are for
/// logs, not for client-facing messages.
fn short_message(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        if let Some(message) = json
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return message.to_string();
        }
    }
    let line = body.lines().next().unwrap_or("").trim();
    if line.is_empty() {
        "no error details provided".to_string()
    } else {
        line.chars().take(200).collect()
    }
}

fn extract_retry_after(body: &str) -> Option<u64> {
    let json = serde_json::from_str::<Value>(body).ok()?;
    retry_after_from_error(json.get("error")?)
}

/// Pull a retry delay out of a Google error object: either a bare
/// `retry_after` key or a RetryInfo detail with `retryDelay: "30s"`.
fn retry_after_from_error(error: &Value) -> Option<u64> {
    if let Some(seconds) = error.get("retry_after").and_then(|v| v.as_u64()) {
        return Some(seconds);
    }
    let details = error.get("details")?.as_array()?;
    for detail in details {
        if let Some(delay) = detail.get("retryDelay").and_then(|d| d.as_str()) {
            if let Ok(seconds) = delay.trim_end_matches('s').parse::<u64>() {
                return Some(seconds);
            }
        }
    }
    None
}
