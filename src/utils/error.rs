//! Error handling for the engine
//!
//! This module defines the top-level error type used throughout the crate.
//! Per-item provider failures are never represented here; they are captured
//! in `ItemResult`s by the item processor. `EngineError` covers the job-level
//! and infrastructure failure modes.

use crate::core::credential::CredentialError;
use crate::core::provider::error::ProviderError;
use crate::utils::crypto::CryptoError;
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use thiserror::Error;

/// Result type alias for the engine
pub type Result<T> = std::result::Result<T, EngineError>;

/// Main error type for the engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown execution or artifact reference
    #[error("Not found: {0}")]
    NotFound(String),

    /// Illegal state transition (e.g. claiming a non-pending execution)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Credential resolution errors
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    /// Crypto errors
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Provider errors that escape the per-item boundary
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// HTTP client errors
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Artifact storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResponseError for EngineError {
    fn status_code(&self) -> StatusCode {
        match self {
            EngineError::Validation(_) | EngineError::Credential(_) => StatusCode::BAD_REQUEST,
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::Conflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "success": false,
            "error": self.to_string(),
        }))
    }
}
