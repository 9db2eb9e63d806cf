//! External generation API integration

pub mod client;
pub mod error;
pub mod response;

pub use client::{GeminiImageClient, GenerationBackend, GenerationRequest};
pub use error::ProviderError;
pub use response::{ArtifactPayload, DEFAULT_MIME_TYPE, extract_artifact};
