//! Generation client
//!
//! One external call per item. The HTTP implementation targets the Gemini
//! `generateContent` endpoint; the `GenerationBackend` trait is the seam the
//! item processor and tests depend on.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    Client, ClientBuilder,
    header::{CONTENT_TYPE, HeaderMap, HeaderValue},
};
use serde_json::{Value, json};
use tokio::time::timeout;
use tracing::debug;

use super::error::ProviderError;
use super::response::{ArtifactPayload, extract_artifact, is_empty_response};
use crate::config::ProviderConfig;

/// One item's worth of request data, assembled by the item processor
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Text prompt
    pub prompt: String,
    /// Provider model name
    pub model: String,
    /// Optional aspect ratio, e.g. "16:9"
    pub aspect_ratio: Option<String>,
    /// Optional resolution, e.g. "2K"
    pub resolution: Option<String>,
    /// Reference images as `data:` URLs
    pub reference_images: Vec<String>,
}

/// Seam between the item processor and the external API
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Execute one generation call. One request represents one item; the
    /// per-attempt timeout is enforced here.
    async fn generate(
        &self,
        request: &GenerationRequest,
        api_key: &str,
    ) -> Result<ArtifactPayload, ProviderError>;
}

/// HTTP client for the Gemini image generation API
#[derive(Debug, Clone)]
pub struct GeminiImageClient {
    base_url: String,
    request_timeout: Duration,
    http_client: Client,
}

impl GeminiImageClient {
    /// Build the client with connect and per-attempt request timeouts
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let http_client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| {
                ProviderError::TransientNetwork(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            http_client,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }

    fn build_headers(api_key: &str) -> Result<HeaderMap, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut key_value = HeaderValue::from_str(api_key)
            .map_err(|_| ProviderError::Authentication("API key contains invalid characters".to_string()))?;
        key_value.set_sensitive(true);
        headers.insert("x-goog-api-key", key_value);
        Ok(headers)
    }

    /// Assemble the provider request body for one item
    pub fn build_request_body(request: &GenerationRequest) -> Result<Value, ProviderError> {
        let mut parts = vec![json!({"text": request.prompt})];

        for data_url in &request.reference_images {
            let (mime_type, data) = parse_data_url(data_url)?;
            parts.push(json!({
                "inlineData": {
                    "mimeType": mime_type,
                    "data": data
                }
            }));
        }

        let mut generation_config = json!({
            "responseModalities": ["IMAGE"]
        });
        let mut image_config = json!({});
        if let Some(aspect_ratio) = &request.aspect_ratio {
            image_config["aspectRatio"] = json!(aspect_ratio);
        }
        if let Some(resolution) = &request.resolution {
            image_config["imageSize"] = json!(resolution);
        }
        if !image_config.as_object().is_some_and(|o| o.is_empty()) {
            generation_config["imageConfig"] = image_config;
        }

        Ok(json!({
            "contents": [{
                "role": "user",
                "parts": parts
            }],
            "generationConfig": generation_config
        }))
    }

    async fn handle_response(&self, response: reqwest::Response) -> Result<ArtifactPayload, ProviderError> {
        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ProviderError::TransientNetwork(format!("failed to read response body: {}", e))
        })?;

        debug!(status = status.as_u16(), "provider response received");

        if !status.is_success() {
            return Err(ProviderError::from_http_status(status.as_u16(), &body));
        }

        if body.trim().is_empty() {
            return Err(ProviderError::TransientNetwork(
                "provider returned an empty response body".to_string(),
            ));
        }

        let json_response: Value = serde_json::from_str(&body).map_err(|e| {
            ProviderError::MalformedResponse(format!("response is not valid JSON: {}", e))
        })?;

        if json_response.get("error").is_some() {
            return Err(ProviderError::from_api_response(&json_response));
        }

        if is_empty_response(&json_response) {
            return Err(ProviderError::TransientNetwork(
                "provider response contained no candidates".to_string(),
            ));
        }

        extract_artifact(&json_response).ok_or_else(|| {
            ProviderError::MalformedResponse(
                "no inline image data found under either response shape".to_string(),
            )
        })
    }
}

#[async_trait]
impl GenerationBackend for GeminiImageClient {
    async fn generate(
        &self,
        request: &GenerationRequest,
        api_key: &str,
    ) -> Result<ArtifactPayload, ProviderError> {
        let url = self.endpoint(&request.model);
        let headers = Self::build_headers(api_key)?;
        let body = Self::build_request_body(request)?;

        debug!(model = %request.model, "sending generation request");

        let response = timeout(
            self.request_timeout,
            self.http_client.post(&url).headers(headers).json(&body).send(),
        )
        .await
        .map_err(|_| ProviderError::TransientNetwork("request timed out".to_string()))?
        .map_err(|e| {
            if e.is_timeout() {
                ProviderError::TransientNetwork("request timed out".to_string())
            } else {
                ProviderError::TransientNetwork(format!("network error: {}", e))
            }
        })?;

        self.handle_response(response).await
    }
}

/// Split a `data:` URL into its media type and base64 payload
fn parse_data_url(data_url: &str) -> Result<(String, String), ProviderError> {
    let stripped = data_url.strip_prefix("data:").ok_or_else(|| {
        ProviderError::InvalidRequest("reference image must be a data: URL".to_string())
    })?;

    let (header, data) = stripped.split_once(',').ok_or_else(|| {
        ProviderError::InvalidRequest("invalid data URL format".to_string())
    })?;

    let mime_type = header.split(';').next().unwrap_or("");
    let mime_type = if mime_type.is_empty() {
        "application/octet-stream"
    } else {
        mime_type
    };

    Ok((mime_type.to_string(), data.to_string()))
}
