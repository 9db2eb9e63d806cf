//! Response normalization
//!
//! The provider returns generated images under two equivalent shapes: REST
//! responses use camelCase (`inlineData` / `mimeType`), SDK-proxied responses
//! use snake_case (`inline_data` / `mime_type`). Both carry the same nested
//! object and must normalize identically. Absence of the artifact under
//! either shape is a hard failure for the caller, never a silent default.

use serde_json::Value;

/// Fallback media type when the provider omits the mime key
pub const DEFAULT_MIME_TYPE: &str = "image/png";

/// Normalized generated artifact: base64 payload plus media type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPayload {
    /// Base64-encoded image bytes
    pub data: String,
    /// Media type, defaulted to [`DEFAULT_MIME_TYPE`] when absent
    pub mime_type: String,
}

/// Extract the first inline image from a `generateContent` response.
///
/// Returns `None` when no candidate part carries inline data under either
/// key convention.
pub fn extract_artifact(response: &Value) -> Option<ArtifactPayload> {
    let candidates = response.get("candidates")?.as_array()?;
    for candidate in candidates {
        let parts = candidate
            .get("content")
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.as_array());
        let Some(parts) = parts else { continue };
        for part in parts {
            if let Some(payload) = inline_data_from_part(part) {
                return Some(payload);
            }
        }
    }
    None
}

/// Whether the response carries no candidates at all. An empty candidate
/// list is ambiguous (the provider sometimes returns it under load) and is
/// classified as transient by the client.
pub fn is_empty_response(response: &Value) -> bool {
    match response.get("candidates").and_then(|c| c.as_array()) {
        Some(candidates) => candidates.is_empty(),
        None => true,
    }
}

fn inline_data_from_part(part: &Value) -> Option<ArtifactPayload> {
    let inline = part.get("inlineData").or_else(|| part.get("inline_data"))?;
    let data = inline.get("data")?.as_str()?;
    let mime_type = inline
        .get("mimeType")
        .or_else(|| inline.get("mime_type"))
        .and_then(|m| m.as_str())
        .unwrap_or(DEFAULT_MIME_TYPE);
    Some(ArtifactPayload {
        data: data.to_string(),
        mime_type: mime_type.to_string(),
    })
}
