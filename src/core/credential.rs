//! Credential resolution
//!
//! Turns a caller-supplied, at-rest-encrypted API credential into a usable
//! secret for the duration of one job. Resolution happens exactly once per
//! job, before the item loop; failure here is always a job-level failure.
//! The plaintext lives only in the returned value and is never persisted.

use thiserror::Error;

use crate::utils::crypto::{CryptoError, decrypt_data};

/// Credential resolution failures, each a distinct job-level fault
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// No encrypted credential was supplied with the batch
    #[error("no API credential was provided with the batch")]
    Missing,

    /// The encrypted blob cannot be parsed
    #[error("stored credential is malformed: {0}")]
    Malformed(String),

    /// Authenticated decryption failed (wrong master key or tampering)
    #[error("credential decryption failed; re-save the API key")]
    Decryption,
}

/// A decrypted provider credential, valid for one job
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedCredential(String);

impl ResolvedCredential {
    /// The plaintext API key
    pub fn api_key(&self) -> &str {
        &self.0
    }
}

// Keep the plaintext out of logs and panic messages.
impl std::fmt::Debug for ResolvedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ResolvedCredential(****)")
    }
}

/// Decrypts caller credentials under the engine's master key
#[derive(Clone)]
pub struct CredentialResolver {
    master_key: Vec<u8>,
}

impl CredentialResolver {
    /// Create a resolver holding the master key
    pub fn new(master_key: impl Into<Vec<u8>>) -> Self {
        Self {
            master_key: master_key.into(),
        }
    }

    /// Resolve an encrypted credential into a usable secret.
    pub fn resolve(&self, encrypted: Option<&str>) -> Result<ResolvedCredential, CredentialError> {
        let encrypted = match encrypted {
            Some(blob) if !blob.trim().is_empty() => blob,
            _ => return Err(CredentialError::Missing),
        };

        match decrypt_data(&self.master_key, encrypted) {
            Ok(plaintext) if plaintext.trim().is_empty() => {
                Err(CredentialError::Malformed("decrypted credential is empty".to_string()))
            }
            Ok(plaintext) => Ok(ResolvedCredential(plaintext)),
            Err(CryptoError::DecryptionFailed) => Err(CredentialError::Decryption),
            Err(e) => Err(CredentialError::Malformed(e.to_string())),
        }
    }
}
