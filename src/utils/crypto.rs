//! AES-256-GCM encryption for credentials at rest
//!
//! Wire format: base64(nonce || ciphertext || tag)
//! - nonce: 12 bytes, randomly generated per encryption
//! - tag: 16 bytes, verified before any plaintext is returned
//!
//! Keys of arbitrary length are accepted and run through SHA-256 to derive
//! the 256-bit cipher key.

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, KeyInit},
};
use base64::{Engine as _, engine::general_purpose};
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// AES-256-GCM nonce size (96 bits as recommended by NIST)
const NONCE_SIZE: usize = 12;

/// AES-256-GCM authentication tag size
const TAG_SIZE: usize = 16;

/// Errors from the crypto layer. Callers distinguish a blob that cannot be
/// parsed at all from one that fails authenticated decryption.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Input is not valid base64
    #[error("invalid base64 encoding: {0}")]
    InvalidEncoding(String),

    /// Input decodes but is shorter than nonce + tag
    #[error("encrypted data too short")]
    TooShort,

    /// Authentication tag verification or decryption failed
    #[error("decryption failed: wrong key or tampered data")]
    DecryptionFailed,

    /// Decrypted bytes are not valid UTF-8
    #[error("decrypted data is not valid UTF-8")]
    InvalidUtf8,

    /// Encryption failed (should not happen with a valid key)
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),
}

fn derive_key(key: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(key);
    hasher.finalize().into()
}

/// Encrypt a plaintext string under the given key.
pub fn encrypt_data(key: &[u8], data: &str) -> Result<String, CryptoError> {
    let derived = derive_key(key);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&derived));

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, data.as_bytes())
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let mut output = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    output.extend_from_slice(&nonce_bytes);
    output.extend_from_slice(&ciphertext);

    Ok(general_purpose::STANDARD.encode(&output))
}

/// Decrypt a blob produced by [`encrypt_data`].
pub fn decrypt_data(key: &[u8], encrypted_data: &str) -> Result<String, CryptoError> {
    let bytes = general_purpose::STANDARD
        .decode(encrypted_data)
        .map_err(|e| CryptoError::InvalidEncoding(e.to_string()))?;

    if bytes.len() < NONCE_SIZE + TAG_SIZE {
        return Err(CryptoError::TooShort);
    }

    let derived = derive_key(key);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&derived));

    let nonce = Nonce::from_slice(&bytes[..NONCE_SIZE]);
    let plaintext = cipher
        .decrypt(nonce, &bytes[NONCE_SIZE..])
        .map_err(|_| CryptoError::DecryptionFailed)?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::InvalidUtf8)
}
