//! AES-256-GCM-SIV encryption and decryption of individual string fields.
//!
//! **Algorithm choice:** AES-256-GCM-SIV (RFC 8452) is nonce-misuse-resistant:
//! an accidental nonce repeat leaks only whether two plaintexts are equal. Each
//! field still gets a fresh random nonce, so encrypting the same value twice
//! yields different tokens.
//!
//! **Do NOT substitute plain AES-256-GCM with a fixed nonce.** GCM nonce reuse
//! is catastrophic: it breaks both confidentiality and authentication.

use aes_gcm_siv::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng},
    Aes256GcmSiv, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use thiserror::Error;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of an AES-GCM-SIV nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of the authentication tag appended to the ciphertext.
pub const TAG_LEN: usize = 16;

/// An encrypted field value.
///
/// The text representation is `base64url-no-pad(nonce ‖ ciphertext ‖ tag)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedField {
    /// Raw nonce bytes.
    pub nonce: [u8; NONCE_LEN],
    /// Raw ciphertext + authentication tag bytes.
    pub ciphertext: Vec<u8>,
}

impl EncryptedField {
    /// Encode this value as the token stored in the document.
    pub fn encode(&self) -> String {
        let mut raw = Vec::with_capacity(NONCE_LEN + self.ciphertext.len());
        raw.extend_from_slice(&self.nonce);
        raw.extend_from_slice(&self.ciphertext);
        URL_SAFE_NO_PAD.encode(raw)
    }

    /// Parse a stored token back into an [`EncryptedField`].
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidEncoding`] if the token is not base64url, or
    /// [`CipherError::InvalidFormat`] if it is too short to hold a nonce and tag.
    pub fn decode(token: &str) -> Result<Self, CipherError> {
        let raw = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| CipherError::InvalidEncoding)?;
        if raw.len() < NONCE_LEN + TAG_LEN {
            return Err(CipherError::InvalidFormat);
        }
        let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LEN);
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(nonce_bytes);
        Ok(Self {
            nonce,
            ciphertext: ciphertext.to_vec(),
        })
    }
}

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The data key is the wrong length (must be [`KEY_LEN`] bytes).
    #[error("invalid data key length: expected {KEY_LEN} bytes")]
    InvalidKeyLength,

    /// AES-GCM-SIV encryption or decryption failed.
    #[error("aead operation failed (wrong key or corrupted value)")]
    AeadFailure,

    /// The stored token is not valid unpadded base64url.
    #[error("value is not valid base64url")]
    InvalidEncoding,

    /// The decoded token is too short to be an encrypted field.
    #[error("value is too short to be an encrypted field")]
    InvalidFormat,
}

/// Encrypt a plaintext field using AES-256-GCM-SIV with a random 96-bit nonce.
///
/// # Errors
///
/// Returns [`CipherError::InvalidKeyLength`] if `key` is not [`KEY_LEN`] bytes.
/// Returns [`CipherError::AeadFailure`] on an internal AEAD error (should be unreachable
/// with a valid key and nonce).
pub fn encrypt_field(plaintext: &[u8], key: &[u8]) -> Result<EncryptedField, CipherError> {
    let cipher = build_cipher(key)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| CipherError::AeadFailure)?;

    Ok(EncryptedField {
        nonce: nonce_bytes,
        ciphertext,
    })
}

/// Decrypt an [`EncryptedField`] back to plaintext bytes.
///
/// # Errors
///
/// Returns [`CipherError::InvalidKeyLength`] if `key` is not [`KEY_LEN`] bytes.
/// Returns [`CipherError::AeadFailure`] if authentication fails (wrong key or tampered data).
pub fn decrypt_field(field: &EncryptedField, key: &[u8]) -> Result<Vec<u8>, CipherError> {
    let cipher = build_cipher(key)?;
    let nonce = Nonce::from_slice(&field.nonce);
    cipher
        .decrypt(nonce, field.ciphertext.as_ref())
        .map_err(|_| CipherError::AeadFailure)
}

/// Fill a fresh [`KEY_LEN`]-byte buffer from the OS CSPRNG.
pub fn random_key() -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    OsRng.fill_bytes(&mut key);
    key
}

fn build_cipher(key: &[u8]) -> Result<Aes256GcmSiv, CipherError> {
    if key.len() != KEY_LEN {
        return Err(CipherError::InvalidKeyLength);
    }
    Aes256GcmSiv::new_from_slice(key).map_err(|_| CipherError::InvalidKeyLength)
}
