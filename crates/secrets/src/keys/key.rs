//! [`EncryptionKey`]: a data key's plaintext bytes and its wrapped form.

use eh_common::error::BoxError;
use eh_common::WrappedKey;
use thiserror::Error;

use crate::crypto::KEY_LEN;

/// Errors produced by the key layer.
#[derive(Debug, Error)]
pub enum KeyServiceError {
    /// The key has not been unwrapped yet.
    #[error("data key has not been unwrapped")]
    NotUnwrapped,

    /// The unwrapped key material has an unexpected length.
    #[error("data key has invalid length: expected {KEY_LEN} bytes, got {0}")]
    InvalidLength(usize),

    /// The backend answered without a field the key service needs.
    #[error("backend response contained no {0}")]
    MissingField(&'static str),

    /// The backend call itself failed.
    #[error("backend request failed")]
    Backend(#[source] BoxError),
}

/// Fixed-size key buffer that holds exactly [`KEY_LEN`] bytes.
///
/// When this type is dropped, the memory is overwritten with zeroes to
/// minimise the window during which plaintext key material lives in RAM.
#[derive(Clone)]
pub struct KeyBytes(Box<[u8; KEY_LEN]>);

impl KeyBytes {
    /// Copy `bytes` into a new buffer.
    ///
    /// # Errors
    ///
    /// Returns [`KeyServiceError::InvalidLength`] if the slice has the wrong length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyServiceError> {
        if bytes.len() != KEY_LEN {
            return Err(KeyServiceError::InvalidLength(bytes.len()));
        }
        let mut buf = Box::new([0u8; KEY_LEN]);
        buf.copy_from_slice(bytes);
        Ok(Self(buf))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }
}

impl Drop for KeyBytes {
    fn drop(&mut self) {
        // Zero the key material on drop.
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for KeyBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material, not even in debug builds.
        f.write_str("KeyBytes([REDACTED])")
    }
}

/// A per-document data key.
///
/// Created by a key service's `generate_key` (plaintext and wrapped form both
/// present) or rebuilt from a document's [`WrappedKey`] (wrapped form only,
/// until the key service unwraps it in place). Only the wrapped form is ever
/// written out.
#[derive(Debug, Clone)]
pub struct EncryptionKey {
    pub kid: String,
    pub wrapped: Vec<u8>,
    plaintext: Option<KeyBytes>,
}

impl EncryptionKey {
    /// A freshly generated key.
    ///
    /// # Errors
    ///
    /// Returns [`KeyServiceError::InvalidLength`] if `plaintext` is not [`KEY_LEN`] bytes.
    pub fn generated(
        kid: impl Into<String>,
        plaintext: &[u8],
        wrapped: Vec<u8>,
    ) -> Result<Self, KeyServiceError> {
        Ok(Self {
            kid: kid.into(),
            wrapped,
            plaintext: Some(KeyBytes::from_slice(plaintext)?),
        })
    }

    /// Returns `true` once plaintext key material is available.
    pub fn is_unwrapped(&self) -> bool {
        self.plaintext.is_some()
    }

    /// Store (or replace) the plaintext recovered by a key service.
    ///
    /// # Errors
    ///
    /// Returns [`KeyServiceError::InvalidLength`] if the slice has the wrong length.
    pub fn set_plaintext(&mut self, bytes: &[u8]) -> Result<(), KeyServiceError> {
        self.plaintext = Some(KeyBytes::from_slice(bytes)?);
        Ok(())
    }

    /// Borrow the plaintext key bytes.
    ///
    /// # Errors
    ///
    /// Returns [`KeyServiceError::NotUnwrapped`] if no plaintext is present.
    pub fn plaintext(&self) -> Result<&KeyBytes, KeyServiceError> {
        self.plaintext.as_ref().ok_or(KeyServiceError::NotUnwrapped)
    }

    /// The persisted form of this key.
    pub fn to_wrapped(&self) -> WrappedKey {
        WrappedKey {
            kid: self.kid.clone(),
            ciphertext: self.wrapped.clone(),
        }
    }
}

impl From<WrappedKey> for EncryptionKey {
    fn from(stored: WrappedKey) -> Self {
        Self {
            kid: stored.kid,
            wrapped: stored.ciphertext,
            plaintext: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_key_starts_wrapped() {
        let key = EncryptionKey::from(WrappedKey {
            kid: "eh-1".into(),
            ciphertext: vec![1, 2, 3],
        });
        assert!(!key.is_unwrapped());
        assert!(matches!(key.plaintext(), Err(KeyServiceError::NotUnwrapped)));
    }

    #[test]
    fn set_and_read_plaintext() {
        let mut key = EncryptionKey::from(WrappedKey {
            kid: "eh-1".into(),
            ciphertext: vec![],
        });
        key.set_plaintext(&[0x42u8; KEY_LEN]).unwrap();
        assert_eq!(key.plaintext().unwrap().as_bytes(), &[0x42u8; KEY_LEN]);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(matches!(
            KeyBytes::from_slice(&[0u8; 16]),
            Err(KeyServiceError::InvalidLength(16))
        ));
    }

    #[test]
    fn wrapped_form_round_trip() {
        let key = EncryptionKey::generated("eh-2", &[7u8; KEY_LEN], vec![9, 9]).unwrap();
        let stored = key.to_wrapped();
        assert_eq!(stored.kid, "eh-2");
        assert_eq!(stored.ciphertext, vec![9, 9]);
    }

    #[test]
    fn key_bytes_redacted_in_debug() {
        let key = EncryptionKey::generated("eh-3", &[0xFF; KEY_LEN], vec![]).unwrap();
        let printed = format!("{key:?}");
        assert!(printed.contains("REDACTED"));
        assert!(!printed.contains("255"));
    }
}
