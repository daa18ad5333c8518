//! Development key service.
//!
//! The wrapped form of a local key is the key itself. Documents sealed with it
//! are protected against casual reading only, which is enough to keep
//! development secrets out of plain sight in version control.

use crate::crypto::cipher::random_key;

use super::key::{EncryptionKey, KeyServiceError};

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalKeyService;

impl LocalKeyService {
    pub fn generate_key(&self, kid: &str) -> Result<EncryptionKey, KeyServiceError> {
        let plaintext = random_key();
        EncryptionKey::generated(kid, &plaintext, plaintext.to_vec())
    }

    pub fn decrypt_key(&self, key: &mut EncryptionKey) -> Result<(), KeyServiceError> {
        let wrapped = key.wrapped.clone();
        key.set_plaintext(&wrapped)
    }
}
