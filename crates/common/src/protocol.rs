//! Control-block and wrapped-key types.
//!
//! The control block is the reserved `eh` item at the top level of a document.
//! The wrapped key is serialised as JSON and stored, base64url-encoded, in the
//! control block's `key` field.

use std::collections::BTreeSet;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SecretsError};

/// Name of the reserved top-level item.
pub const CONTROL_BLOCK_NAME: &str = "eh";

/// Service type of the local development key service.
pub const SERVICE_LOCAL: &str = "local";

/// Service type of the AWS KMS key service.
pub const SERVICE_AWS_KMS: &str = "awskms";

// ---------------------------------------------------------------------------
// Control block
// ---------------------------------------------------------------------------

/// Key service selection persisted in the control block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceParams {
    /// `"local"` or `"awskms"`.
    pub kind: String,
    /// AWS region of the master key. Empty means the SDK default chain.
    pub region: String,
    /// KMS key id, ARN or alias of the master key.
    pub master_key: String,
}

/// Decoded contents of the reserved `eh` item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlBlock {
    /// Whether protected leaf values are currently ciphertext.
    pub encrypted: bool,
    /// Base64url encoding of the JSON [`WrappedKey`]; empty when not encrypted.
    pub key: String,
    /// Key service that produced, and must unwrap, the data key.
    pub service: ServiceParams,
    /// Field names whose string values are encrypted.
    pub protect: Vec<String>,
    /// Fragment locations merged by `read`, in order.
    pub include: Vec<String>,
}

impl ControlBlock {
    /// The protect list as a set, fixed for the duration of one walk.
    pub fn protect_set(&self) -> BTreeSet<String> {
        self.protect.iter().cloned().collect()
    }

    /// Decode the `key` field into a [`WrappedKey`].
    ///
    /// # Errors
    ///
    /// Returns [`SecretsError::Codec`] if the field is empty, is not base64url,
    /// or does not hold a wrapped-key JSON object.
    pub fn wrapped_key(&self) -> Result<WrappedKey> {
        if self.key.is_empty() {
            return Err(SecretsError::codec(
                "key",
                "document is marked encrypted but carries no key",
            ));
        }
        WrappedKey::decode(&self.key)
    }
}

// ---------------------------------------------------------------------------
// Wrapped key
// ---------------------------------------------------------------------------

/// Persisted form of a data key: an identifier plus the backend-wrapped bytes.
///
/// The plaintext key is never part of this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedKey {
    /// Key identifier assigned at generation time.
    pub kid: String,
    /// Backend-specific wrapped key bytes.
    #[serde(with = "base64url")]
    pub ciphertext: Vec<u8>,
}

impl WrappedKey {
    /// Encode as `base64url-no-pad(json(self))`, the text stored in the control block.
    pub fn encode(&self) -> Result<String> {
        let json = serde_json::to_vec(self).map_err(|e| SecretsError::codec("key", e))?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    /// Inverse of [`WrappedKey::encode`].
    pub fn decode(text: &str) -> Result<Self> {
        let json = URL_SAFE_NO_PAD
            .decode(text)
            .map_err(|e| SecretsError::codec("key", e))?;
        serde_json::from_slice(&json).map_err(|e| SecretsError::codec("key", e))
    }
}

mod base64url {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(de)?;
        URL_SAFE_NO_PAD.decode(text).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn wrapped_key_encodes_as_unpadded_base64url() {
        let key = WrappedKey {
            kid: "eh-test".into(),
            ciphertext: vec![0xfb; 33],
        };
        let text = key.encode().unwrap();
        assert!(!text.contains('='));
        assert!(!text.contains('+') && !text.contains('/'));
        assert_eq!(WrappedKey::decode(&text).unwrap(), key);
    }

    #[test]
    fn wrapped_key_json_shape() {
        let key = WrappedKey {
            kid: "k".into(),
            ciphertext: b"abc".to_vec(),
        };
        let json: serde_json::Value = serde_json::to_value(&key).unwrap();
        assert_eq!(json["kid"], "k");
        assert_eq!(json["ciphertext"], "YWJj");
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = WrappedKey::decode("not base64 !!").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Codec);

        let not_json = URL_SAFE_NO_PAD.encode(b"[1,2,3]");
        assert_eq!(WrappedKey::decode(&not_json).unwrap_err().kind(), ErrorKind::Codec);
    }

    #[test]
    fn empty_key_on_encrypted_block_is_codec_error() {
        let block = ControlBlock {
            encrypted: true,
            ..ControlBlock::default()
        };
        assert_eq!(block.wrapped_key().unwrap_err().kind(), ErrorKind::Codec);
    }

    #[test]
    fn protect_set_deduplicates() {
        let block = ControlBlock {
            protect: vec!["password".into(), "hook".into(), "password".into()],
            ..ControlBlock::default()
        };
        let set = block.protect_set();
        assert_eq!(set.len(), 2);
        assert!(set.contains("hook"));
    }
}
