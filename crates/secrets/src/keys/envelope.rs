//! Per-document data-key lifecycle.
//!
//! # Lifecycle
//!
//! 1. [`seal`] generates a fresh data key through the document's key service.
//!    The plaintext goes to the field walker; the wrapped form goes into the
//!    control block.
//! 2. [`open`] decodes the wrapped key stored in the control block and asks the
//!    key service to unwrap it.
//!
//! Plaintext key bytes are never logged. Only the key id and service name are.

use eh_common::{ControlBlock, Result, SecretsError};
use tracing::{debug, info};
use uuid::Uuid;

use crate::settings::Settings;

use super::{EncryptionKey, KeyService};

/// How [`open`] treats a document that is not encrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenPolicy {
    /// Plaintext is an error (decrypt).
    RequireEncrypted,
    /// Plaintext yields no key (read).
    AllowPlaintext,
}

/// Generate the data key for encrypting a document.
///
/// # Errors
///
/// [`SecretsError::State`] if the document is already encrypted, plus any
/// error from selecting or calling the key service.
pub async fn seal(control: &ControlBlock, settings: &Settings) -> Result<EncryptionKey> {
    if control.encrypted {
        return Err(SecretsError::State("contents is already encrypted".into()));
    }

    let service = KeyService::from_params(&control.service, settings).await?;
    let kid = format!("eh-{}", Uuid::now_v7());
    let key = service.generate_key(&kid).await?;

    info!(kid = %key.kid, service = service.name(), "generated data key");
    Ok(key)
}

/// Recover the data key of an encrypted document.
///
/// Returns `Ok(None)` for a plaintext document under [`OpenPolicy::AllowPlaintext`].
///
/// # Errors
///
/// [`SecretsError::State`] for a plaintext document under
/// [`OpenPolicy::RequireEncrypted`], [`SecretsError::Codec`] if the stored key
/// cannot be decoded, plus any error from the key service.
pub async fn open(
    control: &ControlBlock,
    settings: &Settings,
    policy: OpenPolicy,
) -> Result<Option<EncryptionKey>> {
    if !control.encrypted {
        return match policy {
            OpenPolicy::RequireEncrypted => {
                Err(SecretsError::State("contents is not encrypted".into()))
            }
            OpenPolicy::AllowPlaintext => {
                debug!("document is not encrypted");
                Ok(None)
            }
        };
    }

    let mut key = EncryptionKey::from(control.wrapped_key()?);
    let service = KeyService::from_params(&control.service, settings).await?;
    service.decrypt_key(&mut key).await?;

    info!(kid = %key.kid, service = service.name(), "unwrapped data key");
    Ok(Some(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use eh_common::{ErrorKind, ServiceParams, WrappedKey};

    fn local_block() -> ControlBlock {
        ControlBlock {
            service: ServiceParams {
                kind: "local".into(),
                ..ServiceParams::default()
            },
            ..ControlBlock::default()
        }
    }

    fn sealed_block(key: &EncryptionKey) -> ControlBlock {
        ControlBlock {
            encrypted: true,
            key: key.to_wrapped().encode().unwrap(),
            ..local_block()
        }
    }

    #[tokio::test]
    async fn seal_then_open_recovers_key() {
        let settings = Settings::default();
        let key = seal(&local_block(), &settings).await.unwrap();
        assert!(key.kid.starts_with("eh-"));

        let opened = open(&sealed_block(&key), &settings, OpenPolicy::RequireEncrypted)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(opened.kid, key.kid);
        assert_eq!(
            opened.plaintext().unwrap().as_bytes(),
            key.plaintext().unwrap().as_bytes()
        );
    }

    #[tokio::test]
    async fn key_ids_are_unique() {
        let settings = Settings::default();
        let a = seal(&local_block(), &settings).await.unwrap();
        let b = seal(&local_block(), &settings).await.unwrap();
        assert_ne!(a.kid, b.kid);
    }

    #[tokio::test]
    async fn seal_refuses_encrypted_document() {
        let block = ControlBlock {
            encrypted: true,
            ..local_block()
        };
        let err = seal(&block, &Settings::default()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);
    }

    #[tokio::test]
    async fn open_plaintext_depends_on_policy() {
        let settings = Settings::default();
        let err = open(&local_block(), &settings, OpenPolicy::RequireEncrypted)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);

        let none = open(&local_block(), &settings, OpenPolicy::AllowPlaintext)
            .await
            .unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn undecodable_key_is_codec_error() {
        let block = ControlBlock {
            encrypted: true,
            key: "%%%".into(),
            ..local_block()
        };
        let err = open(&block, &Settings::default(), OpenPolicy::AllowPlaintext)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Codec);
    }

    #[tokio::test]
    async fn tampered_wrapped_key_is_backend_error() {
        let wrapped = WrappedKey {
            kid: "eh-x".into(),
            ciphertext: vec![7; 31],
        };
        let block = ControlBlock {
            encrypted: true,
            key: wrapped.encode().unwrap(),
            ..local_block()
        };
        let err = open(&block, &Settings::default(), OpenPolicy::RequireEncrypted)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Backend);
    }
}
