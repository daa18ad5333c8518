//! AWS KMS key service.
//!
//! Data keys are generated under, and unwrapped by, a KMS master key. The KMS
//! calls sit behind [`KmsBackend`] so the service can be exercised without a
//! network connection.

use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_kms::{primitives::Blob, types::DataKeySpec};

use crate::aws::{kms_client, sdk_config};

use super::key::{EncryptionKey, KeyServiceError};

/// A data key as returned by `GenerateDataKey`.
pub struct DataKey {
    pub plaintext: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

impl Drop for DataKey {
    fn drop(&mut self) {
        self.plaintext.iter_mut().for_each(|b| *b = 0);
    }
}

/// The two KMS operations the key service needs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KmsBackend: Send + Sync {
    /// Generate a 256-bit data key under `master_key_id`.
    async fn generate_data_key(&self, master_key_id: &str) -> Result<DataKey, KeyServiceError>;

    /// Unwrap a data key previously produced by [`KmsBackend::generate_data_key`].
    async fn decrypt(
        &self,
        master_key_id: &str,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, KeyServiceError>;
}

/// [`KmsBackend`] backed by the AWS SDK.
#[derive(Clone)]
pub struct SdkKmsBackend {
    client: aws_sdk_kms::Client,
}

impl SdkKmsBackend {
    pub fn new(client: aws_sdk_kms::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl KmsBackend for SdkKmsBackend {
    async fn generate_data_key(&self, master_key_id: &str) -> Result<DataKey, KeyServiceError> {
        let resp = self
            .client
            .generate_data_key()
            .key_id(master_key_id)
            .key_spec(DataKeySpec::Aes256)
            .send()
            .await
            .map_err(|e| KeyServiceError::Backend(e.into()))?;

        let plaintext = resp
            .plaintext()
            .ok_or(KeyServiceError::MissingField("plaintext"))?;
        let ciphertext = resp
            .ciphertext_blob()
            .ok_or(KeyServiceError::MissingField("ciphertext blob"))?;

        Ok(DataKey {
            plaintext: plaintext.as_ref().to_vec(),
            ciphertext: ciphertext.as_ref().to_vec(),
        })
    }

    async fn decrypt(
        &self,
        master_key_id: &str,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, KeyServiceError> {
        // Symmetric KMS ciphertext names its own key; the id only pins it.
        let key_id = (!master_key_id.is_empty()).then(|| master_key_id.to_owned());
        let resp = self
            .client
            .decrypt()
            .set_key_id(key_id)
            .ciphertext_blob(Blob::new(ciphertext.to_vec()))
            .send()
            .await
            .map_err(|e| KeyServiceError::Backend(e.into()))?;

        resp.plaintext()
            .map(|p| p.as_ref().to_vec())
            .ok_or(KeyServiceError::MissingField("plaintext"))
    }
}

/// Key service wrapping data keys with a KMS master key.
#[derive(Clone)]
pub struct AwsKmsKeyService {
    backend: Arc<dyn KmsBackend>,
    master_key_id: String,
}

impl std::fmt::Debug for AwsKmsKeyService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsKmsKeyService")
            .field("master_key_id", &self.master_key_id)
            .finish_non_exhaustive()
    }
}

impl AwsKmsKeyService {
    pub fn new(backend: Arc<dyn KmsBackend>, master_key_id: impl Into<String>) -> Self {
        Self {
            backend,
            master_key_id: master_key_id.into(),
        }
    }

    /// Build a service talking to KMS in `region` (empty for the SDK default).
    pub async fn connect(region: &str, master_key_id: &str, endpoint: Option<&str>) -> Self {
        let config = sdk_config(Some(region)).await;
        let backend = SdkKmsBackend::new(kms_client(&config, endpoint));
        Self::new(Arc::new(backend), master_key_id)
    }

    pub async fn generate_key(&self, kid: &str) -> Result<EncryptionKey, KeyServiceError> {
        let data_key = self.backend.generate_data_key(&self.master_key_id).await?;
        EncryptionKey::generated(kid, &data_key.plaintext, data_key.ciphertext.clone())
    }

    pub async fn decrypt_key(&self, key: &mut EncryptionKey) -> Result<(), KeyServiceError> {
        let mut plaintext = self
            .backend
            .decrypt(&self.master_key_id, &key.wrapped)
            .await?;
        let result = key.set_plaintext(&plaintext);
        plaintext.iter_mut().for_each(|b| *b = 0);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KEY_LEN;
    use eh_common::WrappedKey;

    fn service(mock: MockKmsBackend) -> AwsKmsKeyService {
        AwsKmsKeyService::new(Arc::new(mock), "alias/app")
    }

    #[tokio::test]
    async fn generate_key_uses_master_key() {
        let mut mock = MockKmsBackend::new();
        mock.expect_generate_data_key().times(1).returning(|master_key_id| {
            assert_eq!(master_key_id, "alias/app");
            Ok(DataKey {
                plaintext: vec![0x11; KEY_LEN],
                ciphertext: b"kms-blob".to_vec(),
            })
        });

        let key = service(mock).generate_key("eh-kms").await.unwrap();
        assert_eq!(key.kid, "eh-kms");
        assert_eq!(key.wrapped, b"kms-blob");
        assert_eq!(key.plaintext().unwrap().as_bytes(), &[0x11; KEY_LEN]);
    }

    #[tokio::test]
    async fn decrypt_key_sends_wrapped_blob() {
        let mut mock = MockKmsBackend::new();
        mock.expect_decrypt().times(1).returning(|master_key_id, ciphertext| {
            assert_eq!(master_key_id, "alias/app");
            assert_eq!(ciphertext, b"kms-blob");
            Ok(vec![0x22; KEY_LEN])
        });

        let mut key = EncryptionKey::from(WrappedKey {
            kid: "eh-kms".into(),
            ciphertext: b"kms-blob".to_vec(),
        });
        service(mock).decrypt_key(&mut key).await.unwrap();
        assert_eq!(key.plaintext().unwrap().as_bytes(), &[0x22; KEY_LEN]);
    }

    #[tokio::test]
    async fn backend_failure_propagates() {
        let mut mock = MockKmsBackend::new();
        mock.expect_decrypt()
            .returning(|_, _| Err(KeyServiceError::Backend("AccessDeniedException".into())));

        let mut key = EncryptionKey::from(WrappedKey {
            kid: "eh-kms".into(),
            ciphertext: vec![1, 2, 3],
        });
        let err = service(mock).decrypt_key(&mut key).await.unwrap_err();
        assert!(matches!(err, KeyServiceError::Backend(_)));
        assert!(!key.is_unwrapped());
    }

    #[tokio::test]
    async fn short_data_key_is_rejected() {
        let mut mock = MockKmsBackend::new();
        mock.expect_generate_data_key().returning(|_| {
            Ok(DataKey {
                plaintext: vec![0; 16],
                ciphertext: vec![1],
            })
        });
        let err = service(mock).generate_key("eh-kms").await.unwrap_err();
        assert!(matches!(err, KeyServiceError::InvalidLength(16)));
    }
}
