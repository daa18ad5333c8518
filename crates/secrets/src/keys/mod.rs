//! Data-key management.
//!
//! [`KeyService`] selects a backend from a document's `service` parameters;
//! [`envelope`] drives the per-document key lifecycle on top of it.

pub mod aws;
pub mod envelope;
pub mod key;
pub mod local;

use eh_common::protocol::{SERVICE_AWS_KMS, SERVICE_LOCAL};
use eh_common::{Result, SecretsError, ServiceParams};

use crate::settings::Settings;

pub use aws::{AwsKmsKeyService, DataKey, KmsBackend, SdkKmsBackend};
pub use envelope::{open, seal, OpenPolicy};
pub use key::{EncryptionKey, KeyBytes, KeyServiceError};
pub use local::LocalKeyService;

/// The key-management backend named by a control block.
#[derive(Debug, Clone)]
pub enum KeyService {
    Local(LocalKeyService),
    AwsKms(AwsKmsKeyService),
}

impl KeyService {
    /// Build the service described by `params`.
    ///
    /// # Errors
    ///
    /// Returns [`SecretsError::Config`] for a missing or unknown service type,
    /// or an `awskms` service without a master key.
    pub async fn from_params(params: &ServiceParams, settings: &Settings) -> Result<Self> {
        match params.kind.as_str() {
            SERVICE_LOCAL => Ok(KeyService::Local(LocalKeyService)),
            SERVICE_AWS_KMS => {
                if params.master_key.is_empty() {
                    return Err(SecretsError::Config(
                        "awskms service requires a masterKey".into(),
                    ));
                }
                let service = AwsKmsKeyService::connect(
                    &params.region,
                    &params.master_key,
                    settings.kms_endpoint.as_deref(),
                )
                .await;
                Ok(KeyService::AwsKms(service))
            }
            "" => Err(SecretsError::Config("service type is not set".into())),
            other => Err(SecretsError::Config(format!(
                "unknown service type {other:?}"
            ))),
        }
    }

    /// The `type` value that selects this service.
    pub fn name(&self) -> &'static str {
        match self {
            KeyService::Local(_) => SERVICE_LOCAL,
            KeyService::AwsKms(_) => SERVICE_AWS_KMS,
        }
    }

    /// Generate a fresh data key identified by `kid`.
    pub async fn generate_key(&self, kid: &str) -> Result<EncryptionKey> {
        let generated = match self {
            KeyService::Local(service) => service.generate_key(kid),
            KeyService::AwsKms(service) => service.generate_key(kid).await,
        };
        generated.map_err(|e| SecretsError::backend(self.name(), e))
    }

    /// Unwrap `key` in place.
    pub async fn decrypt_key(&self, key: &mut EncryptionKey) -> Result<()> {
        let unwrapped = match self {
            KeyService::Local(service) => service.decrypt_key(key),
            KeyService::AwsKms(service) => service.decrypt_key(key).await,
        };
        unwrapped.map_err(|e| SecretsError::backend(self.name(), e))
    }
}
