//! AWS SDK client initialisation for KMS (key service) and S3 (include transport).

pub mod clients;

pub use clients::{kms_client, s3_client, sdk_config};
