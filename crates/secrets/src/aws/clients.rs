//! AWS SDK client construction for KMS and S3.

use aws_config::{BehaviorVersion, Region, SdkConfig};

/// Load the shared SDK configuration.
///
/// Credentials are resolved via the standard AWS credential chain. A non-empty
/// `region` overrides the region from the environment or profile.
pub async fn sdk_config(region: Option<&str>) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = region.filter(|r| !r.is_empty()) {
        loader = loader.region(Region::new(region.to_owned()));
    }
    loader.load().await
}

/// Build a KMS client, optionally pointed at a non-AWS endpoint (LocalStack etc.).
pub fn kms_client(config: &SdkConfig, endpoint: Option<&str>) -> aws_sdk_kms::Client {
    let mut builder = aws_sdk_kms::config::Builder::from(config);
    if let Some(url) = endpoint {
        builder = builder.endpoint_url(url);
    }
    aws_sdk_kms::Client::from_conf(builder.build())
}

/// Build an S3 client. A custom endpoint implies path-style addressing, which
/// is what S3-compatible stores expect.
pub fn s3_client(config: &SdkConfig, endpoint: Option<&str>) -> aws_sdk_s3::Client {
    let mut builder = aws_sdk_s3::config::Builder::from(config);
    if let Some(url) = endpoint {
        builder = builder.endpoint_url(url).force_path_style(true);
    }
    aws_sdk_s3::Client::from_conf(builder.build())
}
