use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::config::Region;
use s3::error::DisplayErrorContext;
use s3::primitives::ByteStream;
use s3::types::ServerSideEncryption;
use tracing::info;

use crate::backup::logic::Uploader;
use crate::config::RemoteConfig;
use crate::errors::BackupError;

const DEFAULT_REGION: &str = "us-east-1";

/// Object key for an archive under the configured destination prefix.
///
/// The prefix defaults to `/`; the returned key never starts with a slash,
/// otherwise S3 would create objects under an empty-named folder.
pub(crate) fn object_key(destination: Option<&str>, archive_name: &str) -> String {
    let prefix = destination.unwrap_or("/").trim_matches('/');
    if prefix.is_empty() {
        archive_name.to_string()
    } else {
        format!("{}/{}", prefix, archive_name)
    }
}

/// Remote Uploader backed by the AWS S3 SDK.
///
/// Works against AWS proper or any S3-compatible service via
/// [`RemoteConfig::endpoint_url`]. The SDK only returns `Ok` on a success
/// response, which stands in for the historical explicit 200 check.
pub struct S3Uploader;

#[async_trait]
impl Uploader for S3Uploader {
    async fn upload(
        &self,
        remote: &RemoteConfig,
        file_path: &Path,
        key: &str,
    ) -> Result<(), BackupError> {
        let region = remote
            .region
            .clone()
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let mut loader = aws_config::defaults(s3::config::BehaviorVersion::latest())
            .region(Region::new(region))
            .credentials_provider(s3::config::Credentials::new(
                &remote.access_key_id,
                &remote.secret_access_key,
                None,
                None,
                "Static",
            ));
        if let Some(endpoint_url) = &remote.endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }
        let sdk_config = loader.load().await;
        let client = s3::Client::new(&sdk_config);

        let body = ByteStream::from_path(file_path)
            .await
            .map_err(|e| BackupError::UploadFailed {
                status: None,
                message: format!("failed to read {}: {}", file_path.display(), e),
            })?;

        info!(
            "Attempting to upload {} to the {} bucket",
            key, remote.bucket
        );

        let mut request = client
            .put_object()
            .bucket(&remote.bucket)
            .key(key)
            .body(body);
        if remote.encrypt {
            request = request.server_side_encryption(ServerSideEncryption::Aes256);
        }

        match request.send().await {
            Ok(output) => {
                // The SDK consumes the response body; the ETag is the useful
                // diagnostic identity left to surface.
                info!(
                    "Successfully uploaded {} (etag: {})",
                    key,
                    output.e_tag().unwrap_or("none")
                );
                Ok(())
            }
            Err(e) => {
                let status = e.raw_response().map(|r| r.status().as_u16());
                Err(BackupError::UploadFailed {
                    status,
                    message: DisplayErrorContext(&e).to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_destination_is_the_bucket_root() {
        assert_eq!(object_key(None, "orders_2024_3_7_1.tar.gz"), "orders_2024_3_7_1.tar.gz");
        assert_eq!(object_key(Some("/"), "a.tar.gz"), "a.tar.gz");
    }

    #[test]
    fn prefix_is_joined_without_a_leading_slash() {
        assert_eq!(object_key(Some("/mongo"), "a.tar.gz"), "mongo/a.tar.gz");
        assert_eq!(object_key(Some("mongo/nightly/"), "a.tar.gz"), "mongo/nightly/a.tar.gz");
    }
}
