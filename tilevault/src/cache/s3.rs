//! S3 implementation of the object store interface.
//!
//! A thin adapter: authentication, retries, and connection reuse are the
//! SDK's concern. Region resolution falls back to the ambient environment
//! (`AWS_REGION` / profile) when none is configured explicitly.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::primitives::{ByteStream, DateTime};
use aws_sdk_s3::Client;

use super::object::{ObjectStore, ObjectStoreError, StoredObject};
use super::traits::BoxFuture;

/// Object store backed by an S3 bucket.
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Connect using ambient AWS configuration, optionally overriding the
    /// region.
    pub async fn connect(bucket: impl Into<String>, region: Option<String>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        let config = loader.load().await;

        Self {
            client: Client::new(&config),
            bucket: bucket.into(),
        }
    }

    /// Build a store over an already-configured client, for callers that
    /// manage their own SDK configuration.
    pub fn with_client(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

impl ObjectStore for S3ObjectStore {
    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<StoredObject>, ObjectStoreError>> {
        let key = key.to_string();
        Box::pin(async move {
            let output = match self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(&key)
                .send()
                .await
            {
                Ok(output) => output,
                Err(e) => {
                    let not_found = e
                        .as_service_error()
                        .map(|se| se.is_no_such_key())
                        .unwrap_or(false);
                    if not_found {
                        return Ok(None);
                    }
                    return Err(ObjectStoreError::Backend(e.to_string()));
                }
            };

            let content_type = output.content_type().map(str::to_string);
            let content_encoding = output.content_encoding().map(str::to_string);
            let last_modified = output.last_modified().and_then(system_time_from);

            let bytes = output
                .body
                .collect()
                .await
                .map_err(|e| ObjectStoreError::Backend(e.to_string()))?
                .into_bytes();

            Ok(Some(StoredObject {
                bytes,
                content_type,
                content_encoding,
                last_modified,
            }))
        })
    }

    fn put(&self, key: &str, object: StoredObject) -> BoxFuture<'_, Result<(), ObjectStoreError>> {
        let key = key.to_string();
        Box::pin(async move {
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(&key)
                .set_content_type(object.content_type)
                .set_content_encoding(object.content_encoding)
                .body(ByteStream::from(object.bytes))
                .send()
                .await
                .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;
            Ok(())
        })
    }
}

fn system_time_from(dt: &DateTime) -> Option<SystemTime> {
    let secs = u64::try_from(dt.secs()).ok()?;
    Some(UNIX_EPOCH + Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_time_from_epoch_seconds() {
        let dt = DateTime::from_secs(1_700_000_000);
        let time = system_time_from(&dt).unwrap();
        assert_eq!(
            time.duration_since(UNIX_EPOCH).unwrap().as_secs(),
            1_700_000_000
        );
    }

    #[test]
    fn test_system_time_from_rejects_pre_epoch() {
        let dt = DateTime::from_secs(-1);
        assert!(system_time_from(&dt).is_none());
    }
}
