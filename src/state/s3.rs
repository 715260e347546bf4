//! S3-based snapshot storage backend.
//!
//! Snapshots are stored as `<prefix>/plan-state.json` in a shared bucket so a
//! team renders against the same baseline.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::error::{Result, StateError};

use super::local::STATE_FILE;
use super::store::{StateStore, decode_snapshot, encode_snapshot};
use super::types::PlanSnapshot;

/// S3-based snapshot store.
#[derive(Debug)]
pub struct S3StateStore {
    /// S3 client.
    client: Client,
    /// Bucket name.
    bucket: String,
    /// Key prefix, empty or ending in `/`.
    prefix: String,
}

impl S3StateStore {
    /// Creates a new S3 snapshot store from the ambient AWS configuration.
    pub async fn new(bucket: &str, prefix: Option<&str>, region: Option<&str>) -> Self {
        let config = match region {
            Some(region) => {
                aws_config::from_env()
                    .region(aws_config::Region::new(region.to_string()))
                    .load()
                    .await
            }
            None => aws_config::load_from_env().await,
        };

        Self::with_client(Client::new(&config), bucket, prefix)
    }

    /// Creates a new S3 snapshot store with an existing client.
    #[must_use]
    pub fn with_client(client: Client, bucket: &str, prefix: Option<&str>) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
            prefix: normalize_prefix(prefix),
        }
    }

    /// Gets the full S3 key of the snapshot.
    fn key(&self) -> String {
        format!("{}{STATE_FILE}", self.prefix)
    }

    /// Gets an object from S3.
    async fn get_object(&self, key: &str) -> Result<Option<String>> {
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match result {
            Ok(response) => {
                let bytes = response
                    .body
                    .collect()
                    .await
                    .map_err(|e| StateError::s3(format!("Failed to read S3 object: {e}")))?;

                let content = String::from_utf8(bytes.to_vec()).map_err(|e| StateError::Corrupted {
                    message: format!("Invalid UTF-8 in S3 object: {e}"),
                })?;

                Ok(Some(content))
            }
            Err(sdk_err) => {
                let service_err = sdk_err.into_service_error();
                if service_err.is_no_such_key() {
                    Ok(None)
                } else {
                    Err(StateError::s3(format!("S3 get error: {service_err}")).into())
                }
            }
        }
    }
}

/// Normalizes a key prefix to be empty or end in exactly one `/`.
fn normalize_prefix(prefix: Option<&str>) -> String {
    prefix
        .map(|p| p.trim_matches('/'))
        .filter(|p| !p.is_empty())
        .map(|p| format!("{p}/"))
        .unwrap_or_default()
}

#[async_trait]
impl StateStore for S3StateStore {
    async fn load(&self) -> Result<Option<PlanSnapshot>> {
        let key = self.key();
        debug!("Loading snapshot from s3://{}/{key}", self.bucket);

        match self.get_object(&key).await? {
            Some(json) => {
                let snapshot = decode_snapshot(&json)?;
                info!("Loaded snapshot for prefix: {}", snapshot.prefix);
                Ok(Some(snapshot))
            }
            None => {
                debug!("No snapshot found in S3");
                Ok(None)
            }
        }
    }

    async fn save(&self, snapshot: &PlanSnapshot) -> Result<()> {
        let key = self.key();
        info!("Saving snapshot to s3://{}/{key}", self.bucket);

        let content = encode_snapshot(snapshot)?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(content.into_bytes().into())
            .content_type("application/json")
            .send()
            .await
            .map_err(|e| StateError::s3(format!("S3 put error: {e}")))?;

        debug!("Snapshot saved successfully to S3");
        Ok(())
    }

    async fn delete(&self) -> Result<()> {
        let key = self.key();
        info!("Deleting snapshot from s3://{}/{key}", self.bucket);

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| StateError::s3(format!("S3 delete error: {e}")))?;

        Ok(())
    }

    async fn exists(&self) -> Result<bool> {
        let result = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(self.key())
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(sdk_err) => {
                let service_err = sdk_err.into_service_error();
                if service_err.is_not_found() {
                    Ok(false)
                } else {
                    Err(StateError::s3(format!("S3 head error: {service_err}")).into())
                }
            }
        }
    }

    fn location(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key())
    }

    fn backend_type(&self) -> &'static str {
        "s3"
    }
}
