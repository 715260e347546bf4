//! Snapshot state module for the plan builder.
//!
//! This module persists the last rendered plan so later renders can be
//! diffed against it, either locally or in S3.

mod store;
mod local;
mod s3;
mod types;

pub use store::{StateStore, decode_snapshot, encode_snapshot};
pub use local::{LocalStateStore, STATE_DIR, STATE_FILE};
pub use s3::S3StateStore;
pub use types::{MAX_HISTORY, PlanSnapshot, RenderHistoryEntry, STATE_VERSION};

use crate::config::{StateBackend, StateConfig};
use crate::error::{ConfigError, Result};

/// Opens the snapshot store selected by the configuration.
///
/// `default_prefix` is the S3 key prefix used when none is configured.
///
/// # Errors
///
/// Returns a configuration error if the S3 backend has no bucket.
pub async fn open_store(config: &StateConfig, default_prefix: &str) -> Result<Box<dyn StateStore>> {
    match config.backend {
        StateBackend::Local => {
            let store = match &config.path {
                Some(path) => LocalStateStore::with_base_dir(path),
                None => LocalStateStore::new()?,
            };
            Ok(Box::new(store))
        }
        StateBackend::S3 => {
            let bucket = config.bucket.as_deref().ok_or_else(|| {
                ConfigError::validation("S3 state backend requires a bucket", "state.bucket")
            })?;
            let prefix = config.prefix.as_deref().unwrap_or(default_prefix);
            let store = S3StateStore::new(bucket, Some(prefix), config.region.as_deref()).await;
            Ok(Box::new(store))
        }
    }
}
