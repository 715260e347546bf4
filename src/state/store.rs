//! Snapshot store trait definition.
//!
//! This module defines the common interface for snapshot storage backends.

use async_trait::async_trait;

use crate::error::{Result, StateError};
use super::types::PlanSnapshot;

/// Trait for snapshot storage backends.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Loads the last snapshot.
    ///
    /// Returns `None` if nothing has been rendered yet.
    async fn load(&self) -> Result<Option<PlanSnapshot>>;

    /// Saves a snapshot, replacing the previous one.
    async fn save(&self, snapshot: &PlanSnapshot) -> Result<()>;

    /// Deletes the snapshot.
    async fn delete(&self) -> Result<()>;

    /// Checks if a snapshot exists.
    async fn exists(&self) -> Result<bool>;

    /// Describes where snapshots are stored.
    fn location(&self) -> String;

    /// Gets the backend type name.
    fn backend_type(&self) -> &'static str;
}

#[async_trait]
impl StateStore for Box<dyn StateStore> {
    async fn load(&self) -> Result<Option<PlanSnapshot>> {
        (**self).load().await
    }

    async fn save(&self, snapshot: &PlanSnapshot) -> Result<()> {
        (**self).save(snapshot).await
    }

    async fn delete(&self) -> Result<()> {
        (**self).delete().await
    }

    async fn exists(&self) -> Result<bool> {
        (**self).exists().await
    }

    fn location(&self) -> String {
        (**self).location()
    }

    fn backend_type(&self) -> &'static str {
        (**self).backend_type()
    }
}

/// Parses a stored snapshot document and checks its version.
///
/// # Errors
///
/// Returns a corrupted-state error for invalid JSON and a version mismatch
/// for any other format version.
pub fn decode_snapshot(content: &str) -> Result<PlanSnapshot> {
    let snapshot: PlanSnapshot =
        serde_json::from_str(content).map_err(|e| StateError::Corrupted {
            message: format!("Failed to parse snapshot: {e}"),
        })?;
    snapshot.check_version()?;
    Ok(snapshot)
}

/// Serializes a snapshot for storage.
///
/// # Errors
///
/// Returns a serialization error if the snapshot cannot be encoded.
pub fn encode_snapshot(snapshot: &PlanSnapshot) -> Result<String> {
    serde_json::to_string_pretty(snapshot)
        .map_err(|e| StateError::serialization(format!("Failed to serialize snapshot: {e}")).into())
}
