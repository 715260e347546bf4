//! Local file-based snapshot storage backend.
//!
//! Snapshots live in a directory next to the configuration, by default
//! `.simpleiot/plan-state.json`.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{InfraError, Result, StateError};

use super::store::{StateStore, decode_snapshot, encode_snapshot};
use super::types::PlanSnapshot;

/// Default state directory name.
pub const STATE_DIR: &str = ".simpleiot";

/// Snapshot file name.
pub const STATE_FILE: &str = "plan-state.json";

/// Local file-based snapshot store.
#[derive(Debug)]
pub struct LocalStateStore {
    /// Directory holding the snapshot.
    base_dir: PathBuf,
    /// Path to the snapshot file.
    state_path: PathBuf,
}

impl LocalStateStore {
    /// Creates a store under the current directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the current directory cannot be determined.
    pub fn new() -> Result<Self> {
        let base_dir = std::env::current_dir()
            .map_err(|e| InfraError::internal(format!("Cannot determine current directory: {e}")))?
            .join(STATE_DIR);

        Ok(Self::with_base_dir(base_dir))
    }

    /// Creates a store with a custom base directory.
    #[must_use]
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let state_path = base_dir.join(STATE_FILE);

        Self {
            base_dir,
            state_path,
        }
    }

    /// Creates a store from a custom snapshot file path.
    #[must_use]
    pub fn with_state_path(state_path: impl Into<PathBuf>) -> Self {
        let state_path = state_path.into();
        let base_dir = state_path
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

        Self {
            base_dir,
            state_path,
        }
    }

    /// Returns the snapshot file path.
    #[must_use]
    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    /// Ensures the state directory exists.
    async fn ensure_dir(&self) -> Result<()> {
        if !self.base_dir.exists() {
            debug!("Creating state directory: {}", self.base_dir.display());
            fs::create_dir_all(&self.base_dir).await.map_err(|e| {
                StateError::io(format!("Failed to create state directory: {e}"))
            })?;
        }
        Ok(())
    }
}

#[async_trait]
impl StateStore for LocalStateStore {
    async fn load(&self) -> Result<Option<PlanSnapshot>> {
        if !self.state_path.exists() {
            debug!("Snapshot does not exist: {}", self.state_path.display());
            return Ok(None);
        }

        info!("Loading snapshot from: {}", self.state_path.display());

        let content = fs::read_to_string(&self.state_path).await.map_err(|e| {
            StateError::io(format!("Failed to read snapshot file: {e}"))
        })?;

        decode_snapshot(&content).map(Some)
    }

    async fn save(&self, snapshot: &PlanSnapshot) -> Result<()> {
        self.ensure_dir().await?;

        info!("Saving snapshot to: {}", self.state_path.display());

        let content = encode_snapshot(snapshot)?;

        // Write to a temporary file first, then rename for atomicity
        let temp_path = self.state_path.with_extension("tmp");

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| StateError::io(format!("Failed to create temp snapshot file: {e}")))?;

        file.write_all(content.as_bytes())
            .await
            .map_err(|e| StateError::io(format!("Failed to write snapshot file: {e}")))?;

        file.sync_all()
            .await
            .map_err(|e| StateError::io(format!("Failed to sync snapshot file: {e}")))?;

        fs::rename(&temp_path, &self.state_path)
            .await
            .map_err(|e| StateError::io(format!("Failed to rename snapshot file: {e}")))?;

        debug!("Snapshot saved successfully");
        Ok(())
    }

    async fn delete(&self) -> Result<()> {
        if self.state_path.exists() {
            info!("Deleting snapshot file: {}", self.state_path.display());
            fs::remove_file(&self.state_path)
                .await
                .map_err(|e| StateError::io(format!("Failed to delete snapshot file: {e}")))?;
        }
        Ok(())
    }

    async fn exists(&self) -> Result<bool> {
        Ok(self.state_path.exists())
    }

    fn location(&self) -> String {
        self.state_path.display().to_string()
    }

    fn backend_type(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_support::sample_config;
    use crate::planner::{DiffEngine, PlanBuilder};
    use tempfile::TempDir;

    async fn create_test_store() -> (LocalStateStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = LocalStateStore::with_base_dir(temp_dir.path());
        (store, temp_dir)
    }

    fn snapshot() -> PlanSnapshot {
        let built = PlanBuilder::new().build(&sample_config()).unwrap();
        PlanSnapshot::new("my_iot", "cfg", "plan", built.topology.name(), built.plan)
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let (store, _temp) = create_test_store().await;

        let saved = snapshot();
        store.save(&saved).await.expect("Failed to save snapshot");

        let loaded = store
            .load()
            .await
            .expect("Failed to load snapshot")
            .expect("Snapshot should exist");

        assert_eq!(loaded.prefix, "my_iot");
        assert_eq!(loaded.topology, "standalone");
        assert_eq!(loaded.plan, saved.plan);
        assert_eq!(loaded.rendered_at, saved.rendered_at);
    }

    #[tokio::test]
    async fn test_reloaded_plan_has_no_changes() {
        let (store, _temp) = create_test_store().await;
        let built = PlanBuilder::new().build(&sample_config()).unwrap();

        let saved = PlanSnapshot::new("my_iot", "cfg", "plan", built.topology.name(), built.plan.clone());
        store.save(&saved).await.expect("Failed to save snapshot");
        let loaded = store.load().await.unwrap().expect("Snapshot should exist");

        assert!(loaded.plan.dangling_references().is_empty());
        let diff = DiffEngine::new().compute_diff(Some(&loaded.plan), &built.plan);
        assert!(!diff.has_changes(), "unexpected changes: {diff:?}");
    }

    #[tokio::test]
    async fn test_load_nonexistent() {
        let (store, _temp) = create_test_store().await;

        let result = store.load().await.expect("Load should not fail");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_exists_and_delete() {
        let (store, _temp) = create_test_store().await;

        assert!(!store.exists().await.expect("exists check failed"));

        store.save(&snapshot()).await.expect("Failed to save snapshot");
        assert!(store.exists().await.expect("exists check failed"));
        assert!(!store.state_path().with_extension("tmp").exists());

        store.delete().await.expect("Failed to delete snapshot");
        assert!(!store.exists().await.expect("exists check failed"));
    }

    #[tokio::test]
    async fn test_version_mismatch_rejected() {
        let (store, _temp) = create_test_store().await;

        let mut old = snapshot();
        old.version = String::from("0.1");
        store.save(&old).await.expect("Failed to save snapshot");

        let err = store.load().await.unwrap_err();
        assert!(matches!(
            err,
            InfraError::State(StateError::VersionMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_corrupted_snapshot() {
        let (store, temp) = create_test_store().await;
        std::fs::write(temp.path().join(STATE_FILE), "{ not json").unwrap();

        let err = store.load().await.unwrap_err();
        assert!(matches!(err, InfraError::State(StateError::Corrupted { .. })));
    }
}
