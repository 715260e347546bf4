//! Snapshot types.
//!
//! A [`PlanSnapshot`] records the last rendered plan so the next render can
//! be diffed against it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StateError;
use crate::planner::ResourcePlan;

/// Current version of the snapshot format.
pub const STATE_VERSION: &str = "1.0";

/// Number of render entries kept in a snapshot.
pub const MAX_HISTORY: usize = 50;

/// The last rendered plan with its provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanSnapshot {
    /// Snapshot format version.
    pub version: String,
    /// Deployment name prefix.
    pub prefix: String,
    /// Hash of the configuration the plan was built from.
    pub config_hash: String,
    /// Hash of the plan.
    pub plan_hash: String,
    /// Database topology of the plan.
    pub topology: String,
    /// When the plan was rendered.
    pub rendered_at: DateTime<Utc>,
    /// The rendered plan.
    pub plan: ResourcePlan,
    /// Previous renders, oldest first.
    #[serde(default)]
    pub history: Vec<RenderHistoryEntry>,
}

/// A single entry in the render history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RenderHistoryEntry {
    /// When the render occurred.
    pub timestamp: DateTime<Utc>,
    /// Configuration hash at render time.
    pub config_hash: String,
    /// Plan hash at render time.
    pub plan_hash: String,
    /// Number of resources in the plan.
    pub resource_count: usize,
    /// Resources created, updated or deleted relative to the render before.
    #[serde(default)]
    pub changes: usize,
}

impl PlanSnapshot {
    /// Creates a snapshot of a freshly rendered plan.
    #[must_use]
    pub fn new(
        prefix: &str,
        config_hash: &str,
        plan_hash: &str,
        topology: &str,
        plan: ResourcePlan,
    ) -> Self {
        Self {
            version: STATE_VERSION.to_string(),
            prefix: prefix.to_string(),
            config_hash: config_hash.to_string(),
            plan_hash: plan_hash.to_string(),
            topology: topology.to_string(),
            rendered_at: Utc::now(),
            plan,
            history: Vec::new(),
        }
    }

    /// Carries the history of the previous snapshot over and records one
    /// entry for this render.
    #[must_use]
    pub fn succeeding(mut self, previous: Option<Self>, changes: usize) -> Self {
        if let Some(previous) = previous {
            self.history = previous.history;
        }
        self.add_history(RenderHistoryEntry {
            timestamp: self.rendered_at,
            config_hash: self.config_hash.clone(),
            plan_hash: self.plan_hash.clone(),
            resource_count: self.plan.len(),
            changes,
        });
        self
    }

    /// Adds a history entry, dropping the oldest beyond [`MAX_HISTORY`].
    pub fn add_history(&mut self, entry: RenderHistoryEntry) {
        if self.history.len() >= MAX_HISTORY {
            self.history.remove(0);
        }
        self.history.push(entry);
    }

    /// Checks the snapshot format version.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::VersionMismatch`] for any other version.
    pub fn check_version(&self) -> Result<(), StateError> {
        if self.version == STATE_VERSION {
            Ok(())
        } else {
            Err(StateError::VersionMismatch {
                expected: STATE_VERSION.to_string(),
                found: self.version.clone(),
            })
        }
    }

    /// Returns true if the snapshot was rendered from this configuration hash.
    #[must_use]
    pub fn matches_config(&self, config_hash: &str) -> bool {
        crate::config::ConfigHasher::hashes_match(&self.config_hash, config_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_is_bounded() {
        let mut snapshot = PlanSnapshot::new("my_iot", "c", "p", "standalone", ResourcePlan::new());
        for i in 0..(MAX_HISTORY + 5) {
            snapshot.add_history(RenderHistoryEntry {
                timestamp: Utc::now(),
                config_hash: format!("c{i}"),
                plan_hash: String::from("p"),
                resource_count: 0,
                changes: 0,
            });
        }

        assert_eq!(snapshot.history.len(), MAX_HISTORY);
        assert_eq!(snapshot.history[0].config_hash, "c5");
    }

    #[test]
    fn test_succeeding_carries_history() {
        let first = PlanSnapshot::new("my_iot", "c1", "p1", "standalone", ResourcePlan::new())
            .succeeding(None, 0);
        let second = PlanSnapshot::new("my_iot", "c2", "p2", "clustered", ResourcePlan::new())
            .succeeding(Some(first), 3);

        assert_eq!(second.history.len(), 2);
        assert_eq!(second.history[0].config_hash, "c1");
        assert_eq!(second.history[1].changes, 3);
        assert!(second.matches_config("c2"));
        assert!(!second.matches_config("c1"));
    }

    #[test]
    fn test_version_check() {
        let mut snapshot = PlanSnapshot::new("my_iot", "c", "p", "standalone", ResourcePlan::new());
        assert!(snapshot.check_version().is_ok());

        snapshot.version = String::from("0.9");
        assert!(matches!(
            snapshot.check_version(),
            Err(StateError::VersionMismatch { ref found, .. }) if found == "0.9"
        ));
    }
}
