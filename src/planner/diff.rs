//! Diff engine for comparing a new plan with the last rendered one.
//!
//! Resources are matched by logical id. Changes are reported per attribute
//! name, so a reader sees what moved without the orchestrator's help.

use std::collections::BTreeSet;
use tracing::debug;

use crate::config::ConfigHasher;

use super::plan::ResourcePlan;
use super::resource::ResourceSpec;

/// Engine for computing diffs between two plans.
#[derive(Debug, Default)]
pub struct DiffEngine {
    /// Resource hasher.
    hasher: ConfigHasher,
}

/// Difference for a single resource.
#[derive(Debug, Clone)]
pub struct ResourceDiff {
    /// Logical id.
    pub id: String,
    /// Type of difference.
    pub diff_type: DiffType,
    /// Details about the difference.
    pub details: Vec<DiffDetail>,
    /// Previous hash (if applicable).
    pub old_hash: Option<String>,
    /// New hash (if applicable).
    pub new_hash: Option<String>,
}

/// Type of difference detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffType {
    /// Resource is new.
    Create,
    /// Resource changed.
    Update,
    /// Resource is gone from the new plan.
    Delete,
    /// Resource is unchanged.
    NoChange,
}

/// Detail about a specific difference.
#[derive(Debug, Clone)]
pub struct DiffDetail {
    /// Attribute, `type` or `tags.<key>`.
    pub field: String,
    /// Old value.
    pub old_value: Option<String>,
    /// New value.
    pub new_value: Option<String>,
}

/// Complete diff result.
#[derive(Debug)]
pub struct DiffResult {
    /// All resource diffs, in logical id order.
    pub diffs: Vec<ResourceDiff>,
    /// Number of resources to create.
    pub creates: usize,
    /// Number of resources to update.
    pub updates: usize,
    /// Number of resources to delete.
    pub deletes: usize,
    /// Number of unchanged resources.
    pub unchanged: usize,
    /// Output names added or retargeted.
    pub changed_outputs: Vec<String>,
}

impl DiffEngine {
    /// Creates a new diff engine.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            hasher: ConfigHasher::new(),
        }
    }

    /// Computes the diff between the previous plan, if any, and the new one.
    #[must_use]
    pub fn compute_diff(&self, previous: Option<&ResourcePlan>, desired: &ResourcePlan) -> DiffResult {
        let empty = ResourcePlan::new();
        let previous = previous.unwrap_or(&empty);

        let ids: BTreeSet<&String> = previous
            .resources()
            .keys()
            .chain(desired.resources().keys())
            .collect();

        let diffs: Vec<ResourceDiff> = ids
            .into_iter()
            .map(|id| self.compute_resource_diff(id, previous.get(id), desired.get(id)))
            .collect();

        let changed_outputs = desired
            .outputs()
            .iter()
            .filter(|(name, reference)| previous.outputs().get(*name) != Some(*reference))
            .map(|(name, _)| name.clone())
            .collect();

        let creates = diffs.iter().filter(|d| d.diff_type == DiffType::Create).count();
        let updates = diffs.iter().filter(|d| d.diff_type == DiffType::Update).count();
        let deletes = diffs.iter().filter(|d| d.diff_type == DiffType::Delete).count();
        let unchanged = diffs.iter().filter(|d| d.diff_type == DiffType::NoChange).count();

        DiffResult {
            diffs,
            creates,
            updates,
            deletes,
            unchanged,
            changed_outputs,
        }
    }

    /// Computes the diff for a single logical id.
    fn compute_resource_diff(
        &self,
        id: &str,
        old: Option<&ResourceSpec>,
        new: Option<&ResourceSpec>,
    ) -> ResourceDiff {
        let old_hash = old.map(|spec| self.hasher.hash_resource(spec));
        let new_hash = new.map(|spec| self.hasher.hash_resource(spec));

        let (diff_type, details) = match (old, new) {
            (None, Some(spec)) => {
                debug!("{id} will be created");
                (
                    DiffType::Create,
                    vec![DiffDetail {
                        field: String::from("type"),
                        old_value: None,
                        new_value: Some(spec.kind.to_string()),
                    }],
                )
            }
            (Some(spec), None) => {
                debug!("{id} will be deleted");
                (
                    DiffType::Delete,
                    vec![DiffDetail {
                        field: String::from("type"),
                        old_value: Some(spec.kind.to_string()),
                        new_value: None,
                    }],
                )
            }
            (Some(old_spec), Some(new_spec)) if old_hash != new_hash => {
                debug!("{id} changed");
                (DiffType::Update, Self::compute_detailed_diff(old_spec, new_spec))
            }
            _ => (DiffType::NoChange, Vec::new()),
        };

        ResourceDiff {
            id: id.to_string(),
            diff_type,
            details,
            old_hash,
            new_hash,
        }
    }

    /// Lists the kind, attributes and tags that differ between two specs.
    fn compute_detailed_diff(old: &ResourceSpec, new: &ResourceSpec) -> Vec<DiffDetail> {
        let mut details = Vec::new();

        if old.kind != new.kind {
            details.push(DiffDetail {
                field: String::from("type"),
                old_value: Some(old.kind.to_string()),
                new_value: Some(new.kind.to_string()),
            });
        }

        let names: BTreeSet<&String> = old.attributes.keys().chain(new.attributes.keys()).collect();
        for name in names {
            let before = old.attributes.get(name);
            let after = new.attributes.get(name);
            if before != after {
                details.push(DiffDetail {
                    field: name.clone(),
                    old_value: before.map(ToString::to_string),
                    new_value: after.map(ToString::to_string),
                });
            }
        }

        let keys: BTreeSet<&String> = old.tags.keys().chain(new.tags.keys()).collect();
        for key in keys {
            let before = old.tags.get(key);
            let after = new.tags.get(key);
            if before != after {
                details.push(DiffDetail {
                    field: format!("tags.{key}"),
                    old_value: before.cloned(),
                    new_value: after.cloned(),
                });
            }
        }

        details
    }
}

impl DiffResult {
    /// Returns true if there are any changes.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.creates > 0 || self.updates > 0 || self.deletes > 0 || !self.changed_outputs.is_empty()
    }

    /// Returns the total number of resource changes.
    #[must_use]
    pub const fn total_changes(&self) -> usize {
        self.creates + self.updates + self.deletes
    }

    /// Filters to only diffs that change something.
    #[must_use]
    pub fn actionable_diffs(&self) -> Vec<&ResourceDiff> {
        self.diffs
            .iter()
            .filter(|d| d.diff_type != DiffType::NoChange)
            .collect()
    }

    /// Returns the diff for a logical id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ResourceDiff> {
        self.diffs.iter().find(|d| d.id == id)
    }
}

impl std::fmt::Display for DiffType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::NoChange => "no change",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for ResourceDiff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.id, self.diff_type)?;
        if self.diff_type == DiffType::Update && !self.details.is_empty() {
            write!(f, " (")?;
            for (i, detail) in self.details.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", detail.field)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}
