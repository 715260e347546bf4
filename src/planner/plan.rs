//! Resource plan types.
//!
//! A [`ResourcePlan`] maps logical ids to resource specifications and names
//! the outputs the orchestrator exposes after execution. Maps are ordered, so
//! serializing the same plan always yields the same document.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::PlanError;

use super::resource::{ResourceKind, ResourceRef, ResourceSpec};

/// A complete resource plan.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourcePlan {
    /// Resources by logical id.
    resources: BTreeMap<String, ResourceSpec>,
    /// Outputs by name.
    #[serde(default)]
    outputs: BTreeMap<String, ResourceRef>,
}

/// A reference whose target is not part of the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingReference {
    /// Resource id, or `output:<name>`, holding the reference.
    pub from: String,
    /// The unresolved reference.
    pub reference: ResourceRef,
}

impl ResourcePlan {
    /// Creates an empty plan.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a resource under a logical id.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::DuplicateResource`] if the id is already taken.
    pub fn insert(&mut self, id: impl Into<String>, spec: ResourceSpec) -> Result<(), PlanError> {
        let id = id.into();
        if self.resources.contains_key(&id) {
            return Err(PlanError::DuplicateResource { id });
        }
        self.resources.insert(id, spec);
        Ok(())
    }

    /// Declares an output.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::DuplicateOutput`] if the name is already taken.
    pub fn add_output(
        &mut self,
        name: impl Into<String>,
        reference: ResourceRef,
    ) -> Result<(), PlanError> {
        let name = name.into();
        if self.outputs.contains_key(&name) {
            return Err(PlanError::DuplicateOutput { name });
        }
        self.outputs.insert(name, reference);
        Ok(())
    }

    /// Returns a resource by logical id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ResourceSpec> {
        self.resources.get(id)
    }

    /// Returns true if a resource with this id exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.resources.contains_key(id)
    }

    /// Returns all resources in id order.
    #[must_use]
    pub const fn resources(&self) -> &BTreeMap<String, ResourceSpec> {
        &self.resources
    }

    /// Returns all outputs in name order.
    #[must_use]
    pub const fn outputs(&self) -> &BTreeMap<String, ResourceRef> {
        &self.outputs
    }

    /// Returns the number of resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns true if the plan declares no resources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Returns the ids of all resources of one kind.
    #[must_use]
    pub fn ids_of_kind(&self, kind: ResourceKind) -> Vec<&str> {
        self.resources
            .iter()
            .filter(|(_, spec)| spec.kind == kind)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Counts resources per kind.
    #[must_use]
    pub fn count_by_kind(&self) -> BTreeMap<ResourceKind, usize> {
        let mut counts = BTreeMap::new();
        for spec in self.resources.values() {
            *counts.entry(spec.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Returns every reference in the plan with the id holding it.
    ///
    /// Output references are reported as `output:<name>`.
    #[must_use]
    pub fn references(&self) -> Vec<(String, &ResourceRef)> {
        let mut refs: Vec<(String, &ResourceRef)> = self
            .resources
            .iter()
            .flat_map(|(id, spec)| spec.references().into_iter().map(move |r| (id.clone(), r)))
            .collect();

        refs.extend(
            self.outputs
                .iter()
                .map(|(name, r)| (format!("output:{name}"), r)),
        );

        refs
    }

    /// Returns the ids that reference the given resource.
    #[must_use]
    pub fn referrers(&self, id: &str) -> Vec<String> {
        let mut referrers: Vec<String> = self
            .references()
            .into_iter()
            .filter(|(_, r)| r.resource == id)
            .map(|(from, _)| from)
            .collect();
        referrers.dedup();
        referrers
    }

    /// Returns every reference whose target is missing.
    #[must_use]
    pub fn dangling_references(&self) -> Vec<DanglingReference> {
        self.references()
            .into_iter()
            .filter(|(_, r)| !self.resources.contains_key(&r.resource))
            .map(|(from, r)| DanglingReference {
                from,
                reference: r.clone(),
            })
            .collect()
    }

    /// Checks that every reference resolves inside the plan.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::DanglingReference`] for the first unresolved reference.
    pub fn verify(&self) -> Result<(), PlanError> {
        match self.dangling_references().into_iter().next() {
            Some(dangling) => Err(PlanError::DanglingReference {
                from: dangling.from,
                target: dangling.reference.resource,
            }),
            None => Ok(()),
        }
    }

    /// Applies the tag mapping to every resource.
    pub fn apply_tags(&mut self, tags: &BTreeMap<String, String>) {
        for spec in self.resources.values_mut() {
            for (key, value) in tags {
                spec.tags.insert(key.clone(), value.clone());
            }
        }
    }
}

impl std::fmt::Display for ResourcePlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.resources.is_empty() {
            return write!(f, "Empty plan");
        }

        writeln!(f, "Resource Plan ({} resources):", self.resources.len())?;
        for (id, spec) in &self.resources {
            match spec.physical_name() {
                Some(name) => writeln!(f, "  {id} ({}) {name}", spec.kind)?,
                None => writeln!(f, "  {id} ({})", spec.kind)?,
            }
        }

        if !self.outputs.is_empty() {
            writeln!(f, "\nOutputs:")?;
            for (name, reference) in &self.outputs {
                writeln!(f, "  {name} = {reference}")?;
            }
        }

        Ok(())
    }
}
