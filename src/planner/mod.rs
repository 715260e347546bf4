//! Planning module.
//!
//! This module maps a deployment configuration onto a resource plan and
//! compares plans between renders.

mod builder;
mod database;
mod diff;
mod layers;
pub mod naming;
mod plan;
mod resource;
mod storage;

pub use builder::{BuiltPlan, PlanBuilder};
pub use database::{ClusterSettings, DatabaseTopology, StandaloneSettings, plan_database};
pub use diff::{DiffDetail, DiffEngine, DiffResult, DiffType, ResourceDiff};
pub use layers::plan_layers;
pub use naming::{BucketRole, Naming};
pub use plan::{DanglingReference, ResourcePlan};
pub use resource::{AttributeValue, ResourceKind, ResourceRef, ResourceSpec};
pub use storage::plan_storage;
