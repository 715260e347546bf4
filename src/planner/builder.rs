//! Resource plan builder.
//!
//! Turns a [`DeploymentConfig`] into a [`ResourcePlan`] in one pass:
//! validate, resolve, emit the database, storage and layer groups, apply
//! tags and check every reference. Nothing is returned unless all of it
//! succeeds.

use tracing::{debug, info, warn};

use crate::config::{ConfigValidator, DeploymentConfig, ResolvedConfig};
use crate::error::{PlanError, Result};

use super::database::{DatabaseTopology, plan_database};
use super::layers::plan_layers;
use super::naming::Naming;
use super::plan::ResourcePlan;
use super::storage::plan_storage;

/// Builds resource plans from deployment configurations.
#[derive(Debug, Default)]
pub struct PlanBuilder {
    /// Validator run before resolution.
    validator: ConfigValidator,
}

/// A built plan with what was decided along the way.
#[derive(Debug, Clone)]
pub struct BuiltPlan {
    /// The verified plan.
    pub plan: ResourcePlan,
    /// Database topology that was selected.
    pub topology: DatabaseTopology,
    /// Validation warnings.
    pub warnings: Vec<String>,
}

impl PlanBuilder {
    /// Creates a new builder.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            validator: ConfigValidator::new(),
        }
    }

    /// Builds the plan for a deployment configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if validation or resolution fails, and a
    /// plan error if the emitted resources are inconsistent.
    pub fn build(&self, config: &DeploymentConfig) -> Result<BuiltPlan> {
        let validation = self.validator.validate(config)?;
        for warning in &validation.warnings {
            warn!("{warning}");
        }

        let resolved = ResolvedConfig::resolve(config)?;
        let (plan, topology) = Self::build_resolved(&resolved)?;

        info!(
            "Built plan for '{}': {} resources, {} outputs, {} database",
            resolved.prefix,
            plan.len(),
            plan.outputs().len(),
            topology
        );

        Ok(BuiltPlan {
            plan,
            topology,
            warnings: validation.warnings,
        })
    }

    /// Builds the plan from an already resolved configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`PlanError`] on duplicate ids or dangling references.
    pub fn build_resolved(
        resolved: &ResolvedConfig,
    ) -> std::result::Result<(ResourcePlan, DatabaseTopology), PlanError> {
        let naming = Naming::new(&resolved.prefix, &resolved.uuid);
        let mut plan = ResourcePlan::new();

        let topology = plan_database(resolved, &naming, &mut plan)?;
        debug!("Database group: {} resources", plan.len());

        plan_storage(resolved, &naming, &mut plan)?;
        plan_layers(resolved, &naming, &mut plan)?;

        plan.apply_tags(&resolved.tags);
        plan.verify()?;

        Ok((plan, topology))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigHasher;
    use crate::config::NumericSetting;
    use crate::config::test_support::sample_config;
    use crate::error::{ConfigError, InfraError};
    use crate::planner::naming::{
        APP_LAYER, BASTION_SECURITY_GROUP, DB_BASTION_INGRESS, DB_CLUSTER, DB_INSTANCE,
        IMPORT_LAYER,
    };
    use crate::planner::{AttributeValue, BucketRole, ResourceKind};

    fn build(use_cluster: bool) -> BuiltPlan {
        let mut config = sample_config();
        config.database.use_cluster = use_cluster;
        PlanBuilder::new().build(&config).unwrap()
    }

    #[test]
    fn test_build_is_deterministic() {
        let hasher = ConfigHasher::new();
        let first = build(false);
        let second = build(false);

        assert_eq!(first.plan, second.plan);
        assert_eq!(hasher.hash_plan(&first.plan), hasher.hash_plan(&second.plan));
        assert_eq!(
            serde_json::to_string(&first.plan).unwrap(),
            serde_json::to_string(&second.plan).unwrap()
        );
    }

    #[test]
    fn test_no_dangling_references_in_either_topology() {
        for use_cluster in [false, true] {
            let built = build(use_cluster);
            assert!(built.plan.dangling_references().is_empty());
            assert!(!built.plan.references().is_empty());
        }
    }

    #[test]
    fn test_allow_rule_follows_topology() {
        let standalone = build(false).plan;
        assert!(standalone.contains(DB_INSTANCE));
        assert!(standalone.contains(DB_BASTION_INGRESS));

        let clustered = build(true).plan;
        assert!(clustered.contains(DB_CLUSTER));
        assert!(!clustered.contains(DB_BASTION_INGRESS));
        assert_eq!(clustered.len() + 1, standalone.len());
    }

    #[test]
    fn test_resource_counts() {
        let built = build(false);
        let counts = built.plan.count_by_kind();

        assert_eq!(counts.get(&ResourceKind::Bucket), Some(&5));
        assert_eq!(counts.get(&ResourceKind::OriginAccessIdentity), Some(&3));
        assert_eq!(counts.get(&ResourceKind::Distribution), Some(&3));
        assert_eq!(counts.get(&ResourceKind::LayerVersion), Some(&2));
        assert_eq!(counts.get(&ResourceKind::SecurityGroup), Some(&2));
        assert_eq!(built.plan.outputs().len(), 4);
    }

    #[test]
    fn test_every_resource_carries_tags() {
        let built = build(true);
        let tags = sample_config().tags;

        assert!(
            built
                .plan
                .resources()
                .values()
                .all(|spec| spec.tags == tags)
        );
    }

    #[test]
    fn test_bastion_rule_accepts_explicit_host_cidr() {
        let mut config = sample_config();
        config.my_ip = String::from("198.51.100.20/32");
        let built = PlanBuilder::new().build(&config).unwrap();

        let rule = built
            .plan
            .get(BASTION_SECURITY_GROUP)
            .and_then(|spec| spec.attribute("ingress"))
            .and_then(AttributeValue::as_list)
            .and_then(|rules| rules.first())
            .and_then(AttributeValue::as_map)
            .and_then(|rule| rule.get("cidr_ip"))
            .and_then(AttributeValue::as_text);
        assert_eq!(rule, Some("198.51.100.20/32"));
    }

    #[test]
    fn test_wildcard_caller_rejected() {
        for ip in ["0.0.0.0/0", "0.0.0.0", "10.0.0.0/8"] {
            let mut config = sample_config();
            config.my_ip = String::from(ip);
            let err = PlanBuilder::new().build(&config).unwrap_err();
            assert!(err.is_config_error(), "{ip} should be rejected");
        }
    }

    #[test]
    fn test_malformed_numbers_fail_before_planning() {
        let mut config = sample_config();
        config.database.port = NumericSetting::new("54x2");
        let err = PlanBuilder::new().build(&config).unwrap_err();
        assert!(matches!(
            err,
            InfraError::Config(ConfigError::ValidationError { ref field, .. })
                if field.as_deref() == Some("database.port")
        ));

        let mut config = sample_config();
        config.database.allocated_storage = NumericSetting::new("twenty");
        assert!(PlanBuilder::new().build(&config).is_err());
    }

    #[test]
    fn test_layers_and_bucket_example() {
        let built = build(false);
        assert!(built.plan.contains(APP_LAYER));
        assert!(built.plan.contains(IMPORT_LAYER));
        assert_eq!(
            built
                .plan
                .get(&BucketRole::Dashboard.bucket_id())
                .and_then(|spec| spec.physical_name()),
            Some("my-iot-dashboard-abc123")
        );
    }

    #[test]
    fn test_build_resolved_skips_validation() {
        let resolved = ResolvedConfig::resolve(&sample_config()).unwrap();
        let (plan, topology) = PlanBuilder::build_resolved(&resolved).unwrap();

        assert_eq!(topology.name(), "standalone");
        assert_eq!(plan, build(false).plan);
    }
}
