//! Database resource group.
//!
//! Emits the bastion host and its security group, the database security
//! group, the credential secret and one of two database topologies.

use tracing::debug;

use crate::config::{ResolvedConfig, ResolvedDatabase};
use crate::error::PlanError;

use super::naming::{
    BASTION_HOST, BASTION_SECURITY_GROUP, DATABASE_HOSTNAME_OUTPUT, DB_BASTION_INGRESS,
    DB_CLUSTER, DB_INSTANCE, DB_SECRET, DB_SECURITY_GROUP, Naming,
};
use super::plan::ResourcePlan;
use super::resource::{AttributeValue, ResourceKind, ResourceRef, ResourceSpec};

/// SSH port opened on the bastion.
const SSH_PORT: u16 = 22;
/// Root volume size of the bastion in GiB.
const BASTION_VOLUME_GIB: u32 = 20;
/// Anywhere, as a CIDR.
const ANY_IPV4: &str = "0.0.0.0/0";

/// Settings of a clustered database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterSettings {
    /// Instance class of the cluster members.
    pub instance_type: &'static str,
}

/// Settings of a single-instance database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandaloneSettings {
    /// Instance class.
    pub instance_type: &'static str,
    /// Initial storage in GiB.
    pub allocated_storage: u32,
    /// Storage ceiling in GiB.
    pub max_allocated_storage: u32,
}

/// Shape of the database deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTopology {
    /// Aurora PostgreSQL cluster.
    Clustered(ClusterSettings),
    /// Single RDS PostgreSQL instance reachable from the bastion.
    Standalone(StandaloneSettings),
}

impl DatabaseTopology {
    /// Picks the topology requested by the database settings.
    #[must_use]
    pub const fn select(db: &ResolvedDatabase) -> Self {
        if db.use_cluster {
            Self::Clustered(ClusterSettings {
                instance_type: "r5.large",
            })
        } else {
            Self::Standalone(StandaloneSettings {
                instance_type: "t3.micro",
                allocated_storage: db.allocated_storage,
                max_allocated_storage: db.max_allocated_storage,
            })
        }
    }

    /// Logical id of the database resource.
    #[must_use]
    pub const fn logical_id(&self) -> &'static str {
        match self {
            Self::Clustered(_) => DB_CLUSTER,
            Self::Standalone(_) => DB_INSTANCE,
        }
    }

    /// Short name for display.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        Self::label(matches!(self, Self::Clustered(_)))
    }

    /// Short name of the topology a `use_cluster` flag selects, usable
    /// before the configuration resolves.
    #[must_use]
    pub const fn label(use_cluster: bool) -> &'static str {
        if use_cluster { "clustered" } else { "standalone" }
    }

    /// Reference to the endpoint address of the database.
    #[must_use]
    pub fn endpoint(&self) -> ResourceRef {
        ResourceRef::attr(self.logical_id(), "endpoint_address")
    }
}

impl std::fmt::Display for DatabaseTopology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Adds the database group to `plan` and returns the chosen topology.
///
/// # Errors
///
/// Returns a [`PlanError`] if a logical id is already taken.
pub fn plan_database(
    config: &ResolvedConfig,
    naming: &Naming,
    plan: &mut ResourcePlan,
) -> Result<DatabaseTopology, PlanError> {
    let db = &config.database;

    plan.insert(BASTION_SECURITY_GROUP, bastion_security_group(config, naming))?;
    plan.insert(BASTION_HOST, bastion_host(config, naming))?;
    plan.insert(DB_SECURITY_GROUP, database_security_group(config, naming))?;
    plan.insert(
        DB_SECRET,
        ResourceSpec::new(ResourceKind::DatabaseSecret)
            .with("secret_name", db.password_key.as_str())
            .with("username", db.username.as_str()),
    )?;

    let topology = DatabaseTopology::select(db);
    debug!("Database topology: {topology}");

    match &topology {
        DatabaseTopology::Clustered(settings) => {
            plan.insert(DB_CLUSTER, cluster(config, settings))?;
        }
        DatabaseTopology::Standalone(settings) => {
            plan.insert(DB_INSTANCE, instance(config, settings))?;
            plan.insert(
                DB_BASTION_INGRESS,
                ResourceSpec::new(ResourceKind::SecurityGroupIngress)
                    .with("group", ResourceRef::attr(DB_SECURITY_GROUP, "group_id"))
                    .with("source_group", ResourceRef::attr(BASTION_SECURITY_GROUP, "group_id"))
                    .with("protocol", "tcp")
                    .with("from_port", db.port)
                    .with("to_port", db.port),
            )?;
        }
    }

    plan.add_output(DATABASE_HOSTNAME_OUTPUT, topology.endpoint())?;

    Ok(topology)
}

fn ingress_rule(cidr: &str, port: u16, description: &str) -> AttributeValue {
    AttributeValue::map([
        ("cidr_ip", AttributeValue::from(cidr)),
        ("description", AttributeValue::from(description)),
        ("from_port", AttributeValue::from(port)),
        ("protocol", AttributeValue::from("tcp")),
        ("to_port", AttributeValue::from(port)),
    ])
}

fn bastion_security_group(config: &ResolvedConfig, naming: &Naming) -> ResourceSpec {
    ResourceSpec::new(ResourceKind::SecurityGroup)
        .with("group_name", naming.physical("bastion_ssh_sg"))
        .with("vpc_id", config.vpc_id.as_str())
        .with("allow_all_outbound", true)
        .with(
            "ingress",
            AttributeValue::list([ingress_rule(
                &config.caller_cidr(),
                SSH_PORT,
                "Incoming SSH",
            )]),
        )
}

fn bastion_host(config: &ResolvedConfig, naming: &Naming) -> ResourceSpec {
    let root_volume = AttributeValue::map([
        ("delete_on_termination", AttributeValue::from(true)),
        ("device_name", AttributeValue::from("/dev/xvda")),
        ("encrypted", AttributeValue::from(true)),
        ("volume_size", AttributeValue::from(BASTION_VOLUME_GIB)),
        ("volume_type", AttributeValue::from("standard")),
    ]);

    ResourceSpec::new(ResourceKind::BastionHost)
        .with("instance_name", naming.physical("db_bastion_host"))
        .with("instance_type", "t2.micro")
        .with("machine_image", "amazon-linux-2")
        .with("vpc_id", config.vpc_id.as_str())
        .with("subnet_type", "public")
        .with("key_name", config.keypair_name.as_str())
        .with("security_group", ResourceRef::attr(BASTION_SECURITY_GROUP, "group_id"))
        .with("block_devices", AttributeValue::list([root_volume]))
}

fn database_security_group(config: &ResolvedConfig, naming: &Naming) -> ResourceSpec {
    let db = &config.database;

    ResourceSpec::new(ResourceKind::SecurityGroup)
        .with("group_name", naming.physical("db_sg"))
        .with("vpc_id", config.vpc_id.as_str())
        .with("allow_all_outbound", true)
        .with(
            "ingress",
            AttributeValue::list([
                ingress_rule(ANY_IPV4, db.port, "Database port"),
                ingress_rule(ANY_IPV4, db.https_port, "HTTPS port"),
            ]),
        )
}

/// Attributes shared by both topologies.
fn database_base(kind: ResourceKind, engine: &str, config: &ResolvedConfig) -> ResourceSpec {
    let db = &config.database;

    ResourceSpec::new(kind)
        .with("database_name", db.name.as_str())
        .with("engine", engine)
        .with("engine_version", db.full_version.as_str())
        .with("engine_major_version", db.major_version.as_str())
        .with("port", db.port)
        .with("storage_encrypted", true)
        .with("credentials", ResourceRef::attr(DB_SECRET, "arn"))
        .with("vpc_id", config.vpc_id.as_str())
        .with("subnet_type", "private_with_egress")
        .with(
            "security_groups",
            AttributeValue::list([ResourceRef::attr(DB_SECURITY_GROUP, "group_id")]),
        )
        .with("removal_policy", "destroy")
}

fn cluster(config: &ResolvedConfig, settings: &ClusterSettings) -> ResourceSpec {
    database_base(ResourceKind::DatabaseCluster, "aurora-postgresql", config)
        .with("instance_type", settings.instance_type)
}

fn instance(config: &ResolvedConfig, settings: &StandaloneSettings) -> ResourceSpec {
    database_base(ResourceKind::DatabaseInstance, "postgres", config)
        .with("instance_type", settings.instance_type)
        .with("allocated_storage", settings.allocated_storage)
        .with("max_allocated_storage", settings.max_allocated_storage)
        .with("multi_az", false)
        .with("allow_major_version_upgrade", true)
        .with("auto_minor_version_upgrade", true)
        .with("backup_retention_days", 0_u32)
        .with("delete_automated_backups", true)
        .with("deletion_protection", false)
        .with("publicly_accessible", false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_support::sample_config;

    fn planned(use_cluster: bool) -> (ResourcePlan, DatabaseTopology) {
        let mut config = sample_config();
        config.database.use_cluster = use_cluster;
        let resolved = ResolvedConfig::resolve(&config).unwrap();
        let naming = Naming::new(&resolved.prefix, &resolved.uuid);

        let mut plan = ResourcePlan::new();
        let topology = plan_database(&resolved, &naming, &mut plan).unwrap();
        (plan, topology)
    }

    fn ingress_cidrs(spec: &ResourceSpec) -> Vec<String> {
        spec.attribute("ingress")
            .and_then(AttributeValue::as_list)
            .unwrap_or_default()
            .iter()
            .filter_map(|rule| rule.as_map()?.get("cidr_ip")?.as_text().map(String::from))
            .collect()
    }

    #[test]
    fn test_standalone_topology() {
        let (plan, topology) = planned(false);

        assert!(matches!(topology, DatabaseTopology::Standalone(_)));
        assert!(plan.contains(DB_INSTANCE));
        assert!(plan.contains(DB_BASTION_INGRESS));
        assert!(!plan.contains(DB_CLUSTER));

        let ingress = plan.get(DB_BASTION_INGRESS).unwrap();
        assert_eq!(
            ingress.attribute("source_group").and_then(AttributeValue::as_reference),
            Some(&ResourceRef::attr(BASTION_SECURITY_GROUP, "group_id"))
        );
        assert_eq!(
            ingress.attribute("from_port").and_then(AttributeValue::as_integer),
            Some(5432)
        );

        let instance = plan.get(DB_INSTANCE).unwrap();
        assert_eq!(
            instance.attribute("instance_type").and_then(AttributeValue::as_text),
            Some("t3.micro")
        );
        assert_eq!(
            instance.attribute("allocated_storage").and_then(AttributeValue::as_integer),
            Some(20)
        );
        assert_eq!(
            instance.attribute("publicly_accessible").and_then(AttributeValue::as_bool),
            Some(false)
        );
        assert_eq!(
            plan.outputs().get(DATABASE_HOSTNAME_OUTPUT),
            Some(&ResourceRef::attr(DB_INSTANCE, "endpoint_address"))
        );
    }

    #[test]
    fn test_clustered_topology() {
        let (plan, topology) = planned(true);

        assert_eq!(topology.logical_id(), DB_CLUSTER);
        assert!(plan.contains(DB_CLUSTER));
        assert!(!plan.contains(DB_INSTANCE));
        assert!(!plan.contains(DB_BASTION_INGRESS));

        let cluster = plan.get(DB_CLUSTER).unwrap();
        assert_eq!(
            cluster.attribute("engine").and_then(AttributeValue::as_text),
            Some("aurora-postgresql")
        );
        assert_eq!(
            cluster.attribute("instance_type").and_then(AttributeValue::as_text),
            Some("r5.large")
        );
        assert_eq!(
            plan.outputs().get(DATABASE_HOSTNAME_OUTPUT),
            Some(&ResourceRef::attr(DB_CLUSTER, "endpoint_address"))
        );
    }

    #[test]
    fn test_bastion_ingress_is_single_host() {
        for use_cluster in [false, true] {
            let (plan, _) = planned(use_cluster);
            let group = plan.get(BASTION_SECURITY_GROUP).unwrap();

            assert_eq!(group.physical_name(), Some("my_iot_bastion_ssh_sg"));
            assert_eq!(ingress_cidrs(group), vec!["203.0.113.7/32"]);
        }
    }

    #[test]
    fn test_database_security_group_ports() {
        let (plan, _) = planned(false);
        let group = plan.get(DB_SECURITY_GROUP).unwrap();
        let ports: Vec<i64> = group
            .attribute("ingress")
            .and_then(AttributeValue::as_list)
            .unwrap()
            .iter()
            .filter_map(|rule| rule.as_map()?.get("from_port")?.as_integer())
            .collect();

        assert_eq!(group.physical_name(), Some("my_iot_db_sg"));
        assert_eq!(ports, vec![5432, 443]);
    }

    #[test]
    fn test_bastion_host() {
        let (plan, _) = planned(false);
        let host = plan.get(BASTION_HOST).unwrap();

        assert_eq!(host.physical_name(), Some("my_iot_db_bastion_host"));
        assert_eq!(
            host.attribute("key_name").and_then(AttributeValue::as_text),
            Some("iot-bastion")
        );
        assert_eq!(
            host.attribute("subnet_type").and_then(AttributeValue::as_text),
            Some("public")
        );
    }

    #[test]
    fn test_secret_shared_by_both_topologies() {
        for use_cluster in [false, true] {
            let (plan, topology) = planned(use_cluster);
            let secret = plan.get(DB_SECRET).unwrap();
            assert_eq!(secret.physical_name(), Some("my_iot_db_password"));

            let database = plan.get(topology.logical_id()).unwrap();
            assert_eq!(
                database.attribute("credentials").and_then(AttributeValue::as_reference),
                Some(&ResourceRef::attr(DB_SECRET, "arn"))
            );
        }
    }
}
