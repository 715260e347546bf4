//! Deterministic naming.
//!
//! Every physical name and logical id the builder emits comes from here.
//! Keeping them in one place is what lets the plan check its own
//! references: a resource and everything pointing at it agree on one id.

/// Logical id of the bastion security group.
pub const BASTION_SECURITY_GROUP: &str = "bastion_security_group";
/// Logical id of the bastion host.
pub const BASTION_HOST: &str = "db_bastion_host";
/// Logical id of the database security group.
pub const DB_SECURITY_GROUP: &str = "db_security_group";
/// Logical id of the database credential secret.
pub const DB_SECRET: &str = "db_secret";
/// Logical id of the clustered database.
pub const DB_CLUSTER: &str = "db_cluster";
/// Logical id of the single-instance database.
pub const DB_INSTANCE: &str = "db_instance";
/// Logical id of the bastion-to-database allow rule.
pub const DB_BASTION_INGRESS: &str = "db_bastion_ingress";
/// Logical id of the template content upload.
pub const TEMPLATE_DEPLOYMENT: &str = "template_s3_deployment";
/// Logical id of the shared application layer.
pub const APP_LAYER: &str = "lambda_app_layer";
/// Logical id of the database import layer.
pub const IMPORT_LAYER: &str = "lambda_import_layer";

/// Output name of the database hostname.
pub const DATABASE_HOSTNAME_OUTPUT: &str = "database_hostname";

/// The fixed set of storage buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BucketRole {
    /// Dashboard web assets.
    Dashboard,
    /// Firmware update images.
    FirmwareUpdate,
    /// Device-twin media.
    TwinMedia,
    /// Project templates.
    Template,
    /// Firmware generator artifacts.
    Generator,
}

impl BucketRole {
    /// All roles, in emission order.
    pub const ALL: [Self; 5] = [
        Self::Dashboard,
        Self::FirmwareUpdate,
        Self::TwinMedia,
        Self::Template,
        Self::Generator,
    ];

    /// Returns the role segment used in bucket names.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::FirmwareUpdate => "fw-update",
            Self::TwinMedia => "twin-media",
            Self::Template => "template",
            Self::Generator => "generator",
        }
    }

    /// Returns the role segment used in logical ids.
    #[must_use]
    pub const fn id_stem(self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::FirmwareUpdate => "fw_update",
            Self::TwinMedia => "twin_media",
            Self::Template => "template",
            Self::Generator => "generator",
        }
    }

    /// Returns true if this bucket is fronted by a content distribution.
    #[must_use]
    pub const fn is_distributed(self) -> bool {
        matches!(self, Self::Dashboard | Self::FirmwareUpdate | Self::TwinMedia)
    }

    /// Returns the comment of this role's read-access identity, for
    /// distributed roles.
    #[must_use]
    pub const fn identity_comment(self) -> Option<&'static str> {
        match self {
            Self::Dashboard => Some("Dashboard OIA"),
            Self::FirmwareUpdate => Some("FW Update OIA"),
            Self::TwinMedia => Some("Twin Media OIA"),
            Self::Template | Self::Generator => None,
        }
    }

    /// Logical id of this role's bucket.
    #[must_use]
    pub fn bucket_id(self) -> String {
        format!("{}_bucket", self.id_stem())
    }

    /// Logical id of this role's read-access identity.
    #[must_use]
    pub fn identity_id(self) -> String {
        format!("{}_oai", self.id_stem())
    }

    /// Logical id of this role's read grant.
    #[must_use]
    pub fn read_grant_id(self) -> String {
        format!("{}_read_policy", self.id_stem())
    }

    /// Logical id of this role's distribution.
    #[must_use]
    pub fn distribution_id(self) -> String {
        format!("{}_distribution", self.id_stem())
    }

    /// Output name of this role's distribution domain.
    #[must_use]
    pub fn domain_output(self) -> String {
        format!("{}_domain_name", self.id_stem())
    }
}

impl std::fmt::Display for BucketRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.slug())
    }
}

/// Physical name generator for one deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Naming {
    prefix: String,
    uuid: String,
}

impl Naming {
    /// Creates a naming scheme for a prefix and deployment suffix.
    #[must_use]
    pub fn new(prefix: impl Into<String>, uuid: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            uuid: uuid.into(),
        }
    }

    /// Returns `<prefix>_<suffix>`.
    #[must_use]
    pub fn physical(&self, suffix: &str) -> String {
        format!("{}_{suffix}", self.prefix)
    }

    /// Returns the prefix with underscores replaced, as bucket names forbid them.
    #[must_use]
    pub fn bucket_prefix(&self) -> String {
        self.prefix.replace('_', "-")
    }

    /// Returns `<bucket prefix>-<role>-<uuid>`.
    #[must_use]
    pub fn bucket_name(&self, role: BucketRole) -> String {
        format!("{}-{}-{}", self.bucket_prefix(), role.slug(), self.uuid)
    }
}
