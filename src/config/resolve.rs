//! Typed resolution of a deployment configuration.
//!
//! Every textual number and the caller address are parsed here, before a
//! single resource is emitted. A [`ResolvedConfig`] is what the plan
//! builder consumes.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::path::PathBuf;

use crate::error::ConfigError;

use super::spec::DeploymentConfig;

/// Relative directory under the upload root holding template content.
pub const TEMPLATE_SOURCE_DIR: &str = "template_files";

/// A fully parsed deployment configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// Name prefix.
    pub prefix: String,
    /// Unique deployment suffix.
    pub uuid: String,
    /// VPC identifier.
    pub vpc_id: String,
    /// The single host allowed to reach the bastion.
    pub caller_ip: Ipv4Addr,
    /// Bastion key pair name.
    pub keypair_name: String,
    /// Database settings.
    pub database: ResolvedDatabase,
    /// Root directory for deploy-time uploads.
    pub upload_root: PathBuf,
    /// Layer runtime.
    pub layer_runtime: String,
    /// Shared application layer code path.
    pub app_layer_path: String,
    /// Database import layer code path.
    pub import_layer_path: String,
    /// Tags applied to every resource.
    pub tags: BTreeMap<String, String>,
}

/// Parsed database settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDatabase {
    /// Clustered topology requested.
    pub use_cluster: bool,
    /// Default database name.
    pub name: String,
    /// Master username.
    pub username: String,
    /// Secret name.
    pub password_key: String,
    /// Full engine version.
    pub full_version: String,
    /// Major engine version.
    pub major_version: String,
    /// Database listener port.
    pub port: u16,
    /// HTTPS port.
    pub https_port: u16,
    /// Initial storage in GiB.
    pub allocated_storage: u32,
    /// Storage ceiling in GiB.
    pub max_allocated_storage: u32,
}

impl ResolvedConfig {
    /// Parses every typed field of `config`.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] encountered; no partial result is
    /// ever produced.
    pub fn resolve(config: &DeploymentConfig) -> Result<Self, ConfigError> {
        let db = &config.database;

        let database = ResolvedDatabase {
            use_cluster: db.use_cluster,
            name: db.name.clone(),
            username: db.username.clone(),
            password_key: db.password_key.clone(),
            full_version: db.postgres_full_version.clone(),
            major_version: db.postgres_major_version.clone(),
            port: parse_port(db.port.as_str(), "database.port")?,
            https_port: parse_port(db.https_port.as_str(), "database.https_port")?,
            allocated_storage: db.allocated_storage.parse("database.allocated_storage")?,
            max_allocated_storage: db
                .max_allocated_storage
                .parse("database.max_allocated_storage")?,
        };

        Ok(Self {
            prefix: config.prefix.clone(),
            uuid: config.uuid.clone(),
            vpc_id: config.network.vpc_id.clone(),
            caller_ip: parse_caller_ip(&config.my_ip, "my_ip")?,
            keypair_name: config.keypair_name.clone(),
            database,
            upload_root: PathBuf::from(&config.storage.upload_root),
            layer_runtime: config.layers.runtime.clone(),
            app_layer_path: config.layers.app_layer_path.clone(),
            import_layer_path: config.layers.import_layer_path.clone(),
            tags: config.tags.clone(),
        })
    }

    /// Returns the caller address in CIDR form, always `/32`.
    #[must_use]
    pub fn caller_cidr(&self) -> String {
        format!("{}/32", self.caller_ip)
    }

    /// Returns the local directory uploaded into the templates bucket.
    #[must_use]
    pub fn template_source(&self) -> PathBuf {
        self.upload_root.join(TEMPLATE_SOURCE_DIR)
    }
}

/// Parses a TCP port; zero is rejected.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidNumber`] for anything but `1..=65535`.
pub fn parse_port(raw: &str, field: &str) -> Result<u16, ConfigError> {
    match raw.trim().parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(ConfigError::InvalidNumber {
            field: field.to_string(),
            value: raw.to_string(),
        }),
    }
}

/// Parses the caller address: a single IPv4 host, bare or with `/32`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidAddress`] for any other prefix length, the
/// unspecified address, or a non-IPv4 value.
pub fn parse_caller_ip(raw: &str, field: &str) -> Result<Ipv4Addr, ConfigError> {
    let invalid = || ConfigError::InvalidAddress {
        field: field.to_string(),
        value: raw.to_string(),
    };

    let trimmed = raw.trim();
    let host = match trimmed.split_once('/') {
        Some((host, "32")) => host,
        Some(_) => return Err(invalid()),
        None => trimmed,
    };

    let addr: Ipv4Addr = host.parse().map_err(|_| invalid())?;
    if addr.is_unspecified() || addr.is_broadcast() {
        return Err(invalid());
    }

    Ok(addr)
}
