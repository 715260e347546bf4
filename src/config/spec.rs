//! Configuration specification types for the plan builder.
//!
//! This module defines all the structs that map to the `simpleiot.infra.yaml`
//! file. A [`DeploymentConfig`] is read once per invocation and never mutated
//! by the builder.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::ConfigError;

/// The root configuration structure for one deployment unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploymentConfig {
    /// Name prefix applied to every physical resource name (e.g. `my_iot`).
    pub prefix: String,
    /// Unique deployment suffix used to make bucket names globally unique.
    pub uuid: String,
    /// Network the resources are placed in.
    pub network: NetworkConfig,
    /// Public IPv4 address of the operator allowed to reach the bastion host.
    pub my_ip: String,
    /// Name of the EC2 key pair installed on the bastion host.
    pub keypair_name: String,
    /// Database settings.
    pub database: DatabaseConfig,
    /// Storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Lambda layer settings.
    #[serde(default)]
    pub layers: LayerConfig,
    /// Tags applied to every resource.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    /// Where rendered plan snapshots are kept.
    #[serde(default)]
    pub state: StateConfig,
}

/// Network reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Identifier of the existing VPC.
    pub vpc_id: String,
}

/// Database settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Use an Aurora cluster instead of a single RDS instance.
    #[serde(default)]
    pub use_cluster: bool,
    /// Default database name.
    pub name: String,
    /// Master username stored in the generated secret.
    pub username: String,
    /// Name of the generated credential secret.
    pub password_key: String,
    /// Full PostgreSQL engine version (e.g. `13.4`).
    pub postgres_full_version: String,
    /// Major PostgreSQL engine version (e.g. `13`).
    pub postgres_major_version: String,
    /// Database listener port.
    #[serde(default = "default_db_port")]
    pub port: NumericSetting,
    /// HTTPS port opened alongside the database port.
    #[serde(default = "default_https_port")]
    pub https_port: NumericSetting,
    /// Initial storage in GiB (single-instance topology).
    #[serde(default = "default_allocated_storage")]
    pub allocated_storage: NumericSetting,
    /// Storage autoscaling ceiling in GiB (single-instance topology).
    #[serde(default = "default_max_allocated_storage")]
    pub max_allocated_storage: NumericSetting,
}

/// Storage settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    /// Local directory holding content uploaded at deploy time.
    #[serde(default = "default_upload_root")]
    pub upload_root: String,
}

/// Lambda layer settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LayerConfig {
    /// Runtime both layers are declared compatible with.
    #[serde(default = "default_layer_runtime")]
    pub runtime: String,
    /// Code path of the shared application layer.
    #[serde(default = "default_app_layer_path")]
    pub app_layer_path: String,
    /// Code path of the database import layer.
    #[serde(default = "default_import_layer_path")]
    pub import_layer_path: String,
}

/// Snapshot state configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StateConfig {
    /// Backend type (local or s3).
    #[serde(default)]
    pub backend: StateBackend,
    /// S3 bucket name (required for s3 backend).
    #[serde(default)]
    pub bucket: Option<String>,
    /// S3 key prefix (optional).
    #[serde(default)]
    pub prefix: Option<String>,
    /// S3 region (optional, uses AWS default if not specified).
    #[serde(default)]
    pub region: Option<String>,
    /// Local state directory (for local backend).
    #[serde(default)]
    pub path: Option<String>,
}

/// State backend types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StateBackend {
    /// Local file-based snapshot storage.
    #[default]
    Local,
    /// AWS S3-based snapshot storage.
    S3,
}

/// A numeric limit kept in its textual form until resolution.
///
/// The file may hold either `5432` or `"5432"`; both are kept as text so a
/// malformed value is reported against its field instead of failing the
/// whole YAML document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "RawNumber", into = "String")]
pub struct NumericSetting(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Integer(i64),
    Text(String),
}

impl From<RawNumber> for NumericSetting {
    fn from(raw: RawNumber) -> Self {
        match raw {
            RawNumber::Integer(n) => Self(n.to_string()),
            RawNumber::Text(s) => Self(s),
        }
    }
}

impl From<NumericSetting> for String {
    fn from(setting: NumericSetting) -> Self {
        setting.0
    }
}

impl NumericSetting {
    /// Creates a setting from its textual form.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the raw text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses the setting, reporting failures against `field`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidNumber`] if the text is not a valid `T`.
    pub fn parse<T: FromStr>(&self, field: &str) -> Result<T, ConfigError> {
        self.0.trim().parse::<T>().map_err(|_| ConfigError::InvalidNumber {
            field: field.to_string(),
            value: self.0.clone(),
        })
    }
}

impl std::fmt::Display for NumericSetting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Default value functions

fn default_db_port() -> NumericSetting {
    NumericSetting::new("5432")
}

fn default_https_port() -> NumericSetting {
    NumericSetting::new("443")
}

fn default_allocated_storage() -> NumericSetting {
    NumericSetting::new("20")
}

fn default_max_allocated_storage() -> NumericSetting {
    NumericSetting::new("100")
}

fn default_upload_root() -> String {
    String::from("./s3_upload")
}

fn default_layer_runtime() -> String {
    String::from("python3.8")
}

fn default_app_layer_path() -> String {
    String::from("./lib/lambda_src/layers/iot_app_layer/")
}

fn default_import_layer_path() -> String {
    String::from("./lib/lambda_src/layers/iot_import_layer/out/")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_root: default_upload_root(),
        }
    }
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            runtime: default_layer_runtime(),
            app_layer_path: default_app_layer_path(),
            import_layer_path: default_import_layer_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_setting_accepts_int_and_string() {
        let from_int: NumericSetting = serde_yaml::from_str("5432").unwrap();
        let from_text: NumericSetting = serde_yaml::from_str("\"5432\"").unwrap();
        assert_eq!(from_int, from_text);
        assert_eq!(from_int.parse::<u16>("database.port").unwrap(), 5432);
    }

    #[test]
    fn test_numeric_setting_malformed() {
        let setting = NumericSetting::new("54three2");
        let err = setting.parse::<u16>("database.port").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidNumber { ref field, ref value }
                if field == "database.port" && value == "54three2"
        ));
    }

    #[test]
    fn test_numeric_setting_out_of_range() {
        let setting = NumericSetting::new("70000");
        assert!(setting.parse::<u16>("database.port").is_err());
        assert_eq!(setting.parse::<u32>("database.port").unwrap(), 70_000);
    }

    #[test]
    fn test_layer_defaults() {
        let layers = LayerConfig::default();
        assert_eq!(layers.runtime, "python3.8");
        assert!(layers.import_layer_path.ends_with("/out/"));
    }
}
