//! Configuration validation for deployment configs.
//!
//! This module checks a whole configuration and reports every problem it
//! finds, so a user can fix a file in one pass. Numeric settings and the
//! caller address are checked with the same parsers the resolver uses.

use crate::error::{ConfigError, InfraError, Result};
use tracing::debug;

use super::resolve::{parse_caller_ip, parse_port};
use super::spec::{DatabaseConfig, DeploymentConfig, LayerConfig, StateBackend, StateConfig};
use crate::planner::{BucketRole, Naming};

/// Minimum length of an S3 bucket name.
const MIN_BUCKET_NAME_LEN: usize = 3;

/// Maximum length of an S3 bucket name.
const MAX_BUCKET_NAME_LEN: usize = 63;

/// Maximum length of a tag key.
const MAX_TAG_KEY_LEN: usize = 128;

/// Maximum length of a tag value.
const MAX_TAG_VALUE_LEN: usize = 256;

/// Smallest allocated storage RDS accepts for PostgreSQL, in GiB.
const MIN_RECOMMENDED_STORAGE_GB: u32 = 20;

/// Validator for deployment configurations.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a deployment configuration.
    ///
    /// # Errors
    ///
    /// Returns the first error found if validation fails.
    pub fn validate(&self, config: &DeploymentConfig) -> Result<ValidationResult> {
        let result = self.check(config);

        if let Some(first_error) = result.errors.first() {
            return Err(InfraError::Config(ConfigError::ValidationError {
                message: first_error.message.clone(),
                field: Some(first_error.field.clone()),
            }));
        }

        debug!(
            "Configuration validation passed ({} warnings)",
            result.warnings.len()
        );
        Ok(result)
    }

    /// Runs every check and returns the collected findings without failing.
    #[must_use]
    pub fn check(&self, config: &DeploymentConfig) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_identity(config, &mut result);
        Self::validate_network(config, &mut result);
        Self::validate_database(&config.database, &mut result);
        Self::validate_storage(config, &mut result);
        Self::validate_layers(&config.layers, &mut result);
        Self::validate_tags(config, &mut result);
        Self::validate_state(&config.state, &mut result);

        result
    }

    /// Validates the prefix, deployment suffix, and the bucket names they produce.
    fn validate_identity(config: &DeploymentConfig, result: &mut ValidationResult) {
        if config.prefix.is_empty() {
            result.error("prefix", "Prefix cannot be empty");
        } else if !is_valid_prefix(&config.prefix) {
            result.error(
                "prefix",
                format!(
                    "Prefix '{}' is invalid. Must start with a lowercase letter and contain only lowercase alphanumerics, '_' or '-'.",
                    config.prefix
                ),
            );
        }

        if config.uuid.is_empty() {
            result.error("uuid", "Deployment uuid cannot be empty");
        } else if !config
            .uuid
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            result.error(
                "uuid",
                format!(
                    "Deployment uuid '{}' may only contain lowercase alphanumerics and '-'",
                    config.uuid
                ),
            );
        }

        if config.prefix.is_empty() || config.uuid.is_empty() {
            return;
        }

        let naming = Naming::new(&config.prefix, &config.uuid);
        let mut malformed = None;
        for role in BucketRole::ALL {
            let name = naming.bucket_name(role);
            if !(MIN_BUCKET_NAME_LEN..=MAX_BUCKET_NAME_LEN).contains(&name.len()) {
                result.error(
                    "uuid",
                    format!(
                        "Bucket name '{name}' must be between {MIN_BUCKET_NAME_LEN} and {MAX_BUCKET_NAME_LEN} characters; shorten prefix or uuid"
                    ),
                );
            }
            if malformed.is_none() && !is_valid_bucket_shape(&name) {
                malformed = Some(name);
            }
        }

        if let Some(name) = malformed {
            let normalized_prefix = config.prefix.replace('_', "-");
            let field = if normalized_prefix.ends_with('-') || normalized_prefix.contains("--") {
                "prefix"
            } else {
                "uuid"
            };
            result.error(
                field,
                format!(
                    "Bucket name '{name}' must start and end with a letter or digit and must not repeat '-'"
                ),
            );
        }
    }

    /// Validates the network reference, caller address and key pair.
    fn validate_network(config: &DeploymentConfig, result: &mut ValidationResult) {
        if config.network.vpc_id.is_empty() {
            result.error("network.vpc_id", "VPC id cannot be empty");
        } else if !config.network.vpc_id.starts_with("vpc-") {
            result.warnings.push(format!(
                "network.vpc_id: '{}' does not look like a VPC id",
                config.network.vpc_id
            ));
        }

        if let Err(e) = parse_caller_ip(&config.my_ip, "my_ip") {
            result.error("my_ip", e.to_string());
        }

        if config.keypair_name.is_empty() {
            result.error("keypair_name", "Bastion key pair name cannot be empty");
        }
    }

    /// Validates database settings.
    fn validate_database(db: &DatabaseConfig, result: &mut ValidationResult) {
        for (field, value) in [
            ("database.name", &db.name),
            ("database.username", &db.username),
            ("database.password_key", &db.password_key),
            ("database.postgres_full_version", &db.postgres_full_version),
            ("database.postgres_major_version", &db.postgres_major_version),
        ] {
            if value.is_empty() {
                result.error(field, format!("{field} cannot be empty"));
            }
        }

        if !db.postgres_major_version.is_empty()
            && !db
                .postgres_full_version
                .starts_with(db.postgres_major_version.as_str())
        {
            result.warnings.push(format!(
                "database.postgres_full_version: '{}' does not belong to major version '{}'",
                db.postgres_full_version, db.postgres_major_version
            ));
        }

        let port = Self::record(parse_port(db.port.as_str(), "database.port"), result);
        let https_port = Self::record(
            parse_port(db.https_port.as_str(), "database.https_port"),
            result,
        );
        if let (Some(port), Some(https_port)) = (port, https_port) {
            if port == https_port {
                result.error(
                    "database.https_port",
                    format!("HTTPS port must differ from the database port ({port})"),
                );
            }
        }

        let allocated = Self::record(
            db.allocated_storage
                .parse::<u32>("database.allocated_storage"),
            result,
        );
        let max_allocated = Self::record(
            db.max_allocated_storage
                .parse::<u32>("database.max_allocated_storage"),
            result,
        );

        if allocated == Some(0) {
            result.error(
                "database.allocated_storage",
                "Allocated storage must be at least 1 GiB",
            );
        }
        if let (Some(allocated), Some(max_allocated)) = (allocated, max_allocated) {
            if max_allocated < allocated {
                result.error(
                    "database.max_allocated_storage",
                    format!(
                        "Max allocated storage ({max_allocated} GiB) is below allocated storage ({allocated} GiB)"
                    ),
                );
            }
            if allocated > 0 && allocated < MIN_RECOMMENDED_STORAGE_GB {
                result.warnings.push(format!(
                    "database.allocated_storage: {allocated} GiB is below the {MIN_RECOMMENDED_STORAGE_GB} GiB RDS minimum"
                ));
            }
        }
    }

    /// Validates storage settings.
    fn validate_storage(config: &DeploymentConfig, result: &mut ValidationResult) {
        if config.storage.upload_root.is_empty() {
            result.error("storage.upload_root", "Upload root cannot be empty");
        }
    }

    /// Validates layer settings.
    fn validate_layers(layers: &LayerConfig, result: &mut ValidationResult) {
        if layers.runtime.is_empty() {
            result.error("layers.runtime", "Layer runtime cannot be empty");
        }
        if layers.app_layer_path.is_empty() {
            result.error("layers.app_layer_path", "App layer path cannot be empty");
        }
        if layers.import_layer_path.is_empty() {
            result.error(
                "layers.import_layer_path",
                "Import layer path cannot be empty",
            );
        }
    }

    /// Validates the tag mapping.
    fn validate_tags(config: &DeploymentConfig, result: &mut ValidationResult) {
        for (key, value) in &config.tags {
            let field = format!("tags[{key}]");
            if key.is_empty() {
                result.error("tags", "Tag keys cannot be empty");
            } else if key.len() > MAX_TAG_KEY_LEN {
                result.error(
                    &field,
                    format!("Tag key exceeds {MAX_TAG_KEY_LEN} characters"),
                );
            }
            if value.len() > MAX_TAG_VALUE_LEN {
                result.error(
                    &field,
                    format!("Tag value exceeds {MAX_TAG_VALUE_LEN} characters"),
                );
            }
        }
    }

    /// Validates snapshot state configuration.
    fn validate_state(state: &StateConfig, result: &mut ValidationResult) {
        match state.backend {
            StateBackend::S3 => {
                if state.bucket.as_ref().is_none_or(String::is_empty) {
                    result.error(
                        "state.bucket",
                        "S3 bucket name is required when using S3 backend",
                    );
                }
            }
            StateBackend::Local => {}
        }
    }

    /// Records a parse failure and returns the parsed value, if any.
    fn record<T>(
        parsed: std::result::Result<T, ConfigError>,
        result: &mut ValidationResult,
    ) -> Option<T> {
        match parsed {
            Ok(value) => Some(value),
            Err(e) => {
                let field = e.field().unwrap_or("database").to_string();
                result.error(&field, e.to_string());
                None
            }
        }
    }
}

/// Validates that a prefix follows the naming convention.
/// Prefixes start with a lowercase letter; the rest is lowercase
/// alphanumerics, underscores, or hyphens.
fn is_valid_prefix(prefix: &str) -> bool {
    let mut chars = prefix.chars();

    match chars.next() {
        Some(first) if first.is_ascii_lowercase() => {}
        _ => return false,
    }

    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

/// Checks the character layout of a generated bucket name: alphanumeric
/// at both ends, no adjacent separators.
fn is_valid_bucket_shape(name: &str) -> bool {
    let alnum_edge = |c: Option<char>| c.is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit());

    alnum_edge(name.chars().next()) && alnum_edge(name.chars().last()) && !name.contains("--")
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    fn error(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field: field.to_string(),
            message: message.into(),
        });
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_support::sample_config;
    use crate::config::NumericSetting;

    #[test]
    fn test_valid_prefix() {
        assert!(is_valid_prefix("my_iot"));
        assert!(is_valid_prefix("iot-team-2"));
        assert!(is_valid_prefix("a"));
    }

    #[test]
    fn test_invalid_prefix() {
        assert!(!is_valid_prefix(""));
        assert!(!is_valid_prefix("My_iot")); // uppercase
        assert!(!is_valid_prefix("1iot")); // starts with number
        assert!(!is_valid_prefix("_iot")); // starts with underscore
        assert!(!is_valid_prefix("iot.team")); // dot
    }

    #[test]
    fn test_bucket_shape() {
        assert!(is_valid_bucket_shape("my-iot-dashboard-abc123"));
        assert!(!is_valid_bucket_shape("my-iot-dashboard-abc-"));
        assert!(!is_valid_bucket_shape("-my-iot-dashboard"));
        assert!(!is_valid_bucket_shape("my--iot-dashboard-abc123"));
    }

    #[test]
    fn test_malformed_bucket_names_rejected() {
        let mut config = sample_config();
        config.uuid = String::from("abc-");
        let result = ConfigValidator::new().check(&config);
        let fields: Vec<&str> = result.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["uuid"]);

        let mut config = sample_config();
        config.prefix = String::from("my_-iot");
        let result = ConfigValidator::new().check(&config);
        let fields: Vec<&str> = result.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["prefix"]);

        let mut config = sample_config();
        config.prefix = String::from("my_iot_");
        assert!(ConfigValidator::new().validate(&config).is_err());
    }

    #[test]
    fn test_sample_config_is_valid() {
        let validator = ConfigValidator::new();
        let result = validator.validate(&sample_config()).unwrap();
        assert!(result.is_valid());
        assert_eq!(result.warning_count(), 0);
    }

    #[test]
    fn test_malformed_port_reports_field() {
        let mut config = sample_config();
        config.database.port = NumericSetting::new("five-four-three-two");

        let err = ConfigValidator::new().validate(&config).unwrap_err();
        match err {
            InfraError::Config(ConfigError::ValidationError { field, .. }) => {
                assert_eq!(field.as_deref(), Some("database.port"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = sample_config();
        config.database.https_port = NumericSetting::new("http");
        config.database.max_allocated_storage = NumericSetting::new("lots");
        config.keypair_name = String::new();

        let result = ConfigValidator::new().check(&config);
        let fields: Vec<&str> = result.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(result.error_count(), 3);
        assert!(fields.contains(&"database.https_port"));
        assert!(fields.contains(&"database.max_allocated_storage"));
        assert!(fields.contains(&"keypair_name"));
    }

    #[test]
    fn test_same_ports_rejected() {
        let mut config = sample_config();
        config.database.https_port = NumericSetting::new("5432");

        let result = ConfigValidator::new().check(&config);
        assert!(result.errors.iter().any(|e| e.field == "database.https_port"));
    }

    #[test]
    fn test_storage_ceiling_below_allocation() {
        let mut config = sample_config();
        config.database.allocated_storage = NumericSetting::new("50");
        config.database.max_allocated_storage = NumericSetting::new("40");

        let result = ConfigValidator::new().check(&config);
        assert!(result
            .errors
            .iter()
            .any(|e| e.field == "database.max_allocated_storage"));
    }

    #[test]
    fn test_wildcard_caller_rejected() {
        let mut config = sample_config();
        config.my_ip = String::from("0.0.0.0/0");

        let result = ConfigValidator::new().check(&config);
        assert!(result.errors.iter().any(|e| e.field == "my_ip"));
    }

    #[test]
    fn test_long_bucket_names_rejected() {
        let mut config = sample_config();
        config.uuid = "a".repeat(60);

        let result = ConfigValidator::new().check(&config);
        assert!(result.errors.iter().any(|e| e.field == "uuid"));
    }

    #[test]
    fn test_s3_state_requires_bucket() {
        let mut config = sample_config();
        config.state.backend = StateBackend::S3;

        let result = ConfigValidator::new().check(&config);
        assert!(result.errors.iter().any(|e| e.field == "state.bucket"));
    }

    #[test]
    fn test_warnings_are_not_errors() {
        let mut config = sample_config();
        config.network.vpc_id = String::from("subnet-123");
        config.database.postgres_full_version = String::from("14.2");

        let result = ConfigValidator::new().validate(&config).unwrap();
        assert_eq!(result.warning_count(), 2);
    }
}
