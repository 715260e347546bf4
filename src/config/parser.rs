//! Configuration parser for loading deployment configuration files.
//!
//! This module handles loading configuration from YAML files and environment
//! variables, with proper precedence and error handling.

use crate::error::{ConfigError, InfraError, Result};
use std::path::Path;
use tracing::{debug, info};

use super::spec::DeploymentConfig;

/// Configuration parser for loading deployment configuration.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving the `.env` file.
    base_path: Option<std::path::PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<DeploymentConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(InfraError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            InfraError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<DeploymentConfig> {
        debug!("Parsing YAML configuration");

        let config: DeploymentConfig = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            InfraError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!("Successfully parsed configuration for prefix: {}", config.prefix);
        Ok(config)
    }

    /// Loads configuration with environment variable overrides.
    ///
    /// Environment variables are checked in the format
    /// `SIMPLEIOT_<KEY>` (e.g., `SIMPLEIOT_MY_IP`).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or an
    /// override holds an unusable value.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<DeploymentConfig> {
        let mut config = self.load_file(path)?;
        Self::apply_env_overrides(&mut config)?;
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `SIMPLEIOT_USE_CLUSTER` is not a boolean.
    pub fn apply_env_overrides(config: &mut DeploymentConfig) -> Result<()> {
        if let Ok(prefix) = std::env::var("SIMPLEIOT_PREFIX") {
            debug!("Overriding prefix from environment");
            config.prefix = prefix;
        }

        if let Ok(uuid) = std::env::var("SIMPLEIOT_UUID") {
            debug!("Overriding uuid from environment");
            config.uuid = uuid;
        }

        if let Ok(my_ip) = std::env::var("SIMPLEIOT_MY_IP") {
            debug!("Overriding my_ip from environment");
            config.my_ip = my_ip;
        }

        if let Ok(keypair) = std::env::var("SIMPLEIOT_KEYPAIR_NAME") {
            debug!("Overriding keypair_name from environment");
            config.keypair_name = keypair;
        }

        if let Ok(raw) = std::env::var("SIMPLEIOT_USE_CLUSTER") {
            debug!("Overriding database.use_cluster from environment");
            config.database.use_cluster = parse_bool(&raw).ok_or_else(|| {
                InfraError::Config(ConfigError::InvalidEnvVar {
                    name: String::from("SIMPLEIOT_USE_CLUSTER"),
                    value: raw.clone(),
                })
            })?;
        }

        // State overrides
        if let Ok(bucket) = std::env::var("SIMPLEIOT_STATE_BUCKET") {
            debug!("Overriding state.bucket from environment");
            config.state.bucket = Some(bucket);
        }

        if let Ok(prefix) = std::env::var("SIMPLEIOT_STATE_PREFIX") {
            debug!("Overriding state.prefix from environment");
            config.state.prefix = Some(prefix);
        }

        Ok(())
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| std::path::PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                InfraError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

/// Parses the boolean spellings accepted in environment overrides.
fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &[
    "simpleiot.infra.yaml",
    "simpleiot.infra.yml",
    "infra.yaml",
    "infra.yml",
];

/// Finds the configuration file in the current directory or parent directories.
///
/// # Errors
///
/// Returns an error if no configuration file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<std::path::PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(InfraError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FULL_CONFIG: &str = r#"
prefix: my_iot
uuid: abc123
network:
  vpc_id: vpc-0a1b2c3d
my_ip: 203.0.113.7
keypair_name: iot-bastion
database:
  use_cluster: true
  name: iotdb
  username: iotadmin
  password_key: my_iot_db_password
  postgres_full_version: "13.4"
  postgres_major_version: "13"
  port: 5432
  https_port: "443"
  allocated_storage: 20
  max_allocated_storage: "100"
storage:
  upload_root: ./s3_upload
tags:
  project: simpleiot
  team: my_iot
"#;

    #[test]
    fn test_parse_full_config() {
        let parser = ConfigParser::new();
        let config = parser.parse_yaml(FULL_CONFIG, None).unwrap();

        assert_eq!(config.prefix, "my_iot");
        assert!(config.database.use_cluster);
        assert_eq!(config.database.port.as_str(), "5432");
        assert_eq!(config.database.https_port.as_str(), "443");
        assert_eq!(config.tags.len(), 2);
        assert_eq!(config.layers.runtime, "python3.8");
    }

    #[test]
    fn test_parse_minimal_config_uses_defaults() {
        let yaml = r#"
prefix: iot
uuid: "1"
network:
  vpc_id: vpc-1
my_ip: 198.51.100.1
keypair_name: kp
database:
  name: db
  username: admin
  password_key: secret
  postgres_full_version: "13.4"
  postgres_major_version: "13"
"#;
        let config = ConfigParser::new().parse_yaml(yaml, None).unwrap();
        assert!(!config.database.use_cluster);
        assert_eq!(config.database.port.as_str(), "5432");
        assert_eq!(config.database.max_allocated_storage.as_str(), "100");
        assert_eq!(config.storage.upload_root, "./s3_upload");
        assert!(config.tags.is_empty());
    }

    #[test]
    fn test_malformed_number_survives_parsing() {
        let yaml = FULL_CONFIG.replace("port: 5432", "port: fifty");
        let config = ConfigParser::new().parse_yaml(&yaml, None).unwrap();
        assert_eq!(config.database.port.as_str(), "fifty");
    }

    #[test]
    fn test_missing_required_field() {
        let yaml = FULL_CONFIG.replace("keypair_name: iot-bastion\n", "");
        let err = ConfigParser::new().parse_yaml(&yaml, None).unwrap_err();
        assert!(matches!(err, InfraError::Config(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_load_file_not_found() {
        let temp = TempDir::new().unwrap();
        let err = ConfigParser::new()
            .load_file(temp.path().join("missing.yaml"))
            .unwrap_err();
        assert!(matches!(err, InfraError::Config(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_find_config_file_walks_up() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("simpleiot.infra.yaml"), FULL_CONFIG).unwrap();
        let nested = temp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let found = find_config_file(&nested).unwrap();
        assert_eq!(found, temp.path().join("simpleiot.infra.yaml"));
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("no"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
