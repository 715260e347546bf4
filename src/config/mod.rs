//! Configuration module for the plan builder.
//!
//! This module handles all configuration-related functionality:
//! - Parsing and deserializing `simpleiot.infra.yaml`
//! - Validation of configuration values
//! - Resolution of textual settings into typed values
//! - Computing content hashes for change detection

mod spec;
mod parser;
mod validator;
mod resolve;
mod hash;

pub use spec::{
    DatabaseConfig, DeploymentConfig, LayerConfig, NetworkConfig, NumericSetting, StateBackend,
    StateConfig, StorageConfig,
};
pub use parser::{ConfigParser, DEFAULT_CONFIG_FILES, find_config_file};
pub use validator::{ConfigValidator, ValidationError, ValidationResult};
pub use resolve::{
    ResolvedConfig, ResolvedDatabase, TEMPLATE_SOURCE_DIR, parse_caller_ip, parse_port,
};
pub use hash::ConfigHasher;
