//! Error types for the SimpleIoT infrastructure plan builder.
//!
//! This module provides the error hierarchy for every stage of plan
//! production: configuration loading and validation, plan construction,
//! and snapshot state management.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the plan builder.
#[derive(Debug, Error)]
pub enum InfraError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Plan construction errors.
    #[error("Planning error: {0}")]
    Plan(#[from] PlanError),

    /// Snapshot state errors.
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// A numeric setting could not be parsed.
    #[error("Invalid number for {field}: '{value}'")]
    InvalidNumber {
        /// Field holding the number.
        field: String,
        /// The raw value.
        value: String,
    },

    /// The caller address is not a single IPv4 host.
    #[error("Invalid address for {field}: '{value}' (expected a single IPv4 host, optionally with /32)")]
    InvalidAddress {
        /// Field holding the address.
        field: String,
        /// The raw value.
        value: String,
    },

    /// An environment override holds an unusable value.
    #[error("Invalid value for environment variable {name}: '{value}'")]
    InvalidEnvVar {
        /// Name of the variable.
        name: String,
        /// The rejected value.
        value: String,
    },
}

/// Plan construction errors.
#[derive(Debug, Error)]
pub enum PlanError {
    /// Two resources were declared under the same logical id.
    #[error("Duplicate resource id: {id}")]
    DuplicateResource {
        /// The duplicated logical id.
        id: String,
    },

    /// Two outputs were declared under the same name.
    #[error("Duplicate output name: {name}")]
    DuplicateOutput {
        /// The duplicated output name.
        name: String,
    },

    /// A reference points at a resource that is not in the plan.
    #[error("Dangling reference from {from} to missing resource {target}")]
    DanglingReference {
        /// Resource id or output name holding the reference.
        from: String,
        /// Logical id that could not be resolved.
        target: String,
    },
}

/// Snapshot state errors.
#[derive(Debug, Error)]
pub enum StateError {
    /// Snapshot is corrupted.
    #[error("State is corrupted: {message}")]
    Corrupted {
        /// Description of the corruption.
        message: String,
    },

    /// Local filesystem error while reading or writing state.
    #[error("Local state backend error: {message}")]
    Io {
        /// Description of the failure.
        message: String,
    },

    /// S3 backend error.
    #[error("S3 state backend error: {message}")]
    S3Error {
        /// Description of the S3 error.
        message: String,
    },

    /// Serialization error.
    #[error("State serialization error: {message}")]
    SerializationError {
        /// Description of the serialization error.
        message: String,
    },

    /// Snapshot version mismatch.
    #[error("State version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Expected snapshot version.
        expected: String,
        /// Found snapshot version.
        found: String,
    },
}

/// Result type alias for plan builder operations.
pub type Result<T> = std::result::Result<T, InfraError>;

impl InfraError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this error was caused by the user's configuration.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a validation error without a specific field.
    #[must_use]
    pub fn validation_general(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: None,
        }
    }

    /// Returns the field this error refers to, if known.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::ValidationError { field, .. } => field.as_deref(),
            Self::InvalidNumber { field, .. } | Self::InvalidAddress { field, .. } => {
                Some(field.as_str())
            }
            _ => None,
        }
    }
}

impl StateError {
    /// Creates an S3 error with the given message.
    #[must_use]
    pub fn s3(message: impl Into<String>) -> Self {
        Self::S3Error {
            message: message.into(),
        }
    }

    /// Creates a local filesystem error with the given message.
    #[must_use]
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a serialization error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }
}
