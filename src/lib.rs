// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Tests assert with unwrap/expect/panic freely
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # SimpleIoT Infra
//!
//! A deterministic resource plan builder for the SimpleIoT backend on AWS.
//!
//! ## Overview
//!
//! The builder takes one deployment configuration and declares everything
//! the backend needs, leaving provisioning to an external orchestrator:
//!
//! - A bastion host reachable over SSH from exactly one caller address
//! - A PostgreSQL database, either an Aurora cluster or a single RDS instance
//! - Five S3 buckets, three of them fronted by CloudFront
//! - The shared Lambda layer pair
//!
//! ## Architecture
//!
//! Planning is a pure, single-pass function:
//!
//! 1. **Configuration**: `simpleiot.infra.yaml`, `.env` and `SIMPLEIOT_*` overrides
//! 2. **Resolution**: every textual number and the caller address are parsed
//! 3. **Planning**: database, storage and layer groups are emitted into a
//!    [`planner::ResourcePlan`] whose references are checked before it is returned
//!
//! Rendered plans are saved as snapshots so the next render can be diffed
//! against them.
//!
//! ## Modules
//!
//! - [`config`]: Configuration parsing, validation and resolution
//! - [`planner`]: Resource model, plan builder and plan diff
//! - [`state`]: Snapshot storage backends (local, S3)
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! prefix: my_iot
//! uuid: abc123
//! network:
//!   vpc_id: vpc-0a1b2c3d
//! my_ip: 203.0.113.7
//! keypair_name: iot-bastion
//! database:
//!   use_cluster: false
//!   name: iotdb
//!   username: iotadmin
//!   password_key: my_iot_db_password
//!   postgres_full_version: "13.4"
//!   postgres_major_version: "13"
//!   port: "5432"
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod error;
pub mod planner;
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigHasher, ConfigParser, ConfigValidator, DeploymentConfig, ResolvedConfig};
pub use error::{InfraError, Result};
pub use planner::{BuiltPlan, DatabaseTopology, DiffEngine, PlanBuilder, ResourcePlan};
pub use state::{LocalStateStore, PlanSnapshot, S3StateStore, StateStore};
