//! CLI module for the SimpleIoT infrastructure plan builder.
//!
//! This module provides the command-line interface for building, rendering
//! and comparing resource plans.

mod commands;
mod output;

pub use commands::{Cli, Commands, DocumentFormat, OutputFormat, StateCommands};
pub use output::{OutputFormatter, render_document};
