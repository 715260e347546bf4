//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// SimpleIoT infrastructure plan builder.
#[derive(Parser, Debug)]
#[command(name = "simpleiot-infra")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true, env = "SIMPLEIOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a starter configuration.
    Init {
        /// Directory to initialize (defaults to current directory).
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Force overwrite existing files.
        #[arg(short, long)]
        force: bool,
    },

    /// Validate the deployment configuration.
    Validate {
        /// Show all warnings, not just errors.
        #[arg(short, long)]
        warnings: bool,
    },

    /// Build the resource plan and compare it with the last render.
    Plan {
        /// Show changed attributes per resource.
        #[arg(short, long)]
        detailed: bool,
    },

    /// Write the plan document for the orchestrator.
    Render {
        /// Output file (defaults to stdout).
        #[arg(short = 'O', long = "out")]
        out: Option<PathBuf>,

        /// Document format.
        #[arg(short, long, default_value = "json")]
        format: DocumentFormat,

        /// Do not save a snapshot of the rendered plan.
        #[arg(long)]
        no_save: bool,
    },

    /// List the plan outputs.
    Outputs,

    /// Manage the plan snapshot.
    State {
        /// State subcommand.
        #[command(subcommand)]
        command: StateCommands,
    },
}

/// Snapshot management subcommands.
#[derive(Subcommand, Debug)]
pub enum StateCommands {
    /// Show the last snapshot.
    Show,

    /// Delete the last snapshot.
    Clear {
        /// Skip confirmation.
        #[arg(short, long)]
        yes: bool,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// Plan document formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum DocumentFormat {
    /// Pretty-printed JSON.
    #[default]
    Json,
    /// YAML.
    Yaml,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
