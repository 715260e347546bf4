//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::{DeploymentConfig, ValidationResult};
use crate::error::{InfraError, Result};
use crate::planner::{BuiltPlan, DatabaseTopology, DiffResult, DiffType, ResourcePlan};
use crate::state::PlanSnapshot;

use super::commands::{DocumentFormat, OutputFormat};

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Plan change row for table display.
#[derive(Tabled)]
struct PlanChangeRow {
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Name")]
    name: String,
}

/// Output row for table display.
#[derive(Tabled)]
struct OutputRow {
    #[tabled(rename = "Output")]
    name: String,
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Attribute")]
    attribute: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a validation outcome and configuration summary.
    #[must_use]
    pub fn format_validation(
        &self,
        config: &DeploymentConfig,
        result: &ValidationResult,
        show_warnings: bool,
    ) -> String {
        match self.format {
            OutputFormat::Json => to_json(&serde_json::json!({
                "valid": result.is_valid(),
                "prefix": config.prefix,
                "uuid": config.uuid,
                "topology": DatabaseTopology::label(config.database.use_cluster),
                "errors": result
                    .errors
                    .iter()
                    .map(|e| serde_json::json!({ "field": e.field, "message": e.message }))
                    .collect::<Vec<_>>(),
                "warnings": result.warnings,
            })),
            OutputFormat::Text => {
                let mut output = if result.is_valid() {
                    format!("{} Configuration is valid!\n", "✓".green())
                } else {
                    let mut output = format!(
                        "{} Configuration has {} error(s):\n",
                        "✗".red(),
                        result.error_count()
                    );
                    for error in &result.errors {
                        let _ = writeln!(output, "   - {}: {}", error.field, error.message);
                    }
                    output
                };

                if show_warnings && !result.warnings.is_empty() {
                    let _ = write!(output, "\n{} Warnings:\n", "⚠".yellow());
                    for warning in &result.warnings {
                        let _ = writeln!(output, "   - {warning}");
                    }
                }

                output.push_str("\nConfiguration summary:\n");
                let _ = writeln!(output, "   Prefix: {}", config.prefix);
                let _ = writeln!(output, "   Deployment suffix: {}", config.uuid);
                let _ = writeln!(output, "   VPC: {}", config.network.vpc_id);
                let _ = writeln!(
                    output,
                    "   Database: {}",
                    DatabaseTopology::label(config.database.use_cluster)
                );
                let _ = writeln!(output, "   Tags: {}", config.tags.len());
                output
            }
        }
    }

    /// Formats a built plan and its diff against the last snapshot.
    #[must_use]
    pub fn format_plan(
        &self,
        built: &BuiltPlan,
        diff: &DiffResult,
        plan_hash: &str,
        detailed: bool,
    ) -> String {
        match self.format {
            OutputFormat::Json => to_json(&PlanJson::new(built, diff, plan_hash)),
            OutputFormat::Text => Self::format_plan_text(built, diff, plan_hash, detailed),
        }
    }

    /// Formats a plan as text.
    fn format_plan_text(
        built: &BuiltPlan,
        diff: &DiffResult,
        plan_hash: &str,
        detailed: bool,
    ) -> String {
        let mut output = String::new();

        let _ = write!(output, "\n📋 Resource Plan\n");
        let _ = writeln!(output, "   Plan hash: {}", short(plan_hash));
        let _ = writeln!(output, "   Database: {}", built.topology);
        let _ = write!(output, "   Resources: {}\n\n", built.plan.len());

        if !diff.has_changes() {
            let _ = writeln!(
                output,
                "{} No changes since the last render.",
                "✓".green()
            );
            return output;
        }

        let rows: Vec<PlanChangeRow> = diff
            .actionable_diffs()
            .into_iter()
            .map(|d| {
                let spec = built.plan.get(&d.id);
                PlanChangeRow {
                    action: Self::format_diff_type(d.diff_type),
                    resource: d.id.clone(),
                    kind: spec.map_or_else(
                        || String::from("-"),
                        |s| s.kind.type_name().to_string(),
                    ),
                    name: spec
                        .and_then(|s| s.physical_name())
                        .map_or_else(|| String::from("-"), |n| truncate(n, 40)),
                }
            })
            .collect();

        if !rows.is_empty() {
            output.push_str(&Table::new(rows).to_string());
            output.push('\n');
        }

        if detailed {
            for resource in diff.actionable_diffs() {
                if resource.diff_type != DiffType::Update {
                    continue;
                }
                let _ = writeln!(output, "\n   {}:", resource.id);
                for detail in &resource.details {
                    let _ = writeln!(
                        output,
                        "     {}: {} -> {}",
                        detail.field,
                        detail.old_value.as_deref().unwrap_or("(none)"),
                        detail.new_value.as_deref().unwrap_or("(none)")
                    );
                }
            }
        }

        if !diff.changed_outputs.is_empty() {
            let _ = writeln!(output, "\nChanged outputs: {}", diff.changed_outputs.join(", "));
        }

        let _ = write!(
            output,
            "\nPlan: {} to create, {} to update, {} to delete\n",
            diff.creates.to_string().green(),
            diff.updates.to_string().yellow(),
            diff.deletes.to_string().red()
        );

        output
    }

    /// Formats the outputs of a plan.
    #[must_use]
    pub fn format_outputs(&self, plan: &ResourcePlan) -> String {
        match self.format {
            OutputFormat::Json => to_json(plan.outputs()),
            OutputFormat::Text => {
                let rows: Vec<OutputRow> = plan
                    .outputs()
                    .iter()
                    .map(|(name, reference)| OutputRow {
                        name: name.clone(),
                        resource: reference.resource.clone(),
                        attribute: reference.attribute.clone().unwrap_or_default(),
                    })
                    .collect();

                if rows.is_empty() {
                    return String::from("   No outputs.\n");
                }

                let mut output = Table::new(rows).to_string();
                output.push('\n');
                output
            }
        }
    }

    /// Formats a plan snapshot.
    #[must_use]
    pub fn format_snapshot(&self, snapshot: &PlanSnapshot, location: &str) -> String {
        match self.format {
            OutputFormat::Json => to_json(snapshot),
            OutputFormat::Text => {
                let mut output = String::new();

                let _ = write!(output, "\n💾 Snapshot: {}\n\n", snapshot.prefix);
                let _ = writeln!(output, "   Location: {location}");
                let _ = writeln!(output, "   Version: {}", snapshot.version);
                let _ = writeln!(output, "   Config hash: {}", short(&snapshot.config_hash));
                let _ = writeln!(output, "   Plan hash: {}", short(&snapshot.plan_hash));
                let _ = writeln!(output, "   Database: {}", snapshot.topology);
                let _ = writeln!(output, "   Rendered at: {}", snapshot.rendered_at);
                let _ = writeln!(output, "   Resources: {}", snapshot.plan.len());
                let _ = writeln!(output, "   Outputs: {}", snapshot.plan.outputs().len());

                if !snapshot.history.is_empty() {
                    let _ = writeln!(output, "\n   Recent renders ({}):", snapshot.history.len());
                    for entry in snapshot.history.iter().rev().take(5) {
                        let _ = writeln!(
                            output,
                            "     {} - {} ({} resources, {} changes)",
                            entry.timestamp.format("%Y-%m-%d %H:%M"),
                            short(&entry.plan_hash),
                            entry.resource_count,
                            entry.changes
                        );
                    }
                }

                output
            }
        }
    }

    /// Formats a success message.
    #[must_use]
    pub fn success(&self, message: &str) -> String {
        self.message("success", &"✓".green(), message)
    }

    /// Formats a warning message.
    #[must_use]
    pub fn warning(&self, message: &str) -> String {
        self.message("warning", &"⚠".yellow(), message)
    }

    fn message(&self, status: &str, symbol: &colored::ColoredString, message: &str) -> String {
        match self.format {
            OutputFormat::Json => to_json(&serde_json::json!({ "status": status, "message": message })),
            OutputFormat::Text => format!("{symbol} {message}"),
        }
    }

    /// Formats a diff type with color.
    fn format_diff_type(diff_type: DiffType) -> String {
        match diff_type {
            DiffType::Create => "+create".green().to_string(),
            DiffType::Update => "~update".yellow().to_string(),
            DiffType::Delete => "-delete".red().to_string(),
            DiffType::NoChange => "noop".dimmed().to_string(),
        }
    }
}

/// Serializes a plan as the document handed to the orchestrator.
///
/// # Errors
///
/// Returns an internal error if the plan cannot be serialized.
pub fn render_document(plan: &ResourcePlan, format: DocumentFormat) -> Result<String> {
    match format {
        DocumentFormat::Json => serde_json::to_string_pretty(plan)
            .map(|mut json| {
                json.push('\n');
                json
            })
            .map_err(|e| InfraError::internal(format!("Failed to render plan as JSON: {e}"))),
        DocumentFormat::Yaml => serde_yaml::to_string(plan)
            .map_err(|e| InfraError::internal(format!("Failed to render plan as YAML: {e}"))),
    }
}

/// Returns the display form of a hash.
fn short(hash: &str) -> &str {
    hash.get(..8).unwrap_or(hash)
}

/// Truncates a string to a maximum number of characters.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

// JSON serialization helpers

#[derive(Serialize)]
struct PlanJson<'a> {
    plan_hash: &'a str,
    topology: String,
    resource_count: usize,
    creates: usize,
    updates: usize,
    deletes: usize,
    unchanged: usize,
    changed_outputs: &'a [String],
    changes: Vec<ChangeJson>,
}

#[derive(Serialize)]
struct ChangeJson {
    action: String,
    resource: String,
    fields: Vec<String>,
}

impl<'a> PlanJson<'a> {
    fn new(built: &BuiltPlan, diff: &'a DiffResult, plan_hash: &'a str) -> Self {
        Self {
            plan_hash,
            topology: built.topology.to_string(),
            resource_count: built.plan.len(),
            creates: diff.creates,
            updates: diff.updates,
            deletes: diff.deletes,
            unchanged: diff.unchanged,
            changed_outputs: &diff.changed_outputs,
            changes: diff
                .actionable_diffs()
                .into_iter()
                .map(|d| ChangeJson {
                    action: d.diff_type.to_string(),
                    resource: d.id.clone(),
                    fields: d.details.iter().map(|detail| detail.field.clone()).collect(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigValidator;
    use crate::config::test_support::sample_config;
    use crate::planner::{DiffEngine, PlanBuilder};

    #[test]
    fn test_plan_json() {
        let built = PlanBuilder::new().build(&sample_config()).unwrap();
        let diff = DiffEngine::new().compute_diff(None, &built.plan);
        let formatter = OutputFormatter::new(OutputFormat::Json);

        let json: serde_json::Value =
            serde_json::from_str(&formatter.format_plan(&built, &diff, "abcdef123456", false))
                .unwrap();

        assert_eq!(json["topology"], "standalone");
        assert_eq!(json["creates"], built.plan.len());
        assert_eq!(json["changes"].as_array().unwrap().len(), built.plan.len());
    }

    #[test]
    fn test_plan_text_without_changes() {
        colored::control::set_override(false);
        let built = PlanBuilder::new().build(&sample_config()).unwrap();
        let diff = DiffEngine::new().compute_diff(Some(&built.plan), &built.plan);
        let formatter = OutputFormatter::new(OutputFormat::Text);

        let text = formatter.format_plan(&built, &diff, "abcdef123456", true);
        assert!(text.contains("Plan hash: abcdef12"));
        assert!(text.contains("No changes since the last render."));
    }

    #[test]
    fn test_outputs_table() {
        let built = PlanBuilder::new().build(&sample_config()).unwrap();
        let text = OutputFormatter::new(OutputFormat::Text).format_outputs(&built.plan);

        assert!(text.contains("database_hostname"));
        assert!(text.contains("db_instance"));
        assert!(text.contains("twin_media_domain_name"));
    }

    #[test]
    fn test_documents_read_back_for_each_topology() {
        for use_cluster in [false, true] {
            let mut config = sample_config();
            config.database.use_cluster = use_cluster;
            let built = PlanBuilder::new().build(&config).unwrap();

            let yaml = render_document(&built.plan, DocumentFormat::Yaml).unwrap();
            let from_yaml: ResourcePlan = serde_yaml::from_str(&yaml).unwrap();
            assert_eq!(from_yaml, built.plan);
            assert!(from_yaml.dangling_references().is_empty());

            let json = render_document(&built.plan, DocumentFormat::Json).unwrap();
            let from_json: ResourcePlan = serde_json::from_str(&json).unwrap();
            assert_eq!(from_json, built.plan);
            assert!(
                !DiffEngine::new()
                    .compute_diff(Some(&from_json), &built.plan)
                    .has_changes()
            );
        }
    }

    #[test]
    fn test_validation_topology_matches_plan() {
        for use_cluster in [false, true] {
            let mut config = sample_config();
            config.database.use_cluster = use_cluster;
            let built = PlanBuilder::new().build(&config).unwrap();
            let result = ConfigValidator::new().check(&config);

            let json: serde_json::Value = serde_json::from_str(
                &OutputFormatter::new(OutputFormat::Json).format_validation(&config, &result, false),
            )
            .unwrap();
            assert_eq!(json["topology"], built.topology.name());
        }
    }

    #[test]
    fn test_truncate_and_short() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("my-iot-dashboard-abc123", 10), "my-iot-...");
        assert_eq!(short("abc"), "abc");
        assert_eq!(short("abcdef1234"), "abcdef12");
    }
}
