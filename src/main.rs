//! SimpleIoT infrastructure CLI entrypoint.
//!
//! This is the main entrypoint for the simpleiot-infra command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use simpleiot_infra::cli::{
    Cli, Commands, DocumentFormat, OutputFormatter, StateCommands, render_document,
};
use simpleiot_infra::config::{
    ConfigHasher, ConfigParser, ConfigValidator, DeploymentConfig, StateBackend, find_config_file,
};
use simpleiot_infra::error::{ConfigError, Result};
use simpleiot_infra::planner::{BuiltPlan, DiffEngine, PlanBuilder};
use simpleiot_infra::state::{PlanSnapshot, STATE_DIR, StateStore, open_store};

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Placeholder in the configuration template replaced by `init`.
const UUID_PLACEHOLDER: &str = "__DEPLOYMENT_UUID__";

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);

    match cli.command {
        Commands::Init { path, force } => cmd_init(&path, force),
        Commands::Validate { warnings } => cmd_validate(cli.config.as_ref(), warnings, &formatter),
        Commands::Plan { detailed } => cmd_plan(cli.config.as_ref(), detailed, &formatter).await,
        Commands::Render {
            out,
            format,
            no_save,
        } => cmd_render(cli.config.as_ref(), out.as_deref(), format, no_save, &formatter).await,
        Commands::Outputs => cmd_outputs(cli.config.as_ref(), &formatter),
        Commands::State { command } => cmd_state(cli.config.as_ref(), command, &formatter).await,
    }
}

/// Write a starter configuration.
fn cmd_init(path: &Path, force: bool) -> Result<()> {
    info!("Initializing SimpleIoT infrastructure config in: {}", path.display());

    let config_path = path.join("simpleiot.infra.yaml");
    let env_path = path.join(".env.example");
    let gitignore_path = path.join(".gitignore");

    // Check if files exist
    if !force && config_path.exists() {
        eprintln!("Configuration file already exists: {}", config_path.display());
        eprintln!("Use --force to overwrite.");
        return Ok(());
    }

    // Create directory if needed
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }

    // Write config template with a fresh deployment suffix
    let suffix: String = uuid::Uuid::new_v4().simple().to_string().chars().take(8).collect();
    let config_template =
        include_str!("../templates/simpleiot.infra.yaml").replace(UUID_PLACEHOLDER, &suffix);
    std::fs::write(&config_path, config_template)?;
    eprintln!("Created: {} (uuid: {suffix})", config_path.display());

    // Write .env.example
    let env_template = include_str!("../templates/.env.example");
    std::fs::write(&env_path, env_template)?;
    eprintln!("Created: {}", env_path.display());

    // Write/update .gitignore
    let state_entry = format!("{STATE_DIR}/");
    if gitignore_path.exists() {
        let existing = std::fs::read_to_string(&gitignore_path)?;
        let has_env = existing.lines().any(|line| line.trim() == ".env");
        let has_state = existing.contains(STATE_DIR);
        if !has_env || !has_state {
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(&gitignore_path)?;
            writeln!(file, "\n# SimpleIoT")?;
            if !has_env {
                writeln!(file, ".env")?;
            }
            if !has_state {
                writeln!(file, "{state_entry}")?;
            }
            eprintln!("Updated: {}", gitignore_path.display());
        }
    } else {
        std::fs::write(&gitignore_path, format!(".env\n{state_entry}\n"))?;
        eprintln!("Created: {}", gitignore_path.display());
    }

    eprintln!("\nConfiguration initialized successfully!");
    eprintln!("Next steps:");
    eprintln!("  1. Edit simpleiot.infra.yaml (vpc_id, my_ip, keypair_name)");
    eprintln!("  2. Run 'simpleiot-infra validate' to check your configuration");
    eprintln!("  3. Run 'simpleiot-infra plan' to see what will be declared");
    eprintln!("  4. Run 'simpleiot-infra render --out plan.json' for the orchestrator");

    Ok(())
}

/// Validate configuration.
fn cmd_validate(
    config_path: Option<&PathBuf>,
    show_warnings: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (config, config_file) = load_config(config_path)?;
    info!("Validating configuration: {}", config_file.display());

    let result = ConfigValidator::new().check(&config);
    eprintln!("{}", formatter.format_validation(&config, &result, show_warnings));

    match result.errors.first() {
        Some(first) => Err(ConfigError::validation(first.message.clone(), first.field.clone()).into()),
        None => Ok(()),
    }
}

/// Build the plan and compare it with the last snapshot.
async fn cmd_plan(
    config_path: Option<&PathBuf>,
    detailed: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (config, config_file) = load_config(config_path)?;
    let built = PlanBuilder::new().build(&config)?;
    let store = state_store(&config, &config_file).await?;

    let previous = store.load().await?;
    let diff = DiffEngine::new().compute_diff(previous.as_ref().map(|s| &s.plan), &built.plan);
    let plan_hash = ConfigHasher::new().hash_plan(&built.plan);

    eprintln!("{}", formatter.format_plan(&built, &diff, &plan_hash, detailed));

    Ok(())
}

/// Render the plan document and save a snapshot.
async fn cmd_render(
    config_path: Option<&PathBuf>,
    out: Option<&Path>,
    format: DocumentFormat,
    no_save: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (config, config_file) = load_config(config_path)?;
    let built = PlanBuilder::new().build(&config)?;

    let document = render_document(&built.plan, format)?;
    match out {
        Some(path) => {
            std::fs::write(path, &document)?;
            eprintln!("{}", formatter.success(&format!("Plan written to {}", path.display())));
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(document.as_bytes())?;
            stdout.flush()?;
        }
    }

    if no_save {
        debug!("Snapshot not saved (--no-save)");
        return Ok(());
    }

    save_snapshot(&config, &config_file, built).await?;
    Ok(())
}

/// List plan outputs.
fn cmd_outputs(config_path: Option<&PathBuf>, formatter: &OutputFormatter) -> Result<()> {
    let (config, _) = load_config(config_path)?;
    let built = PlanBuilder::new().build(&config)?;

    eprintln!("{}", formatter.format_outputs(&built.plan));
    Ok(())
}

/// Manage the plan snapshot.
async fn cmd_state(
    config_path: Option<&PathBuf>,
    command: StateCommands,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (config, config_file) = load_config(config_path)?;
    let store = state_store(&config, &config_file).await?;

    match command {
        StateCommands::Show => {
            if let Some(snapshot) = store.load().await? {
                eprintln!("{}", formatter.format_snapshot(&snapshot, &store.location()));
            } else {
                eprintln!("No snapshot found at {}.", store.location());
            }
        }
        StateCommands::Clear { yes } => {
            if !store.exists().await? {
                eprintln!("No snapshot found at {}.", store.location());
                return Ok(());
            }

            if !yes {
                eprint!("Delete the snapshot at {}? [y/N]: ", store.location());
                std::io::stderr().flush()?;

                let mut input = String::new();
                std::io::stdin().read_line(&mut input)?;

                if !input.trim().eq_ignore_ascii_case("y") {
                    eprintln!("Clear cancelled.");
                    return Ok(());
                }
            }

            store.delete().await?;
            eprintln!("{}", formatter.success("Snapshot deleted."));
        }
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Resolves the configuration file path.
fn resolve_config_path(config_path: Option<&PathBuf>) -> Result<PathBuf> {
    config_path.map_or_else(|| find_config_file("."), |path| Ok(path.clone()))
}

/// Returns the directory holding the configuration file.
fn config_dir(config_file: &Path) -> &Path {
    config_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Loads the configuration with `.env` and environment overrides applied.
fn load_config(config_path: Option<&PathBuf>) -> Result<(DeploymentConfig, PathBuf)> {
    let config_file = resolve_config_path(config_path)?;
    debug!("Loading configuration from: {}", config_file.display());

    let parser = ConfigParser::new().with_base_path(config_dir(&config_file));
    parser.load_dotenv()?;

    let config = parser.load_with_env(&config_file)?;
    Ok((config, config_file))
}

/// Opens the configured snapshot store; local snapshots default to a
/// directory next to the configuration file.
async fn state_store(config: &DeploymentConfig, config_file: &Path) -> Result<Box<dyn StateStore>> {
    let mut state = config.state.clone();
    if state.backend == StateBackend::Local && state.path.is_none() {
        state.path = Some(config_dir(config_file).join(STATE_DIR).display().to_string());
    }

    let store = open_store(&state, &config.prefix).await?;
    debug!("Using {} snapshot store at {}", store.backend_type(), store.location());
    Ok(store)
}

/// Saves a snapshot of the rendered plan, carrying the render history over.
async fn save_snapshot(config: &DeploymentConfig, config_file: &Path, built: BuiltPlan) -> Result<()> {
    let store = state_store(config, config_file).await?;
    let hasher = ConfigHasher::new();
    let config_hash = hasher.hash_config(config);
    let plan_hash = hasher.hash_plan(&built.plan);

    let previous = store.load().await?;
    let changes = DiffEngine::new()
        .compute_diff(previous.as_ref().map(|s| &s.plan), &built.plan)
        .total_changes();

    if previous.as_ref().is_some_and(|s| s.matches_config(&config_hash)) {
        debug!("Configuration unchanged since the last render");
    }

    let snapshot = PlanSnapshot::new(
        &config.prefix,
        &config_hash,
        &plan_hash,
        built.topology.name(),
        built.plan,
    )
    .succeeding(previous, changes);

    store.save(&snapshot).await?;
    info!(
        "Snapshot saved to {} ({} changes, plan {})",
        store.location(),
        changes,
        hasher.short_hash(&plan_hash)
    );
    Ok(())
}
