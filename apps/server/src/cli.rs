//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use tracing::info;

use kiln_build::{BuildCoordinator, BuildPipeline, PipelineConfig};
use kiln_shared::{AppConfig, RecipeRegistry, config, load_config};
use kiln_store::{ArtifactStore, DocsCache};

use crate::http;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Kiln — build-on-demand package repository server.
#[derive(Parser)]
#[command(
    name = "kilnd",
    version,
    about = "Serve a package repository whose artifacts are built on first request.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to the config file.
    #[arg(long, default_value = config::CONFIG_FILE_NAME, global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the repository server.
    Serve {
        /// Override the configured bind address.
        #[arg(long)]
        address: Option<String>,

        /// Override the configured bind port.
        #[arg(long)]
        port: Option<u16>,
    },

    /// Write a default config file and an empty recipes file.
    Init,

    /// Validate the config and recipes files, reporting the recipe count.
    Check,
}

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Initialize the tracing subscriber from CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::EnvFilter;

    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    match cli.log_format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command routing
// ---------------------------------------------------------------------------

/// Run the parsed CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Serve { address, port } => {
            let mut app_config = load_config(&cli.config)?;
            if let Some(address) = address {
                app_config.server.address = address;
            }
            if let Some(port) = port {
                app_config.server.port = port;
            }
            serve(app_config).await
        }
        Command::Init => init(&cli.config),
        Command::Check => check(&cli.config),
    }
}

/// Load the recipe registry and serve the repository tree.
async fn serve(app_config: AppConfig) -> Result<()> {
    let registry = Arc::new(RecipeRegistry::load(&app_config.paths.recipes_file)?);
    if registry.is_empty() {
        info!(
            recipes_file = %app_config.paths.recipes_file.display(),
            "no recipes registered; only already-cached artifacts will be served"
        );
    }

    let store = ArtifactStore::new(&app_config.paths.repo_root);
    let docs = DocsCache::new(app_config.paths.docs_root());
    let pipeline = BuildPipeline::new(
        store,
        docs,
        registry,
        PipelineConfig::new(&app_config.paths.build_cache),
    );
    let state = Arc::new(http::AppState {
        repo_root: app_config.paths.repo_root.clone(),
        coordinator: BuildCoordinator::new(pipeline),
    });

    let bind = format!("{}:{}", app_config.server.address, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .map_err(|e| eyre!("failed to bind {bind}: {e}"))?;
    info!(%bind, repo = %app_config.paths.repo_root.display(), "kiln listening");

    axum::serve(listener, http::router(state)).await?;
    Ok(())
}

/// Write a default config and an empty recipes file next to it.
fn init(config_path: &PathBuf) -> Result<()> {
    let app_config = config::init_config(config_path)?;
    let recipes = &app_config.paths.recipes_file;
    if !recipes.exists() {
        std::fs::write(recipes, "# group:name sourceURL; build step; build step\n")?;
        info!(path = %recipes.display(), "created empty recipes file");
    }
    println!("wrote {}", config_path.display());
    Ok(())
}

/// Validate config and recipes without serving.
fn check(config_path: &PathBuf) -> Result<()> {
    let app_config = load_config(config_path)?;
    let registry = RecipeRegistry::load(&app_config.paths.recipes_file)?;
    println!(
        "config ok: {} recipes, repo root {}",
        registry.len(),
        app_config.paths.repo_root.display()
    );
    Ok(())
}
