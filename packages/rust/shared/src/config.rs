//! Server configuration for Kiln.
//!
//! Config lives in `kiln.toml` next to the server's working directory.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{KilnError, Result};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "kiln.toml";

/// Name of the documentation subtree under the repository root.
pub const DOCS_DIR_NAME: &str = "javadoc";

// ---------------------------------------------------------------------------
// Config structs (matching kiln.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Listening socket settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Filesystem layout.
    #[serde(default)]
    pub paths: PathsConfig,
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_address")]
    pub address: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
        }
    }
}

fn default_address() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8080
}

/// `[paths]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Repository root served over HTTP and populated by builds.
    #[serde(default = "default_repo_root")]
    pub repo_root: PathBuf,

    /// Line-oriented recipes file (see `kiln_shared::recipe`).
    #[serde(default = "default_recipes_file")]
    pub recipes_file: PathBuf,

    /// External build-tool local cache that harvest reads from.
    #[serde(default = "default_build_cache")]
    pub build_cache: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            repo_root: default_repo_root(),
            recipes_file: default_recipes_file(),
            build_cache: default_build_cache(),
        }
    }
}

impl PathsConfig {
    /// Root of the documentation cache, parallel to the artifact tree so
    /// extracted docs are served from the same static hierarchy.
    pub fn docs_root(&self) -> PathBuf {
        self.repo_root.join(DOCS_DIR_NAME)
    }
}

fn default_repo_root() -> PathBuf {
    PathBuf::from("repo")
}
fn default_recipes_file() -> PathBuf {
    PathBuf::from("recipes")
}
fn default_build_cache() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".m2")
        .join("repository")
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the application config from `path`. Returns defaults if the file
/// does not exist.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| KilnError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| KilnError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Write a default config file at `path` and return the parsed defaults.
pub fn init_config(path: &Path) -> Result<AppConfig> {
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| KilnError::config(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| KilnError::io(path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(config)
}
