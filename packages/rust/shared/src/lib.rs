//! Shared types, error model, and configuration for Kiln.
//!
//! This crate is the foundation depended on by all other Kiln crates.
//! It provides:
//! - [`KilnError`] — the unified error type
//! - Domain types ([`Coordinate`] and request-path resolution)
//! - The build recipe registry ([`RecipeRegistry`], [`Recipe`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod coordinate;
pub mod error;
pub mod recipe;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, PathsConfig, ServerConfig, init_config, load_config, load_config_from,
};
pub use coordinate::{ARTIFACT_FILE_EXTENSIONS, Coordinate};
pub use error::{KilnError, Result};
pub use recipe::{Recipe, RecipeRegistry};
