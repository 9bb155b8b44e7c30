//! The staged build pipeline.
//!
//! One execution per missing coordinate, driven by the coordinator:
//! precondition check, recipe lookup, fresh workspace, clone, checkout +
//! build steps, harvest into the artifact store, best-effort docs
//! refresh. Any stage failure aborts the run; the artifact directory is
//! only created by the harvest stage, so a failed build leaves the store
//! exactly as it was. The workspace is a `TempDir` and is removed on
//! every exit path, panics included.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, instrument, warn};

use kiln_shared::{Coordinate, KilnError, RecipeRegistry, Result};
use kiln_store::{ArtifactStore, DocsCache};

use crate::command;

/// Default source-fetch command; `{url}` is the recipe's source URL.
pub const DEFAULT_CLONE_COMMAND: &str = "git clone {url}";

/// Default checkout command; `{version}` is the requested version.
pub const DEFAULT_CHECKOUT_COMMAND: &str = "git checkout {version}";

/// Pipeline settings, injected so tests can substitute hermetic commands
/// for the git defaults.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// External build-tool local cache the harvest stage reads from
    /// (conventionally `~/.m2/repository`).
    pub build_cache: PathBuf,
    /// Source-fetch command template (`{url}` substitution).
    pub clone_command: String,
    /// Checkout command template (`{version}` substitution).
    pub checkout_command: String,
}

impl PipelineConfig {
    /// Config with the default git commands.
    pub fn new(build_cache: impl Into<PathBuf>) -> Self {
        Self {
            build_cache: build_cache.into(),
            clone_command: DEFAULT_CLONE_COMMAND.to_string(),
            checkout_command: DEFAULT_CHECKOUT_COMMAND.to_string(),
        }
    }
}

/// Executes the full build for one coordinate.
pub struct BuildPipeline {
    store: ArtifactStore,
    docs: DocsCache,
    registry: Arc<RecipeRegistry>,
    config: PipelineConfig,
}

impl BuildPipeline {
    pub fn new(
        store: ArtifactStore,
        docs: DocsCache,
        registry: Arc<RecipeRegistry>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            docs,
            registry,
            config,
        }
    }

    /// The artifact store this pipeline publishes to.
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Run every stage for `coordinate`. An `Err` is a failed build; the
    /// coordinator reduces it to the boolean outcome waiters observe.
    #[instrument(skip(self), fields(coordinate = %coordinate))]
    pub async fn execute(&self, coordinate: &Coordinate) -> Result<()> {
        // Stage 1: refuse to rebuild over an existing entry.
        if self.store.has(coordinate) {
            return Err(KilnError::build("artifact entry already exists"));
        }

        // Stage 2: recipe lookup.
        let key = coordinate.project_key();
        let Some(recipe) = self.registry.get(&key) else {
            return Err(KilnError::build(format!("no recipe registered for {key}")));
        };

        info!(source = %recipe.source_url, "starting build");

        // Stage 3: isolated workspace, removed on drop whatever happens.
        let workspace = tempfile::Builder::new()
            .prefix("kiln-build-")
            .tempdir()
            .map_err(|e| KilnError::io(std::env::temp_dir(), e))?;
        let log = workspace.path().join("build.log");

        // Stage 4: clone.
        let clone_cmd = self.config.clone_command.replace("{url}", &recipe.source_url);
        if !command::run_logged(&clone_cmd, workspace.path(), &log, &coordinate.version).await? {
            return Err(KilnError::build("clone failed"));
        }

        // Stage 5: checkout + build steps inside the cloned directory.
        let Some(work_dir) = first_subdirectory(workspace.path())? else {
            return Err(KilnError::build("clone produced no working directory"));
        };

        let checkout = self
            .config
            .checkout_command
            .replace("{version}", &coordinate.version);
        let mut steps = Vec::with_capacity(recipe.build_steps.len() + 1);
        steps.push(checkout);
        steps.extend(recipe.build_steps.iter().cloned());

        if !command::run_all(&steps, &work_dir, &log, &coordinate.version).await? {
            return Err(KilnError::build("build step failed"));
        }

        // Stage 6: harvest from the build tool's cache.
        let cached = self.config.build_cache.join(coordinate.folder_structure());
        if !cached.is_dir() {
            return Err(KilnError::build(format!(
                "build produced no artifact at {}",
                cached.display()
            )));
        }
        let dest = self.store.publish(coordinate, &cached, &log)?;

        // Stage 7: docs refresh is best-effort and never fails the build.
        if let Err(e) = self.docs.refresh(&work_dir, &dest, coordinate).await {
            warn!(error = %e, "documentation refresh failed");
        }

        info!(dest = %dest.display(), "build complete");
        Ok(())
    }
}

/// First directory entry directly under `dir` — the single top-level
/// directory a clone produces.
fn first_subdirectory(dir: &Path) -> Result<Option<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| KilnError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| KilnError::io(dir, e))?;
        if entry.path().is_dir() {
            return Ok(Some(entry.path()));
        }
    }
    Ok(None)
}
