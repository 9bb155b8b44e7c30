//! Build execution for Kiln: the staged build pipeline and the
//! single-flight coordinator that deduplicates concurrent requests.
//!
//! The pipeline clones a project, checks out the requested version, runs
//! the recipe's build steps, harvests output from the external build
//! tool's local cache into the artifact store, and refreshes extracted
//! documentation. The coordinator guarantees at most one pipeline
//! execution per coordinate at a time; every concurrent caller observes
//! the outcome of that single run.

pub mod command;
pub mod coordinator;
pub mod pipeline;

pub use coordinator::BuildCoordinator;
pub use pipeline::{BuildPipeline, PipelineConfig};
