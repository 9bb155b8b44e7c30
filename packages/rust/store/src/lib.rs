//! On-disk artifact store and documentation cache.
//!
//! Store state is the filesystem itself: existence of a coordinate's leaf
//! directory under the repository root is the authoritative cache-hit
//! signal, and there is no in-memory index. The documentation cache is a
//! secondary tree keyed per group/name with its own staleness marker.

pub mod artifacts;
pub mod docs;

pub use artifacts::ArtifactStore;
pub use docs::DocsCache;
