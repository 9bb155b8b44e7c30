//! Artifact coordinates and request-path resolution.
//!
//! A [`Coordinate`] is the `(group, name, version)` triple identifying one
//! artifact. It is derived deterministically from a repository-relative
//! request path: `com/example/lib/1.0/lib-1.0.jar` resolves to group
//! `com.example`, name `lib`, version `1.0`.

use std::fmt;
use std::path::{Component, Path, PathBuf};

/// File extensions that address an artifact file rather than a coordinate
/// directory. A request ending in one of these resolves to the parent
/// directory's coordinate.
pub const ARTIFACT_FILE_EXTENSIONS: [&str; 5] = ["pom", "xml", "sha1", "jar", "log"];

/// The `(group, name, version)` triple identifying one artifact.
///
/// Equality and hashing are structural; the coordinate is the key for
/// build deduplication, the artifact store, and the documentation cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Coordinate {
    /// Dot-separated group, e.g. `com.example`.
    pub group: String,
    /// Project name, e.g. `lib`.
    pub name: String,
    /// Requested version, e.g. `1.0` (also a git ref for checkout).
    pub version: String,
}

impl Coordinate {
    /// Construct a coordinate from its three parts.
    pub fn new(
        group: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            version: version.into(),
        }
    }

    /// The recipe registry key for this coordinate: `group:name`.
    pub fn project_key(&self) -> String {
        format!("{}:{}", self.group, self.name)
    }

    /// Relative directory path for this coordinate: group dot-segments
    /// become path separators, followed by name and version.
    pub fn folder_structure(&self) -> PathBuf {
        let mut path: PathBuf = self.group.split('.').collect();
        path.push(&self.name);
        path.push(&self.version);
        path
    }

    /// Resolve a requested file path into a coordinate.
    ///
    /// The path is relativized against `repo_root`; paths that escape the
    /// root or contain non-normal components resolve to `None`. If the
    /// final segment carries a known artifact-file extension the parent
    /// directory names the coordinate. At least three segments must remain
    /// (group, name, version), otherwise `None`.
    pub fn from_request_path(path: &Path, repo_root: &Path) -> Option<Self> {
        let rel = path.strip_prefix(repo_root).ok()?;

        let mut segments = Vec::new();
        for component in rel.components() {
            match component {
                Component::Normal(part) => segments.push(part.to_str()?),
                _ => return None,
            }
        }

        if let Some(last) = segments.last() {
            if let Some(ext) = Path::new(last).extension().and_then(|e| e.to_str()) {
                if ARTIFACT_FILE_EXTENSIONS.contains(&ext) {
                    segments.pop();
                }
            }
        }

        if segments.len() < 3 {
            return None;
        }

        let version = segments.pop()?;
        let name = segments.pop()?;
        let group = segments.join(".");
        Some(Self::new(group, name, version))
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.name, self.version)
    }
}
