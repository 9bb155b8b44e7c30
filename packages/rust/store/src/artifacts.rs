//! Filesystem artifact store.
//!
//! Artifacts live at `<root>/<group as path>/<name>/<version>/`. The
//! directory is only created by [`ArtifactStore::publish`], after every
//! build stage has already succeeded, so "directory exists" is a reliable
//! cache-hit predicate with no half-written entries.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use kiln_shared::{Coordinate, KilnError, Result};

/// Name of the build log copied into each published artifact directory.
pub const BUILD_LOG_NAME: &str = "build.log";

/// Handle on the repository directory that holds published artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Create a store rooted at `root`. The directory itself is created
    /// lazily by the first publish.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Repository root this store serves from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute-or-relative path of the coordinate's directory.
    pub fn path_for(&self, coordinate: &Coordinate) -> PathBuf {
        self.root.join(coordinate.folder_structure())
    }

    /// Whether the coordinate has a published entry. Leaf-directory
    /// existence is the sole predicate; a stray regular file at the
    /// coordinate path is not an entry.
    pub fn has(&self, coordinate: &Coordinate) -> bool {
        self.path_for(coordinate).is_dir()
    }

    /// Publish a built coordinate: create its directory, copy every
    /// regular file from `harvest_dir` (the external build tool's cache
    /// entry), then copy `build_log` in as `build.log`.
    ///
    /// Returns the published directory path.
    pub fn publish(
        &self,
        coordinate: &Coordinate,
        harvest_dir: &Path,
        build_log: &Path,
    ) -> Result<PathBuf> {
        let dest = self.path_for(coordinate);
        std::fs::create_dir_all(&dest).map_err(|e| KilnError::io(&dest, e))?;

        let entries =
            std::fs::read_dir(harvest_dir).map_err(|e| KilnError::io(harvest_dir, e))?;
        let mut copied = 0usize;
        for entry in entries {
            let entry = entry.map_err(|e| KilnError::io(harvest_dir, e))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let target = dest.join(entry.file_name());
            std::fs::copy(&path, &target).map_err(|e| KilnError::io(&target, e))?;
            copied += 1;
            debug!(file = %target.display(), "harvested artifact file");
        }

        let log_target = dest.join(BUILD_LOG_NAME);
        std::fs::copy(build_log, &log_target).map_err(|e| KilnError::io(&log_target, e))?;

        info!(%coordinate, files = copied, dest = %dest.display(), "published artifact");
        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord() -> Coordinate {
        Coordinate::new("com.example", "lib", "1.0")
    }

    #[test]
    fn missing_entry_is_a_cache_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        assert!(!store.has(&coord()));
    }

    #[test]
    fn stray_file_at_coordinate_path_is_not_a_hit() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let path = store.path_for(&coord());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"not a directory").unwrap();

        assert!(!store.has(&coord()));
    }

    #[test]
    fn path_for_mirrors_coordinate_layout() {
        let store = ArtifactStore::new("/srv/repo");
        assert_eq!(
            store.path_for(&coord()),
            PathBuf::from("/srv/repo/com/example/lib/1.0")
        );
    }

    #[test]
    fn publish_copies_files_and_build_log() {
        let dir = tempfile::tempdir().unwrap();
        let harvest = dir.path().join("m2");
        std::fs::create_dir_all(&harvest).unwrap();
        std::fs::write(harvest.join("lib-1.0.jar"), b"jar-bytes").unwrap();
        std::fs::write(harvest.join("lib-1.0.pom"), b"<project/>").unwrap();
        // Subdirectories are not harvested.
        std::fs::create_dir(harvest.join("nested")).unwrap();
        let log = dir.path().join("build.log");
        std::fs::write(&log, b"clone ok\nbuild ok\n").unwrap();

        let store = ArtifactStore::new(dir.path().join("repo"));
        let dest = store.publish(&coord(), &harvest, &log).unwrap();

        assert!(store.has(&coord()));
        assert_eq!(dest, store.path_for(&coord()));
        assert!(dest.join("lib-1.0.jar").exists());
        assert!(dest.join("lib-1.0.pom").exists());
        assert!(!dest.join("nested").exists());
        let published_log = std::fs::read_to_string(dest.join(BUILD_LOG_NAME)).unwrap();
        assert!(published_log.contains("build ok"));
    }

    #[test]
    fn publish_overwrites_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let harvest = dir.path().join("m2");
        std::fs::create_dir_all(&harvest).unwrap();
        std::fs::write(harvest.join("lib-1.0.jar"), b"new").unwrap();
        let log = dir.path().join("build.log");
        std::fs::write(&log, b"").unwrap();

        let store = ArtifactStore::new(dir.path().join("repo"));
        let dest = store.path_for(&coord());
        std::fs::create_dir_all(&dest).unwrap();
        std::fs::write(dest.join("lib-1.0.jar"), b"old").unwrap();

        store.publish(&coord(), &harvest, &log).unwrap();
        assert_eq!(std::fs::read(dest.join("lib-1.0.jar")).unwrap(), b"new");
    }
}
