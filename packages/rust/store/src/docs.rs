//! Documentation cache: extracted javadoc trees with a staleness marker.
//!
//! Docs are keyed per group/name (one level shallower than artifacts,
//! since they are regenerated in place when a newer version is built) and
//! live under the `javadoc/` subtree of the repository root so the HTTP
//! layer serves them as plain static files. Each entry carries a `time`
//! marker file holding the source commit's Unix timestamp; an entry is
//! stale when the requested version's commit is strictly newer.
//!
//! Everything here is best-effort: the build pipeline logs refresh
//! failures and still reports success.

use std::fs::File;
use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{debug, info, warn};

use kiln_shared::{Coordinate, KilnError, Result};

/// Marker file holding the stored commit timestamp, decimal seconds.
pub const MARKER_FILE: &str = "time";

/// Secondary cache of extracted documentation archives.
#[derive(Debug, Clone)]
pub struct DocsCache {
    root: PathBuf,
}

impl DocsCache {
    /// Create a cache rooted at `root` (typically `<repo_root>/javadoc`).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory for a coordinate's docs: group path plus name, without
    /// the version segment.
    pub fn entry_path(&self, coordinate: &Coordinate) -> PathBuf {
        let mut path: PathBuf = coordinate.group.split('.').collect();
        path.push(&coordinate.name);
        self.root.join(path)
    }

    /// Refresh the docs entry for `coordinate` from a freshly built tree.
    ///
    /// `source_dir` is the checked-out clone (used to read the commit
    /// time); `artifact_dir` is the published artifact directory that may
    /// contain a javadoc jar.
    pub async fn refresh(
        &self,
        source_dir: &Path,
        artifact_dir: &Path,
        coordinate: &Coordinate,
    ) -> Result<()> {
        let commit_ts = commit_timestamp(source_dir, &coordinate.version).await;
        self.refresh_with_timestamp(artifact_dir, coordinate, commit_ts)
    }

    /// Staleness check plus rebuild, with the commit timestamp already
    /// computed. Rebuilds when no entry exists, or when `commit_ts` is
    /// strictly newer than the stored marker.
    pub fn refresh_with_timestamp(
        &self,
        artifact_dir: &Path,
        coordinate: &Coordinate,
        commit_ts: i64,
    ) -> Result<()> {
        let entry = self.entry_path(coordinate);

        if entry.exists() {
            let stored = read_marker(&entry);
            if commit_ts <= stored {
                debug!(%coordinate, stored, commit_ts, "docs up to date");
                return Ok(());
            }
        }

        self.rebuild(artifact_dir, &entry, coordinate, commit_ts)
    }

    fn rebuild(
        &self,
        artifact_dir: &Path,
        entry: &Path,
        coordinate: &Coordinate,
        commit_ts: i64,
    ) -> Result<()> {
        let Some(archive) = find_docs_archive(artifact_dir)? else {
            debug!(%coordinate, "no docs archive in artifact directory");
            return Ok(());
        };

        if entry.exists() {
            std::fs::remove_dir_all(entry).map_err(|e| KilnError::io(entry, e))?;
        }
        std::fs::create_dir_all(entry).map_err(|e| KilnError::io(entry, e))?;

        extract_archive(&archive, entry)?;

        let marker = entry.join(MARKER_FILE);
        std::fs::write(&marker, commit_ts.to_string()).map_err(|e| KilnError::io(&marker, e))?;

        info!(%coordinate, archive = %archive.display(), commit_ts, "rebuilt docs entry");
        Ok(())
    }
}

/// Commit time (Unix seconds) of `version` in the git checkout at
/// `source_dir`. Any failure, including unparseable output, yields 0 so a
/// later request rebuilds rather than blocking the pipeline.
pub async fn commit_timestamp(source_dir: &Path, version: &str) -> i64 {
    let output = Command::new("git")
        .args(["show", "-s", "--format=%ct", version])
        .current_dir(source_dir)
        .output()
        .await;

    match output {
        Ok(out) => String::from_utf8_lossy(&out.stdout)
            .trim()
            .parse()
            .unwrap_or(0),
        Err(e) => {
            warn!(dir = %source_dir.display(), error = %e, "commit time probe failed");
            0
        }
    }
}

/// Stored marker timestamp, or 0 when missing/unreadable.
fn read_marker(entry: &Path) -> i64 {
    std::fs::read_to_string(entry.join(MARKER_FILE))
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0)
}

/// First file in `dir` whose name marks it as a documentation archive
/// (contains `javadoc`, ends `.jar`).
fn find_docs_archive(dir: &Path) -> Result<Option<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| KilnError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| KilnError::io(dir, e))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if name.contains("javadoc") && name.ends_with(".jar") {
            return Ok(Some(entry.path()));
        }
    }
    Ok(None)
}

/// Extract every entry of a jar into `dest`: directory entries first,
/// then files, so parents always exist. Entries that escape the
/// extraction root are skipped.
fn extract_archive(archive: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive).map_err(|e| KilnError::io(archive, e))?;
    let mut jar = zip::ZipArchive::new(file)
        .map_err(|e| KilnError::docs(format!("{}: {e}", archive.display())))?;

    for i in 0..jar.len() {
        let entry = jar
            .by_index(i)
            .map_err(|e| KilnError::docs(format!("{}: {e}", archive.display())))?;
        if !entry.is_dir() {
            continue;
        }
        if let Some(rel) = entry.enclosed_name() {
            let dir = dest.join(rel);
            std::fs::create_dir_all(&dir).map_err(|e| KilnError::io(&dir, e))?;
        }
    }

    for i in 0..jar.len() {
        let mut entry = jar
            .by_index(i)
            .map_err(|e| KilnError::docs(format!("{}: {e}", archive.display())))?;
        if entry.is_dir() {
            continue;
        }
        let Some(rel) = entry.enclosed_name() else {
            warn!(archive = %archive.display(), index = i, "skipping unsafe archive entry");
            continue;
        };
        let target = dest.join(rel);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| KilnError::io(parent, e))?;
        }
        let mut out = File::create(&target).map_err(|e| KilnError::io(&target, e))?;
        std::io::copy(&mut entry, &mut out).map_err(|e| KilnError::io(&target, e))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn coord() -> Coordinate {
        Coordinate::new("com.example", "lib", "1.0")
    }

    /// Write a minimal javadoc jar with one directory and two files.
    fn write_docs_jar(dir: &Path) {
        let path = dir.join("lib-1.0-javadoc.jar");
        let file = File::create(path).unwrap();
        let mut jar = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        jar.add_directory("api/", options).unwrap();
        jar.start_file("index.html", options).unwrap();
        jar.write_all(b"<html>docs</html>").unwrap();
        jar.start_file("api/Lib.html", options).unwrap();
        jar.write_all(b"<html>Lib</html>").unwrap();
        jar.finish().unwrap();
    }

    #[test]
    fn entry_path_is_per_group_and_name() {
        let cache = DocsCache::new("/repo/javadoc");
        assert_eq!(
            cache.entry_path(&coord()),
            PathBuf::from("/repo/javadoc/com/example/lib")
        );
    }

    #[test]
    fn first_refresh_builds_unconditionally() {
        let dir = tempfile::tempdir().unwrap();
        let artifact_dir = dir.path().join("artifact");
        std::fs::create_dir_all(&artifact_dir).unwrap();
        write_docs_jar(&artifact_dir);

        let cache = DocsCache::new(dir.path().join("javadoc"));
        cache
            .refresh_with_timestamp(&artifact_dir, &coord(), 0)
            .unwrap();

        let entry = cache.entry_path(&coord());
        assert!(entry.join("index.html").exists());
        assert!(entry.join("api/Lib.html").exists());
        assert_eq!(std::fs::read_to_string(entry.join(MARKER_FILE)).unwrap(), "0");
    }

    #[test]
    fn older_or_equal_commit_leaves_entry_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let artifact_dir = dir.path().join("artifact");
        std::fs::create_dir_all(&artifact_dir).unwrap();
        write_docs_jar(&artifact_dir);

        let cache = DocsCache::new(dir.path().join("javadoc"));
        let entry = cache.entry_path(&coord());
        std::fs::create_dir_all(&entry).unwrap();
        std::fs::write(entry.join(MARKER_FILE), "100").unwrap();
        std::fs::write(entry.join("sentinel"), "untouched").unwrap();

        cache
            .refresh_with_timestamp(&artifact_dir, &coord(), 100)
            .unwrap();
        assert!(entry.join("sentinel").exists());

        cache
            .refresh_with_timestamp(&artifact_dir, &coord(), 50)
            .unwrap();
        assert!(entry.join("sentinel").exists());
        assert_eq!(
            std::fs::read_to_string(entry.join(MARKER_FILE)).unwrap(),
            "100"
        );
    }

    #[test]
    fn newer_commit_rebuilds_entry() {
        let dir = tempfile::tempdir().unwrap();
        let artifact_dir = dir.path().join("artifact");
        std::fs::create_dir_all(&artifact_dir).unwrap();
        write_docs_jar(&artifact_dir);

        let cache = DocsCache::new(dir.path().join("javadoc"));
        let entry = cache.entry_path(&coord());
        std::fs::create_dir_all(&entry).unwrap();
        std::fs::write(entry.join(MARKER_FILE), "100").unwrap();
        std::fs::write(entry.join("sentinel"), "stale").unwrap();

        cache
            .refresh_with_timestamp(&artifact_dir, &coord(), 101)
            .unwrap();

        assert!(!entry.join("sentinel").exists());
        assert!(entry.join("index.html").exists());
        assert_eq!(
            std::fs::read_to_string(entry.join(MARKER_FILE)).unwrap(),
            "101"
        );
    }

    #[test]
    fn traversal_entries_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let artifact_dir = dir.path().join("artifact");
        std::fs::create_dir_all(&artifact_dir).unwrap();

        // A jar with one good entry and one trying to climb out of the
        // extraction root.
        let path = artifact_dir.join("lib-1.0-javadoc.jar");
        let file = File::create(path).unwrap();
        let mut jar = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        jar.start_file("index.html", options).unwrap();
        jar.write_all(b"<html>docs</html>").unwrap();
        jar.start_file("../evil.html", options).unwrap();
        jar.write_all(b"<html>escaped</html>").unwrap();
        jar.finish().unwrap();

        let cache = DocsCache::new(dir.path().join("javadoc"));
        cache
            .refresh_with_timestamp(&artifact_dir, &coord(), 7)
            .unwrap();

        let entry = cache.entry_path(&coord());
        assert!(entry.join("index.html").exists());
        assert!(!entry.parent().unwrap().join("evil.html").exists());
        // The marker still lands, so the entry is complete.
        assert_eq!(std::fs::read_to_string(entry.join(MARKER_FILE)).unwrap(), "7");
    }

    #[test]
    fn missing_docs_archive_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let artifact_dir = dir.path().join("artifact");
        std::fs::create_dir_all(&artifact_dir).unwrap();
        std::fs::write(artifact_dir.join("lib-1.0.jar"), b"not docs").unwrap();

        let cache = DocsCache::new(dir.path().join("javadoc"));
        cache
            .refresh_with_timestamp(&artifact_dir, &coord(), 5)
            .unwrap();

        assert!(!cache.entry_path(&coord()).exists());
    }

    #[tokio::test]
    async fn commit_timestamp_defaults_to_zero_outside_git() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(commit_timestamp(dir.path(), "1.0").await, 0);
    }
}
