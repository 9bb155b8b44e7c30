//! HTTP layer: static serving of the repository tree with build-on-miss.
//!
//! Every request path is looked up under the repository root. Hits are
//! served directly (file bytes or a directory listing); misses are
//! resolved to a coordinate and handed to the build coordinator, then
//! retried. Unresolvable paths and failed builds both yield 404 — the
//! transport deliberately does not distinguish "never existed" from
//! "build attempted and failed".

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, Uri, header};
use axum::response::{Html, IntoResponse, Response};
use tracing::{debug, info};

use kiln_build::BuildCoordinator;
use kiln_shared::Coordinate;

/// Shared state for the request handlers.
pub(crate) struct AppState {
    pub repo_root: PathBuf,
    pub coordinator: BuildCoordinator,
}

/// Router serving the whole repository tree from the fallback handler.
pub(crate) fn router(state: Arc<AppState>) -> Router {
    Router::new().fallback(serve_path).with_state(state)
}

async fn serve_path(State(state): State<Arc<AppState>>, uri: Uri) -> Response {
    let Some(rel) = sanitize_request_path(uri.path()) else {
        return not_found();
    };
    let full = state.repo_root.join(&rel);
    debug!(path = %rel.display(), "request");

    if !full.exists() {
        let Some(coordinate) = Coordinate::from_request_path(&full, &state.repo_root) else {
            return not_found();
        };
        info!(%coordinate, "cache miss, requesting build");
        if !state.coordinator.ensure_built(&coordinate).await {
            return not_found();
        }
        // The build succeeded but the specific file may still be absent
        // (e.g. a checksum the build did not produce).
        if !full.exists() {
            return not_found();
        }
    }

    if full.is_dir() {
        match directory_listing(&full, &rel) {
            Ok(html) => Html(html).into_response(),
            Err(_) => not_found(),
        }
    } else {
        serve_file(&full).await
    }
}

fn not_found() -> Response {
    StatusCode::NOT_FOUND.into_response()
}

/// Turn a request path into a repository-relative path. Rejects anything
/// that is not a plain sequence of normal components.
fn sanitize_request_path(raw: &str) -> Option<PathBuf> {
    let trimmed = raw.trim_start_matches('/');
    let mut rel = PathBuf::new();
    for component in Path::new(trimmed).components() {
        match component {
            Component::Normal(part) => rel.push(part),
            _ => return None,
        }
    }
    Some(rel)
}

async fn serve_file(path: &Path) -> Response {
    match tokio::fs::read(path).await {
        Ok(bytes) => (
            [(header::CONTENT_TYPE, content_type_for(path))],
            bytes,
        )
            .into_response(),
        Err(_) => not_found(),
    }
}

/// Content type from the file extension; unknown extensions are served as
/// opaque bytes.
fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("jar") => "application/java-archive",
        Some("pom") | Some("xml") => "application/xml",
        Some("html") => "text/html",
        Some("css") => "text/css",
        Some("js") => "text/javascript",
        Some("json") => "application/json",
        Some("txt") | Some("log") | Some("sha1") | Some("md5") => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Minimal HTML listing of a repository directory, entries sorted by
/// name, with a parent link everywhere except the root.
fn directory_listing(dir: &Path, rel: &Path) -> std::io::Result<String> {
    let mut entries: Vec<(String, bool)> = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        entries.push((name, entry.path().is_dir()));
    }
    entries.sort();

    let title = if rel.as_os_str().is_empty() {
        "/".to_string()
    } else {
        format!("/{}", rel.display())
    };

    let mut html = String::new();
    html.push_str("<!DOCTYPE html><html><head><title>");
    html.push_str(&title);
    html.push_str("</title></head><body><h1>");
    html.push_str(&title);
    html.push_str("</h1><ul>");
    if !rel.as_os_str().is_empty() {
        html.push_str("<li><a href=\"../\">..</a></li>");
    }
    for (name, is_dir) in &entries {
        let suffix = if *is_dir { "/" } else { "" };
        html.push_str(&format!(
            "<li><a href=\"{name}{suffix}\">{name}{suffix}</a></li>"
        ));
    }
    html.push_str("</ul></body></html>");
    Ok(html)
}
