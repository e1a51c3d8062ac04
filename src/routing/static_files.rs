//! Static file handlers for the explorer and documentation route classes.
//!
//! Both are `tower_http` [`ServeDir`]s, which refuse `..` traversal and
//! serve only regular files below their root. Prefix stripping happens in
//! the router, so the services see paths relative to their root.
//!
//! The documentation root defaults to the working directory, which is also
//! where the TLS material lives, so that class additionally answers 404 for
//! the CA bundle, server certificate and key.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tower_http::services::ServeDir;
use url::Url;

/// Explorer assets, served as-is.
pub fn explorer(root: &Path) -> ServeDir {
    ServeDir::new(root)
}

/// Documentation files, minus anything in `hidden`.
pub fn documentation(root: &Path, hidden: HiddenFiles) -> Router {
    Router::new()
        .fallback_service(ServeDir::new(root))
        .layer(middleware::from_fn_with_state(Arc::new(hidden), hide_files))
}

async fn hide_files(State(hidden): State<Arc<HiddenFiles>>, request: Request, next: Next) -> Response {
    if hidden.is_hidden(request.uri().path()).await {
        tracing::warn!(path = %request.uri().path(), "Refused request for protected file");
        return StatusCode::NOT_FOUND.into_response();
    }
    next.run(request).await
}

/// Files that must not be served from a directory.
#[derive(Debug, Clone, Default)]
pub struct HiddenFiles {
    root: Option<Url>,
    files: Vec<PathBuf>,
}

impl HiddenFiles {
    /// Hide `files` when requested below `root`. Files that do not exist
    /// are skipped.
    pub fn new<'a>(root: &Path, files: impl IntoIterator<Item = &'a PathBuf>) -> Self {
        let root = std::fs::canonicalize(root)
            .ok()
            .and_then(|dir| Url::from_directory_path(dir).ok());
        let files = files
            .into_iter()
            .filter_map(|f| std::fs::canonicalize(f).ok())
            .collect();
        Self { root, files }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Whether the root-relative request `path` names a hidden file.
    pub async fn is_hidden(&self, path: &str) -> bool {
        let Some(root) = &self.root else {
            return false;
        };
        if self.files.is_empty() {
            return false;
        }
        // Joining through a URL applies percent-decoding the same way the
        // file server does.
        let Some(candidate) = root
            .join(path.trim_start_matches('/'))
            .ok()
            .and_then(|url| url.to_file_path().ok())
        else {
            return false;
        };
        let candidate = tokio::fs::canonicalize(&candidate).await.unwrap_or(candidate);
        self.files.iter().any(|f| *f == candidate)
    }
}
