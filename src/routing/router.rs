//! Route table: which handler class owns which path prefix.
//!
//! # Responsibilities
//! - Hold the fixed set of `(prefix, class)` entries
//! - Resolve a request path to exactly one entry, or none
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Entries kept longest prefix first, so resolution is deterministic
//!   regardless of registration order
//! - Overlapping prefixes are rejected at construction, one owner per prefix
//! - Explicit no-match rather than a silent default

use std::path::PathBuf;

use thiserror::Error;

use crate::config::RouteConfig;
use crate::routing::matcher::PathPrefixMatcher;

/// Handler class behind a prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteClass {
    /// Static API explorer assets.
    Explorer(PathBuf),
    /// Static documentation files.
    Documentation(PathBuf),
    /// Protocol bridge.
    Api,
}

impl RouteClass {
    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            RouteClass::Explorer(_) => "swagger",
            RouteClass::Documentation(_) => "doc",
            RouteClass::Api => "api",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub matcher: PathPrefixMatcher,
    pub class: RouteClass,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("route prefix '{0}' must be '/'-delimited, like /name/")]
    InvalidPrefix(String),

    #[error("route prefix '{0}' overlaps '{1}'")]
    Overlap(String, String),
}

/// Immutable prefix → class mapping.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(entries: impl IntoIterator<Item = (String, RouteClass)>) -> Result<Self, RouteError> {
        let mut routes: Vec<Route> = Vec::new();
        for (prefix, class) in entries {
            if !is_delimited_prefix(&prefix) {
                return Err(RouteError::InvalidPrefix(prefix));
            }
            let matcher = PathPrefixMatcher::new(prefix);
            if let Some(existing) = routes.iter().find(|r| r.matcher.overlaps(&matcher)) {
                return Err(RouteError::Overlap(
                    matcher.prefix().to_string(),
                    existing.matcher.prefix().to_string(),
                ));
            }
            routes.push(Route { matcher, class });
        }
        routes.sort_by(|a, b| b.matcher.prefix().len().cmp(&a.matcher.prefix().len()));
        Ok(Self { routes })
    }

    /// The three route classes of the gateway.
    pub fn from_config(config: &RouteConfig) -> Result<Self, RouteError> {
        Self::new([
            (config.swagger_prefix.clone(), RouteClass::Explorer(config.swagger_root.clone())),
            (config.doc_prefix.clone(), RouteClass::Documentation(config.doc_root.clone())),
            (config.api_prefix.clone(), RouteClass::Api),
        ])
    }

    /// Entry owning `path`, if any.
    pub fn resolve(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.matcher.matches(path))
    }

    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }
}

fn is_delimited_prefix(prefix: &str) -> bool {
    let Some(inner) = prefix.strip_prefix('/').and_then(|p| p.strip_suffix('/')) else {
        return false;
    };
    !inner.is_empty()
        && inner
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}
