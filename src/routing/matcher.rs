//! Path prefix matching.
//!
//! # Design Decisions
//! - Prefixes are `/`-delimited: `/doc/` matches `/doc` and `/doc/x`, never `/docs`
//! - Matching is case-sensitive
//! - No regex, so matching is a plain string comparison

/// Matches request paths against one `/`-delimited prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a matcher. `prefix` must start and end with `/`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The prefix without its trailing slash, as a router mount point.
    pub fn mount_point(&self) -> &str {
        self.prefix.trim_end_matches('/')
    }

    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.prefix) || path == self.mount_point()
    }

    /// Whether another prefix lies inside this one, or this inside it.
    pub fn overlaps(&self, other: &PathPrefixMatcher) -> bool {
        self.prefix.starts_with(&other.prefix) || other.prefix.starts_with(&self.prefix)
    }
}
