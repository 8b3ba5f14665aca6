//! Identifier types used throughout the crowdtrace core.
//!
//! Artifacts are identified by the URL they were captured from. The URL is
//! the stable key: display names change between snapshots, URLs do not.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a tracked artifact.
///
/// Two entity handles built from the same `ArtifactUrl` share one sample
/// store for as long as either handle is alive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactUrl(String);

impl ArtifactUrl {
    /// Creates an artifact URL from any string-like value.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    /// Returns the URL as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the path segments after the host, most significant last.
    ///
    /// Used by adapters to derive a fallback display name (e.g. the
    /// `owner/title` pair of a repository URL) before any snapshot exists.
    pub fn path_segments(&self) -> impl Iterator<Item = &str> {
        let without_scheme = self
            .0
            .split_once("://")
            .map_or(self.0.as_str(), |(_, rest)| rest);
        let mut segments = without_scheme
            .trim_end_matches('/')
            .split('/')
            .filter(|segment| !segment.is_empty());
        segments.next(); // host
        segments
    }
}

impl fmt::Display for ArtifactUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ArtifactUrl {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

impl From<String> for ArtifactUrl {
    fn from(url: String) -> Self {
        Self(url)
    }
}
