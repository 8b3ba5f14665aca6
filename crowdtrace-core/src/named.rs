//! Display-named entities and clusters.

use crate::cluster::Cluster;
use std::hash::{Hash, Hasher};

/// Something with a human-facing display name.
///
/// Equality and hashing of named wrappers derive solely from the name: two
/// differently-constructed values sharing a name compare equal. This is
/// deliberate — name-keyed sets and maps treat a name collision across
/// distinct artifacts as "the same logical thing".
pub trait Named {
    /// Returns the display name.
    fn name(&self) -> String;
}

/// A cluster carrying a display name; the unit the view layer consumes.
///
/// Naming changes nothing about iteration — the wrapper delegates to the
/// inner cluster.
#[derive(Debug, Clone)]
pub struct NamedCluster<C> {
    name: String,
    cluster: C,
}

impl<C: Cluster> NamedCluster<C> {
    /// Wraps a cluster under a display name.
    #[must_use]
    pub fn new(name: impl Into<String>, cluster: C) -> Self {
        Self {
            name: name.into(),
            cluster,
        }
    }

    /// Returns the wrapped cluster.
    #[must_use]
    pub fn cluster(&self) -> &C {
        &self.cluster
    }
}

impl<C: Cluster> Cluster for NamedCluster<C> {
    type Individual = C::Individual;

    fn iter(&self) -> Box<dyn Iterator<Item = Self::Individual> + '_> {
        self.cluster.iter()
    }
}

impl<C> Named for NamedCluster<C> {
    fn name(&self) -> String {
        self.name.clone()
    }
}

impl<C> PartialEq for NamedCluster<C> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl<C> Eq for NamedCluster<C> {}

impl<C> Hash for NamedCluster<C> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}
