//! Cluster datatypes: composable, lazily-iterable groups of snapshot series.

use crate::individual::Individual;
use crate::merge::Merged;
use std::any::type_name;
use std::marker::PhantomData;
use tracing::debug;

/// A set of artifacts viewed as one aggregate snapshot sequence.
///
/// Iteration produces the snapshots of every member, ascending by capture
/// time, with same-timestamp snapshots from different members merged into one
/// via the individual algebra. The sequence is finite, restartable, and live:
/// each `iter` call starts a fresh merge over current store state — nothing
/// is cached between traversals, so snapshots appended since the previous
/// traversal are reflected.
pub trait Cluster {
    /// The concrete snapshot kind this cluster produces.
    type Individual: Individual;

    /// Starts a fresh traversal of the aggregate snapshot sequence.
    fn iter(&self) -> Box<dyn Iterator<Item = Self::Individual> + '_>;

    /// Returns the lazy union of this cluster and another.
    ///
    /// The union is not materialized: future appends to either side are
    /// reflected in later traversals.
    fn union<C>(self, other: C) -> LazyUnion<Self, C>
    where
        Self: Sized,
        C: Cluster<Individual = Self::Individual>,
    {
        LazyUnion::new(self, other)
    }
}

impl<T: Individual> Cluster for Box<dyn Cluster<Individual = T>> {
    type Individual = T;

    fn iter(&self) -> Box<dyn Iterator<Item = T> + '_> {
        (**self).iter()
    }
}

/// A cluster composed of two sub-clusters, merged on demand.
///
/// Pulling one element advances the constituent iterators by exactly as much
/// as needed. Because the merge operation is commutative and associative, the
/// output is independent of the order in which clusters were composed.
#[derive(Debug, Clone)]
pub struct LazyUnion<A, B> {
    first: A,
    second: B,
}

impl<A, B> LazyUnion<A, B> {
    /// Composes two clusters without iterating either.
    #[must_use]
    pub fn new(first: A, second: B) -> Self {
        debug!(
            first = type_name::<A>(),
            second = type_name::<B>(),
            "lazy-merging clusters"
        );
        Self { first, second }
    }
}

impl<A, B> Cluster for LazyUnion<A, B>
where
    A: Cluster,
    B: Cluster<Individual = A::Individual>,
{
    type Individual = A::Individual;

    fn iter(&self) -> Box<dyn Iterator<Item = Self::Individual> + '_> {
        Box::new(Merged::new(self.first.iter(), self.second.iter()))
    }
}

/// The identity element of cluster composition: a cluster with no members.
///
/// A union including an empty cluster iterates identically to the union of
/// the rest.
#[derive(Debug)]
pub struct EmptyCluster<T> {
    _kind: PhantomData<T>,
}

impl<T> EmptyCluster<T> {
    /// Creates an empty cluster of the given snapshot kind.
    #[must_use]
    pub fn new() -> Self {
        Self { _kind: PhantomData }
    }
}

impl<T> Default for EmptyCluster<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for EmptyCluster<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T: Individual> Cluster for EmptyCluster<T> {
    type Individual = T;

    fn iter(&self) -> Box<dyn Iterator<Item = T> + '_> {
        Box::new(std::iter::empty())
    }
}

/// A cluster whose concrete composition is erased.
///
/// Useful when folding a runtime-sized collection of clusters, where the
/// nesting of [`LazyUnion`] types cannot be named.
pub type BoxedCluster<T> = Box<dyn Cluster<Individual = T>>;

/// Folds any number of clusters into one lazy union, starting from the
/// identity element — an empty input produces an empty cluster.
#[must_use]
pub fn union_all<T, I>(clusters: I) -> BoxedCluster<T>
where
    T: Individual + 'static,
    I: IntoIterator<Item = BoxedCluster<T>>,
{
    clusters
        .into_iter()
        .fold(Box::new(EmptyCluster::new()) as BoxedCluster<T>, |acc, next| {
            Box::new(LazyUnion::new(acc, next))
        })
}
