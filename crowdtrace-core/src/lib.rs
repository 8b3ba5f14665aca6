//! Cluster algebra for crowdtrace.
//!
//! This crate provides the lazy, composable machinery for merging time series
//! of snapshots from multiple artifacts into derived time series:
//!
//! - [`Individual`] — a combinable, capture-timestamped measurement
//! - [`SampleStore<T>`] — per-artifact, time-ordered snapshot series
//! - [`StoreRegistry<T>`] — weak-value cache handing the same store to every
//!   handle built with the same identifier
//! - [`Cluster`] — anything producing a lazy, ascending-by-capture-time,
//!   timestamp-deduplicated snapshot sequence
//! - [`LazyUnion`] — a cluster composed from two clusters via on-demand merge
//! - [`NamedCluster`] — a cluster carrying a display name
//!
//! The merge operation on every [`Individual`] satisfies:
//! - **Commutative**: merge(a, b) == merge(b, a)
//! - **Associative**: merge(merge(a, b), c) == merge(a, merge(b, c))
//!
//! together with an identity element (the `None` variant of `Option`), so a
//! union's output is independent of the order in which clusters were composed.
//!
//! Everything here is synchronous and single-threaded: stores are shared via
//! `Rc<RefCell<_>>`, and iteration is a pull-based sequence that re-walks the
//! current store state on every traversal start.

mod cluster;
mod ids;
mod individual;
mod merge;
mod named;
mod store;

pub use cluster::{BoxedCluster, Cluster, EmptyCluster, LazyUnion, union_all};
pub use ids::ArtifactUrl;
pub use individual::{Individual, Metrics};
pub use named::{Named, NamedCluster};
pub use store::{AppendOutcome, SampleStore, StoreHandle, StoreIter, StoreRegistry};
