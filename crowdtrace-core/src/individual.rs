//! The individual algebra: combinable, capture-timestamped measurements.

use chrono::{DateTime, Utc};

/// One combinable measurement value, tagged with its capture time.
///
/// Implementations must make `merge`:
/// - **Commutative**: `a.merge(b) == b.merge(a)`
/// - **Associative**: `a.merge(b).merge(c) == a.merge(b.merge(c))`
///
/// and must extend the capture time to the max of both operands. The
/// conventional merge rules are: sum additive counters, union categorical
/// sets, recursively merge nested algebra-typed fields, and clear
/// identity-only fields (owner, original title) — a merged individual no
/// longer refers to one artifact.
///
/// The algebra is closed per concrete kind: `merge` takes `Self`, so merging
/// snapshots of different kinds is a compile error rather than a runtime
/// fault.
pub trait Individual: Sized {
    /// The time at which this measurement was captured.
    fn captured_at(&self) -> DateTime<Utc>;

    /// Combines two individuals into one aggregate individual.
    #[must_use]
    fn merge(self, other: Self) -> Self;
}

/// `Option<T>` models the identity element of the algebra: `None` contributes
/// nothing, so folds can start from it.
///
/// `captured_at` must not be asked of the identity; the merge machinery never
/// does, since `None` is absorbed before any timestamp comparison.
impl<T: Individual> Individual for Option<T> {
    fn captured_at(&self) -> DateTime<Utc> {
        match self {
            Some(individual) => individual.captured_at(),
            None => DateTime::<Utc>::MIN_UTC,
        }
    }

    fn merge(self, other: Self) -> Self {
        match (self, other) {
            (Some(a), Some(b)) => Some(a.merge(b)),
            (a, None) => a,
            (None, b) => b,
        }
    }
}

/// Named scalar measurements an individual can report to the view layer.
///
/// Not every key is present on every individual — an aggregate lacks
/// identity-derived fields, and kinds expose different counters — so
/// consumers skip `None` rather than fail.
pub trait Metrics {
    /// Returns the value of a named measurement, or `None` if this
    /// individual does not carry it.
    fn metric(&self, key: &str) -> Option<f64>;
}
