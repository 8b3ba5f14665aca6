//! Property-based tests for the cluster algebra.
//!
//! These verify the laws the lazy union relies on:
//! - Commutativity: iter(A + B) == iter(B + A)
//! - Associativity: iter((A + B) + C) == iter(A + (B + C))
//! - Identity: iter(A + empty) == iter(A)
//! - Dedup: one output snapshot per distinct capture time, equal to the
//!   merge-fold of every constituent's snapshot at that time

use chrono::{DateTime, TimeZone, Utc};
use crowdtrace_core::{Cluster, EmptyCluster, Individual, SampleStore, StoreHandle, StoreIter};
use proptest::prelude::*;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Gauge {
    at: DateTime<Utc>,
    value: u64,
}

impl Individual for Gauge {
    fn captured_at(&self) -> DateTime<Utc> {
        self.at
    }

    fn merge(self, other: Self) -> Self {
        Self {
            at: self.at.max(other.at),
            value: self.value + other.value,
        }
    }
}

#[derive(Clone)]
struct StoreCluster(StoreHandle<Gauge>);

impl Cluster for StoreCluster {
    type Individual = Gauge;

    fn iter(&self) -> Box<dyn Iterator<Item = Gauge> + '_> {
        Box::new(StoreIter::new(Rc::clone(&self.0)))
    }
}

fn day(offset: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::days(offset as i64)
}

fn cluster_of(snapshots: &[(u32, u64)]) -> StoreCluster {
    let mut store = SampleStore::new();
    for &(offset, value) in snapshots {
        store.append(Gauge {
            at: day(offset),
            value,
        });
    }
    StoreCluster(Rc::new(RefCell::new(store)))
}

fn pairs<C: Cluster<Individual = Gauge>>(cluster: &C) -> Vec<(DateTime<Utc>, u64)> {
    cluster.iter().map(|g| (g.at, g.value)).collect()
}

fn snapshots_strategy() -> impl Strategy<Value = Vec<(u32, u64)>> {
    prop::collection::vec((0u32..40, 0u64..1000), 0..12)
}

proptest! {
    #[test]
    fn union_is_commutative(xs in snapshots_strategy(), ys in snapshots_strategy()) {
        let ab = cluster_of(&xs).union(cluster_of(&ys));
        let ba = cluster_of(&ys).union(cluster_of(&xs));
        prop_assert_eq!(pairs(&ab), pairs(&ba));
    }

    #[test]
    fn union_is_associative(
        xs in snapshots_strategy(),
        ys in snapshots_strategy(),
        zs in snapshots_strategy(),
    ) {
        let left = cluster_of(&xs).union(cluster_of(&ys)).union(cluster_of(&zs));
        let right = cluster_of(&xs).union(cluster_of(&ys).union(cluster_of(&zs)));
        prop_assert_eq!(pairs(&left), pairs(&right));
    }

    #[test]
    fn union_with_identity_is_noop(xs in snapshots_strategy()) {
        let alone = cluster_of(&xs);
        let with_empty = cluster_of(&xs).union(EmptyCluster::new());
        prop_assert_eq!(pairs(&alone), pairs(&with_empty));
    }

    #[test]
    fn output_is_ascending_and_deduplicated(
        xs in snapshots_strategy(),
        ys in snapshots_strategy(),
    ) {
        let union = cluster_of(&xs).union(cluster_of(&ys));
        let produced = pairs(&union);
        for window in produced.windows(2) {
            prop_assert!(window[0].0 < window[1].0);
        }
    }

    #[test]
    fn union_equals_merge_fold_per_timestamp(
        xs in snapshots_strategy(),
        ys in snapshots_strategy(),
    ) {
        // Expected: per capture time, the sum of the last-write-wins value of
        // each constituent store at that time.
        let mut expected: BTreeMap<DateTime<Utc>, u64> = BTreeMap::new();
        for side in [&xs, &ys] {
            let mut deduped: BTreeMap<DateTime<Utc>, u64> = BTreeMap::new();
            for &(offset, value) in side.iter() {
                deduped.insert(day(offset), value);
            }
            for (at, value) in deduped {
                *expected.entry(at).or_insert(0) += value;
            }
        }
        let union = cluster_of(&xs).union(cluster_of(&ys));
        let produced: BTreeMap<DateTime<Utc>, u64> = pairs(&union).into_iter().collect();
        prop_assert_eq!(produced, expected);
    }
}
